use super::layout::Point;

/// Smallest zoom level.
pub const ZOOM_MIN: f64 = 0.5;
/// Largest zoom level.
pub const ZOOM_MAX: f64 = 2.5;
/// Change of one zoom step.
pub const ZOOM_STEP: f64 = 0.2;

const FIT_SCALE_MIN: f64 = 0.1;
const FIT_SCALE_MAX: f64 = 8.0;

/// User-controlled part of the view: a zoom multiplier over the fitted
/// transform plus a screen-space pan.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewState {
	/// Multiplier over the fitted scale.
	pub zoom_level: f64,
	/// Horizontal pan in pixels.
	pub pan_x: f64,
	/// Vertical pan in pixels.
	pub pan_y: f64,
}

impl Default for ViewState {
	fn default() -> Self {
		Self {
			zoom_level: 1.0,
			pan_x: 0.0,
			pan_y: 0.0,
		}
	}
}

impl ViewState {
	/// Zoom one step in, up to [`ZOOM_MAX`].
	pub fn zoom_in(&mut self) {
		self.set_zoom(self.zoom_level + ZOOM_STEP);
	}

	/// Zoom one step out, down to [`ZOOM_MIN`].
	pub fn zoom_out(&mut self) {
		self.set_zoom(self.zoom_level - ZOOM_STEP);
	}

	/// Zoom 1 and no pan.
	pub fn reset(&mut self) {
		*self = Self::default();
	}

	/// Shift the view by a screen-space delta.
	pub fn pan_by(&mut self, dx: f64, dy: f64) {
		self.pan_x += dx;
		self.pan_y += dy;
	}

	// Steps are rounded to one decimal so repeated steps do not drift.
	fn set_zoom(&mut self, zoom: f64) {
		self.zoom_level = ((zoom * 10.0).round() / 10.0).clamp(ZOOM_MIN, ZOOM_MAX);
	}
}

/// Graph-to-screen mapping: `screen = graph * k + (x, y)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewTransform {
	/// Horizontal offset in pixels.
	pub x: f64,
	/// Vertical offset in pixels.
	pub y: f64,
	/// Scale.
	pub k: f64,
}

impl ViewTransform {
	/// Unscaled transform putting the graph origin at the viewport centre.
	pub fn identity_centered(width: f64, height: f64) -> Self {
		Self {
			x: width / 2.0,
			y: height / 2.0,
			k: 1.0,
		}
	}

	/// Transform that fits the bounding box of all finite positions into the
	/// viewport, leaving `padding` pixels on every side.
	pub fn fit(positions: &[Point], width: f64, height: f64, padding: f64) -> Self {
		let mut finite = positions.iter().filter(|p| p.is_finite());
		let Some(first) = finite.next() else {
			return Self::identity_centered(width, height);
		};
		let (mut min, mut max) = (*first, *first);
		for p in finite {
			min.x = min.x.min(p.x);
			min.y = min.y.min(p.y);
			max.x = max.x.max(p.x);
			max.y = max.y.max(p.y);
		}

		let (box_w, box_h) = (max.x - min.x, max.y - min.y);
		let avail_w = (width - 2.0 * padding).max(1.0);
		let avail_h = (height - 2.0 * padding).max(1.0);
		let k = match (box_w > 0.0, box_h > 0.0) {
			(true, true) => (avail_w / box_w).min(avail_h / box_h),
			(true, false) => avail_w / box_w,
			(false, true) => avail_h / box_h,
			(false, false) => 1.0,
		}
		.clamp(FIT_SCALE_MIN, FIT_SCALE_MAX);

		let center = Point::new((min.x + max.x) / 2.0, (min.y + max.y) / 2.0);
		Self {
			x: width / 2.0 - center.x * k,
			y: height / 2.0 - center.y * k,
			k,
		}
	}

	/// Scale around the viewport centre by the zoom level, then pan.
	pub fn apply_view(&self, view: &ViewState, width: f64, height: f64) -> Self {
		let (cx, cy) = (width / 2.0, height / 2.0);
		Self {
			x: cx + (self.x - cx) * view.zoom_level + view.pan_x,
			y: cy + (self.y - cy) * view.zoom_level + view.pan_y,
			k: self.k * view.zoom_level,
		}
	}

	/// Screen position of a graph point.
	pub fn to_screen(&self, p: Point) -> Point {
		Point::new(p.x * self.k + self.x, p.y * self.k + self.y)
	}

	/// Graph point under a screen position.
	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> Point {
		Point::new((sx - self.x) / self.k, (sy - self.y) / self.k)
	}
}
