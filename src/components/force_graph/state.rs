use log::debug;

use super::layout::{LayoutConfig, Point, build_engine};
use super::simulation::{FrameOutcome, Phase, Simulation};
use super::types::GraphModel;
use super::view::{ViewState, ViewTransform};

/// Radius of a drawn node, in graph units.
pub const NODE_RADIUS: f64 = 3.0;
/// Pointer hit radius around a node, in graph units.
pub const HIT_RADIUS: f64 = 6.0;

/// A node held by the pointer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragState {
	pub(crate) node: usize,
}

/// A background drag in progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PanState {
	/// Pointer position at the previous move.
	pub(crate) last_x: f64,
	pub(crate) last_y: f64,
}

/// Everything the canvas needs between frames for one loaded graph.
pub struct ForceGraphState {
	pub(crate) model: GraphModel,
	/// Layout schedule.
	pub simulation: Simulation,
	/// Zoom and pan chosen by the user.
	pub view: ViewState,
	fit: ViewTransform,
	pub(crate) drag: Option<DragState>,
	pub(crate) pan: Option<PanState>,
	pub(crate) width: f64,
	pub(crate) height: f64,
	padding: f64,
}

impl ForceGraphState {
	/// Lay out `model` in a `width` by `height` canvas.
	pub fn new(model: GraphModel, config: &LayoutConfig, width: f64, height: f64) -> Self {
		let center = Point::new(width / 2.0, height / 2.0);
		let simulation = Simulation::new(build_engine(&model, config, center), config);
		debug!(
			"graph layout built: {} nodes, {} edges, {:?} engine",
			model.len(),
			model.edges.len(),
			config.kind
		);
		Self {
			model,
			simulation,
			view: ViewState::default(),
			fit: ViewTransform::identity_centered(width, height),
			drag: None,
			pan: None,
			width,
			height,
			padding: config.fit_padding,
		}
	}

	/// The transform the canvas is drawn with.
	pub fn transform(&self) -> ViewTransform {
		self.fit.apply_view(&self.view, self.width, self.height)
	}

	/// Current node positions, by node index.
	pub fn positions(&self) -> &[Point] {
		self.simulation.positions()
	}

	/// Advance one animation frame. Returns whether the layout changed.
	pub fn tick(&mut self) -> bool {
		match self.simulation.frame() {
			FrameOutcome::Idle => false,
			FrameOutcome::Moved => true,
			FrameOutcome::Fit => {
				self.auto_fit();
				true
			}
		}
	}

	/// Fit the view to the current positions.
	pub fn auto_fit(&mut self) {
		self.fit = ViewTransform::fit(
			self.simulation.positions(),
			self.width,
			self.height,
			self.padding,
		);
	}

	/// Follow a canvas size change without restarting the layout.
	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.simulation.set_center(Point::new(width / 2.0, height / 2.0));
		if self.simulation.phase() != Phase::WarmUp {
			self.auto_fit();
		}
	}

	/// One zoom step in.
	pub fn zoom_in(&mut self) {
		self.view.zoom_in();
	}

	/// One zoom step out.
	pub fn zoom_out(&mut self) {
		self.view.zoom_out();
	}

	/// Back to zoom 1, no pan and a fresh fit.
	pub fn reset_view(&mut self) {
		self.view.reset();
		self.auto_fit();
	}

	/// Closest node within [`HIT_RADIUS`] of a screen point.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<usize> {
		if !self.simulation.is_drawable() {
			return None;
		}
		let at = self.transform().screen_to_graph(sx, sy);
		self.positions()
			.iter()
			.enumerate()
			.filter(|(_, p)| p.is_finite())
			.map(|(i, p)| (i, p.distance(at)))
			.filter(|(_, d)| *d < HIT_RADIUS)
			.min_by(|a, b| a.1.total_cmp(&b.1))
			.map(|(i, _)| i)
	}

	/// Press on a node starts a drag, anywhere else starts a pan.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		if let Some(node) = self.node_at_position(sx, sy) {
			let at = self.transform().screen_to_graph(sx, sy);
			self.simulation.pin(node, at);
			self.drag = Some(DragState { node });
		} else {
			self.pan = Some(PanState {
				last_x: sx,
				last_y: sy,
			});
		}
	}

	/// Drag the held node or pan the view.
	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if let Some(drag) = self.drag {
			let at = self.transform().screen_to_graph(sx, sy);
			self.simulation.pin(drag.node, at);
		} else if let Some(pan) = self.pan.as_mut() {
			self.view.pan_by(sx - pan.last_x, sy - pan.last_y);
			pan.last_x = sx;
			pan.last_y = sy;
		}
	}

	/// End any drag or pan.
	pub fn pointer_up(&mut self) {
		if let Some(drag) = self.drag.take() {
			self.simulation.unpin(drag.node);
		}
		self.pan = None;
	}

	/// Wheel input steps the zoom like the buttons do.
	pub fn wheel(&mut self, delta_y: f64) {
		if delta_y > 0.0 {
			self.zoom_out();
		} else if delta_y < 0.0 {
			self.zoom_in();
		}
	}
}
