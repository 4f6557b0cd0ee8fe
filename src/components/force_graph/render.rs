use std::f64::consts::PI;

use log::trace;
use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::layout::Point;
use super::state::{ForceGraphState, NODE_RADIUS};

const BACKGROUND: &str = "#f5f5f5";
const NODE_FILL: &str = "#4CAF50";
const NODE_FILL_EDGE: &str = "#2E7D32";
const NODE_STROKE: &str = "#1B5E20";
const LABEL_BACKING: &str = "rgba(255, 255, 255, 0.9)";
const EDGE_COLOR: &str = "#999";

const NODE_FONT_SIZE: f64 = 3.0;
const EDGE_FONT_SIZE: f64 = 2.0;
/// Arrow length in screen pixels; divided by the zoom scale when drawn.
const ARROW_LENGTH: f64 = 3.0;
const HALO_OFFSETS: [(f64, f64); 4] = [(-0.5, -0.5), (0.5, -0.5), (-0.5, 0.5), (0.5, 0.5)];

/// Arrowhead and label anchor of one edge, in graph units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeGeometry {
	pub tip: Point,
	pub wings: [Point; 2],
	pub mid: Point,
}

/// Compute where an edge's arrow and label go. `None` for segments that
/// cannot be drawn.
pub fn edge_geometry(start: Point, end: Point, k: f64) -> Option<EdgeGeometry> {
	if !start.is_finite() || !end.is_finite() {
		return None;
	}
	let (dx, dy) = (end.x - start.x, end.y - start.y);
	let dist = dx.hypot(dy);
	if dist < f64::EPSILON {
		return None;
	}
	let length = ARROW_LENGTH / k;
	let (ux, uy) = (dx / dist, dy / dist);
	let tip = Point::new(end.x - ux * length * 2.0, end.y - uy * length * 2.0);
	let angle = dy.atan2(dx);
	let wing = |offset: f64| {
		Point::new(
			tip.x - length * (angle + offset).cos(),
			tip.y - length * (angle + offset).sin(),
		)
	};
	Some(EdgeGeometry {
		tip,
		wings: [wing(-PI / 6.0), wing(PI / 6.0)],
		mid: Point::new(start.x + dx / 2.0, start.y + dy / 2.0),
	})
}

/// Backing rectangle of a node label centred under the node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LabelBox {
	pub x: f64,
	pub y: f64,
	pub width: f64,
	pub height: f64,
	/// Baseline-middle of the text.
	pub text_y: f64,
}

pub fn label_box(center: Point, text_width: f64, k: f64) -> LabelBox {
	let text_y = center.y + NODE_RADIUS + NODE_FONT_SIZE * 0.6;
	let padding = 2.0 / k;
	LabelBox {
		x: center.x - text_width / 2.0 - padding,
		y: text_y - NODE_FONT_SIZE / 2.0 - padding,
		width: text_width + padding * 2.0,
		height: NODE_FONT_SIZE + padding * 2.0,
		text_y,
	}
}

pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	if !state.simulation.is_drawable() {
		return;
	}

	let t = state.transform();
	if !(t.k.is_finite() && t.k > 0.0) {
		return;
	}
	ctx.save();
	let _ = ctx.translate(t.x, t.y);
	let _ = ctx.scale(t.k, t.k);
	ctx.set_text_align("center");
	ctx.set_text_baseline("middle");
	draw_edges(state, ctx, t.k);
	draw_nodes(state, ctx, t.k);
	ctx.restore();
}

fn draw_edges(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, k: f64) {
	let positions = state.positions();
	let dash = js_sys::Array::of2(&JsValue::from_f64(2.0), &JsValue::from_f64(1.0));
	ctx.set_font(&format!("{EDGE_FONT_SIZE}px Sans-Serif"));

	for edge in &state.model.edges {
		let (start, end) = (positions[edge.source], positions[edge.target]);
		let Some(geometry) = edge_geometry(start, end, k) else {
			trace!("skipping edge {} -> {}", edge.source, edge.target);
			continue;
		};

		ctx.begin_path();
		ctx.move_to(start.x, start.y);
		ctx.line_to(end.x, end.y);
		ctx.set_stroke_style_str(EDGE_COLOR);
		let _ = ctx.set_line_dash(&dash);
		ctx.set_line_width(1.5 / k);
		ctx.stroke();

		let [left, right] = geometry.wings;
		ctx.begin_path();
		ctx.move_to(geometry.tip.x, geometry.tip.y);
		ctx.line_to(left.x, left.y);
		ctx.line_to(right.x, right.y);
		ctx.close_path();
		ctx.set_fill_style_str(EDGE_COLOR);
		ctx.fill();
		let _ = ctx.set_line_dash(&js_sys::Array::new());

		if edge.label.is_empty() {
			continue;
		}
		ctx.set_fill_style_str("white");
		for (ox, oy) in HALO_OFFSETS {
			let _ = ctx.fill_text(&edge.label, geometry.mid.x + ox, geometry.mid.y + oy);
		}
		ctx.set_fill_style_str("#000");
		let _ = ctx.fill_text(&edge.label, geometry.mid.x, geometry.mid.y);
	}
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d, k: f64) {
	ctx.set_font(&format!("{NODE_FONT_SIZE}px Sans-Serif"));

	for (node, &p) in state.model.nodes.iter().zip(state.positions()) {
		if !p.is_finite() {
			continue;
		}

		ctx.begin_path();
		let _ = ctx.arc(p.x, p.y, NODE_RADIUS, 0.0, 2.0 * PI);
		match ctx.create_radial_gradient(p.x, p.y, 0.0, p.x, p.y, NODE_RADIUS) {
			Ok(gradient)
				if gradient.add_color_stop(0.0, NODE_FILL).is_ok()
					&& gradient.add_color_stop(1.0, NODE_FILL_EDGE).is_ok() =>
			{
				ctx.set_fill_style_canvas_gradient(&gradient);
			}
			_ => ctx.set_fill_style_str(NODE_FILL),
		}
		ctx.fill();
		ctx.set_stroke_style_str(NODE_STROKE);
		ctx.set_line_width(4.0 / k);
		ctx.stroke();

		let text_width = ctx
			.measure_text(&node.label)
			.map(|m| m.width())
			.unwrap_or(0.0);
		let label = label_box(p, text_width, k);
		ctx.set_fill_style_str(LABEL_BACKING);
		ctx.fill_rect(label.x, label.y, label.width, label.height);
		ctx.set_fill_style_str(NODE_STROKE);
		let _ = ctx.fill_text(&node.label, p.x, label.text_y);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn close(a: Point, b: Point) -> bool {
		a.distance(b) < 1e-9
	}

	#[test]
	fn arrow_sits_two_lengths_before_target() {
		let g = edge_geometry(Point::new(0.0, 0.0), Point::new(100.0, 0.0), 1.0).unwrap();
		assert!(close(g.tip, Point::new(94.0, 0.0)));
		assert!(close(g.mid, Point::new(50.0, 0.0)));
		// Wings trail the tip at 30 degrees on either side.
		let (s, c) = (PI / 6.0).sin_cos();
		assert!(close(g.wings[0], Point::new(94.0 - 3.0 * c, 3.0 * s)));
		assert!(close(g.wings[1], Point::new(94.0 - 3.0 * c, -3.0 * s)));
	}

	#[test]
	fn arrow_shrinks_with_zoom() {
		let g = edge_geometry(Point::new(0.0, 0.0), Point::new(0.0, 100.0), 2.0).unwrap();
		assert!(close(g.tip, Point::new(0.0, 97.0)));
	}

	#[test]
	fn degenerate_edges_are_skipped() {
		let p = Point::new(3.0, 4.0);
		assert_eq!(edge_geometry(p, p, 1.0), None);
		assert_eq!(edge_geometry(p, Point::new(f64::NAN, 1.0), 1.0), None);
		assert_eq!(edge_geometry(Point::new(f64::INFINITY, 0.0), p, 1.0), None);
	}

	#[test]
	fn label_box_is_centred_below_node() {
		let b = label_box(Point::new(10.0, 20.0), 8.0, 2.0);
		assert!((b.x - 5.0).abs() < 1e-9);
		assert!((b.width - 10.0).abs() < 1e-9);
		assert!((b.text_y - (20.0 + NODE_RADIUS + 1.8)).abs() < 1e-9);
		assert!((b.y + b.height / 2.0 - b.text_y).abs() < 1e-9);
	}
}
