use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use super::layout::{
	LayoutConfig, LayoutEngine, Point, TICK, apply_centering, seed_positions, separate_overlaps,
};
use super::types::GraphModel;

/// Layout backed by the `force_graph` charge/spring integrator.
///
/// The integrator has no centering or collision force, so both are applied
/// to the positions after every update. Repulsion is bounded by
/// `force_max` rather than by distance.
pub struct ChargeSpringLayout {
	graph: ForceGraph<usize, ()>,
	handles: Vec<DefaultNodeIdx>,
	positions: Vec<Point>,
	fixed: Vec<bool>,
	center: Point,
	config: LayoutConfig,
	energy: f64,
}

impl ChargeSpringLayout {
	/// Seed every node of `model` on a ring around `center`.
	pub fn new(model: &GraphModel, config: LayoutConfig, center: Point) -> Self {
		let params = &config.charge_spring;
		let mut graph = ForceGraph::new(SimulationParameters {
			force_charge: params.force_charge,
			force_spring: params.force_spring,
			force_max: params.force_max,
			node_speed: params.node_speed,
			damping_factor: params.damping_factor,
		});

		let positions = seed_positions(model.len(), center);
		let handles: Vec<DefaultNodeIdx> = positions
			.iter()
			.enumerate()
			.map(|(i, p)| {
				graph.add_node(NodeData {
					x: p.x as f32,
					y: p.y as f32,
					mass: 10.0,
					is_anchor: false,
					user_data: i,
				})
			})
			.collect();
		for edge in model.edges.iter().filter(|e| e.source != e.target) {
			graph.add_edge(handles[edge.source], handles[edge.target], EdgeData::default());
		}

		Self {
			graph,
			handles,
			fixed: vec![false; positions.len()],
			positions,
			center,
			config,
			energy: f64::INFINITY,
		}
	}

	fn read_back(&mut self) {
		let positions = &mut self.positions;
		self.graph.visit_nodes(|node| {
			if let Some(p) = positions.get_mut(node.data.user_data) {
				*p = Point::new(node.x() as f64, node.y() as f64);
			}
		});
	}

	fn write_back(&mut self) {
		let (positions, fixed) = (&self.positions, &self.fixed);
		self.graph.visit_nodes_mut(|node| {
			let i = node.data.user_data;
			if let (Some(p), Some(false)) = (positions.get(i), fixed.get(i).copied()) {
				node.data.x = p.x as f32;
				node.data.y = p.y as f32;
			}
		});
	}
}

impl LayoutEngine for ChargeSpringLayout {
	fn advance(&mut self, dt: f64) -> &[Point] {
		let h = dt / TICK;
		if h <= 0.0 || self.positions.is_empty() {
			return &self.positions;
		}
		let before = self.positions.clone();

		self.graph.update(dt as f32);
		self.read_back();
		apply_centering(
			&mut self.positions,
			&self.fixed,
			self.center,
			(self.config.center_strength * h).min(1.0),
		);
		separate_overlaps(
			&mut self.positions,
			&self.fixed,
			self.config.collision_radius,
			self.config.collision_strength,
		);
		self.write_back();

		let free = self.fixed.iter().filter(|f| !**f).count();
		let moved: f64 = before
			.iter()
			.zip(&self.positions)
			.zip(&self.fixed)
			.filter(|(_, f)| !**f)
			.map(|((a, b), _)| (a.distance(*b) / h).powi(2))
			.sum();
		self.energy = if free == 0 { 0.0 } else { moved / free as f64 };
		&self.positions
	}

	fn positions(&self) -> &[Point] {
		&self.positions
	}

	fn kinetic_energy(&self) -> f64 {
		self.energy
	}

	fn set_center(&mut self, center: Point) {
		self.center = center;
	}

	fn pin(&mut self, node: usize, at: Point) {
		let Some(&handle) = self.handles.get(node) else {
			return;
		};
		self.positions[node] = at;
		self.fixed[node] = true;
		self.graph.visit_nodes_mut(|n| {
			if n.index() == handle {
				n.data.x = at.x as f32;
				n.data.y = at.y as f32;
				n.data.is_anchor = true;
			}
		});
	}

	fn unpin(&mut self, node: usize) {
		let Some(&handle) = self.handles.get(node) else {
			return;
		};
		self.fixed[node] = false;
		self.graph.visit_nodes_mut(|n| {
			if n.index() == handle {
				n.data.is_anchor = false;
			}
		});
	}

	fn reheat(&mut self) {
		self.energy = f64::INFINITY;
	}
}
