use std::f64::consts::PI;

use serde::Deserialize;

use super::charge_spring::ChargeSpringLayout;
use super::types::GraphModel;

/// Duration of one simulation tick in seconds.
pub const TICK: f64 = 1.0 / 60.0;

/// Radius of the ring new nodes are seeded on.
const SEED_RADIUS: f64 = 100.0;

/// Position in graph space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
	/// Horizontal coordinate.
	pub x: f64,
	/// Vertical coordinate, growing downwards.
	pub y: f64,
}

impl Point {
	/// Point at `(x, y)`.
	pub const fn new(x: f64, y: f64) -> Self {
		Self { x, y }
	}

	/// Whether both coordinates are finite numbers.
	pub fn is_finite(self) -> bool {
		self.x.is_finite() && self.y.is_finite()
	}

	/// Euclidean distance to `other`.
	pub fn distance(self, other: Point) -> f64 {
		(self.x - other.x).hypot(self.y - other.y)
	}
}

/// A force-directed layout advanced one step at a time.
///
/// Index `i` of every slice refers to node `i` of the [`GraphModel`] the
/// engine was built from.
pub trait LayoutEngine {
	/// Advance the simulation by `dt` seconds and return the new positions.
	fn advance(&mut self, dt: f64) -> &[Point];
	/// Positions after the last step.
	fn positions(&self) -> &[Point];
	/// Mean squared node speed of the last step, in px² per tick².
	fn kinetic_energy(&self) -> f64;
	/// Point the centering force pulls toward.
	fn set_center(&mut self, center: Point);
	/// Hold a node at `at` until [`LayoutEngine::unpin`].
	fn pin(&mut self, node: usize, at: Point);
	/// Release a pinned node back to the simulation.
	fn unpin(&mut self, node: usize);
	/// Put energy back into a settled layout, e.g. after a drag.
	fn reheat(&mut self);
}

/// Which [`LayoutEngine`] lays out the graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutKind {
	/// Velocity-decay simulation with a charge cutoff and collision.
	#[default]
	Force,
	/// The `force_graph` charge and spring integrator.
	ChargeSpring,
}

/// Parameters of the `force_graph` integrator used by [`ChargeSpringLayout`].
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChargeSpringParams {
	/// Repulsion between every pair of nodes.
	pub force_charge: f32,
	/// Pull of every edge.
	pub force_spring: f32,
	/// Upper bound of the force on one node.
	pub force_max: f32,
	/// Maximum node speed.
	pub node_speed: f32,
	/// Velocity kept from one step to the next.
	pub damping_factor: f32,
}

impl Default for ChargeSpringParams {
	fn default() -> Self {
		Self {
			force_charge: 150.0,
			force_spring: 0.05,
			force_max: 100.0,
			node_speed: 3000.0,
			damping_factor: 0.9,
		}
	}
}

/// Tuning of the graph layout and its schedule. Every field has a default.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
	/// Engine to use.
	pub kind: LayoutKind,
	/// Negative values repel.
	pub charge_strength: f64,
	/// Pairs further apart than this do not repel.
	pub charge_distance_max: f64,
	/// Rest length of an edge.
	pub link_distance: f64,
	/// Stiffness of an edge.
	pub link_strength: f64,
	/// Fraction of the centroid offset corrected per tick.
	pub center_strength: f64,
	/// Nodes closer than twice this are pushed apart.
	pub collision_radius: f64,
	/// Fraction of an overlap resolved per tick.
	pub collision_strength: f64,
	/// How fast the simulation cools, per tick.
	pub alpha_decay: f64,
	/// Fraction of velocity lost per tick.
	pub velocity_decay: f64,
	/// Ticks run before the first frame is drawn.
	pub warmup_ticks: usize,
	/// Warm-up ticks run per animation frame.
	pub warmup_ticks_per_frame: usize,
	/// Drawn ticks after which the layout settles regardless of energy.
	pub cooldown_ticks: usize,
	/// Kinetic energy below which the layout counts as settled.
	pub energy_threshold: f64,
	/// Screen margin left by auto-fit, in pixels.
	pub fit_padding: f64,
	/// Parameters of [`LayoutKind::ChargeSpring`].
	pub charge_spring: ChargeSpringParams,
}

impl Default for LayoutConfig {
	fn default() -> Self {
		Self {
			kind: LayoutKind::Force,
			charge_strength: -2000.0,
			charge_distance_max: 300.0,
			link_distance: 200.0,
			link_strength: 0.5,
			center_strength: 0.2,
			collision_radius: 50.0,
			collision_strength: 1.0,
			alpha_decay: 0.01,
			velocity_decay: 0.3,
			warmup_ticks: 200,
			warmup_ticks_per_frame: 20,
			cooldown_ticks: 200,
			energy_threshold: 0.05,
			fit_padding: 60.0,
			charge_spring: ChargeSpringParams::default(),
		}
	}
}

/// Initial placement: evenly spaced on a ring around `center`.
pub fn seed_positions(count: usize, center: Point) -> Vec<Point> {
	(0..count)
		.map(|i| {
			let angle = (i as f64) * 2.0 * PI / count as f64;
			Point::new(
				center.x + SEED_RADIUS * angle.cos(),
				center.y + SEED_RADIUS * angle.sin(),
			)
		})
		.collect()
}

/// Build the engine selected by `config` for `model`.
pub fn build_engine(
	model: &GraphModel,
	config: &LayoutConfig,
	center: Point,
) -> Box<dyn LayoutEngine> {
	match config.kind {
		LayoutKind::Force => Box::new(ForceLayout::new(model, config.clone(), center)),
		LayoutKind::ChargeSpring => {
			Box::new(ChargeSpringLayout::new(model, config.clone(), center))
		}
	}
}

/// Pull every free node so that the centroid moves toward `center`.
pub(super) fn apply_centering(
	positions: &mut [Point],
	fixed: &[bool],
	center: Point,
	strength: f64,
) {
	let free = fixed.iter().filter(|f| !**f).count();
	if free == 0 {
		return;
	}
	let (sx, sy) = positions
		.iter()
		.zip(fixed)
		.filter(|(_, f)| !**f)
		.fold((0.0, 0.0), |(sx, sy), (p, _)| (sx + p.x, sy + p.y));
	let (dx, dy) = (
		(sx / free as f64 - center.x) * strength,
		(sy / free as f64 - center.y) * strength,
	);
	for (p, _) in positions.iter_mut().zip(fixed).filter(|(_, f)| !**f) {
		p.x -= dx;
		p.y -= dy;
	}
}

/// Push overlapping nodes apart until they are at least `2 * radius` apart.
pub(super) fn separate_overlaps(
	positions: &mut [Point],
	fixed: &[bool],
	radius: f64,
	strength: f64,
) {
	let min = 2.0 * radius;
	for i in 0..positions.len() {
		for j in (i + 1)..positions.len() {
			let (dx, dy) = nudge(positions[i], positions[j], i, j);
			let dist = dx.hypot(dy);
			if dist >= min {
				continue;
			}
			let push = (min - dist) / dist * strength;
			let (wi, wj) = split_weights(fixed[i], fixed[j]);
			positions[i].x += dx * push * wi;
			positions[i].y += dy * push * wi;
			positions[j].x -= dx * push * wj;
			positions[j].y -= dy * push * wj;
		}
	}
}

// Vector from `b` to `a`, with a small index-derived offset when the two
// points coincide so they can be pushed apart deterministically.
fn nudge(a: Point, b: Point, i: usize, j: usize) -> (f64, f64) {
	let (dx, dy) = (a.x - b.x, a.y - b.y);
	if dx == 0.0 && dy == 0.0 {
		let t = (i * 31 + j * 17) as f64;
		(1e-3 * t.cos(), 1e-3 * t.sin())
	} else {
		(dx, dy)
	}
}

// How much of a correction each of two nodes takes; pinned nodes take none.
fn split_weights(fixed_a: bool, fixed_b: bool) -> (f64, f64) {
	match (fixed_a, fixed_b) {
		(false, false) => (0.5, 0.5),
		(false, true) => (1.0, 0.0),
		(true, false) => (0.0, 1.0),
		(true, true) => (0.0, 0.0),
	}
}

/// Velocity-decay simulation with many-body repulsion, link springs,
/// centering and collision.
pub struct ForceLayout {
	config: LayoutConfig,
	center: Point,
	alpha: f64,
	positions: Vec<Point>,
	velocities: Vec<Point>,
	fixed: Vec<bool>,
	links: Vec<(usize, usize, f64)>,
	energy: f64,
}

impl ForceLayout {
	/// Seed every node of `model` on a ring around `center`.
	pub fn new(model: &GraphModel, config: LayoutConfig, center: Point) -> Self {
		let degrees = model.degrees();
		let links = model
			.edges
			.iter()
			.filter(|e| e.source != e.target)
			.map(|e| {
				let (ds, dt) = (degrees[e.source] as f64, degrees[e.target] as f64);
				(e.source, e.target, ds / (ds + dt))
			})
			.collect();
		Self::with_positions(seed_positions(model.len(), center), links, config, center)
	}

	fn with_positions(
		positions: Vec<Point>,
		links: Vec<(usize, usize, f64)>,
		config: LayoutConfig,
		center: Point,
	) -> Self {
		let n = positions.len();
		Self {
			config,
			center,
			alpha: 1.0,
			positions,
			velocities: vec![Point::default(); n],
			fixed: vec![false; n],
			links,
			energy: f64::INFINITY,
		}
	}

	fn apply_links(&mut self, h: f64) {
		let (distance, strength) = (self.config.link_distance, self.config.link_strength);
		for &(s, t, bias) in &self.links {
			let (ps, pt, vs, vt) = (
				self.positions[s],
				self.positions[t],
				self.velocities[s],
				self.velocities[t],
			);
			let (dx, dy) = nudge(
				Point::new(pt.x + vt.x, pt.y + vt.y),
				Point::new(ps.x + vs.x, ps.y + vs.y),
				t,
				s,
			);
			let len = dx.hypot(dy);
			let l = (len - distance) / len * self.alpha * strength * h;
			let (fx, fy) = (dx * l, dy * l);
			self.velocities[t].x -= fx * bias;
			self.velocities[t].y -= fy * bias;
			self.velocities[s].x += fx * (1.0 - bias);
			self.velocities[s].y += fy * (1.0 - bias);
		}
	}

	fn apply_charge(&mut self, h: f64) {
		let max2 = self.config.charge_distance_max.powi(2);
		let strength = self.config.charge_strength * self.alpha * h;
		let n = self.positions.len();
		for i in 0..n {
			for j in (i + 1)..n {
				let (dx, dy) = nudge(self.positions[j], self.positions[i], j, i);
				let l = dx * dx + dy * dy;
				if l >= max2 {
					continue;
				}
				let w = strength / l.max(1.0);
				self.velocities[i].x += dx * w;
				self.velocities[i].y += dy * w;
				self.velocities[j].x -= dx * w;
				self.velocities[j].y -= dy * w;
			}
		}
	}

	fn apply_collision(&mut self) {
		let min = 2.0 * self.config.collision_radius;
		let strength = self.config.collision_strength;
		let n = self.positions.len();
		for i in 0..n {
			for j in (i + 1)..n {
				let a = Point::new(
					self.positions[i].x + self.velocities[i].x,
					self.positions[i].y + self.velocities[i].y,
				);
				let b = Point::new(
					self.positions[j].x + self.velocities[j].x,
					self.positions[j].y + self.velocities[j].y,
				);
				let (dx, dy) = nudge(a, b, i, j);
				let dist = dx.hypot(dy);
				if dist >= min {
					continue;
				}
				let push = (min - dist) / dist * strength;
				self.velocities[i].x += dx * push * 0.5;
				self.velocities[i].y += dy * push * 0.5;
				self.velocities[j].x -= dx * push * 0.5;
				self.velocities[j].y -= dy * push * 0.5;
			}
		}
	}
}

impl LayoutEngine for ForceLayout {
	fn advance(&mut self, dt: f64) -> &[Point] {
		let h = (dt / TICK).max(0.0);
		if h == 0.0 || self.positions.is_empty() {
			return &self.positions;
		}
		self.alpha -= self.alpha * (self.config.alpha_decay * h).min(1.0);

		self.apply_links(h);
		self.apply_charge(h);
		self.apply_collision();

		let keep = (1.0 - self.config.velocity_decay).powf(h);
		let mut energy = 0.0;
		let mut free = 0usize;
		for i in 0..self.positions.len() {
			if self.fixed[i] {
				self.velocities[i] = Point::default();
				continue;
			}
			let v = &mut self.velocities[i];
			v.x *= keep;
			v.y *= keep;
			self.positions[i].x += v.x * h;
			self.positions[i].y += v.y * h;
			energy += v.x * v.x + v.y * v.y;
			free += 1;
		}
		self.energy = if free == 0 { 0.0 } else { energy / free as f64 };

		apply_centering(
			&mut self.positions,
			&self.fixed,
			self.center,
			(self.config.center_strength * h).min(1.0),
		);
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
		if let Some(p) = self.positions.get_mut(node) {
			*p = at;
			self.fixed[node] = true;
			self.velocities[node] = Point::default();
		}
	}

	fn unpin(&mut self, node: usize) {
		if let Some(f) = self.fixed.get_mut(node) {
			*f = false;
		}
	}

	fn reheat(&mut self) {
		self.alpha = self.alpha.max(0.3);
	}
}
