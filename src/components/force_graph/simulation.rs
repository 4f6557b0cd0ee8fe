use log::debug;

use super::layout::{LayoutConfig, LayoutEngine, Point, TICK};

/// Where a [`Simulation`] is in its schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
	/// Initial ticks, run in batches and not drawn.
	WarmUp,
	/// One tick per frame until the layout calms down.
	Cooling,
	/// Stopped until a drag wakes it up.
	Settled,
}

/// What a frame of the simulation asks of the view.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
	/// Nothing changed.
	Idle,
	/// Positions changed; redraw.
	Moved,
	/// The layout reached a checkpoint (end of warm-up or settled); fit the
	/// view to it.
	Fit,
}

/// Schedules a [`LayoutEngine`] across animation frames.
pub struct Simulation {
	engine: Box<dyn LayoutEngine>,
	phase: Phase,
	warmup_done: usize,
	cooling_done: usize,
	warmup_ticks: usize,
	warmup_per_frame: usize,
	cooldown_ticks: usize,
	energy_threshold: f64,
}

impl Simulation {
	/// Schedule `engine` according to `config`. Starts cooling right away when
	/// there is no warm-up.
	pub fn new(engine: Box<dyn LayoutEngine>, config: &LayoutConfig) -> Self {
		let phase = if config.warmup_ticks == 0 {
			Phase::Cooling
		} else {
			Phase::WarmUp
		};
		Self {
			engine,
			phase,
			warmup_done: 0,
			cooling_done: 0,
			warmup_ticks: config.warmup_ticks,
			warmup_per_frame: config.warmup_ticks_per_frame.max(1),
			cooldown_ticks: config.cooldown_ticks,
			energy_threshold: config.energy_threshold,
		}
	}

	/// Current phase.
	pub fn phase(&self) -> Phase {
		self.phase
	}

	/// Ticks run so far, warm-up included.
	pub fn ticks(&self) -> usize {
		self.warmup_done + self.cooling_done
	}

	/// Current node positions, by node index.
	pub fn positions(&self) -> &[Point] {
		self.engine.positions()
	}

	/// Positions are only shown once the warm-up is over.
	pub fn is_drawable(&self) -> bool {
		self.phase != Phase::WarmUp
	}

	/// Run the work of one animation frame.
	pub fn frame(&mut self) -> FrameOutcome {
		match self.phase {
			Phase::WarmUp => {
				let batch = self.warmup_per_frame.min(self.warmup_ticks - self.warmup_done);
				for _ in 0..batch {
					self.engine.advance(TICK);
				}
				self.warmup_done += batch;
				if self.warmup_done >= self.warmup_ticks {
					debug!("layout warm-up done after {} ticks", self.warmup_done);
					self.phase = Phase::Cooling;
					FrameOutcome::Fit
				} else {
					FrameOutcome::Idle
				}
			}
			Phase::Cooling => {
				self.engine.advance(TICK);
				self.cooling_done += 1;
				let energy = self.engine.kinetic_energy();
				if energy < self.energy_threshold || self.cooling_done >= self.cooldown_ticks {
					debug!(
						"layout settled after {} ticks (energy {:.4})",
						self.ticks(),
						energy
					);
					self.phase = Phase::Settled;
					FrameOutcome::Fit
				} else {
					FrameOutcome::Moved
				}
			}
			Phase::Settled => FrameOutcome::Idle,
		}
	}

	/// Move the point the layout is centred on.
	pub fn set_center(&mut self, center: Point) {
		self.engine.set_center(center);
	}

	/// Hold a node under the pointer and let the rest of the graph react.
	pub fn pin(&mut self, node: usize, at: Point) {
		self.engine.pin(node, at);
		self.wake();
	}

	/// Let a dragged node go.
	pub fn unpin(&mut self, node: usize) {
		self.engine.unpin(node);
	}

	fn wake(&mut self) {
		if self.phase == Phase::Settled {
			self.engine.reheat();
			self.cooling_done = 0;
			self.phase = Phase::Cooling;
		}
	}
}
