#![allow(dead_code)]

use bevy_ecs::prelude::World;
use bevy_ecs::schedule::Schedule;
use dispatch_core::runner::{
    initialize_simulation, run_next_event, run_until_empty, simulation_schedule,
};

/// Upper bound on events per test run; hitting it means the run did not converge.
pub const MAX_STEPS: usize = 100_000;

/// Helper that owns a reusable `Schedule` so tests can step or drain the event queue.
pub struct ScheduleRunner {
    schedule: Schedule,
}

impl Default for ScheduleRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ScheduleRunner {
    /// Create a runner with the default simulation schedule.
    pub fn new() -> Self {
        Self {
            schedule: simulation_schedule(),
        }
    }

    /// Run a single event (returns `true` if an event was processed).
    pub fn run_one(&mut self, world: &mut World) -> bool {
        run_next_event(world, &mut self.schedule)
    }

    /// Run multiple events up to `max_steps`, returning the number of steps executed.
    pub fn run_until_empty(&mut self, world: &mut World, max_steps: usize) -> usize {
        run_until_empty(world, &mut self.schedule, max_steps)
    }

    /// Seed the first dispatch cycle and drain the queue, asserting convergence.
    pub fn run_full(&mut self, world: &mut World) -> usize {
        initialize_simulation(world);
        let steps = self.run_until_empty(world, MAX_STEPS);
        assert!(steps < MAX_STEPS, "runner did not converge");
        steps
    }
}
