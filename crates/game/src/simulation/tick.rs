use crate::world::World;

/// Longest frame delta fed into the accumulator, so a stall does not turn
/// into a burst of catch-up ticks.
const MAX_FRAME_DELTA: f32 = 0.25;

#[derive(Debug, Clone)]
pub struct FixedTimestep {
    tick_rate: u32,
    dt: f32,
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick_rate,
            dt: 1.0 / tick_rate as f32,
            accumulator: 0.0,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn accumulate(&mut self, delta: f32) {
        self.accumulator += delta.clamp(0.0, MAX_FRAME_DELTA);
    }

    pub fn should_tick(&self) -> bool {
        self.accumulator >= self.dt
    }

    /// Takes one tick's worth of time out of the accumulator, if there is one.
    pub fn consume_tick(&mut self) -> bool {
        let ready = self.should_tick();
        if ready {
            self.accumulator -= self.dt;
        }
        ready
    }
}

/// Runs a [`World`] at a fixed rate regardless of how often it is polled.
#[derive(Debug)]
pub struct SimulationLoop {
    world: World,
    timestep: FixedTimestep,
    tick: u32,
}

impl SimulationLoop {
    pub fn new(world: World, tick_rate: u32) -> Self {
        Self {
            world,
            timestep: FixedTimestep::new(tick_rate),
            tick: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn timestep(&self) -> &FixedTimestep {
        &self.timestep
    }

    /// Feeds one frame's elapsed time and runs every tick it pays for.
    pub fn update(&mut self, delta: f32) -> u32 {
        self.timestep.accumulate(delta);

        let dt = self.timestep.dt();
        let mut ticks_run = 0;
        while self.timestep.consume_tick() {
            self.world.update(dt);
            self.tick = self.tick.wrapping_add(1);
            ticks_run += 1;
        }

        ticks_run
    }
}
