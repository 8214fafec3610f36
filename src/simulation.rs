use crate::config::SimConfig;
use crate::error::SimError;
use crate::light::TrafficLight;
use crate::metrics::{self, Metrics};
use crate::pedestrian::{Pedestrian, Side};
use crate::snapshot::{LightView, Snapshot};
use crate::vehicle::{self, lane_change, Behaviour, Vehicle, VehicleAttributes, VehicleClass};
use crate::{Direction, PedestrianId, PedestrianSet, VehicleId, VehicleSet};
use log::{debug, trace};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A simulation of one signalised intersection.
pub struct Simulation {
    /// The simulation parameters.
    config: SimConfig,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The order in which vehicles are updated.
    vehicle_order: Vec<VehicleId>,
    /// The pedestrians being simulated.
    pedestrians: PedestrianSet,
    /// The traffic light.
    light: TrafficLight,
    /// The source of all randomness.
    rng: StdRng,
    /// The distribution of spawned vehicle classes.
    class_distr: WeightedIndex<f64>,
    /// Whether steps are currently ignored.
    paused: bool,
    /// The multiplier applied to each time step.
    time_scale: f64,
    /// The simulated time in s.
    sim_time: f64,
    /// The current frame of simulation.
    frame: usize,
    /// The time since the last vehicle spawn attempt in s.
    vehicle_spawn: f64,
    /// The time since the last pedestrian spawn attempt in s.
    pedestrian_spawn: f64,
    /// The number of vehicles which passed through the intersection and left.
    passed: usize,
}

impl Simulation {
    /// Creates a new simulation seeded from system entropy.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Creates a new simulation whose random choices are determined by `seed`.
    pub fn with_seed(config: SimConfig, seed: u64) -> Result<Self, SimError> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: SimConfig, rng: StdRng) -> Result<Self, SimError> {
        config.validate()?;
        let class_distr = WeightedIndex::new(config.spawning.class_weights())
            .map_err(|err| SimError::InvalidConfig(err.to_string()))?;
        let mut sim = Self {
            vehicles: VehicleSet::with_key(),
            vehicle_order: vec![],
            pedestrians: PedestrianSet::with_key(),
            light: TrafficLight::new(config.light),
            rng,
            class_distr,
            paused: false,
            time_scale: 1.0,
            sim_time: 0.0,
            frame: 0,
            vehicle_spawn: 0.0,
            pedestrian_spawn: 0.0,
            passed: 0,
            config,
        };
        sim.populate();
        Ok(sim)
    }

    /// Gets the simulation parameters.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Advances the simulation by `dt` seconds of wall time, scaled by the time scale.
    /// Does nothing while paused.
    pub fn step(&mut self, dt: f64) {
        if self.paused {
            return;
        }
        let dt = f64::max(dt, 0.0) * self.time_scale;

        self.update_light(dt);
        self.advance_vehicles(dt);
        self.attempt_lane_changes();
        self.update_pedestrians(dt);
        self.remove_exited_vehicles();
        self.remove_finished_pedestrians();
        self.update_spawners(dt);

        self.sim_time += dt;
        self.frame += 1;
        trace!(
            "frame {}: {} vehicles, {} pedestrians, light {}",
            self.frame,
            self.vehicle_order.len(),
            self.pedestrians.len(),
            self.light.phase()
        );
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// The simulated time in s.
    pub fn simulation_time(&self) -> f64 {
        self.sim_time
    }

    /// The multiplier applied to each time step.
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Sets the time scale, clamped to the configured range.
    pub fn set_time_scale(&mut self, scale: f64) {
        let range = self.config.time_scale;
        self.time_scale = scale.clamp(range.min, range.max);
    }

    /// Increases the time scale by one step.
    pub fn speed_up(&mut self) {
        self.set_time_scale(self.time_scale + self.config.time_scale.step);
    }

    /// Decreases the time scale by one step.
    pub fn slow_down(&mut self) {
        self.set_time_scale(self.time_scale - self.config.time_scale.step);
    }

    /// Whether steps are currently ignored.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Stops the simulation advancing until [Simulation::resume] is called.
    pub fn pause(&mut self) {
        self.set_paused(true);
    }

    /// Lets a paused simulation advance again.
    pub fn resume(&mut self) {
        self.set_paused(false);
    }

    /// Sets whether steps are ignored.
    pub fn set_paused(&mut self, paused: bool) {
        if paused != self.paused {
            debug!("{} at frame {}", if paused { "paused" } else { "resumed" }, self.frame);
        }
        self.paused = paused;
    }

    /// Pauses or resumes the simulation.
    pub fn toggle_pause(&mut self) {
        self.set_paused(!self.paused);
    }

    /// Switches the traffic light between fixed and adaptive timing.
    pub fn toggle_adaptive_light(&mut self) {
        self.light.toggle_adaptive();
    }

    /// Sets whether the traffic light uses adaptive timing.
    pub fn set_adaptive_light(&mut self, adaptive: bool) {
        self.light.set_adaptive(adaptive);
    }

    /// Removes every agent, restores the traffic light to its initial state,
    /// zeroes the counters and places the initial vehicles.
    pub fn reset(&mut self) {
        debug!("reset after {} frames", self.frame);
        self.vehicles.clear();
        self.vehicle_order.clear();
        self.pedestrians.clear();
        self.light = TrafficLight::new(self.config.light);
        self.sim_time = 0.0;
        self.frame = 0;
        self.vehicle_spawn = 0.0;
        self.pedestrian_spawn = 0.0;
        self.passed = 0;
        self.populate();
    }

    /// Adds a vehicle at an explicit position, without any safety checks.
    pub fn add_vehicle(&mut self, attributes: &VehicleAttributes) -> Result<VehicleId, SimError> {
        if !attributes.direction.carries(attributes.lane) {
            return Err(SimError::LaneOutsideGroup {
                lane: attributes.lane,
                direction: attributes.direction,
            });
        }
        Ok(self.insert_vehicle(attributes))
    }

    /// Adds a vehicle at the entry to the given lane, unless a vehicle in that
    /// lane is still too close to the entry. Returns `None` if the spawn was skipped.
    pub fn spawn_vehicle(
        &mut self,
        class: VehicleClass,
        lane: u8,
        direction: Direction,
    ) -> Result<Option<VehicleId>, SimError> {
        if !direction.carries(lane) {
            return Err(SimError::LaneOutsideGroup { lane, direction });
        }
        if !self.is_entry_clear(lane, direction) {
            debug!("lane {lane} entry occupied, skipped {class} spawn");
            return Ok(None);
        }
        let x = self.config.road.entry_x(direction);
        let attributes = VehicleAttributes::in_lane(class, lane, direction, x, &self.config);
        self.add_vehicle(&attributes).map(Some)
    }

    /// Whether a vehicle may be spawned at the entry to the given lane.
    pub fn is_entry_clear(&self, lane: u8, direction: Direction) -> bool {
        let road = &self.config.road;
        let buffer = self.config.spawning.entry_buffer;
        !self.vehicles.values().any(|vehicle| {
            vehicle.lane() == lane
                && vehicle.direction() == direction
                && road.near_entry(direction, vehicle.pos_rear(), buffer)
        })
    }

    /// Spawns a vehicle of a random class in a random lane, if its entry is clear.
    pub fn spawn_random_vehicle(&mut self) -> Option<VehicleId> {
        let direction = self.random_direction();
        let lane = self.random_lane(direction);
        let class = self.random_class();
        self.spawn_vehicle(class, lane, direction).ok().flatten()
    }

    /// Removes a vehicle from the simulation, without counting it as passed.
    pub fn remove_vehicle(&mut self, id: VehicleId) -> Option<Vehicle> {
        let vehicle = self.vehicles.remove(id)?;
        self.vehicle_order.retain(|other| *other != id);
        Some(vehicle)
    }

    /// Adds a pedestrian waiting to cross.
    pub fn add_pedestrian(&mut self, side: Side, direction: Direction) -> PedestrianId {
        let road = &self.config.road;
        let params = &self.config.pedestrians;
        let id = self
            .pedestrians
            .insert_with_key(|id| Pedestrian::new(id, side, direction, road, params));
        debug!("spawned pedestrian {:?} on the {:?} side", id, side);
        id
    }

    /// Adds a pedestrian on a random side of the road.
    pub fn spawn_random_pedestrian(&mut self) -> PedestrianId {
        let side = if self.rng.gen_bool(0.5) {
            Side::Near
        } else {
            Side::Far
        };
        let direction = self.random_direction();
        self.add_pedestrian(side, direction)
    }

    /// Moves a vehicle into `lane` if it is eligible to do so.
    pub fn change_lane(&mut self, id: VehicleId, lane: u8) -> Result<(), SimError> {
        if !self.vehicles.contains_key(id) {
            return Err(SimError::UnknownVehicle);
        }
        lane_change::change_lane(&mut self.vehicles, id, lane, &self.config)?;
        Ok(())
    }

    /// Sets a vehicle's speed, clamped to what it is capable of.
    pub fn set_vehicle_speed(&mut self, id: VehicleId, speed: f64) -> Result<(), SimError> {
        let vehicle = self.vehicles.get_mut(id).ok_or(SimError::UnknownVehicle)?;
        vehicle.set_speed(speed);
        Ok(())
    }

    /// Returns an iterator over the vehicles, in update order.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicle_order.iter().map(|id| &self.vehicles[*id])
    }

    /// Returns an iterator over the pedestrians.
    pub fn iter_pedestrians(&self) -> impl Iterator<Item = &Pedestrian> {
        self.pedestrians.values()
    }

    /// Gets a reference to the vehicle with the given ID.
    pub fn get_vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id)
    }

    /// Gets a reference to the pedestrian with the given ID.
    pub fn get_pedestrian(&self, id: PedestrianId) -> Option<&Pedestrian> {
        self.pedestrians.get(id)
    }

    /// Gets the traffic light.
    pub fn light(&self) -> &TrafficLight {
        &self.light
    }

    /// The number of vehicles which drove through the intersection and left the road.
    pub fn passed_count(&self) -> usize {
        self.passed
    }

    /// Summarises the current state of the simulation.
    pub fn metrics(&self) -> Metrics {
        Metrics {
            active_vehicles: self.vehicles.len(),
            passed_vehicles: self.passed,
            average_speed: metrics::average_speed(self.vehicles.values()),
            queue_length: metrics::queue_length(
                self.vehicles.values(),
                &self.config.road,
                &self.config.metrics_queue,
            ),
            active_pedestrians: self.pedestrians.len(),
            simulation_time: self.sim_time,
            time_scale: self.time_scale,
            adaptive_light: self.light.is_adaptive(),
            light_phase: self.light.phase(),
        }
    }

    /// Captures the externally visible state of every agent.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            frame: self.frame,
            light: LightView::from(&self.light),
            vehicles: self.iter_vehicles().map(Into::into).collect(),
            pedestrians: self.iter_pedestrians().map(Into::into).collect(),
            metrics: self.metrics(),
        }
    }

    /// Gets the current state of the simulation as JSON.
    #[cfg(feature = "serde")]
    pub fn snapshot_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self.snapshot())
    }

    /// Inserts a vehicle whose lane is known to belong to its direction.
    fn insert_vehicle(&mut self, attributes: &VehicleAttributes) -> VehicleId {
        let config = &self.config;
        let id = self
            .vehicles
            .insert_with_key(|id| Vehicle::new(id, attributes, config));
        self.vehicle_order.push(id);
        debug!(
            "spawned {} {:?} in lane {} at x={:.1}",
            attributes.class, id, attributes.lane, attributes.x
        );
        id
    }

    /// Places the configured number of initial vehicles, half in each direction.
    fn populate(&mut self) {
        let count = self.config.spawning.initial_vehicles / 2;
        let spacing = self.config.spawning.initial_spacing;
        for dir in Direction::ALL {
            let start = self.config.road.entry_x(dir) - dir.sign() * spacing;
            for i in 0..count {
                let lane = self.random_lane(dir);
                let class = self.random_class();
                let x = start + dir.sign() * spacing * i as f64;
                let attributes = VehicleAttributes::in_lane(class, lane, dir, x, &self.config);
                self.insert_vehicle(&attributes);
            }
        }
    }

    /// Updates the traffic light.
    fn update_light(&mut self, dt: f64) {
        self.light
            .step(dt, self.vehicles.values(), &self.config.road);
    }

    /// Advances each vehicle in turn. Later vehicles observe the new state
    /// of those already advanced.
    fn advance_vehicles(&mut self, dt: f64) {
        for &id in &self.vehicle_order {
            vehicle::advance(
                &mut self.vehicles,
                &self.vehicle_order,
                id,
                dt,
                &self.light,
                &self.config,
            );
        }
    }

    /// Gives each standard vehicle a chance to change lanes.
    fn attempt_lane_changes(&mut self) {
        let probability = self.config.lane_change.probability;
        for &id in &self.vehicle_order {
            if self.vehicles[id].behaviour() != Behaviour::Standard {
                continue;
            }
            if self.rng.gen_bool(probability) {
                lane_change::attempt_lane_change(&mut self.vehicles, id, &self.config);
            }
        }
    }

    /// Updates the pedestrians.
    fn update_pedestrians(&mut self, dt: f64) {
        for pedestrian in self.pedestrians.values_mut() {
            pedestrian.step(dt, &self.light, &self.config.pedestrians);
        }
    }

    /// Removes vehicles which have left the road, counting those which
    /// passed through the intersection.
    fn remove_exited_vehicles(&mut self) {
        let road = &self.config.road;
        let vehicles = &mut self.vehicles;
        let passed = &mut self.passed;
        self.vehicle_order.retain(|id| {
            let vehicle = &vehicles[*id];
            if !road.has_exited(vehicle.direction(), vehicle.pos_rear()) {
                return true;
            }
            if vehicle.has_passed_intersection() {
                *passed += 1;
            }
            debug!(
                "{} {:?} left the road (passed: {})",
                vehicle.class(),
                id,
                vehicle.has_passed_intersection()
            );
            vehicles.remove(*id);
            false
        });
    }

    /// Removes pedestrians which have finished crossing.
    fn remove_finished_pedestrians(&mut self) {
        self.pedestrians.retain(|_, pedestrian| !pedestrian.is_done());
    }

    /// Runs the vehicle and pedestrian spawn timers.
    fn update_spawners(&mut self, dt: f64) {
        let spawning = self.config.spawning;

        self.vehicle_spawn += dt;
        if self.vehicle_spawn >= spawning.vehicle_interval {
            self.vehicle_spawn = 0.0;
            self.spawn_random_vehicle();
        }

        self.pedestrian_spawn += dt;
        if self.pedestrian_spawn >= spawning.pedestrian_interval {
            self.pedestrian_spawn = 0.0;
            if self.rng.gen_bool(spawning.pedestrian_chance) {
                self.spawn_random_pedestrian();
            }
        }
    }

    fn random_direction(&mut self) -> Direction {
        if self.rng.gen_bool(0.5) {
            Direction::Right
        } else {
            Direction::Left
        }
    }

    fn random_lane(&mut self, direction: Direction) -> u8 {
        let lanes = direction.lanes();
        lanes[self.rng.gen_range(0..lanes.len())]
    }

    fn random_class(&mut self) -> VehicleClass {
        VehicleClass::ALL[self.class_distr.sample(&mut self.rng)]
    }
}
