//! Simulation parameters.
//!
//! Every tunable constant of the simulation lives in [SimConfig]. The
//! [Default] implementation gives the reference calibration, in screen-space
//! distance units and seconds.

use crate::error::SimError;
use crate::vehicle::VehicleClass;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The complete configuration of a simulation instance.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimConfig {
    /// The road and intersection geometry.
    pub road: RoadLayout,
    /// Car following and stop line behaviour.
    pub driving: DrivingParams,
    /// The emergency vehicle overrides.
    pub emergency: EmergencyParams,
    /// Lane changing.
    pub lane_change: LaneChangeParams,
    /// Traffic light timing.
    pub light: LightTiming,
    /// Pedestrian crossing behaviour.
    pub pedestrians: PedestrianParams,
    /// Spawning of new agents.
    pub spawning: SpawnParams,
    /// The per-class vehicle parameters.
    pub classes: ClassTable,
    /// The queue reported by [crate::Metrics].
    pub metrics_queue: QueueProbe,
    /// The permitted range of the time scale multiplier.
    pub time_scale: TimeScaleRange,
}

/// The geometry of the road and the intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoadLayout {
    /// The length of the simulated road along the x axis.
    pub length: f64,
    /// The y coordinate of the road's near edge.
    pub y_start: f64,
    /// The width of a single lane.
    pub lane_width: f64,
    /// The x coordinate of the intersection's left edge.
    pub intersection_x: f64,
    /// The width of the intersection along the x axis.
    pub intersection_width: f64,
    /// How far beyond either end of the road vehicles enter and leave.
    pub exit_margin: f64,
}

/// Car following and stop line parameters shared by all standard vehicles.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DrivingParams {
    /// The gap below which a follower slows below its leader's speed.
    pub safe_distance: f64,
    /// The speed of a follower closer than `safe_distance`, relative to its leader.
    pub close_follow_factor: f64,
    /// How far ahead of the stop line the light is observed.
    pub stop_lookahead: f64,
    /// Within this distance of the stop line, vehicles brake for a red or yellow light.
    pub braking_zone: f64,
    /// Once the remaining distance falls below this, the target speed is zero.
    pub hard_stop_distance: f64,
    /// Vehicles aim to stop this far short of the stop line.
    pub stop_line_margin: f64,
    /// A vehicle held at a light is released once this far from the stop line.
    pub release_distance: f64,
    /// The braking rate as a multiple of the vehicle's acceleration.
    pub brake_factor: f64,
    /// The speed of a new vehicle as a fraction of its maximum speed.
    pub initial_speed_factor: f64,
}

/// Overrides for emergency vehicles.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EmergencyParams {
    /// Within this distance of a red light the vehicle slows down.
    pub slow_zone: f64,
    /// The target speed near a red light, as a fraction of maximum speed.
    pub slow_factor: f64,
    /// The safe distance as a fraction of [DrivingParams::safe_distance].
    pub safe_distance_factor: f64,
    /// The speed of a close follower relative to its leader.
    pub close_follow_factor: f64,
    /// Vehicles ahead within this range are asked to change lanes.
    pub clearing_range: f64,
}

/// Lane changing parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LaneChangeParams {
    /// The minimum longitudinal clearance to every vehicle in the target lane.
    pub min_gap: f64,
    /// Seconds after a lane change before another is permitted.
    pub cooldown: f64,
    /// The per-tick probability that a vehicle considers changing lanes.
    pub probability: f64,
}

/// Traffic light timing.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LightTiming {
    /// The base green phase duration in s.
    pub green: f64,
    /// The yellow phase duration in s.
    pub yellow: f64,
    /// In adaptive mode, the green phase is extended once the queue exceeds this.
    pub adaptive_threshold: usize,
    /// The multiplier applied to an extended green phase.
    pub adaptive_factor: f64,
    /// The queue observed by the adaptive controller.
    pub queue: QueueProbe,
}

/// Describes which vehicles count as queued at the intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QueueProbe {
    /// Vehicles slower than this are considered stopped.
    pub max_speed: f64,
    /// Only vehicles whose front is within this distance of the intersection count.
    pub radius: f64,
}

/// Pedestrian parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PedestrianParams {
    /// Seconds a pedestrian waits at the kerb before considering crossing.
    pub wait_time: f64,
    /// The walking speed.
    pub speed: f64,
    /// How far from the road edge pedestrians wait and finish.
    pub kerb_offset: f64,
    /// How far outside the intersection the crossing is.
    pub side_offset: f64,
}

/// Spawning parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpawnParams {
    /// Seconds between vehicle spawn attempts.
    pub vehicle_interval: f64,
    /// Seconds between pedestrian spawn attempts.
    pub pedestrian_interval: f64,
    /// The probability a pedestrian spawn attempt succeeds.
    pub pedestrian_chance: f64,
    /// A lane is blocked for spawning while a vehicle is this close to its entry.
    pub entry_buffer: f64,
    /// The probability that a spawned vehicle is an ambulance.
    pub ambulance_chance: f64,
    /// The probability that a spawned vehicle is a truck.
    pub truck_chance: f64,
    /// The probability that a spawned vehicle is a sports car.
    pub sports_chance: f64,
    /// The number of vehicles placed on the road at start and on reset.
    pub initial_vehicles: usize,
    /// The spacing between initially placed vehicles.
    pub initial_spacing: f64,
}

/// The attributes of one class of vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleParams {
    /// The vehicle length.
    pub length: f64,
    /// The vehicle width.
    pub width: f64,
    /// The maximum speed, in distance units per second.
    pub max_speed: f64,
    /// The acceleration, in distance units per second squared.
    pub acceleration: f64,
    /// The fill colour as RGB.
    pub color: [u8; 3],
}

/// The parameter table indexed by [VehicleClass].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassTable {
    pub normal: VehicleParams,
    pub truck: VehicleParams,
    pub sports: VehicleParams,
    pub ambulance: VehicleParams,
}

/// The permitted time scale multipliers.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeScaleRange {
    pub min: f64,
    pub max: f64,
    /// The increment used by [crate::Simulation::speed_up] and [crate::Simulation::slow_down].
    pub step: f64,
}

impl Default for RoadLayout {
    fn default() -> Self {
        Self {
            length: 1400.0,
            y_start: 340.0,
            lane_width: 40.0,
            intersection_x: 620.0,
            intersection_width: 160.0,
            exit_margin: 100.0,
        }
    }
}

impl Default for DrivingParams {
    fn default() -> Self {
        Self {
            safe_distance: 80.0,
            close_follow_factor: 0.9,
            stop_lookahead: 150.0,
            braking_zone: 100.0,
            hard_stop_distance: 50.0,
            stop_line_margin: 10.0,
            release_distance: 50.0,
            brake_factor: 1.5,
            initial_speed_factor: 0.8,
        }
    }
}

impl Default for EmergencyParams {
    fn default() -> Self {
        Self {
            slow_zone: 80.0,
            slow_factor: 0.5,
            safe_distance_factor: 0.5,
            close_follow_factor: 0.95,
            clearing_range: 150.0,
        }
    }
}

impl Default for LaneChangeParams {
    fn default() -> Self {
        Self {
            min_gap: 40.0,
            cooldown: 2.0,
            probability: 0.01,
        }
    }
}

impl Default for LightTiming {
    fn default() -> Self {
        Self {
            green: 10.0,
            yellow: 3.0,
            adaptive_threshold: 3,
            adaptive_factor: 1.5,
            queue: QueueProbe {
                max_speed: 10.0,
                radius: 200.0,
            },
        }
    }
}

impl Default for QueueProbe {
    fn default() -> Self {
        Self {
            max_speed: 20.0,
            radius: 150.0,
        }
    }
}

impl Default for PedestrianParams {
    fn default() -> Self {
        Self {
            wait_time: 2.0,
            speed: 40.0,
            kerb_offset: 30.0,
            side_offset: 50.0,
        }
    }
}

impl Default for SpawnParams {
    fn default() -> Self {
        Self {
            vehicle_interval: 1.5,
            pedestrian_interval: 4.0,
            pedestrian_chance: 0.6,
            entry_buffer: 200.0,
            ambulance_chance: 0.03,
            truck_chance: 0.12,
            sports_chance: 0.10,
            initial_vehicles: 10,
            initial_spacing: 200.0,
        }
    }
}

impl Default for ClassTable {
    fn default() -> Self {
        Self {
            normal: VehicleParams {
                length: 40.0,
                width: 20.0,
                max_speed: 120.0,
                acceleration: 60.0,
                color: [90, 120, 220],
            },
            truck: VehicleParams {
                length: 70.0,
                width: 26.0,
                max_speed: 80.0,
                acceleration: 30.0,
                color: [140, 90, 40],
            },
            sports: VehicleParams {
                length: 38.0,
                width: 18.0,
                max_speed: 160.0,
                acceleration: 100.0,
                color: [220, 40, 40],
            },
            ambulance: VehicleParams {
                length: 50.0,
                width: 22.0,
                max_speed: 150.0,
                acceleration: 80.0,
                color: [245, 245, 245],
            },
        }
    }
}

impl Default for TimeScaleRange {
    fn default() -> Self {
        Self {
            min: 0.25,
            max: 4.0,
            step: 0.25,
        }
    }
}

impl ClassTable {
    /// Gets the parameters of the given vehicle class.
    pub fn get(&self, class: VehicleClass) -> &VehicleParams {
        match class {
            VehicleClass::Normal => &self.normal,
            VehicleClass::Truck => &self.truck,
            VehicleClass::Sports => &self.sports,
            VehicleClass::Ambulance => &self.ambulance,
        }
    }
}

impl SpawnParams {
    /// The spawn weights of each class, in [VehicleClass::ALL] order.
    pub fn class_weights(&self) -> [f64; 4] {
        let special = self.ambulance_chance + self.truck_chance + self.sports_chance;
        [
            f64::max(1.0 - special, 0.0),
            self.truck_chance,
            self.sports_chance,
            self.ambulance_chance,
        ]
    }
}

impl SimConfig {
    /// Checks that the configuration is self-consistent.
    pub fn validate(&self) -> Result<(), SimError> {
        let positive = [
            ("road.length", self.road.length),
            ("road.lane_width", self.road.lane_width),
            ("road.intersection_width", self.road.intersection_width),
            ("driving.safe_distance", self.driving.safe_distance),
            ("driving.braking_zone", self.driving.braking_zone),
            ("driving.brake_factor", self.driving.brake_factor),
            ("light.green", self.light.green),
            ("light.yellow", self.light.yellow),
            ("light.adaptive_factor", self.light.adaptive_factor),
            ("pedestrians.speed", self.pedestrians.speed),
            ("spawning.vehicle_interval", self.spawning.vehicle_interval),
            ("spawning.pedestrian_interval", self.spawning.pedestrian_interval),
            ("time_scale.min", self.time_scale.min),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| !(*value > 0.0)) {
            return Err(SimError::InvalidConfig(format!("{name} must be positive")));
        }

        for class in VehicleClass::ALL {
            let params = self.classes.get(class);
            if !(params.length > 0.0 && params.max_speed > 0.0 && params.acceleration > 0.0) {
                return Err(SimError::InvalidConfig(format!(
                    "{class} must have positive length, max speed and acceleration"
                )));
            }
            if params.width > self.road.lane_width {
                return Err(SimError::InvalidConfig(format!(
                    "{class} is wider than a lane"
                )));
            }
        }

        let probabilities = [
            ("lane_change.probability", self.lane_change.probability),
            ("spawning.pedestrian_chance", self.spawning.pedestrian_chance),
            ("spawning.ambulance_chance", self.spawning.ambulance_chance),
            ("spawning.truck_chance", self.spawning.truck_chance),
            ("spawning.sports_chance", self.spawning.sports_chance),
        ];
        if let Some((name, _)) = probabilities
            .iter()
            .find(|(_, p)| !(0.0..=1.0).contains(p))
        {
            return Err(SimError::InvalidConfig(format!("{name} must be in [0, 1]")));
        }
        if self.spawning.class_weights().iter().sum::<f64>() <= 0.0 {
            return Err(SimError::InvalidConfig(
                "vehicle class chances must not all be zero".into(),
            ));
        }

        if self.time_scale.min > self.time_scale.max {
            return Err(SimError::InvalidConfig(
                "time_scale.min exceeds time_scale.max".into(),
            ));
        }
        Ok(())
    }
}
