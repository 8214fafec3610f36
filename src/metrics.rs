//! Aggregate measurements of the simulation state.

use crate::config::{QueueProbe, RoadLayout};
use crate::light::LightPhase;
use crate::Vehicle;
#[cfg(feature = "serde")]
use serde::Serialize;

/// A summary of the simulation at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Metrics {
    /// The number of vehicles on the road.
    pub active_vehicles: usize,
    /// The number of vehicles which drove through the intersection and left the road.
    pub passed_vehicles: usize,
    /// The mean speed of the vehicles on the road, or zero if there are none.
    pub average_speed: f64,
    /// The number of slow vehicles near the intersection.
    pub queue_length: usize,
    /// The number of pedestrians waiting or crossing.
    pub active_pedestrians: usize,
    /// The simulated time in s.
    pub simulation_time: f64,
    /// The time scale multiplier.
    pub time_scale: f64,
    /// Whether the light uses adaptive timing.
    pub adaptive_light: bool,
    /// The current light phase.
    pub light_phase: LightPhase,
}

/// Computes the mean speed of the vehicles, or zero if there are none.
pub fn average_speed<'a>(vehicles: impl IntoIterator<Item = &'a Vehicle>) -> f64 {
    let (count, total) = vehicles
        .into_iter()
        .fold((0usize, 0.0), |(count, total), vehicle| {
            (count + 1, total + vehicle.speed())
        });
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Counts the vehicles which are queued at the intersection.
pub fn queue_length<'a>(
    vehicles: impl IntoIterator<Item = &'a Vehicle>,
    road: &RoadLayout,
    probe: &QueueProbe,
) -> usize {
    vehicles
        .into_iter()
        .filter(|vehicle| vehicle.is_queued(road, probe))
        .count()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::SimConfig;
    use crate::{Direction, VehicleAttributes, VehicleClass, VehicleId};
    use assert_approx_eq::assert_approx_eq;

    fn vehicle(lane: u8, x: f64, speed: f64, config: &SimConfig) -> Vehicle {
        let direction = Direction::of_lane(lane).unwrap();
        let attributes = VehicleAttributes::in_lane(VehicleClass::Normal, lane, direction, x, config);
        let mut vehicle = Vehicle::new(VehicleId::default(), &attributes, config);
        vehicle.set_speed(speed);
        vehicle
    }

    #[test]
    fn empty_collections_are_zero() {
        let config = SimConfig::default();
        let none: [&Vehicle; 0] = [];
        assert_approx_eq!(average_speed(none), 0.0);
        assert_eq!(queue_length(none, &config.road, &config.metrics_queue), 0);
    }

    #[test]
    fn averages_speed() {
        let config = SimConfig::default();
        let vehicles = [vehicle(0, 0.0, 30.0, &config), vehicle(2, 900.0, 90.0, &config)];
        assert_approx_eq!(average_speed(&vehicles), 60.0);
    }

    #[test]
    fn counts_slow_vehicles_near_intersection() {
        let config = SimConfig::default();
        let vehicles = [
            // Front at 580, stopped: queued
            vehicle(0, 540.0, 0.0, &config),
            // Front at 390, 230 away: too far
            vehicle(1, 350.0, 0.0, &config),
            // Front at 800, 20 past the intersection, slow: queued
            vehicle(3, 840.0, 15.0, &config),
            // Close but moving
            vehicle(2, 900.0, 60.0, &config),
        ];
        assert_eq!(queue_length(&vehicles, &config.road, &config.metrics_queue), 2);
        assert_eq!(queue_length(&vehicles, &config.road, &config.light.queue), 1);
    }
}
