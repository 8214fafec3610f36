//! Plain data views of the simulation, for rendering and reporting.

use crate::light::{Axis, LightPhase, Signal, TrafficLight};
use crate::metrics::Metrics;
use crate::pedestrian::{CrossingState, Pedestrian};
use crate::vehicle::{Vehicle, VehicleClass};
use crate::{Direction, PedestrianId, VehicleId};
#[cfg(feature = "serde")]
use serde::Serialize;

/// The state of the whole simulation at one instant.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct Snapshot {
    pub frame: usize,
    pub light: LightView,
    pub vehicles: Vec<VehicleView>,
    pub pedestrians: Vec<PedestrianView>,
    pub metrics: Metrics,
}

/// The externally visible state of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct VehicleView {
    pub id: VehicleId,
    pub class: VehicleClass,
    pub x: f64,
    pub y: f64,
    pub length: f64,
    pub width: f64,
    pub lane: u8,
    pub direction: Direction,
    pub speed: f64,
    pub passed_intersection: bool,
    pub color: [u8; 3],
}

/// The externally visible state of a pedestrian.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct PedestrianView {
    pub id: PedestrianId,
    pub x: f64,
    pub y: f64,
    pub state: CrossingState,
}

/// The externally visible state of the traffic light.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct LightView {
    pub phase: LightPhase,
    pub east_west: Signal,
    pub north_south: Signal,
    pub adaptive: bool,
    pub timer: f64,
}

impl From<&Vehicle> for VehicleView {
    fn from(vehicle: &Vehicle) -> Self {
        let pos = vehicle.position();
        Self {
            id: vehicle.id(),
            class: vehicle.class(),
            x: pos.x,
            y: pos.y,
            length: vehicle.length(),
            width: vehicle.width(),
            lane: vehicle.lane(),
            direction: vehicle.direction(),
            speed: vehicle.speed(),
            passed_intersection: vehicle.has_passed_intersection(),
            color: vehicle.color(),
        }
    }
}

impl From<&Pedestrian> for PedestrianView {
    fn from(pedestrian: &Pedestrian) -> Self {
        let pos = pedestrian.position();
        Self {
            id: pedestrian.id(),
            x: pos.x,
            y: pos.y,
            state: pedestrian.state(),
        }
    }
}

impl From<&TrafficLight> for LightView {
    fn from(light: &TrafficLight) -> Self {
        Self {
            phase: light.phase(),
            east_west: light.signal(Axis::EastWest),
            north_south: light.signal(Axis::NorthSouth),
            adaptive: light.is_adaptive(),
            timer: light.timer(),
        }
    }
}
