//! A micro-simulation of traffic through a single signalised intersection.
//!
//! Vehicles travel along a four lane road, two lanes in each direction,
//! following the vehicle ahead, changing lanes and stopping for the traffic
//! light. Ambulances ignore red lights and clear their lane ahead of them.
//! Pedestrians cross beside the intersection while cross traffic has right of way.

pub use cgmath;
pub use config::SimConfig;
pub use error::{LaneChangeError, SimError};
pub use light::{Axis, LightPhase, Signal, TrafficLight};
pub use metrics::Metrics;
pub use pedestrian::{CrossingState, Pedestrian, Side};
pub use road::{Direction, NUM_LANES};
pub use simulation::Simulation;
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use snapshot::{LightView, PedestrianView, Snapshot, VehicleView};
pub use util::Interval;
pub use vehicle::{Behaviour, Vehicle, VehicleAttributes, VehicleClass};

pub mod config;
mod error;
mod light;
pub mod math;
pub mod metrics;
mod pedestrian;
mod road;
mod simulation;
mod snapshot;
mod util;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
    /// Unique ID of a [Pedestrian].
    pub struct PedestrianId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
type PedestrianSet = SlotMap<PedestrianId, Pedestrian>;
