use crate::config::{PedestrianParams, RoadLayout};
use crate::light::{Axis, Signal, TrafficLight};
use crate::math::Point2d;
use crate::{Direction, PedestrianId};
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A pedestrian crossing the road beside the intersection.
#[derive(Clone, Debug)]
pub struct Pedestrian {
    /// The pedestrian's ID.
    id: PedestrianId,
    /// The side of the road the pedestrian started from.
    side: Side,
    /// Which side of the intersection the crossing is on.
    direction: Direction,
    /// The crossing state.
    state: CrossingState,
    /// The time spent waiting at the kerb, in s.
    wait_timer: f64,
    /// The current position.
    pos: Point2d,
    /// The y coordinate at which the crossing is complete.
    target_y: f64,
}

/// A side of the road.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Side {
    /// The edge at the road's smallest y coordinate.
    Near,
    /// The edge at the road's largest y coordinate.
    Far,
}

/// The progress of a pedestrian across the road.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum CrossingState {
    Waiting,
    Crossing,
    Done,
}

impl Pedestrian {
    /// Creates a pedestrian waiting at the kerb.
    ///
    /// # Parameters
    /// * `side` - The side of the road to start from.
    /// * `direction` - `Right` to cross before the intersection, `Left` to cross after it.
    pub(crate) fn new(
        id: PedestrianId,
        side: Side,
        direction: Direction,
        road: &RoadLayout,
        params: &PedestrianParams,
    ) -> Self {
        let near = road.y_start - params.kerb_offset;
        let far = road.y_start + road.width() + params.kerb_offset;
        let (y, target_y) = match side {
            Side::Near => (near, far),
            Side::Far => (far, near),
        };
        let x = road.stop_line(direction) - direction.sign() * params.side_offset;
        Self {
            id,
            side,
            direction,
            state: CrossingState::Waiting,
            wait_timer: 0.0,
            pos: Point2d::new(x, y),
            target_y,
        }
    }

    /// Gets the pedestrian's ID.
    pub fn id(&self) -> PedestrianId {
        self.id
    }

    /// The side of the road the pedestrian started from.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Which side of the intersection the pedestrian crosses on.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The crossing state.
    pub fn state(&self) -> CrossingState {
        self.state
    }

    /// The current position.
    pub fn position(&self) -> Point2d {
        self.pos
    }

    /// The y coordinate at which the crossing is complete.
    pub fn target_y(&self) -> f64 {
        self.target_y
    }

    /// The time spent waiting at the kerb, in s.
    pub fn wait_time(&self) -> f64 {
        self.wait_timer
    }

    /// Whether the pedestrian has finished crossing.
    pub fn is_done(&self) -> bool {
        self.state == CrossingState::Done
    }

    /// Advances the pedestrian by `dt` seconds.
    pub(crate) fn step(&mut self, dt: f64, light: &TrafficLight, params: &PedestrianParams) {
        let dt = f64::max(dt, 0.0);
        match self.state {
            CrossingState::Waiting => {
                self.wait_timer += dt;
                if self.wait_timer > params.wait_time && light.signal(Axis::NorthSouth) != Signal::Red {
                    debug!("pedestrian {:?} started crossing", self.id);
                    self.state = CrossingState::Crossing;
                }
            }
            CrossingState::Crossing => {
                let arrived = match self.side {
                    Side::Near => {
                        self.pos.y += params.speed * dt;
                        self.pos.y >= self.target_y
                    }
                    Side::Far => {
                        self.pos.y -= params.speed * dt;
                        self.pos.y <= self.target_y
                    }
                };
                if arrived {
                    debug!("pedestrian {:?} finished crossing", self.id);
                    self.state = CrossingState::Done;
                }
            }
            CrossingState::Done => {}
        }
    }
}
