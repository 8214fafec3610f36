//! Road geometry: lanes, directions and the intersection footprint.

use crate::config::RoadLayout;
use crate::util::Interval;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// The number of lanes on the road, two in each direction.
pub const NUM_LANES: u8 = 4;

/// The direction of travel along the road.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Towards increasing x, in lanes 0 and 1.
    Right,
    /// Towards decreasing x, in lanes 2 and 3.
    Left,
}

impl Direction {
    /// Both directions.
    pub const ALL: [Direction; 2] = [Direction::Right, Direction::Left];

    /// Gets the direction from its sign, `+1` or `-1`.
    pub fn from_sign(sign: i32) -> Option<Self> {
        match sign {
            1 => Some(Direction::Right),
            -1 => Some(Direction::Left),
            _ => None,
        }
    }

    /// The sign of the direction along the x axis.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Right => 1.0,
            Direction::Left => -1.0,
        }
    }

    /// The lane group used by traffic travelling in this direction.
    pub fn lanes(self) -> [u8; 2] {
        match self {
            Direction::Right => [0, 1],
            Direction::Left => [2, 3],
        }
    }

    /// Gets the direction of the traffic using the given lane.
    pub fn of_lane(lane: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|dir| dir.carries(lane))
    }

    /// Whether the lane belongs to this direction's lane group.
    pub fn carries(self, lane: u8) -> bool {
        self.lanes().contains(&lane)
    }

    /// The other lane in this direction's group, if `lane` is in the group.
    pub fn adjacent_lane(self, lane: u8) -> Option<u8> {
        self.carries(lane).then(|| lane ^ 1)
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Right => write!(f, "right"),
            Direction::Left => write!(f, "left"),
        }
    }
}

impl RoadLayout {
    /// The total width of the road.
    pub fn width(&self) -> f64 {
        NUM_LANES as f64 * self.lane_width
    }

    /// The y coordinate that centres an object of the given width in a lane.
    pub fn lane_y(&self, lane: u8, width: f64) -> f64 {
        self.y_start + lane as f64 * self.lane_width + 0.5 * (self.lane_width - width)
    }

    /// The extent of the intersection along the x axis.
    pub fn footprint(&self) -> Interval<f64> {
        Interval::new(
            self.intersection_x,
            self.intersection_x + self.intersection_width,
        )
    }

    /// The x coordinate of the stop line faced by traffic in the given direction.
    pub fn stop_line(&self, dir: Direction) -> f64 {
        match dir {
            Direction::Right => self.footprint().min,
            Direction::Left => self.footprint().max,
        }
    }

    /// The x coordinate of the side of the intersection where traffic leaves it.
    pub fn far_edge(&self, dir: Direction) -> f64 {
        match dir {
            Direction::Right => self.footprint().max,
            Direction::Left => self.footprint().min,
        }
    }

    /// The x coordinate at which new vehicles enter the road.
    pub fn entry_x(&self, dir: Direction) -> f64 {
        match dir {
            Direction::Right => -self.exit_margin,
            Direction::Left => self.length + self.exit_margin,
        }
    }

    /// Whether a vehicle at `x` has left the simulated road.
    pub fn has_exited(&self, dir: Direction, x: f64) -> bool {
        match dir {
            Direction::Right => x > self.length + self.exit_margin,
            Direction::Left => x < -self.exit_margin,
        }
    }

    /// Whether `x` lies within `buffer` of the end of the road where traffic enters.
    pub fn near_entry(&self, dir: Direction, x: f64, buffer: f64) -> bool {
        match dir {
            Direction::Right => x < buffer,
            Direction::Left => x > self.length - buffer,
        }
    }
}
