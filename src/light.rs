use crate::config::{LightTiming, QueueProbe, RoadLayout};
use crate::{Direction, Vehicle};
use itertools::Itertools;
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// The traffic light controlling the intersection.
///
/// Cycles through the four [LightPhase]s in order. In adaptive mode the green
/// phases are extended while the queue observed for the active phase is long.
#[derive(Clone, Debug)]
pub struct TrafficLight {
    /// The current phase.
    phase: LightPhase,
    /// The time since the current phase was entered, in s.
    timer: f64,
    /// Whether green durations respond to queue lengths.
    adaptive: bool,
    /// The green duration in effect as of the last step.
    green: f64,
    /// The timing parameters.
    timing: LightTiming,
}

/// A phase of the traffic light cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum LightPhase {
    EwGreen,
    EwYellow,
    NsGreen,
    NsYellow,
}

/// The colour shown to one axis of traffic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Signal {
    Red,
    Yellow,
    Green,
}

/// An axis of movement through the intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Axis {
    /// Along the road; all vehicles travel on this axis.
    EastWest,
    /// Across the road; pedestrians cross on this axis.
    NorthSouth,
}

impl LightPhase {
    /// The phase which follows this one.
    pub fn next(self) -> Self {
        use LightPhase::*;
        match self {
            EwGreen => EwYellow,
            EwYellow => NsGreen,
            NsGreen => NsYellow,
            NsYellow => EwGreen,
        }
    }

    /// The axis which has right of way during this phase.
    pub fn axis(self) -> Axis {
        match self {
            LightPhase::EwGreen | LightPhase::EwYellow => Axis::EastWest,
            LightPhase::NsGreen | LightPhase::NsYellow => Axis::NorthSouth,
        }
    }

    /// Whether this is a green phase.
    pub fn is_green(self) -> bool {
        matches!(self, LightPhase::EwGreen | LightPhase::NsGreen)
    }

    /// The lane group whose queue extends the green time of this phase.
    pub fn queue_group(self) -> Direction {
        match self.axis() {
            Axis::EastWest => Direction::Right,
            Axis::NorthSouth => Direction::Left,
        }
    }

    /// The state name, e.g. `ew_green`.
    pub fn name(self) -> &'static str {
        match self {
            LightPhase::EwGreen => "ew_green",
            LightPhase::EwYellow => "ew_yellow",
            LightPhase::NsGreen => "ns_green",
            LightPhase::NsYellow => "ns_yellow",
        }
    }
}

impl fmt::Display for LightPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TrafficLight {
    /// Creates a traffic light at the start of the east-west green phase.
    pub fn new(timing: LightTiming) -> Self {
        Self {
            phase: LightPhase::EwGreen,
            timer: 0.0,
            adaptive: false,
            green: timing.green,
            timing,
        }
    }

    /// Advances the traffic light by `dt` seconds.
    pub fn step<'a>(
        &mut self,
        dt: f64,
        vehicles: impl IntoIterator<Item = &'a Vehicle>,
        road: &RoadLayout,
    ) {
        self.timer += f64::max(dt, 0.0);
        self.green = if self.adaptive {
            self.adaptive_green(vehicles, road)
        } else {
            self.timing.green
        };

        if self.timer >= self.phase_duration() {
            let next = self.phase.next();
            debug!(
                "light {} -> {} after {:.2}s",
                self.phase, next, self.timer
            );
            self.phase = next;
            self.timer = 0.0;
        }
    }

    /// The current phase.
    pub fn phase(&self) -> LightPhase {
        self.phase
    }

    /// The time spent in the current phase in s.
    pub fn timer(&self) -> f64 {
        self.timer
    }

    /// The duration of the current phase as of the last step.
    pub fn phase_duration(&self) -> f64 {
        if self.phase.is_green() {
            self.green
        } else {
            self.timing.yellow
        }
    }

    /// The time until the current phase ends, assuming its duration does not change.
    pub fn time_remaining(&self) -> f64 {
        f64::max(self.phase_duration() - self.timer, 0.0)
    }

    /// Whether the light is in adaptive mode.
    pub fn is_adaptive(&self) -> bool {
        self.adaptive
    }

    /// Switches between fixed and adaptive timing.
    /// The current phase and timer are unaffected.
    pub fn toggle_adaptive(&mut self) {
        self.set_adaptive(!self.adaptive);
    }

    /// Sets whether the light uses adaptive timing.
    pub fn set_adaptive(&mut self, adaptive: bool) {
        if adaptive != self.adaptive {
            debug!("light timing: {}", if adaptive { "adaptive" } else { "fixed" });
        }
        self.adaptive = adaptive;
    }

    /// The colour shown to the given axis.
    pub fn signal(&self, axis: Axis) -> Signal {
        use LightPhase::*;
        match (axis, self.phase) {
            (Axis::EastWest, EwGreen) | (Axis::NorthSouth, NsGreen) => Signal::Green,
            (Axis::EastWest, EwYellow) | (Axis::NorthSouth, NsYellow) => Signal::Yellow,
            _ => Signal::Red,
        }
    }

    /// The colour shown to vehicles travelling in the given direction.
    pub fn signal_for(&self, _dir: Direction) -> Signal {
        self.signal(Axis::EastWest)
    }

    /// Computes the green duration given the current queues.
    fn adaptive_green<'a>(
        &self,
        vehicles: impl IntoIterator<Item = &'a Vehicle>,
        road: &RoadLayout,
    ) -> f64 {
        let queues = queue_by_group(vehicles, road, &self.timing.queue);
        let queue = queues[&self.phase.queue_group()];
        if queue > self.timing.adaptive_threshold {
            self.timing.green * self.timing.adaptive_factor
        } else {
            self.timing.green
        }
    }
}

/// Counts the queued vehicles in each lane group.
fn queue_by_group<'a>(
    vehicles: impl IntoIterator<Item = &'a Vehicle>,
    road: &RoadLayout,
    probe: &QueueProbe,
) -> std::collections::HashMap<Direction, usize> {
    let mut counts = vehicles
        .into_iter()
        .filter(|vehicle| vehicle.is_queued(road, probe))
        .map(|vehicle| vehicle.direction())
        .counts();
    for dir in Direction::ALL {
        counts.entry(dir).or_insert(0);
    }
    counts
}
