use thiserror::Error;

/// Errors returned by [crate::Simulation] operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// The lane is not part of the lane group for the direction of travel.
    #[error("lane {lane} does not carry traffic travelling {direction}")]
    LaneOutsideGroup { lane: u8, direction: crate::Direction },
    /// The vehicle ID does not refer to a vehicle in the simulation.
    #[error("no such vehicle")]
    UnknownVehicle,
    /// The configuration is not self-consistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The vehicle may not change into the requested lane.
    #[error("lane change refused: {0}")]
    LaneChange(#[from] LaneChangeError),
}

/// The reason a lane change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LaneChangeError {
    /// The vehicle changed lanes too recently.
    #[error("lane change cooldown has not expired")]
    Cooldown,
    /// The target lane is the current lane or belongs to the opposing direction.
    #[error("target lane is not an adjacent lane in the same direction")]
    OutsideLaneGroup,
    /// A vehicle in the target lane is too close.
    #[error("insufficient gap in target lane")]
    Blocked,
}
