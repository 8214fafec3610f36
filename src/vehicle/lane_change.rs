use super::{Behaviour, Vehicle};
use crate::config::SimConfig;
use crate::error::LaneChangeError;
use crate::{VehicleId, VehicleSet};
use log::debug;
use smallvec::SmallVec;

impl Vehicle {
    /// Checks whether the vehicle may move into `target_lane` without coming
    /// within `min_gap` of any vehicle already travelling in it.
    pub fn can_change_lane<'a>(
        &self,
        target_lane: u8,
        vehicles: impl IntoIterator<Item = &'a Vehicle>,
        min_gap: f64,
    ) -> Result<(), LaneChangeError> {
        if self.lc_cooldown > 0.0 {
            return Err(LaneChangeError::Cooldown);
        }
        if target_lane == self.lane || !self.direction.carries(target_lane) {
            return Err(LaneChangeError::OutsideLaneGroup);
        }

        let extent = self.extent();
        let blocked = vehicles
            .into_iter()
            .filter(|other| {
                other.id != self.id && other.lane == target_lane && other.direction == self.direction
            })
            .any(|other| extent.clearance_with(&other.extent()) < min_gap);
        if blocked {
            Err(LaneChangeError::Blocked)
        } else {
            Ok(())
        }
    }

    /// Whether the vehicle ahead is close enough to make another lane attractive.
    pub fn wants_lane_change<'a>(
        &self,
        vehicles: impl IntoIterator<Item = &'a Vehicle>,
        safe_distance: f64,
    ) -> bool {
        self.leader(vehicles)
            .map_or(false, |leader| leader.gap < 2.0 * safe_distance)
    }

    /// Moves the vehicle to the centre of `lane` and restarts its cooldown.
    fn move_to_lane(&mut self, lane: u8, config: &SimConfig) {
        self.lane = lane;
        self.pos.y = config.road.lane_y(lane, self.width());
        self.lc_cooldown = config.lane_change.cooldown;
    }
}

/// Moves a vehicle into `target_lane` if it is eligible to do so.
/// The vehicle is left untouched otherwise.
pub(crate) fn change_lane(
    vehicles: &mut VehicleSet,
    id: VehicleId,
    target_lane: u8,
    config: &SimConfig,
) -> Result<(), LaneChangeError> {
    let vehicle = &vehicles[id];
    vehicle.can_change_lane(target_lane, vehicles.values(), config.lane_change.min_gap)?;
    debug!(
        "{} {:?} changed lanes {} -> {}",
        vehicle.class, id, vehicle.lane, target_lane
    );
    vehicles[id].move_to_lane(target_lane, config);
    Ok(())
}

/// Tries the adjacent lane if the vehicle is held up by the vehicle ahead.
/// Returns the new lane on success.
pub(crate) fn attempt_lane_change(
    vehicles: &mut VehicleSet,
    id: VehicleId,
    config: &SimConfig,
) -> Option<u8> {
    let vehicle = vehicles.get(id)?;
    if !vehicle.wants_lane_change(vehicles.values(), config.driving.safe_distance) {
        return None;
    }
    force_lane_change(vehicles, id, config)
}

/// Tries the adjacent lane regardless of the traffic ahead.
/// Returns the new lane on success.
pub(crate) fn force_lane_change(
    vehicles: &mut VehicleSet,
    id: VehicleId,
    config: &SimConfig,
) -> Option<u8> {
    let vehicle = vehicles.get(id)?;
    let target = vehicle.direction.adjacent_lane(vehicle.lane)?;
    change_lane(vehicles, id, target, config).ok().map(|_| target)
}

/// Asks every non-emergency vehicle within clearing range ahead of an
/// emergency vehicle to leave its lane, in `order`.
/// Returns the number of vehicles which moved.
pub(crate) fn clear_path(
    vehicles: &mut VehicleSet,
    order: &[VehicleId],
    id: VehicleId,
    config: &SimConfig,
) -> usize {
    let Some(emergency) = vehicles.get(id) else {
        return 0;
    };
    let range = config.emergency.clearing_range;
    let blockers = order
        .iter()
        .filter_map(|other| vehicles.get(*other))
        .filter(|other| {
            other.behaviour() != Behaviour::EmergencyPriority && emergency.shares_lane(other)
        })
        .filter(|other| {
            let gap = emergency.gap_to(other);
            gap > 0.0 && gap < range
        })
        .map(|other| other.id)
        .collect::<SmallVec<[VehicleId; 8]>>();

    let moved = blockers
        .into_iter()
        .filter(|blocker| force_lane_change(vehicles, *blocker, config).is_some())
        .count();
    if moved > 0 {
        debug!("{:?} cleared {} vehicle(s) from its lane", id, moved);
    }
    moved
}
