use self::acceleration::{AccelerationModel, ModelParams};
use crate::config::{DrivingParams, EmergencyParams, QueueProbe, RoadLayout, SimConfig, VehicleParams};
use crate::light::{Signal, TrafficLight};
use crate::math::{Point2d, Vector2d};
use crate::util::Interval;
use crate::{Direction, VehicleId, VehicleSet};
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

mod acceleration;
pub(crate) mod lane_change;

/// A simulated vehicle.
///
/// The vehicle's `x` coordinate is its trailing edge: it occupies
/// `[x, x + length]` when travelling right and `[x - length, x]` when
/// travelling left.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID.
    pub(crate) id: VehicleId,
    /// The vehicle class.
    class: VehicleClass,
    /// The class parameters.
    params: VehicleParams,
    /// The acceleration model.
    acc: AccelerationModel,
    /// The trailing edge and near side of the vehicle.
    pos: Point2d,
    /// The lane the vehicle occupies.
    lane: u8,
    /// The direction of travel.
    direction: Direction,
    /// The speed in distance units per second.
    speed: f64,
    /// The speed the vehicle was aiming for during the last update.
    target_speed: f64,
    /// The time until the vehicle may change lanes again, in s.
    lc_cooldown: f64,
    /// Whether the vehicle's front has passed through the intersection.
    passed: bool,
    /// Whether the vehicle is being held by the traffic light.
    stopped_at_light: bool,
}

/// Where and what kind of vehicle to create.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleAttributes {
    /// The vehicle class.
    pub class: VehicleClass,
    /// The trailing edge of the vehicle.
    pub x: f64,
    /// The near side of the vehicle.
    pub y: f64,
    /// The lane; must belong to the lane group of `direction`.
    pub lane: u8,
    /// The direction of travel.
    pub direction: Direction,
}

/// The kinds of vehicle in the simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum VehicleClass {
    Normal,
    Truck,
    Sports,
    Ambulance,
}

/// Selects the update algorithm used by a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Behaviour {
    /// Obeys the traffic light and follows the vehicle ahead.
    Standard,
    /// Drives through red lights and clears its lane of traffic.
    EmergencyPriority,
}

/// The vehicle ahead, as observed by its follower.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Leader {
    pub gap: f64,
    pub speed: f64,
}

impl VehicleClass {
    /// All vehicle classes.
    pub const ALL: [VehicleClass; 4] = [
        VehicleClass::Normal,
        VehicleClass::Truck,
        VehicleClass::Sports,
        VehicleClass::Ambulance,
    ];

    /// The update algorithm used by vehicles of this class.
    pub fn behaviour(self) -> Behaviour {
        match self {
            VehicleClass::Ambulance => Behaviour::EmergencyPriority,
            _ => Behaviour::Standard,
        }
    }

    /// The class name, e.g. `truck`.
    pub fn name(self) -> &'static str {
        match self {
            VehicleClass::Normal => "car",
            VehicleClass::Truck => "truck",
            VehicleClass::Sports => "sports",
            VehicleClass::Ambulance => "ambulance",
        }
    }
}

impl fmt::Display for VehicleClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl VehicleAttributes {
    /// Places a vehicle of the given class in the centre of a lane.
    pub fn in_lane(
        class: VehicleClass,
        lane: u8,
        direction: Direction,
        x: f64,
        config: &SimConfig,
    ) -> Self {
        let width = config.classes.get(class).width;
        Self {
            class,
            x,
            y: config.road.lane_y(lane, width),
            lane,
            direction,
        }
    }
}

impl Vehicle {
    /// Creates a new vehicle travelling at a fraction of its maximum speed.
    pub(crate) fn new(id: VehicleId, attributes: &VehicleAttributes, config: &SimConfig) -> Self {
        let params = *config.classes.get(attributes.class);
        let acc = AccelerationModel::new(&ModelParams {
            max_speed: params.max_speed,
            acceleration: params.acceleration,
            brake_factor: config.driving.brake_factor,
        });
        Self {
            id,
            class: attributes.class,
            params,
            acc,
            pos: Point2d::new(attributes.x, attributes.y),
            lane: attributes.lane,
            direction: attributes.direction,
            speed: acc.clamp(params.max_speed * config.driving.initial_speed_factor),
            target_speed: params.max_speed,
            lc_cooldown: 0.0,
            passed: false,
            stopped_at_light: false,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The vehicle class.
    pub fn class(&self) -> VehicleClass {
        self.class
    }

    /// The update algorithm used by this vehicle.
    pub fn behaviour(&self) -> Behaviour {
        self.class.behaviour()
    }

    /// The trailing edge and near side of the vehicle.
    pub fn position(&self) -> Point2d {
        self.pos
    }

    /// The vehicle's velocity.
    pub fn velocity(&self) -> Vector2d {
        Vector2d::new(self.direction.sign() * self.speed, 0.0)
    }

    /// The lane the vehicle occupies.
    pub fn lane(&self) -> u8 {
        self.lane
    }

    /// The direction of travel.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// The vehicle's length.
    pub fn length(&self) -> f64 {
        self.params.length
    }

    /// The vehicle's width.
    pub fn width(&self) -> f64 {
        self.params.width
    }

    /// The fill colour of the vehicle's class.
    pub fn color(&self) -> [u8; 3] {
        self.params.color
    }

    /// The current speed.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// The speed the vehicle was aiming for during the last update.
    pub fn target_speed(&self) -> f64 {
        self.target_speed
    }

    /// The maximum speed of the vehicle's class.
    pub fn max_speed(&self) -> f64 {
        self.acc.max_speed()
    }

    /// The acceleration of the vehicle's class.
    pub fn acceleration(&self) -> f64 {
        self.acc.acceleration()
    }

    /// The time until the vehicle may change lanes again, in s.
    pub fn lane_change_cooldown(&self) -> f64 {
        self.lc_cooldown
    }

    /// Whether the vehicle has driven through the intersection.
    pub fn has_passed_intersection(&self) -> bool {
        self.passed
    }

    /// Whether the vehicle is being held by a red or yellow light.
    pub fn is_stopped_at_light(&self) -> bool {
        self.stopped_at_light
    }

    /// The position of the trailing edge along the road.
    pub fn pos_rear(&self) -> f64 {
        self.pos.x
    }

    /// The position of the leading edge along the road.
    pub fn pos_front(&self) -> f64 {
        self.pos.x + self.direction.sign() * self.params.length
    }

    /// The space the vehicle occupies along the road.
    pub fn extent(&self) -> Interval<f64> {
        Interval::spanning(self.pos_rear(), self.pos_front())
    }

    /// The distance from this vehicle's front to the rear of `other`,
    /// measured in the direction of travel.
    pub fn gap_to(&self, other: &Vehicle) -> f64 {
        self.direction.sign() * (other.pos_rear() - self.pos_front())
    }

    /// The distance from the front of the vehicle to its stop line.
    /// Negative once the front has crossed it.
    pub fn light_distance(&self, road: &RoadLayout) -> f64 {
        self.direction.sign() * (road.stop_line(self.direction) - self.pos_front())
    }

    /// Whether `other` shares this vehicle's lane and direction.
    pub fn shares_lane(&self, other: &Vehicle) -> bool {
        other.id != self.id && other.lane == self.lane && other.direction == self.direction
    }

    /// Finds the nearest vehicle ahead in the same lane.
    pub fn vehicle_ahead<'a>(
        &self,
        vehicles: impl IntoIterator<Item = &'a Vehicle>,
    ) -> Option<&'a Vehicle> {
        vehicles
            .into_iter()
            .filter(|other| self.shares_lane(other))
            .map(|other| (self.gap_to(other), other))
            .filter(|(gap, _)| *gap > 0.0)
            .fold(None, |nearest: Option<(f64, &'a Vehicle)>, (gap, other)| match nearest {
                Some((min, _)) if min <= gap => nearest,
                _ => Some((gap, other)),
            })
            .map(|(_, other)| other)
    }

    /// Whether the vehicle counts towards a queue at the intersection.
    pub fn is_queued(&self, road: &RoadLayout, probe: &QueueProbe) -> bool {
        self.speed < probe.max_speed && road.footprint().distance(self.pos_front()) < probe.radius
    }

    /// Observes the vehicle ahead.
    pub(crate) fn leader<'a>(&self, vehicles: impl IntoIterator<Item = &'a Vehicle>) -> Option<Leader> {
        self.vehicle_ahead(vehicles).map(|other| Leader {
            gap: self.gap_to(other),
            speed: other.speed,
        })
    }

    /// Sets the speed, clamped to what the vehicle is capable of.
    pub(crate) fn set_speed(&mut self, speed: f64) {
        self.speed = self.acc.clamp(speed);
    }

    /// Counts down the lane change cooldown.
    fn tick_cooldown(&mut self, dt: f64) {
        self.lc_cooldown = f64::max(self.lc_cooldown - dt, 0.0);
    }

    /// Chooses the target speed of a standard vehicle.
    fn plan_standard(
        &mut self,
        leader: Option<Leader>,
        light_distance: f64,
        signal: Signal,
        params: &DrivingParams,
    ) {
        let must_stop = light_distance > 0.0
            && light_distance < params.stop_lookahead
            && signal != Signal::Green;
        if must_stop {
            self.stopped_at_light = true;
        }

        self.target_speed = match leader {
            _ if must_stop && light_distance < params.braking_zone => {
                let remaining = f64::max(light_distance - params.stop_line_margin, 0.0);
                if remaining < params.hard_stop_distance {
                    0.0
                } else {
                    self.max_speed() * remaining / params.braking_zone
                }
            }
            Some(leader) if leader.gap < params.safe_distance => {
                leader.speed * params.close_follow_factor
            }
            Some(leader) if leader.gap < 2.0 * params.safe_distance => leader.speed,
            Some(_) => self.max_speed(),
            None => {
                if self.stopped_at_light && light_distance > params.release_distance {
                    self.stopped_at_light = false;
                }
                self.max_speed()
            }
        };
    }

    /// Chooses the target speed of an emergency vehicle.
    fn plan_emergency(
        &mut self,
        leader: Option<Leader>,
        light_distance: f64,
        signal: Signal,
        driving: &DrivingParams,
        params: &EmergencyParams,
    ) {
        let slow_for_light =
            light_distance > 0.0 && light_distance < params.slow_zone && signal == Signal::Red;
        let safe_distance = driving.safe_distance * params.safe_distance_factor;

        self.target_speed = match leader {
            _ if slow_for_light => self.max_speed() * params.slow_factor,
            Some(leader) if leader.gap < safe_distance => leader.speed * params.close_follow_factor,
            _ => self.max_speed(),
        };
    }

    /// Integrates the vehicle's speed and position.
    fn integrate(&mut self, dt: f64) {
        self.speed = self.acc.respond(self.speed, self.target_speed, dt);
        self.pos.x += self.speed * dt * self.direction.sign();
    }

    /// Records the vehicle passing through the intersection.
    fn mark_passed(&mut self, road: &RoadLayout) {
        if self.passed {
            return;
        }
        let beyond = self.direction.sign() * (self.pos_front() - road.far_edge(self.direction));
        if beyond > 0.0 {
            debug!("{} {:?} passed the intersection", self.class, self.id);
            self.passed = true;
        }
    }
}

/// Advances a vehicle by `dt` seconds.
///
/// The vehicle observes the other vehicles as they are now, including any that
/// have already moved this tick. An emergency vehicle first asks the vehicles
/// ahead of it to change lanes, in `order`, which may move them before their
/// own update.
pub(crate) fn advance(
    vehicles: &mut VehicleSet,
    order: &[VehicleId],
    id: VehicleId,
    dt: f64,
    light: &TrafficLight,
    config: &SimConfig,
) {
    let dt = f64::max(dt, 0.0);
    let Some(vehicle) = vehicles.get_mut(id) else {
        return;
    };
    vehicle.tick_cooldown(dt);
    let behaviour = vehicle.behaviour();

    if behaviour == Behaviour::EmergencyPriority {
        lane_change::clear_path(vehicles, order, id, config);
    }

    let vehicle = &vehicles[id];
    let leader = vehicle.leader(vehicles.values());
    let light_distance = vehicle.light_distance(&config.road);
    let signal = light.signal_for(vehicle.direction);

    let vehicle = &mut vehicles[id];
    match behaviour {
        Behaviour::Standard => {
            vehicle.plan_standard(leader, light_distance, signal, &config.driving)
        }
        Behaviour::EmergencyPriority => vehicle.plan_emergency(
            leader,
            light_distance,
            signal,
            &config.driving,
            &config.emergency,
        ),
    }
    vehicle.integrate(dt);
    vehicle.mark_passed(&config.road);
}
