/// The speed response of a vehicle.
///
/// Speed approaches the target speed at a constant rate, braking being
/// faster than accelerating.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccelerationModel {
    max_speed: f64,
    acc: f64,
    dec: f64,
}

/// The parameters of the acceleration model.
pub struct ModelParams {
    /// The vehicle's maximum speed.
    pub max_speed: f64,
    /// The rate at which the vehicle speeds up.
    pub acceleration: f64,
    /// The braking rate as a multiple of `acceleration`.
    pub brake_factor: f64,
}

impl AccelerationModel {
    /// Creates a new acceleration model.
    pub fn new(params: &ModelParams) -> Self {
        AccelerationModel {
            max_speed: params.max_speed,
            acc: params.acceleration,
            dec: params.acceleration * params.brake_factor,
        }
    }

    /// The vehicle's maximum speed.
    pub fn max_speed(&self) -> f64 {
        self.max_speed
    }

    /// The rate at which the vehicle speeds up.
    pub fn acceleration(&self) -> f64 {
        self.acc
    }

    /// The rate at which the vehicle brakes.
    pub fn deceleration(&self) -> f64 {
        self.dec
    }

    /// Clamps a speed to the range the vehicle is capable of.
    pub fn clamp(&self, speed: f64) -> f64 {
        speed.clamp(0.0, self.max_speed)
    }

    /// Computes the speed after `dt` seconds of moving towards `target`.
    ///
    /// # Arguments
    /// * `speed` - The current speed.
    /// * `target` - The desired speed; clamped to `[0, max_speed]`.
    /// * `dt` - The time step in seconds.
    pub fn respond(&self, speed: f64, target: f64, dt: f64) -> f64 {
        let target = self.clamp(target);
        let dt = f64::max(dt, 0.0);
        let speed = if speed < target {
            f64::min(speed + self.acc * dt, target)
        } else {
            f64::max(speed - self.dec * dt, target)
        };
        self.clamp(speed)
    }
}
