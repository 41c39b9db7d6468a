use crate::VehicleConfig;

/// The smallest net distance to the vehicle ahead used by the car following term, in m.
/// Overlapping vehicles are treated as being this far apart.
pub const MIN_NET_DIST: f64 = 0.01; // m

/// The acceleration model of a vehicle: the intelligent driver model.
#[derive(Clone, Debug)]
pub struct AccelerationModel {
    desired_vel: f64,
    max_acc: f64,
    comf_dec: f64,
    min_gap: f64,
    exponent: f64,
    headway: f64,
}

impl AccelerationModel {
    /// Creates a new acceleration model.
    pub fn new(config: &VehicleConfig) -> Self {
        AccelerationModel {
            desired_vel: config.desired_velocity,
            max_acc: config.max_acceleration,
            comf_dec: config.comfortable_deceleration,
            min_gap: config.min_gap,
            exponent: config.acceleration_exponent,
            headway: config.reaction_time,
        }
    }

    /// The velocity the driver wants to reach on a free road, in m/s.
    pub fn desired_velocity(&self) -> f64 {
        self.desired_vel
    }

    /// Calculates the acceleration on a free road.
    ///
    /// # Arguments
    /// * `vel` - The velocity of the simulated vehicle (m/s).
    /// * `desired_vel` - The velocity the vehicle is trying to reach (m/s).
    pub fn free_road(&self, vel: f64, desired_vel: f64) -> f64 {
        self.max_acc * (1. - (vel / desired_vel).powf(self.exponent))
    }

    /// Calculates the desired minimum gap to the vehicle ahead.
    ///
    /// # Arguments
    /// * `my_vel` - The velocity of the simulated vehicle (m/s).
    /// * `their_vel` - The vehicle ahead's velocity (m/s).
    pub fn desired_gap(&self, my_vel: f64, their_vel: f64) -> f64 {
        let appr = my_vel - their_vel;
        let factor = 1. / (2. * (self.max_acc * self.comf_dec).sqrt());
        self.min_gap + (my_vel * self.headway) + (my_vel * appr * factor)
    }

    /// Calculates the (non-positive) acceleration term from following the vehicle ahead.
    ///
    /// # Arguments
    /// * `net_dist` - The distance between this vehicle and the vehicle ahead in metres.
    /// * `my_vel` - The velocity of the simulated vehicle (m/s).
    /// * `their_vel` - The vehicle ahead's velocity (m/s).
    pub fn interaction(&self, net_dist: f64, my_vel: f64, their_vel: f64) -> f64 {
        let term = self.desired_gap(my_vel, their_vel) / f64::max(net_dist, MIN_NET_DIST);
        -(term * term)
    }

    /// Calculates the deceleration used to stop at a red light.
    ///
    /// # Arguments
    /// * `vel` - The velocity of the simulated vehicle (m/s).
    /// * `approach_vel` - The speed vehicles approach a red light at (m/s).
    pub fn stop_at_light(&self, vel: f64, approach_vel: f64) -> f64 {
        -self.comf_dec * vel / approach_vel
    }
}
