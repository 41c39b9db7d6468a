//! Vehicle parameters, starting states and the specifications used to spawn vehicles.

use crate::ConfigurationError;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The behavioural parameters of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleConfig {
    /// The vehicle length in m.
    pub length: f64,
    /// The velocity the driver wants to travel at on a free road, in m/s.
    pub desired_velocity: f64,
    /// The maximum acceleration of the vehicle, in m/s^2.
    pub max_acceleration: f64,
    /// The comfortable deceleration of the vehicle, a positive number in m/s^2.
    pub comfortable_deceleration: f64,
    /// The minimum gap kept to the vehicle ahead when stopped, in m.
    pub min_gap: f64,
    /// How quickly acceleration falls off as the desired velocity is approached.
    pub acceleration_exponent: f64,
    /// The desired time headway to the vehicle ahead, in s.
    pub reaction_time: f64,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            length: 5.0,
            desired_velocity: 33.333,
            max_acceleration: 0.73,
            comfortable_deceleration: 1.67,
            min_gap: 2.0,
            acceleration_exponent: 4.0,
            reaction_time: 1.6,
        }
    }
}

impl VehicleConfig {
    /// Returns a copy of this config with the given overrides applied.
    pub fn with_overrides(&self, overrides: &VehicleConfigOverrides) -> Self {
        Self {
            length: overrides.length.unwrap_or(self.length),
            desired_velocity: overrides.desired_velocity.unwrap_or(self.desired_velocity),
            max_acceleration: overrides.max_acceleration.unwrap_or(self.max_acceleration),
            comfortable_deceleration: overrides
                .comfortable_deceleration
                .unwrap_or(self.comfortable_deceleration),
            min_gap: overrides.min_gap.unwrap_or(self.min_gap),
            acceleration_exponent: overrides
                .acceleration_exponent
                .unwrap_or(self.acceleration_exponent),
            reaction_time: overrides.reaction_time.unwrap_or(self.reaction_time),
        }
    }

    /// Checks that every parameter is in its valid range.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let checks = [
            ("length", self.length, self.length > 0.0),
            ("desired_velocity", self.desired_velocity, self.desired_velocity > 0.0),
            ("max_acceleration", self.max_acceleration, self.max_acceleration > 0.0),
            (
                "comfortable_deceleration",
                self.comfortable_deceleration,
                self.comfortable_deceleration > 0.0,
            ),
            ("min_gap", self.min_gap, self.min_gap >= 0.0),
            (
                "acceleration_exponent",
                self.acceleration_exponent,
                self.acceleration_exponent > 0.0,
            ),
            ("reaction_time", self.reaction_time, self.reaction_time >= 0.0),
        ];
        match checks.iter().find(|(_, _, ok)| !ok) {
            Some((name, value, _)) => Err(ConfigurationError::InvalidParameter {
                name: *name,
                value: *value,
            }),
            None => Ok(()),
        }
    }
}

/// Optional replacements for the fields of a [VehicleConfig].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleConfigOverrides {
    pub length: Option<f64>,
    pub desired_velocity: Option<f64>,
    pub max_acceleration: Option<f64>,
    pub comfortable_deceleration: Option<f64>,
    pub min_gap: Option<f64>,
    pub acceleration_exponent: Option<f64>,
    pub reaction_time: Option<f64>,
}

impl VehicleConfigOverrides {
    /// Layers `other` on top of these overrides. Fields set in `other` win.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            length: other.length.or(self.length),
            desired_velocity: other.desired_velocity.or(self.desired_velocity),
            max_acceleration: other.max_acceleration.or(self.max_acceleration),
            comfortable_deceleration: other
                .comfortable_deceleration
                .or(self.comfortable_deceleration),
            min_gap: other.min_gap.or(self.min_gap),
            acceleration_exponent: other.acceleration_exponent.or(self.acceleration_exponent),
            reaction_time: other.reaction_time.or(self.reaction_time),
        }
    }

    /// Applies the overrides to the default [VehicleConfig].
    pub fn resolve(&self) -> VehicleConfig {
        VehicleConfig::default().with_overrides(self)
    }
}

/// The kinematic state of a vehicle when it enters the network.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StartingState {
    /// Position along the first road of the route, in m.
    pub position: f64,
    /// Velocity in m/s.
    pub velocity: f64,
    /// Acceleration in m/s^2.
    pub acceleration: f64,
}

impl StartingState {
    /// Returns a copy of this state with the given overrides applied.
    pub fn with_overrides(&self, overrides: &StartingStateOverrides) -> Self {
        Self {
            position: overrides.position.unwrap_or(self.position),
            velocity: overrides.velocity.unwrap_or(self.velocity),
            acceleration: overrides.acceleration.unwrap_or(self.acceleration),
        }
    }
}

/// Optional replacements for the fields of a [StartingState].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StartingStateOverrides {
    pub position: Option<f64>,
    pub velocity: Option<f64>,
    pub acceleration: Option<f64>,
}

impl StartingStateOverrides {
    /// Layers `other` on top of these overrides. Fields set in `other` win.
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            position: other.position.or(self.position),
            velocity: other.velocity.or(self.velocity),
            acceleration: other.acceleration.or(self.acceleration),
        }
    }

    /// Applies the overrides to a vehicle starting at rest at the start of its road.
    pub fn resolve(&self) -> StartingState {
        StartingState::default().with_overrides(self)
    }
}

/// Everything needed to spawn a vehicle into a simulation.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleSpec {
    /// The names of the roads the vehicle travels along, in order.
    pub route: Vec<String>,
    /// The simulated time at which the vehicle enters the network, in s.
    pub spawn_time: f64,
    /// Changes to the default vehicle parameters.
    pub config: VehicleConfigOverrides,
    /// Changes to the default starting state.
    pub start: StartingStateOverrides,
}

impl VehicleSpec {
    /// Creates a specification for a default vehicle.
    pub fn new<S: AsRef<str>>(route: &[S], spawn_time: f64) -> Self {
        Self {
            route: route.iter().map(|s| s.as_ref().to_owned()).collect(),
            spawn_time,
            ..Default::default()
        }
    }

    /// Sets the vehicle parameter overrides.
    pub fn with_config(mut self, config: VehicleConfigOverrides) -> Self {
        self.config = config;
        self
    }

    /// Sets the starting state overrides.
    pub fn with_start(mut self, start: StartingStateOverrides) -> Self {
        self.start = start;
        self
    }
}
