//! The recorded history of a simulation run.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The kinematic state of a vehicle at the end of one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// Position along the road, in m.
    pub position: f64,
    /// Velocity in m/s.
    pub velocity: f64,
    /// The acceleration applied during the tick, in m/s^2.
    pub acceleration: f64,
}

/// The samples recorded while a vehicle travelled along one road of its route.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegTelemetry {
    /// The name of the road.
    pub road: String,
    /// One sample per tick spent on the road.
    pub samples: Vec<Sample>,
}

impl LegTelemetry {
    pub fn positions(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.position)
    }

    pub fn velocities(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.velocity)
    }

    pub fn accelerations(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.acceleration)
    }
}

/// Everything recorded about a single vehicle.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VehicleRecord {
    /// The names of the roads on the vehicle's route.
    pub route: Vec<String>,
    /// The simulated time the vehicle entered the network, in s.
    pub spawn_time: f64,
    /// The simulated time the vehicle left the end of its route, in s.
    pub finish_time: Option<f64>,
    /// The telemetry of each road visited so far, in route order.
    pub legs: Vec<LegTelemetry>,
}

impl VehicleRecord {
    /// The time taken to complete the route, in s, if it was completed.
    pub fn travel_time(&self) -> Option<f64> {
        self.finish_time.map(|t| t - self.spawn_time)
    }

    /// Whether the vehicle reached the end of its route.
    pub fn is_finished(&self) -> bool {
        self.finish_time.is_some()
    }

    /// The telemetry of the first visit to the named road.
    pub fn leg(&self, road: &str) -> Option<&LegTelemetry> {
        self.legs.iter().find(|leg| leg.road == road)
    }

    /// Every sample recorded for the vehicle, in time order.
    pub fn samples(&self) -> impl Iterator<Item = &Sample> {
        self.legs.iter().flat_map(|leg| leg.samples.iter())
    }
}

/// The outcome of a simulation run.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationResult {
    /// The simulated time when the run ended, in s.
    pub elapsed: f64,
    /// One record per spawned vehicle, in spawn order.
    pub vehicles: Vec<VehicleRecord>,
}

impl SimulationResult {
    /// The travel times of every vehicle that completed its route, in spawn order.
    pub fn travel_times(&self) -> Vec<f64> {
        self.vehicles
            .iter()
            .filter_map(VehicleRecord::travel_time)
            .collect()
    }

    /// The record of the `index`th vehicle to spawn.
    pub fn record(&self, index: usize) -> Option<&VehicleRecord> {
        self.vehicles.get(index)
    }

    /// The vehicles which completed their route.
    pub fn completed(&self) -> impl Iterator<Item = &VehicleRecord> {
        self.vehicles.iter().filter(|v| v.is_finished())
    }

    /// The mean travel time of the completed rides, if there were any.
    pub fn mean_travel_time(&self) -> Option<f64> {
        let times = self.travel_times();
        if times.is_empty() {
            None
        } else {
            Some(times.iter().sum::<f64>() / times.len() as f64)
        }
    }
}
