//! A microscopic traffic flow simulation.
//!
//! Vehicles travel along a network of single lane [Road]s, following the vehicle
//! ahead of them according to the intelligent driver model. Roads may be controlled
//! by [TrafficLight]s which cycle through a fixed schedule of green and red phases.
//! A [Simulation] steps the whole network forward with a fixed time step and
//! collects the kinematic history of every vehicle into a [SimulationResult].

pub use cgmath;
pub use error::{ConfigurationError, RouteError, SimError, SimResult};
pub use generator::VehicleGenerator;
pub use light::{ApproachParams, Phase, TrafficLight};
pub use road::{Road, RoadAttributes, RoadMap};
pub use simulation::{Simulation, SimulationConfig, SimulationState};
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use spec::{
    StartingState, StartingStateOverrides, VehicleConfig, VehicleConfigOverrides, VehicleSpec,
};
pub use telemetry::{LegTelemetry, Sample, SimulationResult, VehicleRecord};
pub use vehicle::Vehicle;

mod error;
mod generator;
mod light;
pub mod math;
mod road;
mod simulation;
mod spec;
mod telemetry;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Road].
    pub struct RoadId;
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
    /// Unique ID of a [TrafficLight].
    pub struct TrafficLightId;
}

type RoadSet = SlotMap<RoadId, Road>;
type VehicleSet = SlotMap<VehicleId, Vehicle>;
