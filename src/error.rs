use thiserror::Error;

/// An invalid input to the simulation, detected before it starts running.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("each vehicle must have a non-empty route")]
    EmptyRoute,

    #[error("at least one vehicle specification is required")]
    NoVehicles,

    #[error("unknown road `{0}`")]
    UnknownRoad(String),

    #[error("road id does not belong to this road map")]
    ForeignRoad,

    #[error("a road named `{0}` already exists")]
    DuplicateRoad(String),

    #[error("road `{0}` has zero length")]
    DegenerateRoad(String),

    #[error("road `{0}` is already controlled by another traffic light")]
    AlreadyControlled(String),

    #[error("a traffic light needs at least one phase")]
    NoPhases,

    #[error("phase {phase} has {got} lights but the traffic light controls {expected} roads")]
    PhaseLength {
        phase: usize,
        expected: usize,
        got: usize,
    },

    #[error("phase {phase} has non-positive duration {duration}")]
    PhaseDuration { phase: usize, duration: f64 },

    #[error("invalid value {value} for `{name}`")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("vehicle starts at {position} m but road `{road}` is only {length} m long")]
    StartBeyondRoad {
        road: String,
        position: f64,
        length: f64,
    },
}

/// A vehicle tried to move between two roads that are not connected.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("road `{from}` does not lead to road `{to}`")]
pub struct RouteError {
    pub from: String,
    pub to: String,
}

/// Any error produced while building or running a simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("route error: {0}")]
    Route(#[from] RouteError),
}

pub type SimResult<T> = Result<T, SimError>;
