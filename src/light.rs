use crate::{ConfigurationError, RoadId, RoadMap};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A traffic light which cycles a set of roads through a fixed schedule
/// of green and red phases.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TrafficLight {
    /// The controlled roads.
    roads: Vec<RoadId>,
    /// The phases, in the order they are cycled through.
    phases: Vec<Phase>,
    /// The index of the current phase.
    phase: usize,
    /// The time left in the current phase, in s.
    countdown: f64,
    /// How the first vehicle on a red road approaches the light.
    approach: ApproachParams,
}

/// A single phase of a traffic light's cycle.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Phase {
    /// How long the phase lasts, in s.
    pub duration: f64,
    /// Whether each controlled road is green, in the order the roads were given.
    pub green: Vec<bool>,
}

/// How the first vehicle on a road approaches a red light at its end.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApproachParams {
    /// The velocity vehicles slow down to near a red light, in m/s.
    pub approaching_speed: f64,
    /// The distance from the light at which vehicles start slowing down, in m.
    pub slowing_down_distance: f64,
    /// The distance from the light at which vehicles brake to a stop, in m.
    pub stopping_distance: f64,
}

impl Default for ApproachParams {
    fn default() -> Self {
        Self {
            approaching_speed: 5.0,
            slowing_down_distance: 50.0,
            stopping_distance: 15.0,
        }
    }
}

impl Phase {
    /// Creates a new phase.
    pub fn new(duration: f64, green: impl Into<Vec<bool>>) -> Self {
        Self {
            duration,
            green: green.into(),
        }
    }
}

impl ApproachParams {
    fn validate(&self) -> Result<(), ConfigurationError> {
        let invalid = |name, value| Err(ConfigurationError::InvalidParameter { name, value });
        if self.approaching_speed <= 0.0 {
            return invalid("approaching_speed", self.approaching_speed);
        }
        if self.stopping_distance < 0.0 {
            return invalid("stopping_distance", self.stopping_distance);
        }
        if self.slowing_down_distance < self.stopping_distance {
            return invalid("slowing_down_distance", self.slowing_down_distance);
        }
        Ok(())
    }
}

impl TrafficLight {
    /// Creates a new traffic light.
    ///
    /// # Parameters
    /// * `roads` - The roads controlled by the light
    /// * `phases` - The cycle; each phase has one green flag per road
    /// * `approach` - How vehicles approach the light while it is red
    pub fn new(
        roads: Vec<RoadId>,
        phases: Vec<Phase>,
        approach: ApproachParams,
    ) -> Result<Self, ConfigurationError> {
        if phases.is_empty() {
            return Err(ConfigurationError::NoPhases);
        }
        for (idx, phase) in phases.iter().enumerate() {
            if phase.green.len() != roads.len() {
                return Err(ConfigurationError::PhaseLength {
                    phase: idx,
                    expected: roads.len(),
                    got: phase.green.len(),
                });
            }
            if !(phase.duration > 0.0) {
                return Err(ConfigurationError::PhaseDuration {
                    phase: idx,
                    duration: phase.duration,
                });
            }
        }
        approach.validate()?;
        let countdown = phases[0].duration;
        Ok(Self {
            roads,
            phases,
            phase: 0,
            countdown,
            approach,
        })
    }

    /// The controlled roads.
    pub fn roads(&self) -> &[RoadId] {
        &self.roads
    }

    /// The phases of the cycle.
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// The index of the current phase.
    pub fn current_phase(&self) -> usize {
        self.phase
    }

    /// The time left in the current phase, in s.
    pub fn countdown(&self) -> f64 {
        self.countdown
    }

    /// How vehicles approach the light while it is red.
    pub fn approach(&self) -> ApproachParams {
        self.approach
    }

    /// The total duration of one cycle, in s.
    pub fn cycle_time(&self) -> f64 {
        self.phases.iter().map(|p| p.duration).sum()
    }

    /// Whether the given road is green in the current phase,
    /// or `None` if the light does not control it.
    pub fn is_green(&self, road_id: RoadId) -> Option<bool> {
        let idx = self.roads.iter().position(|id| *id == road_id)?;
        Some(self.phases[self.phase].green[idx])
    }

    /// Advances the light by `dt` seconds.
    ///
    /// At most one phase change happens per call, so a `dt` longer than
    /// the next phase will not skip over it.
    pub fn tic(&mut self, dt: f64, roads: &mut RoadMap) {
        self.countdown -= dt;
        if self.countdown <= 0.0 {
            self.phase = (self.phase + 1) % self.phases.len();
            self.countdown = self.phases[self.phase].duration;
            log::debug!("traffic light entered phase {}", self.phase);
            self.apply(roads);
        }
    }

    /// Sets the green flag of every controlled road from the current phase.
    pub(crate) fn apply(&self, roads: &mut RoadMap) {
        let phase = &self.phases[self.phase];
        for (road_id, green) in self.roads.iter().zip(&phase.green) {
            roads.get_mut(*road_id).set_green_light(*green);
        }
    }
}
