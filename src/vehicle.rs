use self::acceleration::AccelerationModel;
use crate::telemetry::{LegTelemetry, Sample, VehicleRecord};
use crate::{
    ApproachParams, ConfigurationError, RoadId, RoadMap, StartingState, VehicleConfig, VehicleId,
};

mod acceleration;

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID
    pub(crate) id: VehicleId,
    /// The order in which the vehicle was scheduled to spawn.
    seq: usize,
    /// The vehicle's length in m.
    length: f64,
    /// The acceleration model
    acc: AccelerationModel,
    /// The longitudinal position of the front of the vehicle along the current road, in m.
    pos: f64,
    /// The velocity in m/s.
    vel: f64,
    /// The acceleration applied during the last tick, in m/s^2.
    last_acc: f64,
    /// The vehicle's route.
    route: Vec<RoadId>,
    /// The index into `route` of the road the vehicle is on.
    leg: usize,
    /// The simulated time the vehicle was spawned, in s.
    spawn_time: f64,
    /// The simulated time the vehicle left the end of its route, in s.
    finish_time: Option<f64>,
    /// The samples recorded on each road entered so far.
    legs: Vec<Vec<Sample>>,
}

/// The state of a vehicle's leader at the start of a tick.
#[derive(Clone, Copy, Debug)]
pub(crate) struct LeaderState {
    pub pos: f64,
    pub vel: f64,
}

/// What a vehicle sees of its road at the start of a tick.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RoadAhead {
    /// The length of the road in m.
    pub length: f64,
    /// How to approach the red light at the end of the road, if there is one.
    pub red_light: Option<ApproachParams>,
}

/// A vehicle's kinematic state at the end of a tick, before it is committed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Motion {
    pub pos: f64,
    pub vel: f64,
    pub acc: f64,
}

/// Where a vehicle ended up after its motion was committed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Progress {
    /// Still on the same road.
    Stayed,
    /// Passed the end of `from` and should continue onto `to`,
    /// `overshoot` metres past its start.
    Crossed {
        from: RoadId,
        to: RoadId,
        overshoot: f64,
    },
    /// Passed the end of the last road on its route.
    Finished,
}

impl Vehicle {
    /// Creates a new vehicle at the start of its route.
    pub(crate) fn new(
        id: VehicleId,
        seq: usize,
        route: Vec<RoadId>,
        config: &VehicleConfig,
        start: &StartingState,
        spawn_time: f64,
    ) -> Result<Self, ConfigurationError> {
        if route.is_empty() {
            return Err(ConfigurationError::EmptyRoute);
        }
        config.validate()?;
        Ok(Self {
            id,
            seq,
            length: config.length,
            acc: AccelerationModel::new(config),
            pos: start.position,
            vel: start.velocity,
            last_acc: start.acceleration,
            route,
            leg: 0,
            spawn_time,
            finish_time: None,
            legs: vec![vec![]],
        })
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The vehicle's length in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The velocity the driver wants to travel at on a free road, in m/s.
    pub fn desired_velocity(&self) -> f64 {
        self.acc.desired_velocity()
    }

    /// The ID of the road the vehicle is currently travelling on.
    pub fn road_id(&self) -> RoadId {
        self.route[self.leg]
    }

    /// The vehicle's route.
    pub fn route(&self) -> &[RoadId] {
        &self.route
    }

    /// The longitudinal position of the front of the vehicle in m.
    pub fn pos(&self) -> f64 {
        self.pos
    }

    /// The vehicle's velocity in m/s.
    pub fn vel(&self) -> f64 {
        self.vel
    }

    /// The acceleration applied during the last tick, in m/s^2.
    pub fn acc(&self) -> f64 {
        self.last_acc
    }

    /// Whether the vehicle has left the end of its route.
    pub fn is_finished(&self) -> bool {
        self.finish_time.is_some()
    }

    /// The simulated time the vehicle was spawned, in s.
    pub fn spawn_time(&self) -> f64 {
        self.spawn_time
    }

    /// The simulated time the vehicle left the end of its route, in s.
    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    /// The samples recorded on the current road.
    pub fn current_samples(&self) -> &[Sample] {
        &self.legs[self.leg]
    }

    pub(crate) fn seq(&self) -> usize {
        self.seq
    }

    /// The state a follower sees of this vehicle.
    pub(crate) fn leader_state(&self) -> LeaderState {
        LeaderState {
            pos: self.pos,
            vel: self.vel,
        }
    }

    /// Calculates the vehicle's acceleration for the coming tick.
    ///
    /// # Parameters
    /// * `road` - The road the vehicle is on
    /// * `leader` - The vehicle ahead on the same road, if there is one
    pub(crate) fn calc_acceleration(&self, road: &RoadAhead, leader: Option<LeaderState>) -> f64 {
        let mut desired_vel = self.acc.desired_velocity();

        // Only the first vehicle reacts to the light, the rest follow it
        if let (None, Some(approach)) = (leader, road.red_light) {
            let distance = road.length - self.pos;
            if distance < approach.stopping_distance {
                return self.acc.stop_at_light(self.vel, approach.approaching_speed);
            }
            if distance < approach.slowing_down_distance {
                desired_vel = f64::min(desired_vel, approach.approaching_speed);
            }
        }

        let mut acc = self.acc.free_road(self.vel, desired_vel);
        if let Some(leader) = leader {
            let net_dist = leader.pos - self.pos - self.length;
            if net_dist <= 0.0 {
                log::warn!(
                    "vehicle {:?} overlaps its leader by {:.3} m",
                    self.id,
                    -net_dist
                );
            }
            acc += self.acc.interaction(net_dist, self.vel, leader.vel);
        }
        acc
    }

    /// Integrates the vehicle's velocity and position over one tick.
    ///
    /// # Parameters
    /// * `acc` - The acceleration applied during the tick
    /// * `dt` - The time step in seconds
    pub(crate) fn integrate(&self, acc: f64, dt: f64) -> Motion {
        let vel = self.vel + acc * dt;
        if vel < 0.0 {
            Motion {
                pos: self.pos - 0.5 * self.vel * dt,
                vel: 0.0,
                acc,
            }
        } else {
            Motion {
                pos: self.pos + self.vel * dt + 0.5 * acc * dt * dt,
                vel,
                acc,
            }
        }
    }

    /// Applies the result of a tick and checks whether the vehicle has
    /// travelled past the end of its current road.
    ///
    /// # Parameters
    /// * `motion` - The vehicle's new state
    /// * `road_length` - The length of the current road in m
    pub(crate) fn commit(&mut self, motion: Motion, road_length: f64) -> Progress {
        self.pos = motion.pos;
        self.vel = motion.vel;
        self.last_acc = motion.acc;

        if self.pos <= road_length {
            return Progress::Stayed;
        }
        match self.route.get(self.leg + 1) {
            Some(&to) => Progress::Crossed {
                from: self.route[self.leg],
                to,
                overshoot: self.pos - road_length,
            },
            None => Progress::Finished,
        }
    }

    /// Moves the vehicle onto the next road on its route.
    pub(crate) fn enter_next(&mut self, pos: f64) {
        self.leg += 1;
        self.pos = pos;
        self.legs.push(vec![]);
    }

    /// Marks the vehicle as having completed its route.
    pub(crate) fn finish(&mut self, time: f64) {
        self.finish_time = Some(time);
    }

    /// Appends the current state to the telemetry of the current road.
    pub(crate) fn record(&mut self) {
        self.legs[self.leg].push(Sample {
            position: self.pos,
            velocity: self.vel,
            acceleration: self.last_acc,
        });
    }

    /// Builds the vehicle's record, naming the roads it visited.
    pub(crate) fn to_record(&self, roads: &RoadMap) -> VehicleRecord {
        let name = |id: &RoadId| roads.get(*id).map_or("", |r| r.name()).to_owned();
        VehicleRecord {
            route: self.route.iter().map(name).collect(),
            spawn_time: self.spawn_time,
            finish_time: self.finish_time,
            legs: self
                .route
                .iter()
                .zip(&self.legs)
                .map(|(id, samples)| LegTelemetry {
                    road: name(id),
                    samples: samples.clone(),
                })
                .collect(),
        }
    }
}
