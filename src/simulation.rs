use crate::light::TrafficLight;
use crate::telemetry::SimulationResult;
use crate::vehicle::{Motion, Progress, RoadAhead, Vehicle};
use crate::{
    ConfigurationError, RoadId, RoadMap, RouteError, SimResult, StartingState, TrafficLightId,
    VehicleConfig, VehicleId, VehicleSet, VehicleSpec,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use std::collections::VecDeque;

/// Tolerance used when comparing times against the simulation clock, in s.
const TIME_EPSILON: f64 = 1e-9; // s

/// The timing parameters of a simulation.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SimulationConfig {
    /// The fixed time step, in s.
    pub time_step: f64,
    /// The simulated time after which the run ends, in s.
    pub total_time: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            time_step: 1.0 / 60.0,
            total_time: 600.0,
        }
    }
}

/// The lifecycle of a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimulationState {
    /// Built but not yet stepped.
    Idle,
    /// At least one tick has been simulated.
    Running,
    /// The run is over and further steps do nothing.
    Stopped,
}

/// A vehicle waiting for its spawn time.
#[derive(Clone, Debug)]
struct PendingVehicle {
    seq: usize,
    route: Vec<RoadId>,
    spawn_time: f64,
    config: VehicleConfig,
    start: StartingState,
}

impl PendingVehicle {
    /// Resolves and validates a vehicle specification against the road network.
    fn new(spec: &VehicleSpec, roads: &RoadMap) -> Result<Self, ConfigurationError> {
        let route = roads.resolve_route(&spec.route)?;
        let config = spec.config.resolve();
        config.validate()?;
        let start = spec.start.resolve();

        if !spec.spawn_time.is_finite() {
            return Err(ConfigurationError::InvalidParameter {
                name: "spawn_time",
                value: spec.spawn_time,
            });
        }
        if !(start.velocity >= 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "velocity",
                value: start.velocity,
            });
        }
        let first = &roads[route[0]];
        if !(0.0..=first.length()).contains(&start.position) {
            return Err(ConfigurationError::StartBeyondRoad {
                road: first.name().to_owned(),
                position: start.position,
                length: first.length(),
            });
        }

        Ok(Self {
            seq: 0,
            route,
            spawn_time: spec.spawn_time,
            config,
            start,
        })
    }
}

/// A traffic simulation.
pub struct Simulation {
    /// The timing parameters.
    config: SimulationConfig,
    /// The road network.
    roads: RoadMap,
    /// The traffic lights.
    lights: SlotMap<TrafficLightId, TrafficLight>,
    /// Vehicles yet to be spawned, in spawn order.
    pending: VecDeque<PendingVehicle>,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// Vehicles which have completed their route, in the order they finished.
    retired: Vec<Vehicle>,
    /// The current frame of simulation.
    frame: usize,
    /// Where the simulation is in its lifecycle.
    state: SimulationState,
}

impl Simulation {
    /// Creates a new simulation.
    ///
    /// # Parameters
    /// * `config` - The time step and total simulated time
    /// * `roads` - The road network
    /// * `specs` - The vehicles to spawn; there must be at least one
    /// * `lights` - The traffic lights controlling roads in `roads`
    pub fn new(
        config: SimulationConfig,
        roads: RoadMap,
        specs: Vec<VehicleSpec>,
        lights: Vec<TrafficLight>,
    ) -> Result<Self, ConfigurationError> {
        if !(config.time_step > 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "time_step",
                value: config.time_step,
            });
        }
        if !(config.total_time >= 0.0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "total_time",
                value: config.total_time,
            });
        }
        if specs.is_empty() {
            return Err(ConfigurationError::NoVehicles);
        }

        let mut pending = specs
            .iter()
            .map(|spec| PendingVehicle::new(spec, &roads))
            .collect::<Result<Vec<_>, _>>()?;
        pending.sort_by(|a, b| a.spawn_time.total_cmp(&b.spawn_time));
        for (seq, vehicle) in pending.iter_mut().enumerate() {
            vehicle.seq = seq;
        }

        let mut sim = Self {
            config,
            roads,
            lights: SlotMap::with_key(),
            pending: pending.into(),
            vehicles: VehicleSet::with_key(),
            retired: vec![],
            frame: 0,
            state: SimulationState::Idle,
        };
        for light in lights {
            sim.add_traffic_light(light)?;
        }
        Ok(sim)
    }

    /// Links a traffic light to the roads it controls and applies its first phase.
    fn add_traffic_light(
        &mut self,
        light: TrafficLight,
    ) -> Result<TrafficLightId, ConfigurationError> {
        let light_id = self.lights.insert(light);
        let light = &self.lights[light_id];
        for road_id in light.roads() {
            let road = self
                .roads
                .get(*road_id)
                .ok_or(ConfigurationError::ForeignRoad)?;
            if road.traffic_light().is_some() {
                return Err(ConfigurationError::AlreadyControlled(road.name().to_owned()));
            }
            self.roads.get_mut(*road_id).set_traffic_light(light_id);
        }
        light.apply(&mut self.roads);
        Ok(light_id)
    }

    /// Runs the simulation until the total time has elapsed or every vehicle
    /// has completed its route.
    pub fn run(mut self) -> SimResult<SimulationResult> {
        while self.step()? {}
        log::debug!(
            "simulation stopped at {:.2} s with {} vehicles finished",
            self.elapsed(),
            self.retired.len()
        );
        Ok(self.result())
    }

    /// Advances the simulation by a single time step.
    /// Returns `false` once the simulation has stopped.
    pub fn step(&mut self) -> SimResult<bool> {
        if self.state == SimulationState::Stopped {
            return Ok(false);
        }
        if self.elapsed() > self.config.total_time + TIME_EPSILON {
            self.state = SimulationState::Stopped;
            return Ok(false);
        }
        self.state = SimulationState::Running;

        let dt = self.config.time_step;
        log::trace!("frame {} at {:.3} s", self.frame, self.elapsed());
        self.spawn_vehicles()?;
        if let Err(err) = self.move_vehicles(dt) {
            self.state = SimulationState::Stopped;
            return Err(err.into());
        }
        self.update_lights(dt);
        self.retire_vehicles();
        self.frame += 1;

        if self.vehicles.is_empty() && self.pending.is_empty() {
            self.state = SimulationState::Stopped;
        }
        Ok(self.state == SimulationState::Running)
    }

    /// Gets the timing parameters.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Gets the lifecycle state.
    pub fn state(&self) -> SimulationState {
        self.state
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Gets the simulated time, in s.
    pub fn elapsed(&self) -> f64 {
        self.frame as f64 * self.config.time_step
    }

    /// Gets the road network.
    pub fn roads(&self) -> &RoadMap {
        &self.roads
    }

    /// Gets a reference to the active vehicle with the given ID.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    /// Returns an iterator over the vehicles currently in the network.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Returns an iterator over the vehicles which completed their route.
    pub fn iter_retired(&self) -> impl Iterator<Item = &Vehicle> {
        self.retired.iter()
    }

    /// Returns an iterator over all the traffic lights in the simulation.
    pub fn iter_lights(&self) -> impl Iterator<Item = (TrafficLightId, &TrafficLight)> {
        self.lights.iter()
    }

    /// The number of vehicles still waiting to be spawned.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// The vehicle immediately ahead of the given one on the same road.
    pub fn leader_of(&self, vehicle_id: VehicleId) -> Option<VehicleId> {
        let vehicle = self.vehicles.get(vehicle_id)?;
        self.roads[vehicle.road_id()].leader_of(vehicle_id)
    }

    /// Collects the telemetry of every spawned vehicle, in spawn order.
    /// Vehicles which never spawned are not included.
    pub fn result(&self) -> SimulationResult {
        let mut vehicles = self
            .retired
            .iter()
            .chain(self.vehicles.values())
            .collect::<Vec<_>>();
        vehicles.sort_by_key(|v| v.seq());
        SimulationResult {
            elapsed: self.elapsed(),
            vehicles: vehicles.iter().map(|v| v.to_record(&self.roads)).collect(),
        }
    }

    /// Places every vehicle whose spawn time has been reached onto the
    /// first road of its route.
    fn spawn_vehicles(&mut self) -> Result<(), ConfigurationError> {
        let now = self.elapsed();
        while let Some(pending) = self.pending.pop_front() {
            if pending.spawn_time > now + TIME_EPSILON {
                self.pending.push_front(pending);
                break;
            }
            let road_id = pending.route[0];
            let vehicle_id = self.vehicles.try_insert_with_key(|id| {
                Vehicle::new(
                    id,
                    pending.seq,
                    pending.route,
                    &pending.config,
                    &pending.start,
                    pending.spawn_time,
                )
            })?;
            self.roads
                .get_mut(road_id)
                .insert_vehicle(&self.vehicles, vehicle_id);
            log::debug!(
                "spawned vehicle {:?} on `{}` at {:.2} s",
                vehicle_id,
                self.roads[road_id].name(),
                now
            );
        }
        Ok(())
    }

    /// Calculates the state of every vehicle at the end of this tick.
    /// Every vehicle sees the vehicle ahead as it was at the start of the tick.
    fn calculate_motions(&self, dt: f64) -> Vec<(VehicleId, Motion)> {
        let mut motions = Vec::with_capacity(self.vehicles.len());
        for road in self.roads.iter() {
            let ahead = RoadAhead {
                length: road.length(),
                red_light: road.red_light().map(|id| self.lights[id].approach()),
            };
            let mut leader = None;
            for vehicle_id in road.vehicles() {
                let vehicle = &self.vehicles[vehicle_id];
                let acc = vehicle.calc_acceleration(&ahead, leader);
                motions.push((vehicle_id, vehicle.integrate(acc, dt)));
                leader = Some(vehicle.leader_state());
            }
        }
        motions
    }

    /// Moves every vehicle forward by one tick, then transfers vehicles
    /// which passed the end of their road onto the next one.
    ///
    /// Transfers happen only once every vehicle has moved, so a vehicle is
    /// always placed among the new positions of the vehicles on its next road.
    fn move_vehicles(&mut self, dt: f64) -> Result<(), RouteError> {
        let end_time = (self.frame + 1) as f64 * dt;
        let motions = self.calculate_motions(dt);

        let mut crossings = vec![];
        for (vehicle_id, motion) in &motions {
            let vehicle = &mut self.vehicles[*vehicle_id];
            let road_id = vehicle.road_id();
            match vehicle.commit(*motion, self.roads[road_id].length()) {
                Progress::Stayed => {}
                Progress::Crossed {
                    from,
                    to,
                    overshoot,
                } => crossings.push((*vehicle_id, from, to, overshoot)),
                Progress::Finished => {
                    vehicle.finish(end_time);
                    self.roads.get_mut(road_id).remove_vehicle(*vehicle_id);
                }
            }
        }

        for &(vehicle_id, from, to, _) in &crossings {
            self.roads.next_road(from, to)?;
            self.roads.get_mut(from).remove_vehicle(vehicle_id);
        }
        for (vehicle_id, from, to, overshoot) in crossings {
            self.vehicles[vehicle_id].enter_next(overshoot);
            self.roads
                .get_mut(to)
                .insert_vehicle(&self.vehicles, vehicle_id);
            log::debug!(
                "vehicle {:?} moved from `{}` onto `{}`",
                vehicle_id,
                self.roads[from].name(),
                self.roads[to].name()
            );
        }

        for (vehicle_id, _) in motions {
            self.vehicles[vehicle_id].record();
        }
        Ok(())
    }

    /// Updates the traffic lights.
    fn update_lights(&mut self, dt: f64) {
        for light in self.lights.values_mut() {
            light.tic(dt, &mut self.roads);
        }
    }

    /// Moves vehicles which completed their route out of the network.
    fn retire_vehicles(&mut self) {
        let finished = self
            .vehicles
            .iter()
            .filter(|(_, vehicle)| vehicle.is_finished())
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        for vehicle_id in finished {
            if let Some(vehicle) = self.vehicles.remove(vehicle_id) {
                log::debug!(
                    "vehicle {:?} finished after {:.2} s",
                    vehicle_id,
                    vehicle.finish_time().unwrap_or_default() - vehicle.spawn_time()
                );
                self.retired.push(vehicle);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::math::Point2d;
    use crate::{
        ApproachParams, Phase, RoadAttributes, SimError, StartingStateOverrides,
        VehicleConfigOverrides,
    };
    use assert_approx_eq::assert_approx_eq;

    fn highway() -> RoadMap {
        let mut roads = RoadMap::new();
        roads
            .add_road(&RoadAttributes {
                name: "A4",
                start: Point2d::new(0.0, 0.0),
                end: Point2d::new(2000.0, 0.0),
            })
            .unwrap();
        roads
    }

    fn at(position: f64) -> StartingStateOverrides {
        StartingStateOverrides {
            position: Some(position),
            ..Default::default()
        }
    }

    #[test]
    fn rejects_bad_configuration() {
        let config = SimulationConfig::default();
        let err = Simulation::new(config, highway(), vec![], vec![]).err();
        assert_eq!(err, Some(ConfigurationError::NoVehicles));

        let spec = VehicleSpec::new::<&str>(&[], 0.0);
        let err = Simulation::new(config, highway(), vec![spec], vec![]).err();
        assert_eq!(err, Some(ConfigurationError::EmptyRoute));

        let spec = VehicleSpec::new(&["M1"], 0.0);
        let err = Simulation::new(config, highway(), vec![spec], vec![]).err();
        assert_eq!(err, Some(ConfigurationError::UnknownRoad("M1".into())));

        let spec = VehicleSpec::new(&["A4"], 0.0).with_start(at(2500.0));
        let err = Simulation::new(config, highway(), vec![spec], vec![]).err();
        assert!(matches!(err, Some(ConfigurationError::StartBeyondRoad { .. })));

        let spec = VehicleSpec::new(&["A4"], 0.0);
        let config = SimulationConfig {
            time_step: 0.0,
            ..Default::default()
        };
        let err = Simulation::new(config, highway(), vec![spec], vec![]).err();
        assert!(matches!(
            err,
            Some(ConfigurationError::InvalidParameter {
                name: "time_step",
                ..
            })
        ));
    }

    #[test]
    fn rejects_road_with_two_lights() {
        let roads = highway();
        let a4 = roads.road_id("A4").unwrap();
        let light = || {
            TrafficLight::new(
                vec![a4],
                vec![Phase::new(10.0, [true])],
                ApproachParams::default(),
            )
            .unwrap()
        };
        let err = Simulation::new(
            SimulationConfig::default(),
            roads,
            vec![VehicleSpec::new(&["A4"], 0.0)],
            vec![light(), light()],
        )
        .err();
        assert_eq!(err, Some(ConfigurationError::AlreadyControlled("A4".into())));
    }

    #[test]
    fn spawns_in_time_order() {
        let specs = vec![
            VehicleSpec::new(&["A4"], 1.0),
            VehicleSpec::new(&["A4"], 0.0).with_start(at(100.0)),
        ];
        let mut sim = Simulation::new(SimulationConfig::default(), highway(), specs, vec![])
            .unwrap();
        assert_eq!(sim.state(), SimulationState::Idle);
        assert!(sim.step().unwrap());
        assert_eq!(sim.state(), SimulationState::Running);
        assert_eq!(sim.iter_vehicles().count(), 1);
        assert_eq!(sim.pending_count(), 1);

        while sim.elapsed() < 1.0 + TIME_EPSILON {
            sim.step().unwrap();
        }
        assert_eq!(sim.iter_vehicles().count(), 2);

        let result = sim.result();
        assert_eq!(result.vehicles[0].spawn_time, 0.0);
        assert_eq!(result.vehicles[1].spawn_time, 1.0);
        assert!(result.vehicles[0].legs[0].samples[0].position > 100.0);
    }

    #[test]
    fn queue_follows_position_order() {
        // The vehicle further along is listed second but must lead
        let specs = vec![
            VehicleSpec::new(&["A4"], 0.0),
            VehicleSpec::new(&["A4"], 0.0).with_start(at(400.0)),
        ];
        let mut sim = Simulation::new(SimulationConfig::default(), highway(), specs, vec![])
            .unwrap();
        sim.step().unwrap();

        let a4 = sim.roads().get_by_name("A4").unwrap();
        let queue = a4.vehicles().collect::<Vec<_>>();
        assert_eq!(queue.len(), 2);
        assert!(sim.get_vehicle(queue[0]).unwrap().pos() > 400.0);
        assert_eq!(sim.leader_of(queue[1]), Some(queue[0]));
        assert_eq!(sim.leader_of(queue[0]), None);
    }

    #[test]
    fn crossing_vehicle_joins_queue_in_position_order() {
        let mut roads = RoadMap::new();
        let a = roads
            .add_road(&RoadAttributes {
                name: "A",
                start: Point2d::new(0.0, 0.0),
                end: Point2d::new(100.0, 0.0),
            })
            .unwrap();
        let b = roads
            .add_road(&RoadAttributes {
                name: "B",
                start: Point2d::new(100.0, 0.0),
                end: Point2d::new(1100.0, 0.0),
            })
            .unwrap();
        roads.connect(a, b).unwrap();

        let fast = |position| StartingStateOverrides {
            position: Some(position),
            velocity: Some(30.0),
            ..Default::default()
        };
        let specs = vec![
            VehicleSpec::new(&["A", "B"], 0.0).with_start(fast(99.9)),
            VehicleSpec::new(&["B"], 0.0).with_start(fast(0.0)),
        ];
        let mut sim = Simulation::new(SimulationConfig::default(), roads, specs, vec![]).unwrap();
        sim.step().unwrap();

        // The vehicle already on B moved 0.5 m, the one crossing from A only 0.4 m
        let queue = sim.roads()[b].vehicles().collect::<Vec<_>>();
        assert_eq!(queue.len(), 2);
        let positions = queue
            .iter()
            .map(|id| sim.get_vehicle(*id).unwrap().pos())
            .collect::<Vec<_>>();
        assert!(positions[0] > positions[1]);
        assert_eq!(sim.get_vehicle(queue[1]).unwrap().route(), &[a, b]);
        assert_eq!(sim.leader_of(queue[1]), Some(queue[0]));
    }

    #[test]
    fn followers_see_the_previous_tick() {
        let dt = 0.5;
        let leader_config = VehicleConfigOverrides {
            desired_velocity: Some(25.0),
            ..Default::default()
        };
        let specs = vec![
            VehicleSpec::new(&["A4"], 0.0)
                .with_start(StartingStateOverrides {
                    velocity: Some(20.0),
                    ..Default::default()
                }),
            VehicleSpec::new(&["A4"], 0.0)
                .with_config(leader_config)
                .with_start(at(50.0)),
        ];
        let config = SimulationConfig {
            time_step: dt,
            total_time: 10.0,
        };
        let mut sim = Simulation::new(config, highway(), specs, vec![]).unwrap();
        sim.step().unwrap();

        // The follower reacts to the leader at rest at 50 m, not where it is now
        let vc = VehicleConfig::default();
        let vel: f64 = 20.0;
        let gap = 50.0 - 0.0 - vc.length;
        let s_star = vc.min_gap
            + vc.reaction_time * vel
            + vel * vel / (2.0 * (vc.max_acceleration * vc.comfortable_deceleration).sqrt());
        let acc = vc.max_acceleration * (1.0 - (vel / vc.desired_velocity).powf(4.0))
            - (s_star / gap).powi(2);

        let result = sim.result();
        let follower = &result.vehicles[0].legs[0].samples[0];
        assert_approx_eq!(follower.acceleration, acc);
        let leader = &result.vehicles[1].legs[0].samples[0];
        assert!(leader.position > 50.0);
    }

    #[test]
    fn route_error_stops_the_run() {
        let mut roads = highway();
        roads
            .add_road(&RoadAttributes {
                name: "M1",
                start: Point2d::new(0.0, 0.0),
                end: Point2d::new(100.0, 0.0),
            })
            .unwrap();
        let spec = VehicleSpec::new(&["A4", "M1"], 0.0).with_start(StartingStateOverrides {
            position: Some(1990.0),
            velocity: Some(30.0),
            ..Default::default()
        });
        let sim = Simulation::new(SimulationConfig::default(), roads, vec![spec], vec![]).unwrap();
        let err = sim.run().unwrap_err();
        assert_eq!(
            err,
            SimError::Route(RouteError {
                from: "A4".into(),
                to: "M1".into()
            })
        );
    }

    #[test]
    fn stops_when_the_horizon_is_reached() {
        let config = SimulationConfig {
            time_step: 0.5,
            total_time: 2.0,
        };
        let spec = VehicleSpec::new(&["A4"], 0.0);
        let mut sim = Simulation::new(config, highway(), vec![spec], vec![]).unwrap();
        let mut ticks = 0;
        while sim.step().unwrap() {
            ticks += 1;
        }
        // Ticks at 0.0, 0.5, 1.0, 1.5 and 2.0
        assert_eq!(ticks, 5);
        assert_eq!(sim.state(), SimulationState::Stopped);
        assert!(!sim.step().unwrap());
        assert_eq!(sim.result().vehicles[0].legs[0].samples.len(), 5);
    }
}
