//! Tests that involve the simulation of a single road.

use traffic_flow::{
    math::Point2d, RoadAttributes, RoadMap, Simulation, SimulationConfig, SimulationState,
    VehicleSpec,
};

fn single_road(length: f64) -> RoadMap {
    let mut roads = RoadMap::new();
    roads
        .add_road(&RoadAttributes {
            name: "A4",
            start: Point2d::new(0.0, 0.0),
            end: Point2d::new(length, 0.0),
        })
        .unwrap();
    roads
}

/// Test that a vehicle's position increases monotonically.
#[test]
fn vehicle_drives_forward() {
    let config = SimulationConfig {
        time_step: 0.1,
        total_time: 10.0,
    };
    let mut sim =
        Simulation::new(config, single_road(100.0), vec![VehicleSpec::new(&["A4"], 0.0)], vec![])
            .unwrap();

    sim.step().unwrap();
    let veh = sim.iter_vehicles().next().unwrap().id();
    let mut pos = sim.get_vehicle(veh).unwrap().pos();
    for _ in 0..99 {
        sim.step().unwrap();
        let next_pos = sim.get_vehicle(veh).unwrap().pos();
        assert!(next_pos > pos);
        pos = next_pos;
    }
}

/// A default vehicle starting at rest covers 2 km within two minutes.
#[test]
fn reaches_end_of_road_within_two_minutes() {
    let config = SimulationConfig {
        total_time: 120.0,
        ..Default::default()
    };
    let sim = Simulation::new(
        config,
        single_road(2000.0),
        vec![VehicleSpec::new(&["A4"], 0.0)],
        vec![],
    )
    .unwrap();
    let result = sim.run().unwrap();

    let vehicle = &result.vehicles[0];
    assert!(vehicle.is_finished());
    assert!(vehicle.travel_time().unwrap() < 120.0);
    assert!(result.elapsed < 120.0);

    let leg = vehicle.leg("A4").unwrap();
    assert!(leg.positions().last().unwrap() > 2000.0);
    assert!(leg.velocities().all(|v| v < 33.333));
    assert!(leg.accelerations().all(|a| a > 0.0));
}

/// The velocity rises monotonically towards the desired velocity.
#[test]
fn approaches_desired_velocity() {
    let sim = Simulation::new(
        SimulationConfig::default(),
        single_road(10_000.0),
        vec![VehicleSpec::new(&["A4"], 0.0)],
        vec![],
    )
    .unwrap();
    let result = sim.run().unwrap();

    let vels = result.vehicles[0].leg("A4").unwrap().velocities().collect::<Vec<_>>();
    assert!(vels.windows(2).all(|w| w[1] >= w[0]));
    let last = *vels.last().unwrap();
    assert!(last > 33.33 && last <= 33.333);
}

/// The run stops as soon as the last vehicle has left the network.
#[test]
fn stops_when_empty() {
    let mut sim = Simulation::new(
        SimulationConfig::default(),
        single_road(100.0),
        vec![VehicleSpec::new(&["A4"], 0.0)],
        vec![],
    )
    .unwrap();
    while sim.step().unwrap() {}
    assert_eq!(sim.state(), SimulationState::Stopped);
    assert!(sim.elapsed() < 60.0);
    assert_eq!(sim.iter_vehicles().count(), 0);
    assert_eq!(sim.iter_retired().count(), 1);
    assert!(sim.roads().get_by_name("A4").unwrap().vehicles().len() == 0);
}
