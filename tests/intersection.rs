//! Tests that run the whole intersection.

use assert_approx_eq::assert_approx_eq;
use intersection_sim::{
    CrossingState, Direction, LaneChangeError, LightPhase, SimConfig, SimError, Simulation, Side,
    VehicleAttributes, VehicleClass, VehicleId,
};
use std::collections::HashMap;

/// A configuration with no random spawning or lane changes.
fn quiet_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.spawning.initial_vehicles = 0;
    config.spawning.vehicle_interval = 1e9;
    config.spawning.pedestrian_interval = 1e9;
    config.lane_change.probability = 0.0;
    config
}

/// A configuration with frequent spawning.
fn busy_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.spawning.vehicle_interval = 0.3;
    config.spawning.pedestrian_interval = 1.0;
    config.spawning.pedestrian_chance = 0.8;
    config.lane_change.probability = 0.05;
    config
}

fn place(sim: &mut Simulation, class: VehicleClass, lane: u8, x: f64) -> VehicleId {
    let direction = Direction::of_lane(lane).unwrap();
    let attributes = VehicleAttributes::in_lane(class, lane, direction, x, sim.config());
    sim.add_vehicle(&attributes).unwrap()
}

/// Test that a vehicle's position increases monotonically.
#[test]
fn vehicle_drives_forward() {
    let mut sim = Simulation::with_seed(quiet_config(), 1).unwrap();
    let veh = place(&mut sim, VehicleClass::Normal, 0, 0.0);

    let mut pos = sim.get_vehicle(veh).unwrap().pos_rear();
    for _ in 0..100 {
        sim.step(0.05);
        let next_pos = sim.get_vehicle(veh).unwrap().pos_rear();
        assert!(next_pos > pos);
        pos = next_pos;
    }
}

#[test]
fn speeds_stay_within_bounds_and_rates() {
    let mut sim = Simulation::with_seed(busy_config(), 42).unwrap();
    let dt = 0.05;
    let brake_factor = sim.config().driving.brake_factor;
    let mut previous: HashMap<VehicleId, f64> = HashMap::new();

    for _ in 0..2000 {
        sim.step(dt);
        let mut current = HashMap::new();
        for vehicle in sim.iter_vehicles() {
            let speed = vehicle.speed();
            assert!(speed >= 0.0);
            assert!(speed <= vehicle.max_speed() + 1e-9);
            if let Some(before) = previous.get(&vehicle.id()) {
                let limit = vehicle.acceleration() * brake_factor * dt + 1e-9;
                assert!((speed - before).abs() <= limit);
            }
            assert!(vehicle.direction().carries(vehicle.lane()));
            current.insert(vehicle.id(), speed);
        }
        previous = current;
    }
    assert!(sim.passed_count() > 0);
}

#[test]
fn every_vehicle_passes_and_leaves() {
    let mut sim = Simulation::with_seed(quiet_config(), 5).unwrap();
    place(&mut sim, VehicleClass::Normal, 0, 0.0);
    place(&mut sim, VehicleClass::Truck, 1, 100.0);
    place(&mut sim, VehicleClass::Sports, 2, 1400.0);
    place(&mut sim, VehicleClass::Ambulance, 3, 1300.0);
    place(&mut sim, VehicleClass::Normal, 0, -200.0);

    for _ in 0..1600 {
        sim.step(0.05);
    }
    assert_eq!(sim.iter_vehicles().count(), 0);
    assert_eq!(sim.passed_count(), 5);
    assert_eq!(sim.metrics().passed_vehicles, 5);
}

#[test]
fn standard_vehicles_do_not_cross_on_red() {
    let mut sim = Simulation::with_seed(quiet_config(), 9).unwrap();
    let config = sim.config().clone();

    // Wait for the light to turn red for the road
    while sim.light().phase() != LightPhase::NsGreen {
        sim.step(0.05);
    }
    let eastbound = place(&mut sim, VehicleClass::Normal, 1, 350.0);
    let westbound = place(&mut sim, VehicleClass::Truck, 2, 1050.0);

    while sim.light().phase() == LightPhase::NsGreen {
        sim.step(0.05);
        for id in [eastbound, westbound] {
            let vehicle = sim.get_vehicle(id).unwrap();
            assert!(vehicle.light_distance(&config.road) > 0.0);
            assert!(!vehicle.has_passed_intersection());
        }
    }
    for id in [eastbound, westbound] {
        assert!(sim.get_vehicle(id).unwrap().is_stopped_at_light());
        assert!(sim.get_vehicle(id).unwrap().speed() < 1e-9);
    }
}

#[test]
fn light_cycles_with_fixed_durations() {
    let mut sim = Simulation::with_seed(quiet_config(), 2).unwrap();
    let timing = sim.config().light;
    let mut phase = sim.light().phase();
    let mut entered: f64 = 0.0;
    let mut transitions = 0;

    for _ in 0..4000 {
        sim.step(0.01);
        let next = sim.light().phase();
        if next != phase {
            assert_eq!(phase.next(), next);
            let expected = if phase.is_green() { timing.green } else { timing.yellow };
            let lasted = sim.simulation_time() - entered;
            assert!((lasted - expected).abs() < 0.02 + 1e-9);
            entered = sim.simulation_time();
            phase = next;
            transitions += 1;
        }
    }
    assert!(transitions >= 4);
}

#[test]
fn pedestrians_progress_monotonically() {
    let mut config = quiet_config();
    config.spawning.pedestrian_interval = 0.5;
    config.spawning.pedestrian_chance = 1.0;
    let mut sim = Simulation::with_seed(config, 11).unwrap();
    let rank = |state: CrossingState| match state {
        CrossingState::Waiting => 0,
        CrossingState::Crossing => 1,
        CrossingState::Done => 2,
    };

    let mut seen = HashMap::new();
    let mut crossed = 0;
    for _ in 0..1200 {
        sim.step(0.05);
        for ped in sim.iter_pedestrians() {
            // Finished pedestrians are removed in the step they finish
            assert_ne!(ped.state(), CrossingState::Done);
            let state = rank(ped.state());
            let before = seen.insert(ped.id(), state).unwrap_or(0);
            assert!(state >= before);
        }
        crossed = crossed.max(seen.values().filter(|s| **s == 1).count());
    }
    assert!(crossed > 0);
}

#[test]
fn pedestrians_only_start_while_road_is_stopped() {
    let mut sim = Simulation::with_seed(quiet_config(), 3).unwrap();
    let ped = sim.add_pedestrian(Side::Near, Direction::Right);

    loop {
        sim.step(0.1);
        if sim.light().phase() == LightPhase::NsGreen {
            break;
        }
        assert_eq!(sim.get_pedestrian(ped).unwrap().state(), CrossingState::Waiting);
    }
    assert_eq!(sim.get_pedestrian(ped).unwrap().state(), CrossingState::Crossing);

    for _ in 0..100 {
        sim.step(0.1);
    }
    assert!(sim.get_pedestrian(ped).is_none());
    assert_eq!(sim.iter_pedestrians().count(), 0);
}

#[test]
fn refused_lane_change_leaves_vehicle_untouched() {
    let mut sim = Simulation::with_seed(quiet_config(), 4).unwrap();
    let a = place(&mut sim, VehicleClass::Normal, 0, 300.0);
    place(&mut sim, VehicleClass::Truck, 1, 320.0);
    let before = sim.get_vehicle(a).unwrap().clone();

    assert_eq!(
        sim.change_lane(a, 1),
        Err(SimError::LaneChange(LaneChangeError::Blocked))
    );
    assert_eq!(
        sim.change_lane(a, 2),
        Err(SimError::LaneChange(LaneChangeError::OutsideLaneGroup))
    );
    let after = sim.get_vehicle(a).unwrap();
    assert_eq!(after.lane(), before.lane());
    assert_eq!(after.position(), before.position());
    assert_approx_eq!(after.lane_change_cooldown(), 0.0);
}

#[test]
fn close_follower_targets_below_leader_speed() {
    let mut sim = Simulation::with_seed(quiet_config(), 6).unwrap();
    let a = place(&mut sim, VehicleClass::Normal, 0, 100.0);
    let b = place(&mut sim, VehicleClass::Normal, 0, 170.0);
    sim.set_vehicle_speed(a, 50.0).unwrap();
    sim.set_vehicle_speed(b, 30.0).unwrap();
    let gap = sim
        .get_vehicle(a)
        .unwrap()
        .gap_to(sim.get_vehicle(b).unwrap());
    assert_approx_eq!(gap, 30.0);

    sim.step(0.05);
    let follower = sim.get_vehicle(a).unwrap();
    assert_approx_eq!(follower.target_speed(), 27.0);
    assert!(follower.speed() < 50.0);
}

#[test]
fn later_vehicles_observe_moved_leaders() {
    // Leader updated first: the follower sees where it moved to this tick
    let mut sim = Simulation::with_seed(quiet_config(), 6).unwrap();
    let leader = place(&mut sim, VehicleClass::Normal, 0, 250.0);
    let follower = place(&mut sim, VehicleClass::Normal, 0, 100.0);
    sim.step(1.0);
    assert_approx_eq!(sim.get_vehicle(leader).unwrap().pos_rear(), 370.0);
    assert_approx_eq!(sim.get_vehicle(follower).unwrap().target_speed(), 120.0);

    // Follower updated first: it sees the leader where it started
    let mut sim = Simulation::with_seed(quiet_config(), 6).unwrap();
    let follower = place(&mut sim, VehicleClass::Normal, 0, 100.0);
    place(&mut sim, VehicleClass::Normal, 0, 250.0);
    sim.step(1.0);
    assert_approx_eq!(sim.get_vehicle(follower).unwrap().target_speed(), 96.0);
}

#[test]
fn cleared_vehicle_follows_its_new_lane_in_the_same_tick() {
    let mut sim = Simulation::with_seed(quiet_config(), 8).unwrap();
    let ambulance = place(&mut sim, VehicleClass::Ambulance, 0, 100.0);
    let blocker = place(&mut sim, VehicleClass::Normal, 0, 250.0);
    let slow = place(&mut sim, VehicleClass::Normal, 1, 400.0);
    sim.set_vehicle_speed(slow, 10.0).unwrap();

    sim.step(0.05);
    assert_eq!(sim.get_vehicle(ambulance).unwrap().lane(), 0);
    let blocker = sim.get_vehicle(blocker).unwrap();
    assert_eq!(blocker.lane(), 1);
    // Gap of 110 to the slow vehicle: matches its speed
    assert_approx_eq!(blocker.target_speed(), 10.0);
}

#[test]
fn ambulance_clears_its_lane() {
    let mut sim = Simulation::with_seed(quiet_config(), 8).unwrap();
    let ambulance = place(&mut sim, VehicleClass::Ambulance, 0, 100.0);
    let blocker = place(&mut sim, VehicleClass::Normal, 0, 250.0);

    sim.step(0.05);
    assert_eq!(sim.get_vehicle(blocker).unwrap().lane(), 1);
    assert_eq!(sim.get_vehicle(ambulance).unwrap().lane(), 0);
    assert_approx_eq!(
        sim.get_vehicle(ambulance).unwrap().target_speed(),
        sim.config().classes.ambulance.max_speed
    );
}

#[test]
fn spawning_respects_entry_buffer() {
    let mut sim = Simulation::with_seed(busy_config(), 13).unwrap();
    for _ in 0..400 {
        sim.step(0.05);
        let road = sim.config().road;
        for dir in Direction::ALL {
            for lane in dir.lanes() {
                let at_entry = sim
                    .iter_vehicles()
                    .filter(|v| v.lane() == lane && v.direction() == dir)
                    .filter(|v| (v.pos_rear() - road.entry_x(dir)).abs() < 1e-9)
                    .count();
                assert!(at_entry <= 1);
            }
        }
    }

    let mut sim = Simulation::with_seed(quiet_config(), 13).unwrap();
    let first = sim.spawn_vehicle(VehicleClass::Truck, 3, Direction::Left).unwrap();
    assert!(first.is_some());
    assert_eq!(sim.spawn_vehicle(VehicleClass::Truck, 3, Direction::Left), Ok(None));
    assert!(sim.is_entry_clear(2, Direction::Left));
}

#[test]
fn reset_clears_everything() {
    let mut sim = Simulation::with_seed(busy_config(), 21).unwrap();
    sim.set_adaptive_light(true);
    for _ in 0..1000 {
        sim.step(0.05);
    }
    sim.reset();

    let metrics = sim.metrics();
    assert_eq!(metrics.active_vehicles, sim.config().spawning.initial_vehicles);
    assert_eq!(metrics.passed_vehicles, 0);
    assert_eq!(metrics.active_pedestrians, 0);
    assert_eq!(metrics.light_phase, LightPhase::EwGreen);
    assert!(!metrics.adaptive_light);
    assert_approx_eq!(metrics.simulation_time, 0.0);
}

#[test]
fn empty_simulation_metrics() {
    let sim = Simulation::with_seed(quiet_config(), 0).unwrap();
    let metrics = sim.metrics();
    assert_eq!(metrics.active_vehicles, 0);
    assert_approx_eq!(metrics.average_speed, 0.0);
    assert_eq!(metrics.queue_length, 0);
}

#[test]
fn seeded_runs_are_reproducible() {
    let run = || {
        let mut sim = Simulation::with_seed(busy_config(), 77).unwrap();
        for _ in 0..500 {
            sim.step(0.05);
        }
        sim.snapshot()
    };
    let a = run();
    let b = run();
    assert_eq!(a.vehicles.len(), b.vehicles.len());
    for (a, b) in a.vehicles.iter().zip(&b.vehicles) {
        assert_eq!(a.class, b.class);
        assert_eq!(a.lane, b.lane);
        assert_approx_eq!(a.x, b.x);
    }
    assert_eq!(a.metrics, b.metrics);
}

#[test]
fn snapshot_reflects_state() {
    let mut sim = Simulation::with_seed(quiet_config(), 1).unwrap();
    let id = place(&mut sim, VehicleClass::Sports, 1, 200.0);
    sim.add_pedestrian(Side::Far, Direction::Left);
    sim.step(0.05);

    let snapshot = sim.snapshot();
    assert_eq!(snapshot.frame, 1);
    assert_eq!(snapshot.vehicles.len(), 1);
    assert_eq!(snapshot.vehicles[0].id, id);
    assert_eq!(snapshot.vehicles[0].class, VehicleClass::Sports);
    assert_eq!(snapshot.pedestrians.len(), 1);
    assert_eq!(snapshot.pedestrians[0].state, CrossingState::Waiting);
    assert_eq!(snapshot.light.phase, LightPhase::EwGreen);
}

#[cfg(feature = "serde")]
#[test]
fn snapshot_serializes_to_json() {
    let sim = Simulation::with_seed(SimConfig::default(), 1).unwrap();
    let json = sim.snapshot_json().unwrap();
    assert_eq!(json["vehicles"].as_array().map(Vec::len), Some(10));
    assert_eq!(json["light"]["phase"], "ew_green");
}
