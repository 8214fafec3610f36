//! Randomised checks of invariants which hold for any seed and time step.

use intersection_sim::{Direction, LightPhase, SimConfig, Simulation, VehicleClass};
use proptest::prelude::*;

fn busy_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.spawning.vehicle_interval = 0.4;
    config.spawning.pedestrian_interval = 1.0;
    config.spawning.pedestrian_chance = 0.7;
    config.lane_change.probability = 0.05;
    config
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn vehicles_stay_in_their_lane_group(seed in any::<u64>(), dt in 0.01f64..0.2) {
        let mut sim = Simulation::with_seed(busy_config(), seed).unwrap();
        for _ in 0..300 {
            sim.step(dt);
            for vehicle in sim.iter_vehicles() {
                prop_assert!(vehicle.direction().carries(vehicle.lane()));
                prop_assert!(vehicle.speed() >= 0.0);
                prop_assert!(vehicle.speed() <= vehicle.max_speed() + 1e-9);
            }
        }
    }

    #[test]
    fn passed_count_never_decreases(seed in any::<u64>(), scale in 0.25f64..4.0) {
        let mut sim = Simulation::with_seed(busy_config(), seed).unwrap();
        sim.set_time_scale(scale);
        let mut passed = 0;
        for _ in 0..400 {
            sim.step(0.05);
            let metrics = sim.metrics();
            prop_assert!(metrics.passed_vehicles >= passed);
            prop_assert_eq!(metrics.active_vehicles, sim.iter_vehicles().count());
            passed = metrics.passed_vehicles;
        }
    }

    #[test]
    fn light_timer_stays_within_phase(seed in any::<u64>(), dt in 0.01f64..0.5, adaptive in any::<bool>()) {
        let mut sim = Simulation::with_seed(busy_config(), seed).unwrap();
        sim.set_adaptive_light(adaptive);
        let mut phase = sim.light().phase();
        for _ in 0..300 {
            sim.step(dt);
            let light = sim.light();
            prop_assert!(light.timer() < light.phase_duration() + dt);
            if light.phase() != phase {
                prop_assert_eq!(phase.next(), light.phase());
                phase = light.phase();
            }
        }
    }

    #[test]
    fn spawning_into_occupied_entry_is_skipped(
        class_index in 0usize..4,
        dir_right in any::<bool>(),
        lane_index in 0usize..2,
    ) {
        let mut config = busy_config();
        config.spawning.initial_vehicles = 0;
        let mut sim = Simulation::with_seed(config, 1).unwrap();
        let class = VehicleClass::ALL[class_index];
        let dir = if dir_right { Direction::Right } else { Direction::Left };
        let lane = dir.lanes()[lane_index];

        prop_assert!(sim.spawn_vehicle(class, lane, dir).unwrap().is_some());
        prop_assert!(sim.spawn_vehicle(class, lane, dir).unwrap().is_none());
        prop_assert_eq!(sim.iter_vehicles().count(), 1);
        prop_assert_eq!(sim.light().phase(), LightPhase::EwGreen);
    }
}
