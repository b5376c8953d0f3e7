use approx::assert_relative_eq;

use control::{ChargerType, SessionConfig, SimulationDriver};
use electrical::{LimitingFactor, PackConfig, SystemVoltage};
use simcore::Model;

fn quiet_pack() -> PackConfig {
    PackConfig::default().with_temperature_jitter(false)
}

fn small_pack() -> PackConfig {
    // one parallel string of 108 cells
    quiet_pack().with_capacity_kwh(5.0)
}

#[test]
fn c_rate_bound_session_tapers_near_eighty_percent() {
    let pack = quiet_pack()
        .with_system_voltage(SystemVoltage::V400)
        .with_capacity_kwh(80.0)
        .with_max_c_rate(1.5)
        .with_cooling_power_kw(10.0);
    let mut driver = SimulationDriver::new(SessionConfig::new(pack, ChargerType::Fast)).unwrap();
    assert_relative_eq!(driver.pack().total_capacity_ah(), 200.0);

    let mut tapered_at = None;
    for _ in 0..20_000 {
        let soc_before = driver.pack().average_state_of_charge();
        driver.tick();
        if driver.last_current_a() < 300.0 - 1e-6 {
            tapered_at = Some(soc_before);
            break;
        }
        assert_eq!(driver.pack().limiting_factor(), Some(LimitingFactor::CRate));
    }

    let soc = tapered_at.expect("current never dropped below the C-rate ceiling");
    assert!(soc > 78.0 && soc < 83.0, "taper began at {soc:.2}%");
    assert_eq!(driver.pack().limiting_factor(), Some(LimitingFactor::StateOfCharge));
}

#[test]
fn heater_warms_a_cold_pack() {
    let cold = quiet_pack()
        .with_initial_temperature_c(-5.0)
        .with_ambient_temperature_c(-5.0);

    let mut heated = SimulationDriver::new(SessionConfig::new(
        cold.clone().with_battery_heating(true),
        ChargerType::Fast,
    ))
    .unwrap();
    let mut unheated = SimulationDriver::new(SessionConfig::new(cold, ChargerType::Fast)).unwrap();

    let mut previous = heated.pack().average_temperature();
    for _ in 0..10 {
        heated.tick();
        unheated.tick();
        let now = heated.pack().average_temperature();
        assert!(now > previous, "heated pack cooled: {previous} -> {now}");
        previous = now;
        assert!(heated.pack().is_heating());
    }

    let heated_rise = heated.pack().average_temperature() + 5.0;
    let unheated_rise = unheated.pack().average_temperature() + 5.0;
    assert!(heated_rise > 0.05);
    assert!(unheated_rise.abs() < 1e-3);
    assert!(!unheated.pack().is_heating());
}

#[test]
fn reset_restores_the_initial_session() {
    let mut driver = SimulationDriver::new(SessionConfig::new(quiet_pack(), ChargerType::Standard)).unwrap();
    let initial = driver.snapshot();
    let initial_points = driver.data_points().to_vec();

    driver.start();
    for _ in 0..50 {
        driver.advance(1.0);
    }
    driver.stop();
    assert!(driver.data_points().len() > 1);

    driver.reset();
    assert_eq!(driver.snapshot(), initial);
    assert_eq!(driver.data_points(), initial_points.as_slice());
    assert_eq!(driver.data_points().len(), 1);
    assert_eq!(driver.elapsed_sim_seconds(), 0.0);
}

#[test]
fn identical_configs_produce_identical_runs() {
    let config = SessionConfig::new(PackConfig::default().with_seed(7), ChargerType::Fast);
    let mut a = SimulationDriver::new(config.clone()).unwrap();
    let mut b = SimulationDriver::new(config).unwrap();

    for _ in 0..500 {
        a.tick();
        b.tick();
    }
    assert_eq!(a.snapshot(), b.snapshot());
    assert_eq!(a.data_points(), b.data_points());

    // jitter stream restarts on reset as well
    let first_run = a.snapshot();
    a.reset();
    for _ in 0..500 {
        a.tick();
    }
    assert_eq!(a.snapshot(), first_run);
}

#[test]
fn stalled_session_does_not_grow_history() {
    // too hot to accept any current for well over a thousand ticks
    let pack = quiet_pack()
        .with_initial_temperature_c(60.0)
        .with_cooling_power_kw(0.0)
        .with_initial_soc(0.5);
    let mut driver = SimulationDriver::new(SessionConfig::new(pack, ChargerType::Fast)).unwrap();

    for _ in 0..1200 {
        driver.tick();
    }
    assert_eq!(driver.last_current_a(), 0.0);
    assert_eq!(driver.pack().limiting_factor(), Some(LimitingFactor::HighTemperature));
    assert_eq!(driver.data_points().len(), 1);
}

#[test]
fn full_charge_stops_the_session_and_bounds_history() {
    let mut driver = SimulationDriver::new(SessionConfig::new(small_pack(), ChargerType::Fast))
        .unwrap()
        .with_history_capacity(8);
    driver.start();

    let mut calls = 0;
    while driver.is_running() && calls < 10_000 {
        driver.advance(1.0);
        calls += 1;
    }

    assert!(!driver.is_running());
    assert!(driver.pack().average_state_of_charge() >= 99.5);
    assert!(driver.data_points().len() <= 8);
    assert_eq!(driver.data_points()[0].time_s, 0.0);

    let times: Vec<f64> = driver.data_points().iter().map(|p| p.time_s).collect();
    assert!(times.windows(2).all(|w| w[0] < w[1]));

    // stopped sessions ignore wall time
    let elapsed = driver.elapsed_sim_seconds();
    assert_eq!(driver.advance(5.0), 0);
    assert_eq!(driver.elapsed_sim_seconds(), elapsed);
}

#[test]
fn replacing_the_config_rebuilds_the_pack() {
    let mut driver = SimulationDriver::new(SessionConfig::new(quiet_pack(), ChargerType::Fast)).unwrap();
    driver.start();
    driver.advance(2.0);

    let bigger = quiet_pack().with_system_voltage(SystemVoltage::V800);
    driver
        .replace_config(SessionConfig::new(bigger, ChargerType::Standard))
        .unwrap();
    assert_eq!(driver.pack().cells_in_series(), 216);
    assert_eq!(driver.charger(), ChargerType::Standard);
    assert_eq!(driver.elapsed_sim_seconds(), 0.0);
    assert_eq!(driver.data_points().len(), 1);

    let broken = quiet_pack().with_capacity_kwh(-1.0);
    assert!(
        driver
            .replace_config(SessionConfig::new(broken, ChargerType::Fast))
            .is_err()
    );
    assert_eq!(driver.pack().cells_in_series(), 216);
}
