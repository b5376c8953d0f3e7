use control::{ChargerType, SessionConfig, SimulationDriver};
use electrical::{PackConfig, SystemVoltage};
use plotters::prelude::*;

fn draw_series(
    filename: &str,
    title: &str,
    x_label: &str,
    y_label: &str,
    x: &[f64],
    y: &[f64],
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(filename, (1024, 768)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_max = x.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let y_min = y.iter().cloned().fold(f64::INFINITY, f64::min);
    let y_max = y.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("Arial", 28))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..x_max.max(1.0), y_min.min(0.0)..y_max * 1.05)?;

    chart.configure_mesh().x_desc(x_label).y_desc(y_label).draw()?;

    chart.draw_series(LineSeries::new(
        x.iter().cloned().zip(y.iter().cloned()),
        &BLUE,
    ))?;

    root.present()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let pack = PackConfig::default()
        .with_system_voltage(SystemVoltage::V800)
        .with_capacity_kwh(90.0)
        .with_max_car_power_kw(Some(270.0));

    let mut driver = SimulationDriver::new(SessionConfig::new(pack, ChargerType::Fast))?;
    driver.start();
    while driver.is_running() {
        driver.advance(1.0);
    }

    let points = driver.data_points();
    let soc: Vec<f64> = points.iter().map(|p| p.soc_percent).collect();
    let power: Vec<f64> = points.iter().map(|p| p.power_kw).collect();
    let minutes: Vec<f64> = points.iter().map(|p| p.time_s / 60.0).collect();

    draw_series("charge_power.png", "Charging power", "SoC (%)", "Power (kW)", &soc, &power)?;
    draw_series("charge_soc.png", "State of charge", "Time (min)", "SoC (%)", &minutes, &soc)?;

    println!(
        "Charged to {:.1}% in {:.1} min, wrote charge_power.png and charge_soc.png",
        driver.pack().average_state_of_charge(),
        driver.elapsed_sim_seconds() / 60.0
    );
    Ok(())
}
