// Test flight log persistence and the plotting entry point

use std::path::PathBuf;

use crazyflie_waypoints::plot::render_flight_log;
use crazyflie_waypoints::{Error, FlightLog, LogRecord};
use plotters::prelude::*;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("{}_{}.npy", name, std::process::id()))
}

#[test]
fn saved_log_loads_bit_for_bit() -> Result<(), Box<dyn std::error::Error>> {
    let log: FlightLog = (0..100)
        .map(|i| {
            let t = i as f64;
            LogRecord {
                timestamp: 10.0 * t,
                x: (0.013 * t).sin() as f32 as f64,
                y: (0.021 * t).cos() as f32 as f64,
                z: 0.4f32 as f64 - 1e-7 * t,
                target_x: 0.5f32 as f64,
                target_y: 0.0,
                target_z: 0.4f32 as f64,
            }
        })
        .collect();

    let path = temp_path("flight_log_roundtrip");
    log.save(&path)?;
    let loaded = FlightLog::load(&path)?;
    std::fs::remove_file(&path)?;

    assert_eq!(loaded.len(), log.len());
    for (a, b) in loaded.records().iter().zip(log.records()) {
        assert_eq!(a.timestamp.to_bits(), b.timestamp.to_bits());
        assert_eq!(a.x.to_bits(), b.x.to_bits());
        assert_eq!(a.y.to_bits(), b.y.to_bits());
        assert_eq!(a.z.to_bits(), b.z.to_bits());
        assert_eq!(a.target_z.to_bits(), b.target_z.to_bits());
    }

    Ok(())
}

#[test]
fn empty_log_round_trips() -> Result<(), Box<dyn std::error::Error>> {
    let path = temp_path("flight_log_empty");
    FlightLog::new().save(&path)?;
    let loaded = FlightLog::load(&path)?;
    std::fs::remove_file(&path)?;

    assert!(loaded.is_empty());

    Ok(())
}

#[test]
fn missing_log_is_an_error() {
    let result = FlightLog::load(temp_path("flight_log_missing"));
    assert!(matches!(result, Err(Error::Npy(_))));
}

#[test]
fn plotting_a_missing_log_is_an_error() {
    let result = render_flight_log(&temp_path("plot_missing"), &std::env::temp_dir());
    assert!(result.is_err());
}

// Figures carry text, which needs a system font
fn fonts_available() -> bool {
    let mut buffer = vec![0u8; 32 * 32 * 3];
    let area = BitMapBackend::with_buffer(&mut buffer, (32, 32)).into_drawing_area();
    area.draw_text("x", &("sans-serif", 10).into_text_style(&area), (0, 0))
        .is_ok()
}

fn hover_log(records: usize) -> FlightLog {
    (0..records)
        .map(|i| LogRecord {
            timestamp: 10.0 * i as f64,
            x: 0.01 * i as f64,
            y: 0.0,
            z: 0.4 - 0.001 * i as f64,
            target_x: 0.5,
            target_y: 0.0,
            target_z: 0.4,
        })
        .collect()
}

fn assert_png(path: &std::path::Path) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    assert!(bytes.len() > 8, "{} is empty", path.display());
    assert_eq!(&bytes[1..4], b"PNG");
    Ok(())
}

#[test]
fn renders_both_figures_next_to_the_log() -> Result<(), Box<dyn std::error::Error>> {
    if !fonts_available() {
        eprintln!("no system font, skipping figure rendering");
        return Ok(());
    }

    for (name, records) in [("render_hover", 50), ("render_single", 1)] {
        let dir = std::env::temp_dir().join(format!("{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir)?;
        let log_path = dir.join("flight.npy");
        hover_log(records).save(&log_path)?;

        let (position, trajectory) = render_flight_log(&log_path, &dir)?;

        assert_eq!(position, dir.join("flight_position.png"));
        assert_eq!(trajectory, dir.join("flight_trajectory.png"));
        assert_png(&position)?;
        assert_png(&trajectory)?;

        std::fs::remove_dir_all(&dir)?;
    }

    Ok(())
}
