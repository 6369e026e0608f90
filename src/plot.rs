//! # Flight log plots
//!
//! Two PNG figures are rendered from a flight log, next to each other and named after the log file stem:
//!  - `<stem>_position.png`: x, y and z against the sample index, three stacked charts, actual in red and target
//!    dashed in blue
//!  - `<stem>_trajectory.png`: the actual and target 3D trajectories
//!
//! Rendering is a pure function of the log, nothing here talks to a vehicle.

use std::ops::Range;
use std::path::{Path, PathBuf};

use log::info;
use plotters::prelude::*;

use crate::flight_log::{Columns, FlightLog};
use crate::{Error, Result};

const POSITION_SIZE: (u32, u32) = (1200, 900);
const TRAJECTORY_SIZE: (u32, u32) = (1000, 900);

const ACTUAL_COLOR: RGBColor = RED;
const TARGET_COLOR: RGBColor = BLUE;

const DASH_SIZE: i32 = 6;
const DASH_SPACING: i32 = 4;

fn plot_error<E: std::fmt::Display>(e: E) -> Error {
    Error::Plot(e.to_string())
}

/// Value range covering every series, padded so that flat series stay visible
pub fn value_range<'a>(series: impl IntoIterator<Item = &'a [f64]>) -> Range<f64> {
    let (min, max) = series
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        });

    if min > max {
        return -1.0..1.0;
    }

    let span = max - min;
    let padding = if span < 1e-6 { 0.5 } else { span * 0.15 };
    (min - padding)..(max + padding)
}

fn indexed(values: &[f64]) -> Vec<(f64, f64)> {
    values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as f64, v))
        .collect()
}

/// Paths of the two figures rendered for `log_path` into `output_dir`
pub fn figure_paths(log_path: &Path, output_dir: &Path) -> (PathBuf, PathBuf) {
    let stem = log_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "flight".to_owned());

    (
        output_dir.join(format!("{}_position.png", stem)),
        output_dir.join(format!("{}_trajectory.png", stem)),
    )
}

/// Render x, y and z, actual against target, as three stacked charts
pub fn render_position(columns: &Columns, output: &Path) -> Result<()> {
    let root = BitMapBackend::new(output, POSITION_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let axes = [
        ("x", &columns.x, &columns.target_x),
        ("y", &columns.y, &columns.target_y),
        ("z", &columns.z, &columns.target_z),
    ];
    let samples = columns.t.len().max(1) as f64;

    for (area, (name, actual, target)) in root.split_evenly((3, 1)).iter().zip(axes) {
        let y_range = value_range([actual.as_slice(), target.as_slice()]);

        let mut chart = ChartBuilder::on(area)
            .margin(10)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(0f64..samples, y_range)
            .map_err(plot_error)?;

        chart
            .configure_mesh()
            .x_desc("sample")
            .y_desc(format!("{} (m)", name))
            .light_line_style(WHITE.mix(0.7))
            .draw()
            .map_err(plot_error)?;

        chart
            .draw_series(LineSeries::new(indexed(actual), ACTUAL_COLOR.stroke_width(2)))
            .map_err(plot_error)?
            .label(format!("{} actual", name))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], ACTUAL_COLOR.stroke_width(2)));

        chart
            .draw_series(DashedLineSeries::new(
                indexed(target),
                DASH_SIZE,
                DASH_SPACING,
                TARGET_COLOR.stroke_width(2),
            ))
            .map_err(plot_error)?
            .label(format!("{} target", name))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], TARGET_COLOR.stroke_width(2)));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_error)?;
    }

    root.present().map_err(plot_error)?;
    Ok(())
}

/// Render the actual and target 3D trajectories
///
/// Altitude is the vertical axis of the figure.
pub fn render_trajectory(columns: &Columns, output: &Path) -> Result<()> {
    let root = BitMapBackend::new(output, TRAJECTORY_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let x_range = value_range([columns.x.as_slice(), columns.target_x.as_slice()]);
    let y_range = value_range([columns.y.as_slice(), columns.target_y.as_slice()]);
    let z_range = value_range([columns.z.as_slice(), columns.target_z.as_slice()]);

    // Plotters draws its second axis vertically, altitude goes there
    let mut chart = ChartBuilder::on(&root)
        .caption("trajectory: x, y, altitude (z)", ("sans-serif", 24))
        .margin(20)
        .build_cartesian_3d(x_range, z_range, y_range)
        .map_err(plot_error)?;

    chart.with_projection(|mut projection| {
        projection.yaw = 0.6;
        projection.pitch = 0.35;
        projection.scale = 0.85;
        projection.into_matrix()
    });

    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.1))
        .max_light_lines(3)
        .draw()
        .map_err(plot_error)?;

    let actual = points_3d(&columns.x, &columns.y, &columns.z);
    let target = points_3d(&columns.target_x, &columns.target_y, &columns.target_z);

    chart
        .draw_series(LineSeries::new(actual, ACTUAL_COLOR.stroke_width(2)))
        .map_err(plot_error)?
        .label("actual")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], ACTUAL_COLOR.stroke_width(2)));

    chart
        .draw_series(LineSeries::new(target, TARGET_COLOR.stroke_width(1)))
        .map_err(plot_error)?
        .label("target")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], TARGET_COLOR.stroke_width(1)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

fn points_3d(x: &[f64], y: &[f64], z: &[f64]) -> Vec<(f64, f64, f64)> {
    x.iter()
        .zip(y)
        .zip(z)
        .map(|((&x, &y), &z)| (x, z, y))
        .collect()
}

/// Load `log_path` and render both figures into `output_dir`
///
/// Returns the paths of the position and trajectory figures.
pub fn render_flight_log(log_path: &Path, output_dir: &Path) -> Result<(PathBuf, PathBuf)> {
    let log = FlightLog::load(log_path)?;
    info!("Loaded {} records from {}", log.len(), log_path.display());

    let columns = log.columns();
    let (position, trajectory) = figure_paths(log_path, output_dir);

    render_position(&columns, &position)?;
    info!("Position figure written to {}", position.display());

    render_trajectory(&columns, &trajectory)?;
    info!("Trajectory figure written to {}", trajectory.display());

    Ok((position, trajectory))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_pads_both_series() {
        let actual = [0.0, 0.4];
        let target = [0.5];
        let range = value_range([&actual[..], &target[..]]);
        assert!((range.start - -0.075).abs() < 1e-12);
        assert!((range.end - 0.575).abs() < 1e-12);
    }

    #[test]
    fn flat_series_get_a_visible_range() {
        let flat = [0.5; 10];
        let range = value_range([&flat[..]]);
        assert_eq!(range, 0.0..1.0);
    }

    #[test]
    fn empty_series_fall_back_to_unit_range() {
        let empty: [f64; 0] = [];
        assert_eq!(value_range([&empty[..]]), -1.0..1.0);
    }

    #[test]
    fn figures_are_named_after_the_log() {
        let (position, trajectory) = figure_paths(Path::new("logs/lab8_log.npy"), Path::new("out"));
        assert_eq!(position, Path::new("out/lab8_log_position.png"));
        assert_eq!(trajectory, Path::new("out/lab8_log_trajectory.png"));
    }

    #[test]
    fn altitude_is_the_vertical_axis() {
        assert_eq!(points_3d(&[1.0], &[2.0], &[3.0]), vec![(1.0, 3.0, 2.0)]);
    }
}
