//! PNG charts of a finished run
//!
//! Three panels stacked vertically share the elapsed-time axis: memory, CPU,
//! and I/O read/write together.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::sample::{Sample, SampleSeries};

/// Chart filename used when no name can be derived from the command.
pub const DEFAULT_CHART_FILENAME: &str = "procwatch.png";

/// `<command-basename>-<YYYYMMDD-HHMMSS>.png` for the given command and time.
pub fn default_chart_filename(command: &[String], now: DateTime<Local>) -> String {
    let base = command
        .first()
        .and_then(|program| Path::new(program).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty());

    match base {
        Some(name) => format!("{}-{}.png", name, now.format("%Y%m%d-%H%M%S")),
        None => DEFAULT_CHART_FILENAME.to_string(),
    }
}

struct Line {
    label: &'static str,
    color: RGBColor,
    value: fn(&Sample) -> f64,
}

struct Panel {
    y_label: &'static str,
    lines: Vec<Line>,
}

fn panels() -> [Panel; 3] {
    [
        Panel {
            y_label: "Memory (MB)",
            lines: vec![Line { label: "Memory (MB)", color: BLUE, value: |s| s.memory_mb }],
        },
        Panel {
            y_label: "CPU (%)",
            lines: vec![Line { label: "CPU (%)", color: RED, value: |s| s.cpu_percent }],
        },
        Panel {
            y_label: "I/O (MB)",
            lines: vec![
                Line { label: "I/O Read (MB)", color: GREEN, value: |s| s.io_read_mb },
                Line { label: "I/O Write (MB)", color: MAGENTA, value: |s| s.io_write_mb },
            ],
        },
    ]
}

/// Draws sample series to PNG files.
#[derive(Debug, Clone)]
pub struct SeriesRenderer {
    width: u32,
    height: u32,
    directory: Option<PathBuf>,
}

impl Default for SeriesRenderer {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl SeriesRenderer {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            width: config.width,
            height: config.height,
            directory: config.directory.clone(),
        }
    }

    /// Where the chart for `command` goes when no explicit path is given.
    pub fn output_path_for(&self, command: &[String], now: DateTime<Local>) -> PathBuf {
        let filename = default_chart_filename(command, now);
        match &self.directory {
            Some(dir) => dir.join(filename),
            None => PathBuf::from(filename),
        }
    }

    /// Draw `series` into a PNG at `path`.
    pub fn render(&self, series: &SampleSeries, path: &Path) -> RenderResult<()> {
        if series.is_empty() {
            return Err(RenderError::EmptySeries);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RenderError::Output {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        }

        let root = BitMapBackend::new(path, (self.width, self.height)).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;

        let x_max = series.duration_seconds().max(1e-3);
        let panels = panels();
        let areas = root.split_evenly((panels.len(), 1));
        for (index, (panel, area)) in panels.iter().zip(areas.iter()).enumerate() {
            let is_bottom = index + 1 == panels.len();
            draw_panel(area, panel, series, x_max, is_bottom)?;
        }

        root.present().map_err(|e| RenderError::Output {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        info!("Chart written to {}", path.display());
        Ok(())
    }
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    panel: &Panel,
    series: &SampleSeries,
    x_max: f64,
    is_bottom: bool,
) -> RenderResult<()> {
    let y_max = panel
        .lines
        .iter()
        .flat_map(|line| series.iter().map(line.value))
        .fold(0.0_f64, f64::max);
    let y_max = if y_max > 0.0 { y_max * 1.05 } else { 1.0 };

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..x_max, 0.0..y_max)
        .map_err(draw_error)?;

    let mut mesh = chart.configure_mesh();
    mesh.y_desc(panel.y_label);
    if is_bottom {
        mesh.x_desc("Time (s)");
    }
    mesh.draw().map_err(draw_error)?;

    for line in &panel.lines {
        let color = line.color;
        let points = series.iter().map(|sample| (sample.elapsed_seconds, (line.value)(sample)));
        chart
            .draw_series(LineSeries::new(points, &color))
            .map_err(draw_error)?
            .label(line.label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()
        .map_err(draw_error)?;

    Ok(())
}

fn draw_error(err: impl std::fmt::Display) -> RenderError {
    RenderError::Draw { reason: err.to_string() }
}
