#![cfg(not(tarpaulin_include))]
#![cfg(feature = "render")]
use crate::entity::Trace;
use plotters::prelude::*;

/// Styling options for rendering a computed trace.
///
/// The axis bounds default to the data extents (padded the way the mesh
/// expects); a graph entity's configured `yrange` can be passed through
/// `y_bounds` to pin the vertical window instead.
#[derive(Clone, Debug)]
pub struct PlotOptions {
    /// Title displayed at the top of the chart
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the chart in pixels
    pub width: u32,

    /// Height of the chart in pixels
    pub height: u32,

    /// Fixed vertical window; `None` fits the data
    pub y_bounds: Option<[f64; 2]>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            title: "Graph".to_string(),
            x_label: "x".to_string(),
            y_label: "y".to_string(),
            width: 800,
            height: 600,
            y_bounds: None,
        }
    }
}

/// Renders a trace to a PNG file.
///
/// The real series is drawn as a blue line; samples that carried a nonzero
/// imaginary component are drawn by their real part as a red line. An empty
/// trace still produces a valid (blank) chart.
///
/// # Arguments
/// * `trace` - The computed series pair from the graph engine
/// * `options` - Chart styling options
/// * `path` - File path where the chart should be saved
///
/// # Returns
/// * A Result indicating success or failure
pub fn render_graph(
    trace: &Trace,
    options: &PlotOptions,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let all_x = trace.real.x.iter().chain(trace.complex.x.iter());
    let all_y = trace.real.y.iter().chain(trace.complex.y.iter());
    let (x_min, x_max) = extent(all_x);
    let (y_min, y_max) = match options.y_bounds {
        Some([lo, hi]) => (lo, hi),
        None => extent(all_y),
    };

    let mut chart = ChartBuilder::on(&root)
        .caption(&options.title, ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(40)
        .build_cartesian_2d(x_min..x_max + 1.0, y_min..y_max + 1.0)?;

    chart
        .configure_mesh()
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .draw()?;

    if !trace.real.is_empty() {
        chart.draw_series(LineSeries::new(
            trace.real.x.iter().zip(trace.real.y.iter()).map(|(&x, &y)| (x, y)),
            &BLUE,
        ))?;
    }

    if !trace.complex.is_empty() {
        chart.draw_series(LineSeries::new(
            trace
                .complex
                .x
                .iter()
                .zip(trace.complex.y.iter())
                .map(|(&x, &y)| (x, y)),
            &RED,
        ))?;
    }

    root.present()?;

    Ok(())
}

/// Renders a trace and returns the PNG image data as bytes.
///
/// Renders into a temporary directory and reads the file back, so nothing is
/// left on disk.
pub fn render_graph_png(
    trace: &Trace,
    options: &PlotOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("graph.png");
    let path = path.to_str().ok_or("temporary path is not valid UTF-8")?;

    render_graph(trace, options, path)?;

    let png_data = std::fs::read(path)?;
    Ok(png_data)
}

fn extent<'a, I: Iterator<Item = &'a f64>>(values: I) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    if min > max {
        // no data at all
        (0.0, 100.0)
    } else {
        (min, max)
    }
}
