//! Static two-panel rendering of a radial wavefunction and its potential.
//!
//! The left panel shows `P(r)` over the solution mesh; the right panel shows
//! `V(r)` over a display mesh with a dashed line marking a bound-state energy.
//! Output is written to a PNG or SVG file chosen by the path's extension.

use std::{ ops::Range, path::Path };
use ndarray as nd;
use plotters::{ coord::Shift, prelude::* };
use crate::{ Arr1, error::{ LengthError, PlotError }, units::E_d };

/// Figure styling.
#[derive(Clone, Debug)]
pub struct PlotConfig {
    /// Image width in pixels (default: 1000)
    pub width: u32,
    /// Image height in pixels (default: 500)
    pub height: u32,
    /// Left panel title
    pub wf_title: String,
    /// Left panel legend entry
    pub wf_label: String,
    /// Left panel y-axis label
    pub wf_ylabel: String,
    /// Right panel title
    pub pot_title: String,
    /// Right panel y-axis label
    pub pot_ylabel: String,
    /// Shared x-axis label
    pub xlabel: String,
    /// Energy of the overlaid level (MeV; default: -2.224)
    pub energy_level: f64,
    /// Legend entry for the overlaid level
    pub energy_label: String,
    /// Wavefunction line color (default: matplotlib blue)
    pub wf_color: RGBColor,
    /// Potential line color (default: RED)
    pub pot_color: RGBColor,
    /// Energy level line color (default: BLUE)
    pub level_color: RGBColor,
    /// Background color (default: WHITE)
    pub background: RGBColor,
    /// Line width in pixels (default: 2)
    pub line_width: u32,
    /// Number of dashes in the energy level line (default: 40)
    pub dashes: usize,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
            wf_title: "Deuteron Wavefunction Solution".to_string(),
            wf_label: "Wavefunction P(r)".to_string(),
            wf_ylabel: "P(r)".to_string(),
            pot_title: "Potential Function V(r)".to_string(),
            pot_ylabel: "V(r) (MeV)".to_string(),
            xlabel: "r (fm)".to_string(),
            energy_level: E_d,
            energy_label: "Energy Level (-2.224 MeV & J=1^+)".to_string(),
            wf_color: RGBColor(31, 119, 180),
            pot_color: RED,
            level_color: BLUE,
            background: WHITE,
            line_width: 2,
            dashes: 40,
        }
    }
}

fn drawing<E: std::fmt::Display>(err: E) -> PlotError {
    PlotError::Drawing(err.to_string())
}

// axis range covering all values with 5% padding on either side; degenerate
// (e.g. identically zero) data gets a unit range
pub(crate) fn padded_range<I>(values: I) -> Range<f64>
where I: IntoIterator<Item = f64>
{
    let (lo, hi)
        = values.into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() { return -1.0..1.0; }
    let span = hi - lo;
    if span <= f64::EPSILON * (1.0 + lo.abs().max(hi.abs())) {
        return lo - 1.0..hi + 1.0;
    }
    lo - 0.05 * span..hi + 0.05 * span
}

// endpoints of `n` equal dashes along a horizontal line, with equal gaps
// between them
pub(crate) fn dash_segments(x0: f64, x1: f64, y: f64, n: usize)
    -> Vec<[(f64, f64); 2]>
{
    if n == 0 { return Vec::new(); }
    let period = (x1 - x0) / (2 * n - 1) as f64;
    (0..n)
        .map(|k| {
            let a = x0 + 2.0 * k as f64 * period;
            [(a, y), (a + period, y)]
        })
        .collect()
}

fn output_format(path: &Path) -> Result<&'static str, PlotError> {
    let ext
        = path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("png"),
        "svg" => Ok("svg"),
        _ => Err(PlotError::Format(ext)),
    }
}

/// Render the wavefunction `p` over `r` and the potential `v` over `r_disp`
/// side by side, writing to `path`.
///
/// Returns [`PlotError::Format`] for paths not ending in `.png` or `.svg`,
/// [`PlotError::Length`] for mismatched coordinate and value arrays, and
/// [`PlotError::Empty`] for empty series.
pub fn render<P, S, T, U, W>(
    path: P,
    r: &Arr1<S>,
    p: &Arr1<T>,
    r_disp: &Arr1<U>,
    v: &Arr1<W>,
    config: &PlotConfig,
) -> Result<(), PlotError>
where
    P: AsRef<Path>,
    S: nd::Data<Elem = f64>,
    T: nd::Data<Elem = f64>,
    U: nd::Data<Elem = f64>,
    W: nd::Data<Elem = f64>,
{
    let path = path.as_ref();
    let fmt = output_format(path)?;
    LengthError::check(r, p)?;
    LengthError::check(r_disp, v)?;
    if r.is_empty() || r_disp.is_empty() { return Err(PlotError::Empty); }

    let wf: Vec<(f64, f64)>
        = r.iter().zip(p).map(|(rk, pk)| (*rk, *pk)).collect();
    let pot: Vec<(f64, f64)>
        = r_disp.iter().zip(v).map(|(rk, vk)| (*rk, *vk)).collect();
    let size = (config.width, config.height);
    log::debug!("plot::render: writing {}", path.display());
    match fmt {
        "svg" => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            render_impl(root, &wf, &pot, config)
        },
        _ => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            render_impl(root, &wf, &pot, config)
        },
    }
}

fn render_impl<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    wf: &[(f64, f64)],
    pot: &[(f64, f64)],
    config: &PlotConfig,
) -> Result<(), PlotError>
{
    root.fill(&config.background).map_err(drawing)?;
    let panels = root.split_evenly((1, 2));
    if let Some(left) = panels.first() {
        draw_wavefunction(left, wf, config)?;
    }
    if let Some(right) = panels.get(1) {
        draw_potential(right, pot, config)?;
    }
    root.present().map_err(drawing)?;
    Ok(())
}

fn draw_wavefunction<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    wf: &[(f64, f64)],
    config: &PlotConfig,
) -> Result<(), PlotError>
{
    let xrange = padded_range(wf.iter().map(|(r, _)| *r));
    let yrange = padded_range(wf.iter().map(|(_, p)| *p));
    let mut chart
        = ChartBuilder::on(area)
        .caption(&config.wf_title, ("sans-serif", 20).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(xrange, yrange)
        .map_err(drawing)?;
    chart.configure_mesh()
        .x_desc(&config.xlabel)
        .y_desc(&config.wf_ylabel)
        .draw()
        .map_err(drawing)?;

    let color = config.wf_color;
    chart
        .draw_series(LineSeries::new(
            wf.iter().copied(),
            ShapeStyle::from(&color).stroke_width(config.line_width),
        ))
        .map_err(drawing)?
        .label(&config.wf_label)
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    chart.configure_series_labels()
        .background_style(config.background.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(drawing)?;
    Ok(())
}

fn draw_potential<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    pot: &[(f64, f64)],
    config: &PlotConfig,
) -> Result<(), PlotError>
{
    let xrange = padded_range(pot.iter().map(|(r, _)| *r));
    let yrange
        = padded_range(
            pot.iter().map(|(_, v)| *v)
                .chain(std::iter::once(config.energy_level))
        );
    let (x0, x1) = (xrange.start, xrange.end);
    let mut chart
        = ChartBuilder::on(area)
        .caption(&config.pot_title, ("sans-serif", 20).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(xrange, yrange)
        .map_err(drawing)?;
    chart.configure_mesh()
        .x_desc(&config.xlabel)
        .y_desc(&config.pot_ylabel)
        .draw()
        .map_err(drawing)?;

    let pot_color = config.pot_color;
    chart
        .draw_series(LineSeries::new(
            pot.iter().copied(),
            ShapeStyle::from(&pot_color).stroke_width(config.line_width),
        ))
        .map_err(drawing)?
        .label("V(r)")
        .legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + 20, y)], pot_color)
        });

    let level_color = config.level_color;
    let level_style = ShapeStyle::from(&level_color).stroke_width(config.line_width);
    chart
        .draw_series(
            dash_segments(x0, x1, config.energy_level, config.dashes)
                .into_iter()
                .map(|seg| PathElement::new(seg.to_vec(), level_style))
        )
        .map_err(drawing)?
        .label(&config.energy_label)
        .legend(move |(x, y)| {
            PathElement::new(vec![(x, y), (x + 8, y)], level_color)
        });
    chart.configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(config.background.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(drawing)?;
    Ok(())
}
