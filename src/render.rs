//! Three-panel plume chart: cumulative precipitation, precipitation intensity
//! distribution and temperature spread, with a run header and source footer.
//!
//! Rendering happens in two steps. [`plan_figure`] decides what each panel
//! shows from the data alone, so every panel succeeds or fails on its own.
//! [`render`] then draws the plan with plotters and encodes a PNG.

use std::error::Error as StdError;

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::Tz;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::constants::{
    AXIS_TICK_DATE_FORMAT, DATA_UNAVAILABLE_TEXT, HEADER_DATE_FORMAT, HEADER_UNAVAILABLE_TEXT,
    PLOT_ERROR_TEXT, PLOT_FONT_FAMILY,
};
use crate::fetch::FetchedTable;
use crate::run::ForecastRun;
use crate::summary::{
    cumulative_precip, intensity_distribution, temperature_stats, CumulativePrecip,
    IntensityBucket, IntensityDistribution, IntensityThresholds, SummaryError, TemperatureStats,
};
use crate::table::{normalize, MemberMatrix, NormalizedTable, TableError};

const MIN_PLOT_WIDTH: u32 = 300;
const MIN_PLOT_HEIGHT: u32 = 450;

const CUMULATIVE_TITLE: &str = "Cumulative Precipitation";
const INTENSITY_TITLE: &str = "Precipitation Intensity Distribution";
const TEMPERATURE_TITLE: &str = "Ensemble 2m Temperature Forecast";

const MEMBER_COLOR: RGBColor = RGBColor(169, 169, 169);
const MEMBER_ALPHA: f64 = 0.6;
const GRID_COLOR: RGBColor = RGBColor(128, 128, 128);
const FOOTER_COLOR: RGBColor = RGBColor(128, 128, 128);
const TEMP_BAND_OUTER_COLOR: RGBColor = RGBColor(240, 128, 128);
const TEMP_BAND_OUTER_ALPHA: f64 = 0.3;
const TEMP_BAND_INNER_COLOR: RGBColor = RGBColor(205, 92, 92);
const TEMP_BAND_INNER_ALPHA: f64 = 0.4;
const TEMP_MEAN_COLOR: RGBColor = RGBColor(255, 0, 0);
const INTENSITY_ALPHA: f64 = 0.9;

// Stacked bottom to top.
const INTENSITY_STACK: [(IntensityBucket, RGBColor); 5] = [
    (IntensityBucket::VeryHeavy, RGBColor(255, 0, 0)),
    (IntensityBucket::Heavy, RGBColor(255, 140, 0)),
    (IntensityBucket::Moderate, RGBColor(255, 255, 0)),
    (IntensityBucket::Light, RGBColor(60, 179, 113)),
    (IntensityBucket::Trace, RGBColor(173, 216, 230)),
];

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;
type Chart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;
type DrawResult = Result<(), Box<dyn StdError>>;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Could not establish a valid datetime axis for plotting")]
    NoTimeAxis,

    #[error("Chart size {width}x{height} is below the 300x450 minimum")]
    InvalidSize { width: u32, height: u32 },

    #[error("Failed to draw chart: {0}")]
    Drawing(String),

    #[error("Failed to encode PNG: {0}")]
    Encode(#[from] png::EncodingError),
}

/// One data kind ready for plotting.
#[derive(Clone, Debug)]
pub struct ForecastBundle {
    pub table: NormalizedTable,
    pub members: MemberMatrix,
    pub source_url: String,
    pub run: ForecastRun,
}

impl ForecastBundle {
    /// Normalizes a fetched CSV; tables without timestamps or members are unusable.
    pub fn from_fetched(fetched: &FetchedTable, tz: Tz) -> Result<Self, TableError> {
        let table = normalize(&fetched.text, tz)?;
        if !table.has_valid_timestamps() {
            return Err(TableError::NoValidTimestamps);
        }
        let members = table.members()?;
        info!(
            "{} table: {} rows, {} columns, {} members",
            fetched.kind,
            table.row_count(),
            table.columns().len(),
            members.member_count()
        );
        Ok(Self {
            table,
            members,
            source_url: fetched.url.clone(),
            run: fetched.run,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Panel<T> {
    Ready(T),
    Unavailable,
    Failed(String),
}

impl<T> Panel<T> {
    pub fn status(&self) -> PanelStatus {
        match self {
            Self::Ready(_) => PanelStatus::Plotted,
            Self::Unavailable => PanelStatus::Unavailable,
            Self::Failed(_) => PanelStatus::Failed,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelStatus {
    Plotted,
    Unavailable,
    Failed,
}

#[derive(Clone, Debug)]
pub struct TimeAxis {
    instants: Vec<Option<DateTime<Tz>>>,
}

impl TimeAxis {
    pub fn new(instants: Vec<Option<DateTime<Tz>>>) -> Self {
        Self { instants }
    }

    pub fn len(&self) -> usize {
        self.instants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instants.is_empty()
    }

    pub fn is_usable(&self) -> bool {
        self.instants.iter().any(Option::is_some)
    }

    pub fn first(&self) -> Option<DateTime<Tz>> {
        self.instants.first().copied().flatten()
    }

    fn origin(&self) -> Option<DateTime<Tz>> {
        self.instants.iter().flatten().next().copied()
    }

    fn last_valid(&self) -> Option<DateTime<Tz>> {
        self.instants.iter().flatten().next_back().copied()
    }

    /// Hours since the first valid instant, one entry per step.
    pub fn hours(&self) -> Vec<Option<f64>> {
        let Some(origin) = self.origin() else {
            return vec![None; self.instants.len()];
        };
        self.instants
            .iter()
            .map(|instant| instant.map(|instant| hours_between(origin, instant)))
            .collect()
    }

    fn span_hours(&self) -> f64 {
        match (self.origin(), self.last_valid()) {
            (Some(origin), Some(last)) => hours_between(origin, last),
            _ => 0.0,
        }
    }

    /// Offsets of each local midnight inside the axis.
    pub fn day_boundaries(&self) -> Vec<f64> {
        let (Some(origin), Some(last)) = (self.origin(), self.last_valid()) else {
            return Vec::new();
        };
        let tz = origin.timezone();
        let mut boundaries = Vec::new();
        let mut day = origin.date_naive().succ_opt();
        while let Some(date) = day {
            let Some(midnight) = date
                .and_hms_opt(0, 0, 0)
                .and_then(|naive| tz.from_local_datetime(&naive).earliest())
            else {
                break;
            };
            if midnight > last {
                break;
            }
            boundaries.push(hours_between(origin, midnight));
            day = date.succ_opt();
        }
        boundaries
    }

    pub fn tick_label(&self, hours: f64) -> String {
        match self.origin() {
            Some(origin) => (origin + Duration::seconds((hours * 3600.0).round() as i64))
                .format(AXIS_TICK_DATE_FORMAT)
                .to_string(),
            None => String::new(),
        }
    }

    pub fn description(&self) -> String {
        match self.origin() {
            Some(origin) => format!("Date ({})", origin.timezone().name()),
            None => "Date".to_string(),
        }
    }
}

fn hours_between(from: DateTime<Tz>, to: DateTime<Tz>) -> f64 {
    (to - from).num_seconds() as f64 / 3600.0
}

#[derive(Clone, Debug, PartialEq)]
pub struct HeaderText {
    pub title: String,
    pub subtitle: String,
}

#[derive(Clone, Debug)]
pub struct FigurePlan {
    pub axis: TimeAxis,
    pub header: Option<HeaderText>,
    pub footer: [String; 2],
    pub thresholds: IntensityThresholds,
    pub cumulative: Panel<CumulativePrecip>,
    pub intensity: Panel<IntensityDistribution>,
    pub temperature: Panel<TemperatureStats>,
}

impl FigurePlan {
    pub fn statuses(&self) -> [PanelStatus; 3] {
        [
            self.cumulative.status(),
            self.intensity.status(),
            self.temperature.status(),
        ]
    }
}

pub struct RenderedChart {
    pub png: Vec<u8>,
    /// Cumulative, intensity and temperature panels, in drawing order.
    pub panels: [PanelStatus; 3],
}

/// Prefers the temperature timestamps, falls back to precipitation.
pub fn select_time_axis(
    temperature: Option<&ForecastBundle>,
    precipitation: Option<&ForecastBundle>,
) -> Option<TimeAxis> {
    [temperature, precipitation]
        .into_iter()
        .flatten()
        .map(|bundle| TimeAxis::new(bundle.table.timestamps().to_vec()))
        .find(|axis| !axis.is_empty() && axis.is_usable())
}

pub fn plan_figure(
    airport_code: &str,
    temperature: Option<&ForecastBundle>,
    precipitation: Option<&ForecastBundle>,
    cfg: &Config,
) -> Result<FigurePlan, RenderError> {
    let axis = select_time_axis(temperature, precipitation).ok_or(RenderError::NoTimeAxis)?;
    let steps = axis.len();
    let code = airport_code.to_uppercase();

    let header = axis.first().map(|first| {
        let utc = first.with_timezone(&Utc);
        HeaderText {
            title: format!("{} day Forecast at {code} Airport", cfg.forecast_days),
            subtitle: format!(
                "GEFS Model Run: {} {} ({} Z)",
                first.format(HEADER_DATE_FORMAT),
                first.format("%Z"),
                utc.format(HEADER_DATE_FORMAT)
            ),
        }
    });
    if header.is_none() {
        warn!("First time axis value is invalid; header unavailable for {code}");
    }

    let footer = [
        format!(
            "Temperature data source: {}",
            temperature.map_or("N/A", |bundle| bundle.source_url.as_str())
        ),
        format!(
            "Precipitation data source: {}",
            precipitation.map_or("N/A", |bundle| bundle.source_url.as_str())
        ),
    ];

    let precip_members = precipitation
        .filter(|bundle| bundle.members.member_count() > 0)
        .map(|bundle| bundle.members.aligned_to(steps));
    let temp_members = temperature
        .filter(|bundle| bundle.members.member_count() > 0)
        .map(|bundle| bundle.members.aligned_to(steps));

    let cumulative = match &precip_members {
        Some(members) => match cumulative_precip(members) {
            Ok(summary) => Panel::Ready(summary),
            Err(error) => {
                warn!("Cumulative precipitation panel for {code}: {error}");
                Panel::Failed(error.to_string())
            }
        },
        None => Panel::Unavailable,
    };

    let intensity = match &precip_members {
        Some(members) => {
            let distribution = intensity_distribution(members, &cfg.thresholds);
            if distribution.has_precipitation() {
                Panel::Ready(distribution)
            } else {
                warn!("Intensity panel for {code}: no member reaches trace precipitation");
                Panel::Failed("No valid data for intensity distribution".to_string())
            }
        }
        None => Panel::Unavailable,
    };

    let temperature_panel = match &temp_members {
        Some(members) => match temperature_stats(members) {
            Ok(stats) => Panel::Ready(stats),
            Err(SummaryError::AllMissing(_)) => {
                warn!("Temperature panel for {code}: every member value is missing");
                Panel::Unavailable
            }
        },
        None => Panel::Unavailable,
    };

    Ok(FigurePlan {
        axis,
        header,
        footer,
        thresholds: cfg.thresholds,
        cumulative,
        intensity,
        temperature: temperature_panel,
    })
}

pub fn render(
    airport_code: &str,
    temperature: Option<&ForecastBundle>,
    precipitation: Option<&ForecastBundle>,
    cfg: &Config,
) -> Result<RenderedChart, RenderError> {
    let (width, height) = (cfg.plot_width, cfg.plot_height);
    if width < MIN_PLOT_WIDTH || height < MIN_PLOT_HEIGHT {
        return Err(RenderError::InvalidSize { width, height });
    }

    let plan = plan_figure(airport_code, temperature, precipitation, cfg)?;
    debug!("Planned panels {:?}", plan.statuses());
    let mut buffer = vec![0u8; width as usize * height as usize * 3];
    let panels = draw_figure(&mut buffer, width, height, &plan)?;
    let png = encode_png(&buffer, width, height)?;
    info!(
        "Chart rendered for {} ({} bytes)",
        airport_code.to_uppercase(),
        png.len()
    );
    Ok(RenderedChart { png, panels })
}

fn drawing_error(error: impl std::fmt::Display) -> RenderError {
    RenderError::Drawing(error.to_string())
}

fn draw_figure(
    buffer: &mut [u8],
    width: u32,
    height: u32,
    plan: &FigurePlan,
) -> Result<[PanelStatus; 3], RenderError> {
    let root = BitMapBackend::with_buffer(buffer, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(drawing_error)?;

    let header_height = (height * 7 / 100) as i32;
    let footer_height = (height * 4 / 100) as i32;
    let (header, rest) = root.split_vertically(header_height);
    let (body, footer) = rest.split_vertically(height as i32 - header_height - footer_height);
    let panels = body.split_evenly((3, 1));

    draw_header(&header, plan);

    let axis = &plan.axis;
    let statuses = [
        draw_panel(&panels[0], CUMULATIVE_TITLE, &plan.cumulative, |area, data| {
            draw_cumulative(area, axis, data)
        }),
        draw_panel(&panels[1], INTENSITY_TITLE, &plan.intensity, |area, data| {
            draw_intensity(area, axis, data, &plan.thresholds)
        }),
        draw_panel(&panels[2], TEMPERATURE_TITLE, &plan.temperature, |area, data| {
            draw_temperature(area, axis, data)
        }),
    ];

    draw_footer(&footer, &plan.footer);
    root.present().map_err(drawing_error)?;
    Ok(statuses)
}

fn draw_panel<T>(
    area: &Area<'_>,
    title: &str,
    panel: &Panel<T>,
    draw: impl Fn(&Area<'_>, &T) -> DrawResult,
) -> PanelStatus {
    match panel {
        Panel::Ready(data) => match draw(area, data) {
            Ok(()) => {
                draw_title(area, title);
                PanelStatus::Plotted
            }
            Err(error) => {
                warn!("Error drawing {title} panel: {error}");
                if let Err(error) = area.fill(&WHITE) {
                    debug!("Could not clear {title} panel: {error}");
                }
                draw_placeholder(area, title, PLOT_ERROR_TEXT);
                PanelStatus::Failed
            }
        },
        Panel::Unavailable => {
            draw_placeholder(area, title, DATA_UNAVAILABLE_TEXT);
            panel.status()
        }
        Panel::Failed(reason) => {
            debug!("{title} panel not plotted: {reason}");
            draw_placeholder(area, title, PLOT_ERROR_TEXT);
            panel.status()
        }
    }
}

/// Text is best-effort: without a registered font the chart is drawn without it.
fn draw_label(
    area: &Area<'_>,
    text: &str,
    position: (i32, i32),
    size: f64,
    style: FontStyle,
    color: &RGBColor,
    anchor: HPos,
) {
    let font = FontDesc::new(FontFamily::Name(PLOT_FONT_FAMILY), size, style);
    let text_style = TextStyle::from(font)
        .color(color)
        .pos(Pos::new(anchor, VPos::Center));
    if let Err(error) = area.draw_text(text, &text_style, position) {
        debug!("Skipped chart text {text:?}: {error}");
    }
}

fn draw_title(area: &Area<'_>, title: &str) {
    let (width, _) = area.dim_in_pixel();
    draw_label(
        area,
        title,
        (width as i32 / 2, 18),
        20.0,
        FontStyle::Normal,
        &BLACK,
        HPos::Center,
    );
}

fn draw_placeholder(area: &Area<'_>, title: &str, message: &str) {
    let (width, height) = area.dim_in_pixel();
    let (width, height) = (width as i32, height as i32);
    let frame = Rectangle::new([(70, 40), (width - 20, height - 60)], BLACK.stroke_width(1));
    if let Err(error) = area.draw(&frame) {
        debug!("Could not draw {title} frame: {error}");
    }
    draw_title(area, title);
    draw_label(
        area,
        message,
        (width / 2, height / 2),
        18.0,
        FontStyle::Normal,
        &BLACK,
        HPos::Center,
    );
}

fn draw_header(area: &Area<'_>, plan: &FigurePlan) {
    let (width, height) = area.dim_in_pixel();
    let (center, height) = (width as i32 / 2, height as i32);
    match &plan.header {
        Some(header) => {
            draw_label(
                area,
                &header.title,
                (center, height * 2 / 5),
                26.0,
                FontStyle::Bold,
                &BLACK,
                HPos::Center,
            );
            draw_label(
                area,
                &header.subtitle,
                (center, height * 3 / 4),
                17.0,
                FontStyle::Normal,
                &BLACK,
                HPos::Center,
            );
        }
        None => draw_label(
            area,
            HEADER_UNAVAILABLE_TEXT,
            (center, height / 2),
            20.0,
            FontStyle::Normal,
            &BLACK,
            HPos::Center,
        ),
    }
}

fn draw_footer(area: &Area<'_>, lines: &[String; 2]) {
    let (_, height) = area.dim_in_pixel();
    let height = height as i32;
    for (idx, line) in lines.iter().enumerate() {
        draw_label(
            area,
            line,
            (12, height * (idx as i32 + 1) / 3),
            12.0,
            FontStyle::Normal,
            &FOOTER_COLOR,
            HPos::Left,
        );
    }
}

fn build_chart<'a, 'b>(
    area: &'a Area<'b>,
    axis: &TimeAxis,
    y_range: (f64, f64),
) -> Result<Chart<'a, 'b>, Box<dyn StdError>> {
    let x_max = axis.span_hours().max(1.0);
    let chart = ChartBuilder::on(area)
        .margin(20)
        .margin_top(40)
        .x_label_area_size(60)
        .y_label_area_size(70)
        .build_cartesian_2d(0.0..x_max, y_range.0..y_range.1)?;
    Ok(chart)
}

fn configure_mesh<'a, 'b: 'a>(
    chart: &mut Chart<'a, 'b>,
    axis: &TimeAxis,
    y_desc: &str,
    y_range: (f64, f64),
) -> DrawResult {
    let x_desc = axis.description();
    let formatter = |hours: &f64| axis.tick_label(*hours);
    if let Err(error) = chart
        .configure_mesh()
        .x_labels(8)
        .y_labels(8)
        .x_label_formatter(&formatter)
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()
    {
        debug!("Axis labels skipped: {error}");
    }

    for boundary in axis.day_boundaries() {
        chart.draw_series(LineSeries::new(
            [(boundary, y_range.0), (boundary, y_range.1)],
            GRID_COLOR.mix(0.6).stroke_width(1),
        ))?;
    }
    Ok(())
}

fn draw_legend<'a, 'b: 'a>(chart: &mut Chart<'a, 'b>, position: SeriesLabelPosition) {
    if let Err(error) = chart
        .configure_series_labels()
        .position(position)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
    {
        debug!("Legend skipped: {error}");
    }
}

/// Splits a gappy series into contiguous runs of defined points.
fn segments(x: &[Option<f64>], y: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (x, y) in x.iter().zip(y) {
        match (x, y) {
            (Some(x), Some(y)) if y.is_finite() => current.push((*x, *y)),
            _ => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

/// Closed outline between two gappy series, one polygon per contiguous run.
fn band_polygons(
    x: &[Option<f64>],
    low: &[Option<f64>],
    high: &[Option<f64>],
) -> Vec<Vec<(f64, f64)>> {
    let mut polygons = Vec::new();
    let mut run: Vec<(f64, f64, f64)> = Vec::new();
    let points = x
        .iter()
        .zip(low.iter().zip(high))
        .map(|(x, (low, high))| match (x, low, high) {
            (Some(x), Some(low), Some(high)) => Some((*x, *low, *high)),
            _ => None,
        })
        .chain(std::iter::once(None));
    for point in points {
        match point {
            Some(point) => run.push(point),
            None => {
                if run.len() >= 2 {
                    let mut outline: Vec<(f64, f64)> =
                        run.iter().map(|(x, _, high)| (*x, *high)).collect();
                    outline.extend(run.iter().rev().map(|(x, low, _)| (*x, *low)));
                    polygons.push(outline);
                }
                run.clear();
            }
        }
    }
    polygons
}

fn value_range<'a>(series: impl Iterator<Item = &'a Option<f64>>) -> Option<(f64, f64)> {
    series
        .flatten()
        .filter(|value| value.is_finite())
        .fold(None, |range, value| match range {
            None => Some((*value, *value)),
            Some((low, high)) => Some((low.min(*value), high.max(*value))),
        })
}

fn draw_cumulative(area: &Area<'_>, axis: &TimeAxis, data: &CumulativePrecip) -> DrawResult {
    let x = axis.hours();
    let (_, high) = value_range(data.per_member.iter().flatten()).ok_or("no cumulative values")?;
    let y_range = (0.0, (high * 1.05).max(0.1));
    let mut chart = build_chart(area, axis, y_range)?;
    configure_mesh(&mut chart, axis, "Total Accumulation (inches)", y_range)?;

    let member_style = MEMBER_COLOR.mix(MEMBER_ALPHA).stroke_width(1);
    let mut labelled = false;
    for series in &data.per_member {
        for run in segments(&x, series) {
            let anno = chart.draw_series(LineSeries::new(run, member_style))?;
            if !labelled {
                anno.label("Ensemble Members").legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], member_style)
                });
                labelled = true;
            }
        }
    }

    for (idx, run) in segments(&x, &data.mean).into_iter().enumerate() {
        let anno = chart.draw_series(LineSeries::new(run, BLACK.stroke_width(2)))?;
        if idx == 0 {
            anno.label("Mean").legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], BLACK.stroke_width(2))
            });
        }
    }

    draw_legend(&mut chart, SeriesLabelPosition::UpperLeft);
    Ok(())
}

fn draw_intensity(
    area: &Area<'_>,
    axis: &TimeAxis,
    data: &IntensityDistribution,
    thresholds: &IntensityThresholds,
) -> DrawResult {
    let hours = axis.hours();
    let x: Vec<f64> = hours.iter().flatten().copied().collect();
    if x.is_empty() {
        return Err("no valid time steps for intensity distribution".into());
    }

    let y_range = (0.0, 100.0);
    let mut chart = build_chart(area, axis, y_range)?;
    configure_mesh(&mut chart, axis, "Percentage of Models (%)", y_range)?;

    let mut base = vec![0.0; x.len()];
    for (bucket, color) in INTENSITY_STACK {
        let shares = data.series(bucket);
        let valid_shares = hours
            .iter()
            .zip(&shares)
            .filter(|(hour, _)| hour.is_some())
            .map(|(_, share)| *share);
        let top: Vec<f64> = base
            .iter()
            .zip(valid_shares)
            .map(|(base, share)| (base + share).min(100.0))
            .collect();
        let mut outline: Vec<(f64, f64)> = x.iter().copied().zip(top.iter().copied()).collect();
        outline.extend(x.iter().copied().zip(base.iter().copied()).rev());

        chart
            .draw_series(std::iter::once(Polygon::new(
                outline,
                color.mix(INTENSITY_ALPHA).filled(),
            )))?
            .label(thresholds.legend_label(bucket))
            .legend(move |(x, y)| {
                Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled())
            });
        base = top;
    }

    draw_legend(&mut chart, SeriesLabelPosition::UpperRight);
    Ok(())
}

fn draw_temperature(area: &Area<'_>, axis: &TimeAxis, data: &TemperatureStats) -> DrawResult {
    let x = axis.hours();
    let (low, high) = value_range(data.p10.iter().chain(&data.p90).chain(&data.mean))
        .ok_or("no temperature values")?;
    let y_range = (low - 2.0, high + 2.0);
    let mut chart = build_chart(area, axis, y_range)?;
    configure_mesh(&mut chart, axis, "Temperature (°F)", y_range)?;

    let bands = [
        (
            &data.p10,
            &data.p90,
            TEMP_BAND_OUTER_COLOR.mix(TEMP_BAND_OUTER_ALPHA).filled(),
            "10-90th Percentile Range",
        ),
        (
            &data.p25,
            &data.p75,
            TEMP_BAND_INNER_COLOR.mix(TEMP_BAND_INNER_ALPHA).filled(),
            "25-75th Percentile Range",
        ),
    ];
    for (low, high, style, label) in bands {
        for (idx, outline) in band_polygons(&x, low, high).into_iter().enumerate() {
            let anno = chart.draw_series(std::iter::once(Polygon::new(outline, style)))?;
            if idx == 0 {
                anno.label(label).legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 12, y + 5)], style)
                });
            }
        }
    }

    for (idx, run) in segments(&x, &data.mean).into_iter().enumerate() {
        let anno = chart.draw_series(LineSeries::new(run, TEMP_MEAN_COLOR.stroke_width(2)))?;
        if idx == 0 {
            anno.label("Mean").legend(|(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], TEMP_MEAN_COLOR.stroke_width(2))
            });
        }
    }

    draw_legend(&mut chart, SeriesLabelPosition::UpperRight);
    Ok(())
}

fn encode_png(rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
    let mut encoded = Vec::new();
    let mut encoder = png::Encoder::new(&mut encoded, width, height);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(rgb)?;
    writer.finish()?;
    Ok(encoded)
}
