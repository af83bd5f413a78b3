//! Lays out the weekday composites of a hall as a grid figure.

use std::{
    fs::read,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use anyhow::{anyhow, Result};
use image::RgbImage;
use plotters::{
    coord::Shift,
    element::BitMapElement,
    prelude::*,
    style::{
        register_font,
        text_anchor::{HPos, Pos, VPos},
        FontStyle,
    },
};
use tracing::{debug, warn};

use crate::{
    compositor::CompositeImage,
    weekday::{DateKey, Weekday},
};

static FONT_FAMILY: &str = "sans-serif";
static FONT_CANDIDATES: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];
static FONT_LOADED: OnceLock<bool> = OnceLock::new();

/// Pixels per inch of the figure.
const DPI: f64 = 100.0;
const FIGURE_TITLE_SIZE: f64 = 22.0;
const PANEL_TITLE_SIZE: f64 = 17.0;
const LABEL_SIZE: f64 = 14.0;
const PANEL_MARGIN: u32 = 8;
const PANEL_TITLE_HEIGHT: u32 = 26;
const TICK_LABEL_WIDTH: u32 = 64;
const AXIS_LABEL_HEIGHT: u32 = 24;
const TICK_LENGTH: i32 = 4;
/// Offset of the first tick from the top of the image.
const FIRST_TICK: u32 = 10;

/// Register a font for chart text once per process.
///
/// Returns whether text can be drawn. Without a font the figure still shows the images and ticks.
/// Only the first call looks at `font_path`, later calls return the first outcome and ignore it.
pub fn load_font(font_path: Option<&Path>) -> bool {
    *FONT_LOADED.get_or_init(|| {
        let candidates = font_path
            .map(Path::to_path_buf)
            .into_iter()
            .chain(FONT_CANDIDATES.into_iter().map(PathBuf::from));
        for candidate in candidates {
            let Ok(bytes) = read(&candidate) else {
                continue;
            };
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            if register_font(FONT_FAMILY, FontStyle::Normal, bytes).is_ok() {
                debug!(path = %candidate.display(), "registered chart font");
                return true;
            }
        }
        warn!("no usable font found, charts are drawn without text");
        false
    })
}

/// The composite of one weekday and the dates it is made of.
#[derive(Debug, Clone)]
pub struct DayPanel {
    pub weekday: Weekday,
    pub dates: Vec<DateKey>,
    pub image: CompositeImage,
}

/// Grid placement and pixel size of an overview figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub panels: usize,
    pub rows: usize,
    pub columns: usize,
    pub width: u32,
    pub height: u32,
}

impl GridLayout {
    /// `max_dates` is the largest number of dates of any panel.
    pub fn new(panels: usize, max_dates: usize) -> Self {
        let rows = ((panels + 1) / 2).max(1);
        let columns = if panels >= 2 { 2 } else { 1 };
        let width_inches = if columns == 2 { 15.0 } else { 8.0 };
        let height_inches = 1.0 + (max_dates + 2) as f64 * 0.3 * rows as f64;
        Self {
            panels,
            rows,
            columns,
            width: (width_inches * DPI).round() as u32,
            height: (height_inches * DPI).round() as u32,
        }
    }

    /// Row and column of a panel.
    pub fn cell(&self, index: usize) -> (usize, usize) {
        match self.panels {
            1 => (0, 0),
            2 => (0, index),
            _ => (index / 2, index % 2),
        }
    }

    /// An odd number of more than two panels leaves the last cell empty.
    pub fn has_empty_cell(&self) -> bool {
        self.panels > 2 && self.panels % 2 == 1
    }
}

/// Tick positions in image pixels with their labels.
///
/// There are two more ticks than dates, the outer two without a label.
pub fn tick_marks(image_height: u32, dates: &[DateKey]) -> Vec<(u32, String)> {
    let count = dates.len() as u32 + 2;
    let step = (image_height / count).max(1);
    std::iter::once(String::new())
        .chain(dates.iter().map(|date| date.label()))
        .chain(std::iter::once(String::new()))
        .enumerate()
        .map(|(index, label)| (FIRST_TICK + index as u32 * step, label))
        .collect()
}

/// A rendered overview, kept in memory until saved.
#[derive(Debug, Clone)]
pub struct OverviewFigure {
    image: RgbImage,
}

impl OverviewFigure {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.image.get_pixel(x, y).0
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.image.save(path)?;
        Ok(())
    }
}

/// Draw the panels into a figure titled `title`.
pub fn render_figure(title: &str, panels: &[DayPanel], with_text: bool) -> Result<OverviewFigure> {
    let max_dates = panels.iter().map(|panel| panel.dates.len()).max().unwrap_or(0);
    let layout = GridLayout::new(panels.len(), max_dates);
    let mut buffer = vec![255u8; layout.width as usize * layout.height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (layout.width, layout.height))
            .into_drawing_area();
        root.fill(&WHITE)?;
        let title_height = (layout.height / 10).max(30);
        let (title_area, body) = root.split_vertically(title_height);
        if with_text {
            let style = TextStyle::from((FONT_FAMILY, FIGURE_TITLE_SIZE).into_font())
                .pos(Pos::new(HPos::Center, VPos::Center));
            title_area.draw_text(
                title,
                &style,
                (layout.width as i32 / 2, title_height as i32 / 2),
            )?;
        }
        let mut cells = body.split_evenly((layout.rows, layout.columns));
        if layout.has_empty_cell() {
            cells.truncate(layout.panels);
        }
        for (index, panel) in panels.iter().enumerate() {
            let (row, column) = layout.cell(index);
            draw_panel(&cells[row * layout.columns + column], panel, with_text)?;
        }
        root.present()?;
    }
    let image = RgbImage::from_raw(layout.width, layout.height, buffer)
        .ok_or_else(|| anyhow!("figure buffer does not match its size"))?;
    Ok(OverviewFigure { image })
}

fn draw_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    panel: &DayPanel,
    with_text: bool,
) -> Result<()> {
    let (width, height) = area.dim_in_pixel();
    let plot_left = PANEL_MARGIN + TICK_LABEL_WIDTH;
    let plot_top = PANEL_MARGIN + PANEL_TITLE_HEIGHT;
    let plot_width = width.saturating_sub(plot_left + PANEL_MARGIN);
    let plot_height = height.saturating_sub(plot_top + AXIS_LABEL_HEIGHT + PANEL_MARGIN);
    let (image_width, image_height) = (panel.image.width(), panel.image.height());
    if plot_width == 0 || plot_height == 0 || image_width == 0 || image_height == 0 {
        return Ok(());
    }

    let scale = f64::min(
        plot_width as f64 / image_width as f64,
        plot_height as f64 / image_height as f64,
    );
    let scaled_width = ((image_width as f64 * scale).round() as u32).clamp(1, plot_width);
    let scaled_height = ((image_height as f64 * scale).round() as u32).clamp(1, plot_height);
    let left = (plot_left + (plot_width - scaled_width) / 2) as i32;
    let top = (plot_top + (plot_height - scaled_height) / 2) as i32;

    let bitmap: BitMapElement<'_, (i32, i32)> = BitMapElement::with_owned_buffer(
        (left, top),
        (scaled_width, scaled_height),
        panel.image.to_rgb_on_white(scaled_width, scaled_height),
    )
    .ok_or_else(|| anyhow!("bitmap buffer too small for {}", panel.weekday))?;
    area.draw(&bitmap)?;
    let right = left + scaled_width as i32;
    let bottom = top + scaled_height as i32;
    area.draw(&Rectangle::new(
        [(left - 1, top - 1), (right, bottom)],
        BLACK.stroke_width(1),
    ))?;

    let label_style = TextStyle::from((FONT_FAMILY, LABEL_SIZE).into_font())
        .pos(Pos::new(HPos::Right, VPos::Center));
    for (position, label) in tick_marks(image_height, &panel.dates) {
        if position >= image_height {
            continue;
        }
        let y = top + (position as f64 * scale).round() as i32;
        area.draw(&PathElement::new(
            vec![(left - 1 - TICK_LENGTH, y), (left - 1, y)],
            BLACK,
        ))?;
        if with_text && !label.is_empty() {
            area.draw_text(&label, &label_style, (left - 2 - TICK_LENGTH, y))?;
        }
    }

    if with_text {
        let centered = |size: f64| {
            TextStyle::from((FONT_FAMILY, size).into_font()).pos(Pos::new(HPos::Center, VPos::Center))
        };
        let middle = (left + right) / 2;
        area.draw_text(
            panel.weekday.name(),
            &centered(PANEL_TITLE_SIZE),
            (middle, (PANEL_MARGIN + PANEL_TITLE_HEIGHT / 2) as i32),
        )?;
        area.draw_text(
            "Time",
            &centered(LABEL_SIZE),
            (middle, bottom + AXIS_LABEL_HEIGHT as i32 / 2),
        )?;
    }
    Ok(())
}
