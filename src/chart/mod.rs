// Copyright 2019 Twitter, Inc.
// Licensed under the Apache License, Version 2.0
// http://www.apache.org/licenses/LICENSE-2.0

use crate::error::Result;
use crate::metrics::Comparison;

use log::debug;
use rusttype::{point, Font, PositionedGlyph, Scale};

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

macro_rules! hexcolour {
    ($colour:literal) => {
        ColorRgb {
            r: (($colour & 0xFF0000) >> 16) as u8,
            g: (($colour & 0x00FF00) >> 8) as u8,
            b: ($colour & 0x0000FF) as u8,
        }
    };
}

const WHITE: ColorRgb = hexcolour!(0xFFFFFF);
const BLACK: ColorRgb = hexcolour!(0x000000);
const GRID: ColorRgb = hexcolour!(0xDDDDDD);

const COLOURS: &[ColorRgb] = &[
    hexcolour!(0xAA0000),
    hexcolour!(0x0000FF),
    hexcolour!(0x888888),
    hexcolour!(0xDDCC77),
    hexcolour!(0x999933),
    hexcolour!(0x332288),
    hexcolour!(0x117733),
    hexcolour!(0x88CCEE),
    hexcolour!(0x882255),
    hexcolour!(0x44AA99),
    hexcolour!(0xAA4499),
    hexcolour!(0xCC6677),
];

pub const BASELINE_LABEL: &str = "Baseline";
pub const CANDIDATE_LABEL: &str = "New Allocator";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ColorRgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Clone, Copy, Debug)]
struct Rect {
    x: usize,
    y: usize,
    w: usize,
    h: usize,
}

pub struct ImageBuffer<T> {
    buffer: Vec<Vec<T>>,
    height: usize,
    width: usize,
}

impl ImageBuffer<ColorRgb> {
    pub fn new(width: usize, height: usize, background: ColorRgb) -> ImageBuffer<ColorRgb> {
        ImageBuffer {
            buffer: vec![vec![background; width]; height],
            height,
            width,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> ColorRgb {
        self.buffer[y][x]
    }

    pub fn set_pixel(&mut self, x: usize, y: usize, value: ColorRgb) {
        if x < self.width && y < self.height {
            self.buffer[y][x] = value;
        }
    }

    /// Fills the rectangle spanned by the two corners, clipped to the
    /// buffer.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, value: ColorRgb) {
        let (x0, x1) = (x0.min(x1), x0.max(x1));
        let (y0, y1) = (y0.min(y1), y0.max(y1));
        for y in y0.max(0)..=y1.min(self.height as i64 - 1) {
            for x in x0.max(0)..=x1.min(self.width as i64 - 1) {
                self.buffer[y as usize][x as usize] = value;
            }
        }
    }

    /// Draws a stroked line segment by stepping along the major axis.
    pub fn line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, stroke: usize, value: ColorRgb) {
        let dx = x1 - x0;
        let dy = y1 - y0;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        for i in 0..=steps {
            let t = i as f64 / steps as f64;
            self.plot_thick(
                (x0 + dx * t).round() as i64,
                (y0 + dy * t).round() as i64,
                stroke,
                value,
            );
        }
    }

    fn plot_thick(&mut self, x: i64, y: i64, stroke: usize, value: ColorRgb) {
        let r = stroke as i64 / 2;
        for oy in -r..(stroke as i64 - r) {
            for ox in -r..(stroke as i64 - r) {
                let (px, py) = (x + ox, y + oy);
                if px >= 0 && py >= 0 {
                    self.set_pixel(px as usize, py as usize, value);
                }
            }
        }
    }

    /// Copies `other` onto this buffer, skipping `other`'s background
    /// pixels.
    pub fn overlay(&mut self, other: &ImageBuffer<ColorRgb>, x: usize, y: usize) {
        for sy in 0..other.height {
            for sx in 0..other.width {
                if other.buffer[sy][sx] != WHITE && sy + y < self.height && sx + x < self.width {
                    self.buffer[sy + y][sx + x] = other.buffer[sy][sx];
                }
            }
        }
    }

    /// A copy rotated a quarter turn counter-clockwise.
    pub fn rotated_ccw(&self) -> ImageBuffer<ColorRgb> {
        let mut rotated = ImageBuffer::new(self.height, self.width, WHITE);
        for y in 0..self.height {
            for x in 0..self.width {
                rotated.buffer[self.width - 1 - x][y] = self.buffer[y][x];
            }
        }
        rotated
    }

    pub fn write_png(&self, file: &str) -> Result<()> {
        let mut buffer = Vec::with_capacity(self.height * self.width * 3);
        for row in 0..self.height {
            for col in 0..self.width {
                let pixel = self.buffer[row][col];
                buffer.push(pixel.r);
                buffer.push(pixel.g);
                buffer.push(pixel.b);
            }
        }
        let w = BufWriter::new(File::create(Path::new(file))?);
        let mut encoder = png::Encoder::new(w, self.width as u32, self.height as u32);
        encoder.set_color(png::ColorType::RGB);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&buffer)?;
        Ok(())
    }
}

fn string_buffer(string: &str, size: f32, colour: ColorRgb) -> ImageBuffer<ColorRgb> {
    let font_data = dejavu::sans_mono::regular();
    let font = Font::try_from_bytes(font_data).unwrap();

    let height: f32 = size;
    let pixel_height = height.ceil() as usize;
    let scale = Scale {
        x: height,
        y: height,
    };

    let v_metrics = font.v_metrics(scale);
    let offset = point(0.0, v_metrics.ascent);

    let glyphs: Vec<PositionedGlyph> = font.layout(string, scale, offset).collect();

    let width = glyphs
        .iter()
        .map(|g| g.unpositioned().h_metrics().advance_width)
        .fold(0.0, |x, y| x + y)
        .ceil() as usize;

    let mut overlay = ImageBuffer::new(width.max(1), pixel_height.max(1), WHITE);

    for g in glyphs {
        if let Some(bb) = g.pixel_bounding_box() {
            g.draw(|x, y, v| {
                let x = x as i32 + bb.min.x;
                let y = y as i32 + bb.min.y;
                if v > 0.25 && x >= 0 && y >= 0 {
                    overlay.set_pixel(x as usize, y as usize, colour);
                }
            })
        }
    }

    overlay
}

/// Maps data coordinates into a plot rectangle, y growing upward.
struct Mapper {
    plot: Rect,
    xmin: f64,
    xmax: f64,
    ymin: f64,
    ymax: f64,
}

impl Mapper {
    fn x(&self, v: f64) -> f64 {
        if self.xmax > self.xmin {
            self.plot.x as f64 + (v - self.xmin) / (self.xmax - self.xmin) * (self.plot.w - 1) as f64
        } else {
            (self.plot.x + self.plot.w / 2) as f64
        }
    }

    fn y(&self, v: f64) -> f64 {
        let bottom = (self.plot.y + self.plot.h - 1) as f64;
        if self.ymax > self.ymin {
            bottom - (v - self.ymin) / (self.ymax - self.ymin) * (self.plot.h - 1) as f64
        } else {
            bottom
        }
    }
}

/// Font sizes and label areas for one panel, scaled down proportionally
/// when the panel is smaller than the default quadrant.
struct Style {
    caption: f32,
    label: f32,
    tick: f32,
    stroke: usize,
    left: usize,
    right: usize,
    top: usize,
    bottom: usize,
}

impl Style {
    fn for_panel(panel: &Rect) -> Style {
        let f = (panel.w as f64 / 2400.0)
            .min(panel.h as f64 / 1800.0)
            .min(1.0)
            .max(0.2);
        Style {
            caption: (44.0 * f) as f32,
            label: (28.0 * f) as f32,
            tick: (22.0 * f) as f32,
            stroke: ((3.0 * f).round() as usize).max(1),
            left: (150.0 * f) as usize,
            right: (50.0 * f) as usize,
            top: (90.0 * f) as usize,
            bottom: (130.0 * f) as usize,
        }
    }

    fn plot(&self, panel: &Rect) -> Rect {
        Rect {
            x: panel.x + self.left,
            y: panel.y + self.top,
            w: panel.w.saturating_sub(self.left + self.right).max(1),
            h: panel.h.saturating_sub(self.top + self.bottom).max(1),
        }
    }
}

/// Tick positions covering `min..max`, stepped at 1, 2, or 5 times a power
/// of ten. Returns the positions and the step.
fn ticks(min: f64, max: f64, target: usize) -> (Vec<f64>, f64) {
    let span = max - min;
    if !(span > 0.0) {
        return (vec![min], 1.0);
    }
    let raw = span / target.max(1) as f64;
    let magnitude = 10f64.powf(raw.log10().floor());
    let normalized = raw / magnitude;
    let step = magnitude
        * if normalized <= 1.0 {
            1.0
        } else if normalized <= 2.0 {
            2.0
        } else if normalized <= 5.0 {
            5.0
        } else {
            10.0
        };
    let mut positions = Vec::new();
    let mut value = (min / step).ceil() * step;
    while value <= max + step * 1e-9 {
        positions.push(value);
        value += step;
    }
    (positions, step)
}

fn format_tick(value: f64, step: f64) -> String {
    if step >= 1.0 {
        format!("{:.0}", value)
    } else {
        let decimals = (-step.log10().floor()) as usize;
        format!("{:.*}", decimals, value)
    }
}

fn draw_caption(buffer: &mut ImageBuffer<ColorRgb>, panel: &Rect, caption: &str, style: &Style) {
    let text = string_buffer(caption, style.caption, BLACK);
    let x = panel.x + panel.w.saturating_sub(text.width()) / 2;
    let y = panel.y + style.top / 4;
    buffer.overlay(&text, x, y);
}

fn draw_x_desc(buffer: &mut ImageBuffer<ColorRgb>, panel: &Rect, plot: &Rect, desc: &str, style: &Style) {
    let text = string_buffer(desc, style.label, BLACK);
    let x = plot.x + plot.w.saturating_sub(text.width()) / 2;
    let y = (panel.y + panel.h).saturating_sub(text.height() + style.bottom / 8);
    buffer.overlay(&text, x, y);
}

fn draw_y_desc(buffer: &mut ImageBuffer<ColorRgb>, panel: &Rect, plot: &Rect, desc: &str, style: &Style) {
    let text = string_buffer(desc, style.label, BLACK).rotated_ccw();
    let x = panel.x + style.left / 16;
    let y = plot.y + plot.h.saturating_sub(text.height()) / 2;
    buffer.overlay(&text, x, y);
}

fn draw_y_axis(buffer: &mut ImageBuffer<ColorRgb>, plot: &Rect, mapper: &Mapper, style: &Style) {
    let (positions, step) = ticks(mapper.ymin, mapper.ymax, 5);
    for position in positions {
        let py = mapper.y(position).round() as i64;
        buffer.fill_rect(plot.x as i64, py, (plot.x + plot.w - 1) as i64, py, GRID);
        let label = string_buffer(&format_tick(position, step), style.tick, BLACK);
        let lx = plot.x.saturating_sub(label.width() + 8);
        let ly = (py as usize).saturating_sub(label.height() / 2);
        buffer.overlay(&label, lx, ly);
    }
}

fn draw_x_axis(buffer: &mut ImageBuffer<ColorRgb>, plot: &Rect, mapper: &Mapper, style: &Style) {
    let (positions, step) = ticks(mapper.xmin, mapper.xmax, 6);
    for position in positions {
        let px = mapper.x(position).round() as i64;
        buffer.fill_rect(px, plot.y as i64, px, (plot.y + plot.h - 1) as i64, GRID);
        let label = string_buffer(&format_tick(position, step), style.tick, BLACK);
        let lx = (px as usize).saturating_sub(label.width() / 2);
        let ly = plot.y + plot.h + 8;
        buffer.overlay(&label, lx, ly);
    }
}

fn draw_frame(buffer: &mut ImageBuffer<ColorRgb>, plot: &Rect) {
    let (x0, y0) = (plot.x as i64, plot.y as i64);
    let (x1, y1) = ((plot.x + plot.w - 1) as i64, (plot.y + plot.h - 1) as i64);
    buffer.fill_rect(x0, y0, x1, y0, BLACK);
    buffer.fill_rect(x0, y1, x1, y1, BLACK);
    buffer.fill_rect(x0, y0, x0, y1, BLACK);
    buffer.fill_rect(x1, y0, x1, y1, BLACK);
}

fn draw_legend(
    buffer: &mut ImageBuffer<ColorRgb>,
    plot: &Rect,
    entries: &[(&str, ColorRgb)],
    style: &Style,
) {
    let labels: Vec<ImageBuffer<ColorRgb>> = entries
        .iter()
        .map(|(label, _)| string_buffer(label, style.label, BLACK))
        .collect();
    let swatch = (style.label * 1.4) as usize;
    let pad = (style.label / 2.0) as usize + 2;
    let entry_h = labels.iter().map(ImageBuffer::height).max().unwrap_or(1) + pad;
    let text_w = labels.iter().map(ImageBuffer::width).max().unwrap_or(1);
    let box_w = pad + swatch + pad + text_w + pad;
    let box_h = pad + entries.len() * entry_h;

    let x0 = (plot.x + plot.w).saturating_sub(box_w + 10) as i64;
    let y0 = (plot.y + 10) as i64;
    let x1 = x0 + box_w as i64 - 1;
    let y1 = y0 + box_h as i64 - 1;
    buffer.fill_rect(x0, y0, x1, y1, WHITE);
    buffer.fill_rect(x0, y0, x1, y0, BLACK);
    buffer.fill_rect(x0, y1, x1, y1, BLACK);
    buffer.fill_rect(x0, y0, x0, y1, BLACK);
    buffer.fill_rect(x1, y0, x1, y1, BLACK);

    for (i, ((_, colour), label)) in entries.iter().zip(&labels).enumerate() {
        let cy = y0 as f64 + (pad + i * entry_h) as f64 + entry_h as f64 / 2.0 - pad as f64 / 2.0;
        buffer.line(
            (x0 as usize + pad) as f64,
            cy,
            (x0 as usize + pad + swatch) as f64,
            cy,
            style.stroke,
            *colour,
        );
        let lx = x0 as usize + pad + swatch + pad;
        let ly = (cy as usize).saturating_sub(label.height() / 2);
        buffer.overlay(label, lx, ly);
    }
}

fn line_panel(
    buffer: &mut ImageBuffer<ColorRgb>,
    panel: Rect,
    caption: &str,
    y_desc: &str,
    time: &[f64],
    series: &[(&str, &[f64], ColorRgb)],
) {
    let style = Style::for_panel(&panel);
    let plot = style.plot(&panel);

    let (mut xmin, mut xmax) = (f64::MAX, f64::MIN);
    for &value in time {
        xmin = xmin.min(value);
        xmax = xmax.max(value);
    }
    if time.is_empty() {
        xmin = 0.0;
        xmax = 1.0;
    }

    let mut hi = f64::MIN;
    let mut lo: f64 = 0.0;
    for (_, values, _) in series {
        for &value in *values {
            hi = hi.max(value);
            lo = lo.min(value);
        }
    }
    if hi <= lo {
        hi = lo + 1.0;
    }
    let margin = (hi - lo) * 0.05;
    let mapper = Mapper {
        plot,
        xmin,
        xmax,
        ymin: lo,
        ymax: hi + margin,
    };

    draw_y_axis(buffer, &plot, &mapper, &style);
    draw_x_axis(buffer, &plot, &mapper, &style);

    for (_, values, colour) in series {
        for pair in time.iter().zip(values.iter()).collect::<Vec<_>>().windows(2) {
            let (x0, y0) = (*pair[0].0, *pair[0].1);
            let (x1, y1) = (*pair[1].0, *pair[1].1);
            buffer.line(
                mapper.x(x0),
                mapper.y(y0),
                mapper.x(x1),
                mapper.y(y1),
                style.stroke,
                *colour,
            );
        }
    }

    draw_frame(buffer, &plot);
    draw_caption(buffer, &panel, caption, &style);
    draw_x_desc(buffer, &panel, &plot, "Time", &style);
    draw_y_desc(buffer, &panel, &plot, y_desc, &style);

    let entries: Vec<(&str, ColorRgb)> = series.iter().map(|(label, _, c)| (*label, *c)).collect();
    draw_legend(buffer, &plot, &entries, &style);
}

fn bar_panel(
    buffer: &mut ImageBuffer<ColorRgb>,
    panel: Rect,
    caption: &str,
    y_desc: &str,
    categories: &[String],
    series: &[(&str, &[f64], ColorRgb)],
) {
    let style = Style::for_panel(&panel);
    let plot = style.plot(&panel);

    let mut hi = f64::MIN;
    let mut lo: f64 = 0.0;
    for (_, values, _) in series {
        for &value in *values {
            hi = hi.max(value);
            lo = lo.min(value);
        }
    }
    if hi <= lo {
        hi = lo + 1.0;
    }
    let margin = (hi - lo) * 0.05;
    let mapper = Mapper {
        plot,
        xmin: 0.0,
        xmax: categories.len() as f64,
        ymin: lo,
        ymax: hi + margin,
    };

    draw_y_axis(buffer, &plot, &mapper, &style);

    let slot = plot.w as f64 / categories.len().max(1) as f64;
    // two bars per slot, each 0.35 slots wide, meeting at the slot center
    let bar_w = slot * 0.35;
    let floor = mapper.y(0.0);
    for (i, category) in categories.iter().enumerate() {
        let center = plot.x as f64 + slot * i as f64 + slot / 2.0;
        for (s, (_, values, colour)) in series.iter().enumerate() {
            let value = values.get(i).copied().unwrap_or(0.0);
            let (bx0, bx1) = if s == 0 {
                (center - bar_w, center)
            } else {
                (center, center + bar_w)
            };
            buffer.fill_rect(
                bx0.round() as i64,
                mapper.y(value).round() as i64,
                bx1.round() as i64 - 1,
                floor.round() as i64,
                *colour,
            );
        }
        let label = string_buffer(category, style.tick, BLACK);
        let lx = (center as usize).saturating_sub(label.width() / 2);
        let ly = plot.y + plot.h + 8;
        buffer.overlay(&label, lx, ly);
    }

    draw_frame(buffer, &plot);
    draw_caption(buffer, &panel, caption, &style);
    draw_y_desc(buffer, &panel, &plot, y_desc, &style);

    let entries: Vec<(&str, ColorRgb)> = series.iter().map(|(label, _, c)| (*label, *c)).collect();
    draw_legend(buffer, &plot, &entries, &style);
}

/// Renders the 2x2 comparison figure and writes it as a PNG.
pub fn save_comparison(
    comparison: &Comparison,
    file: &str,
    width: usize,
    height: usize,
) -> Result<()> {
    debug!("rendering {}x{} comparison figure", width, height);
    let mut buffer = ImageBuffer::new(width, height, WHITE);
    let (w, h) = (width / 2, height / 2);

    line_panel(
        &mut buffer,
        Rect { x: 0, y: 0, w, h },
        "Total Rejected Requests Over Time",
        "Requests",
        &comparison.time,
        &[
            (BASELINE_LABEL, &comparison.rejected.baseline, COLOURS[0]),
            (CANDIDATE_LABEL, &comparison.rejected.candidate, COLOURS[1]),
        ],
    );
    line_panel(
        &mut buffer,
        Rect { x: w, y: 0, w, h },
        "Total Energy Consumption Over Time",
        "Watts",
        &comparison.time,
        &[
            (BASELINE_LABEL, &comparison.energy.baseline, COLOURS[0]),
            (CANDIDATE_LABEL, &comparison.energy.candidate, COLOURS[1]),
        ],
    );
    bar_panel(
        &mut buffer,
        Rect { x: 0, y: h, w, h },
        "Total Unsatisfied Requests by Service",
        "Requests",
        &comparison.services,
        &[
            (BASELINE_LABEL, &comparison.unsatisfied.baseline, COLOURS[0]),
            (
                CANDIDATE_LABEL,
                &comparison.unsatisfied.candidate,
                COLOURS[1],
            ),
        ],
    );
    bar_panel(
        &mut buffer,
        Rect { x: w, y: h, w, h },
        "95th Percentile End-to-End Delay by Service",
        "Delay (s)",
        &comparison.services,
        &[
            (BASELINE_LABEL, &comparison.delay_p95.baseline, COLOURS[0]),
            (CANDIDATE_LABEL, &comparison.delay_p95.candidate, COLOURS[1]),
        ],
    );

    buffer.write_png(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::SeriesPair;

    #[test]
    fn buffer_pixels() {
        let mut buffer = ImageBuffer::new(4, 3, WHITE);
        buffer.set_pixel(1, 2, BLACK);
        assert_eq!(buffer.pixel(1, 2), BLACK);
        assert_eq!(buffer.pixel(0, 0), WHITE);
        // out of bounds writes are dropped
        buffer.set_pixel(100, 100, BLACK);
    }

    #[test]
    fn fill_rect_clips() {
        let mut buffer = ImageBuffer::new(4, 4, WHITE);
        buffer.fill_rect(-5, -5, 100, 100, BLACK);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(buffer.pixel(x, y), BLACK);
            }
        }
    }

    #[test]
    fn rotation_swaps_dimensions() {
        let mut buffer = ImageBuffer::new(3, 2, WHITE);
        buffer.set_pixel(2, 0, BLACK);
        let rotated = buffer.rotated_ccw();
        assert_eq!(rotated.width(), 2);
        assert_eq!(rotated.height(), 3);
        // (2, 0) maps to (0, width - 1 - 2) = (0, 0)
        assert_eq!(rotated.pixel(0, 0), BLACK);
    }

    #[test]
    fn text_renders_glyphs() {
        let text = string_buffer("p95", 20.0, BLACK);
        assert!(text.width() > 0);
        assert!(text.height() >= 20);
        let mut dark = 0;
        for y in 0..text.height() {
            for x in 0..text.width() {
                if text.pixel(x, y) == BLACK {
                    dark += 1;
                }
            }
        }
        assert!(dark > 0);
    }

    #[test]
    fn tick_positions() {
        let (positions, step) = ticks(0.0, 100.0, 5);
        assert_eq!(step, 20.0);
        assert_eq!(positions, vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);

        let (positions, _) = ticks(0.0, 0.0, 5);
        assert_eq!(positions, vec![0.0]);

        let (positions, step) = ticks(0.0, 1.0, 5);
        assert!((step - 0.2).abs() < 1e-9);
        assert_eq!(positions.len(), 6);
    }

    #[test]
    fn tick_formatting() {
        assert_eq!(format_tick(20.0, 20.0), "20");
        assert_eq!(format_tick(0.4, 0.2), "0.4");
        assert_eq!(format_tick(0.05, 0.05), "0.05");
    }

    #[test]
    fn figure_written_and_decodable() {
        let comparison = Comparison {
            time: vec![0.0, 1.0, 2.0],
            services: vec!["svc1".to_string(), "svc2".to_string()],
            rejected: SeriesPair {
                baseline: vec![3.0, 7.0, 11.0],
                candidate: vec![2.0, 6.0, 10.0],
            },
            energy: SeriesPair {
                baseline: vec![16.0, 27.0, 38.0],
                candidate: vec![15.0, 26.0, 37.0],
            },
            unsatisfied: SeriesPair {
                baseline: vec![6.0, 3.0],
                candidate: vec![5.0, 2.0],
            },
            delay_p95: SeriesPair {
                baseline: vec![5.75, 8.9],
                candidate: vec![5.0, 8.0],
            },
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("figure.png");
        let path = path.to_str().unwrap();
        save_comparison(&comparison, path, 800, 600).unwrap();

        let decoder = png::Decoder::new(File::open(path).unwrap());
        let (info, _) = decoder.read_info().unwrap();
        assert_eq!(info.width, 800);
        assert_eq!(info.height, 600);
    }
}
