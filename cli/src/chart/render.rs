//! In-process rasterizer for [`ChartSpec`].
//!
//! Draws grid lines, candle wicks and bodies, overlay polylines and a row of
//! legend colour keys onto an RGB canvas. No text is drawn.

use crate::{
    error::{AnalystError, Result},
    models::{ChartLayer, ChartSpec, Rgb},
};
use chrono::NaiveDate;
use image::{Rgb as Pixel, RgbImage};
use std::collections::HashMap;

pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 720;

const MIN_SIDE: u32 = 100;
const MAX_SIDE: u32 = 8192;

#[derive(Debug, Clone)]
pub struct ChartStyle {
    pub background: Rgb,
    pub grid: Rgb,
    pub bullish: Rgb,
    pub bearish: Rgb,
    pub grid_lines: u32,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            background: Rgb(255, 255, 255),
            grid: Rgb(230, 230, 230),
            bullish: Rgb(38, 166, 154),
            bearish: Rgb(239, 83, 80),
            grid_lines: 6,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PlotArea {
    left: f64,
    top: f64,
    width: f64,
    height: f64,
}

#[derive(Debug, Clone)]
pub struct Rasterizer {
    width: u32,
    height: u32,
    style: ChartStyle,
}

impl Rasterizer {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        for (label, side) in [("width", width), ("height", height)] {
            if !(MIN_SIDE..=MAX_SIDE).contains(&side) {
                return Err(AnalystError::Render(format!(
                    "canvas {} {} outside {}..={}",
                    label, side, MIN_SIDE, MAX_SIDE
                )));
            }
        }
        Ok(Self {
            width,
            height,
            style: ChartStyle::default(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn render(&self, spec: &ChartSpec) -> Result<RgbImage> {
        let candles = spec.candles();
        if candles.is_empty() {
            return Err(AnalystError::Render(format!(
                "chart '{}' has no candlestick layer to draw",
                spec.title()
            )));
        }
        let (lo, hi) = spec
            .price_bounds()
            .ok_or_else(|| AnalystError::Render("chart has no finite prices".to_string()))?;
        let (lo, hi) = padded_bounds(lo, hi);
        if !(hi - lo).is_finite() {
            return Err(AnalystError::Render(format!("price range {}..{} cannot be drawn", lo, hi)));
        }

        let mut img = RgbImage::from_pixel(self.width, self.height, pixel(self.style.background));
        let area = PlotArea {
            left: 16.0,
            top: 36.0,
            width: self.width as f64 - 32.0,
            height: self.height as f64 - 56.0,
        };
        let to_y = |price: f64| area.top + (hi - price) / (hi - lo) * area.height;
        let slot = area.width / candles.len() as f64;
        let to_x = |index: usize| area.left + (index as f64 + 0.5) * slot;

        // Grid
        for g in 0..=self.style.grid_lines {
            let y = area.top + area.height * g as f64 / self.style.grid_lines.max(1) as f64;
            draw_line(&mut img, area.left, y, area.left + area.width, y, self.style.grid);
        }

        // Candles
        let half_body = (slot * 0.35).max(0.5);
        for (i, candle) in candles.iter().enumerate() {
            if ![candle.open, candle.high, candle.low, candle.close].iter().all(|p| p.is_finite()) {
                continue;
            }
            let color = if candle.close >= candle.open {
                self.style.bullish
            } else {
                self.style.bearish
            };
            let x = to_x(i);
            draw_line(&mut img, x, to_y(candle.high), x, to_y(candle.low), color);

            let body_top = to_y(candle.open.max(candle.close));
            let body_bottom = to_y(candle.open.min(candle.close));
            fill_rect(&mut img, x - half_body, body_top, x + half_body, body_bottom.max(body_top + 1.0), color);
        }

        // Overlays
        let index_of: HashMap<NaiveDate, usize> =
            candles.iter().enumerate().map(|(i, c)| (c.date, i)).collect();

        for (n, layer) in spec.overlays().enumerate() {
            let ChartLayer::Line { color, points, .. } = layer else {
                continue;
            };

            let coords: Vec<(f64, f64)> = points
                .iter()
                .filter(|(_, value)| value.is_finite())
                .filter_map(|(date, value)| index_of.get(date).map(|&i| (to_x(i), to_y(*value))))
                .collect();

            for pair in coords.windows(2) {
                let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
                draw_line(&mut img, x0, y0, x1, y1, *color);
                draw_line(&mut img, x0, y0 + 1.0, x1, y1 + 1.0, *color);
            }
            if let [(x, y)] = coords.as_slice() {
                fill_rect(&mut img, x - 1.0, y - 1.0, x + 1.0, y + 1.0, *color);
            }

            // Legend key
            let key_x = area.left + n as f64 * 28.0;
            fill_rect(&mut img, key_x, 14.0, key_x + 20.0, 20.0, *color);
        }

        Ok(img)
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            style: ChartStyle::default(),
        }
    }
}

/// Leave 5% headroom; a flat series gets a fixed band around its price.
fn padded_bounds(lo: f64, hi: f64) -> (f64, f64) {
    let span = hi - lo;
    if span <= f64::EPSILON {
        let pad = (lo.abs() * 0.01).max(1.0);
        return (lo - pad, hi + pad);
    }
    (lo - span * 0.05, hi + span * 0.05)
}

fn pixel(color: Rgb) -> Pixel<u8> {
    Pixel([color.0, color.1, color.2])
}

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, pixel(color));
    }
}

/// Canvas coordinate clamped to a band just outside the image, so line
/// walks stay bounded.
fn coord(v: f64) -> i64 {
    let limit = (MAX_SIDE * 2) as f64;
    v.round().clamp(-limit, limit) as i64
}

/// Bresenham line; pixels outside the canvas are skipped, as are lines with
/// non-finite ends.
fn draw_line(img: &mut RgbImage, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgb) {
    if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
        return;
    }
    let (mut x, mut y) = (coord(x0), coord(y0));
    let (x1, y1) = (coord(x1), coord(y1));
    let dx = (x1 - x).abs();
    let dy = -(y1 - y).abs();
    let sx = if x < x1 { 1 } else { -1 };
    let sy = if y < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        put(img, x, y, color);
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

fn fill_rect(img: &mut RgbImage, x0: f64, y0: f64, x1: f64, y1: f64, color: Rgb) {
    if ![x0, y0, x1, y1].iter().all(|v| v.is_finite()) {
        return;
    }
    let (xa, xb) = (coord(x0.min(x1)).max(0), coord(x0.max(x1)).min(img.width() as i64));
    let (ya, yb) = (coord(y0.min(y1)).max(0), coord(y0.max(y1)).min(img.height() as i64));
    for y in ya..=yb {
        for x in xa..=xb {
            put(img, x, y, color);
        }
    }
}
