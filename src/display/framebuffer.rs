/*
 *  display/framebuffer.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  Page-packed monochrome canvas and drawing primitives
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use core::convert::Infallible;
use embedded_graphics::geometry::{OriginDimensions, Size};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use crate::display::font::GlyphTable;

/// How far past the canvas a line is stepped before it gets clipped
const CLIP_MARGIN: i64 = 1024;

/// A monochrome bitmap laid out the way the controller RAM is: each byte
/// is 8 vertically stacked pixels of one column, LSB on top, and pages of
/// `width` bytes follow each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    frame: Box<[u8]>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        let size = width as usize * height.div_ceil(8) as usize;
        Self { width, height, frame: vec![0u8; size].into_boxed_slice() }
    }

    pub fn width(&self) -> u32 { self.width }
    pub fn height(&self) -> u32 { self.height }
    pub fn frame_size(&self) -> usize { self.frame.len() }

    /// Raw page-packed bytes, ready for the panel
    pub fn as_bytes(&self) -> &[u8] { &self.frame }

    /// Byte index and bit mask for (x, y), or None when off-canvas
    #[inline]
    fn locate(&self, x: i32, y: i32) -> Option<(usize, u8)> {
        if x < 0 || y < 0 || x as u32 >= self.width || y as u32 >= self.height {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        Some((self.width as usize * (y / 8) + x, 1u8 << (y % 8)))
    }

    pub fn pixel(&self, x: i32, y: i32) -> Option<BinaryColor> {
        self.locate(x, y)
            .map(|(i, mask)| BinaryColor::from(self.frame[i] & mask != 0))
    }

    /// Set or clear one pixel; off-canvas coordinates are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, color: BinaryColor) {
        if let Some((i, mask)) = self.locate(x, y) {
            match color {
                BinaryColor::On => self.frame[i] |= mask,
                BinaryColor::Off => self.frame[i] &= !mask,
            }
        }
    }

    /// Fill the whole frame with one color.
    pub fn clear(&mut self, color: BinaryColor) {
        self.frame.fill(if color.is_on() { 0xFF } else { 0x00 });
    }

    /// Plot from wide arithmetic; coordinates past `i32` are dropped.
    #[inline]
    fn plot(&mut self, x: i64, y: i64, color: BinaryColor) {
        if let (Ok(x), Ok(y)) = (i32::try_from(x), i32::try_from(y)) {
            self.set_pixel(x, y, color);
        }
    }

    /// Cut a line back to the canvas plus `CLIP_MARGIN` on every side
    /// (Liang-Barsky). Lines already inside that box come back unchanged.
    fn clip_line(&self, x1: i64, y1: i64, x2: i64, y2: i64) -> Option<(i64, i64, i64, i64)> {
        let (xmin, ymin) = (-CLIP_MARGIN, -CLIP_MARGIN);
        let xmax = i64::from(self.width) + CLIP_MARGIN;
        let ymax = i64::from(self.height) + CLIP_MARGIN;
        let inside = |x: i64, y: i64| (xmin..=xmax).contains(&x) && (ymin..=ymax).contains(&y);
        if inside(x1, y1) && inside(x2, y2) {
            return Some((x1, y1, x2, y2));
        }

        let (dx, dy) = ((x2 - x1) as f64, (y2 - y1) as f64);
        let (mut t0, mut t1) = (0.0f64, 1.0f64);
        let edges = [
            (-dx, (x1 - xmin) as f64),
            (dx, (xmax - x1) as f64),
            (-dy, (y1 - ymin) as f64),
            (dy, (ymax - y1) as f64),
        ];
        for (p, q) in edges {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
                continue;
            }
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = t0.max(r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = t1.min(r);
            }
        }
        let at = |t: f64| {
            ((x1 as f64 + t * dx).round() as i64, (y1 as f64 + t * dy).round() as i64)
        };
        let ((ax, ay), (bx, by)) = (at(t0), at(t1));
        Some((ax, ay, bx, by))
    }

    /// Bresenham line, both endpoints included.
    pub fn draw_line(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: BinaryColor) {
        let Some((x1, y1, x2, y2)) =
            self.clip_line(i64::from(x1), i64::from(y1), i64::from(x2), i64::from(y2))
        else {
            return;
        };
        let dx = (x2 - x1).abs();
        let dy = (y2 - y1).abs();
        let sx = if x1 < x2 { 1 } else { -1 };
        let sy = if y1 < y2 { 1 } else { -1 };
        let mut err = dx - dy;
        let (mut x, mut y) = (x1, y1);

        loop {
            self.plot(x, y, color);
            if x == x2 && y == y2 {
                break;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// Rectangle outline between two opposite corners.
    pub fn draw_rect(&mut self, x1: i32, y1: i32, x2: i32, y2: i32, color: BinaryColor) {
        self.draw_line(x1, y1, x2, y1, color);
        self.draw_line(x2, y1, x2, y2, color);
        self.draw_line(x2, y2, x1, y2, color);
        self.draw_line(x1, y2, x1, y1, color);
    }

    /// Midpoint circle outline. A negative radius draws nothing, nor does
    /// a circle whose bounding box misses the canvas.
    pub fn draw_circle(&mut self, x0: i32, y0: i32, radius: i32, color: BinaryColor) {
        if radius < 0 {
            return;
        }
        let (x0, y0, r) = (i64::from(x0), i64::from(y0), i64::from(radius));
        if x0 + r < 0 || y0 + r < 0
            || x0 - r >= i64::from(self.width) || y0 - r >= i64::from(self.height)
        {
            return;
        }
        let mut x = r;
        let mut y = 0i64;
        let mut radius_error = 1 - x;

        while x >= y {
            for (dx, dy) in [(x, y), (y, x), (-x, y), (-y, x), (-x, -y), (-y, -x), (x, -y), (y, -x)] {
                self.plot(x0 + dx, y0 + dy, color);
            }
            y += 1;
            if radius_error < 0 {
                radius_error += 2 * y + 1;
            } else {
                x -= 1;
                radius_error += 2 * (y - x) + 1;
            }
        }
    }

    /// Blit one glyph with its top-left corner at (x0, y0). Only set font
    /// bits are drawn; characters missing from the table draw nothing.
    pub fn draw_glyph(&mut self, x0: i32, y0: i32, ch: char, color: BinaryColor, font: &GlyphTable) {
        let glyph = font.glyph_or_blank(ch);
        for (strip, columns) in glyph.iter().enumerate() {
            for bit in 0..8 {
                let mask = 1u8 << bit;
                for (x, &column) in columns.iter().enumerate() {
                    if column & mask != 0 {
                        self.set_pixel(x0 + x as i32, y0 + (strip * 8 + bit) as i32, color);
                    }
                }
            }
        }
    }

    /// Lay `text` out left to right at the font's fixed advance. No
    /// wrapping; whatever runs off the edge is clipped per pixel.
    pub fn draw_string(&mut self, x0: i32, y0: i32, text: &str, color: BinaryColor, font: &GlyphTable) {
        let advance = font.font_width() as i32;
        for (i, ch) in text.chars().enumerate() {
            self.draw_glyph(x0 + i as i32 * advance, y0, ch, color, font);
        }
    }

    /// Number of lit pixels
    pub fn count_on_pixels(&self) -> usize {
        self.frame.iter().map(|b| b.count_ones() as usize).sum()
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Canvas {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(p, c) in pixels {
            self.set_pixel(p.x, p.y, c);
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        Canvas::clear(self, color);
        Ok(())
    }
}
