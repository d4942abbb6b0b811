/*
 *  display/font.rs
 *
 *  lcdmsg - ST7565 message panel
 *  (c) 2020-26 Stuart Hunter
 *
 *  16x16 glyph table keyed by character code
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

use std::ops::RangeInclusive;

use embedded_graphics::mono_font::{ascii::FONT_7X14, MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

use crate::display::framebuffer::Canvas;

pub const GLYPH_COLUMNS: usize = 16;
pub const GLYPH_STRIPS: usize = 2;

/// One glyph: two strips of 8 rows, one byte per column, LSB on top
pub type Glyph = [[u8; GLYPH_COLUMNS]; GLYPH_STRIPS];

pub const BLANK_GLYPH: Glyph = [[0; GLYPH_COLUMNS]; GLYPH_STRIPS];

const TABLE_SIZE: usize = 256;

/// Read-only font indexed by character code (0-255).
#[derive(Debug, Clone)]
pub struct GlyphTable {
    glyphs: Vec<Option<Glyph>>,
    font_width: u32,
}

impl GlyphTable {
    /// An empty table; every lookup misses.
    pub fn empty(font_width: u32) -> Self {
        Self { glyphs: vec![None; TABLE_SIZE], font_width }
    }

    /// Rasterize `codes` of a mono font into 16x16 cells. The advance is the
    /// font's character width plus its spacing.
    pub fn from_mono_font(font: &MonoFont<'_>, codes: RangeInclusive<u8>) -> Self {
        let mut table = Self::empty(font.character_size.width + font.character_spacing);
        let style = MonoTextStyle::new(font, BinaryColor::On);
        let mut cell = Canvas::new(GLYPH_COLUMNS as u32, (GLYPH_STRIPS * 8) as u32);

        for code in codes {
            let ch = char::from(code);
            let mut utf8 = [0u8; 4];
            cell.clear(BinaryColor::Off);
            // Canvas is infallible
            let _ = Text::with_baseline(ch.encode_utf8(&mut utf8), Point::zero(), style, Baseline::Top)
                .draw(&mut cell);

            let mut glyph = BLANK_GLYPH;
            for (strip, bytes) in cell.as_bytes().chunks_exact(GLYPH_COLUMNS).enumerate() {
                glyph[strip].copy_from_slice(bytes);
            }
            table.glyphs[usize::from(code)] = Some(glyph);
        }
        table
    }

    /// Printable ASCII from the 7x14 font, seven pixels per character so a
    /// full 18 character line fits across 128 columns.
    pub fn builtin() -> Self {
        Self::from_mono_font(&FONT_7X14, 0x20..=0x7E)
    }

    pub fn insert(&mut self, code: u8, glyph: Glyph) {
        self.glyphs[usize::from(code)] = Some(glyph);
    }

    /// Glyph for `ch`, or None when the code is past the table or was never
    /// authored.
    pub fn lookup(&self, ch: char) -> Option<&Glyph> {
        let code = usize::try_from(u32::from(ch)).ok()?;
        self.glyphs.get(code)?.as_ref()
    }

    pub fn glyph_or_blank(&self, ch: char) -> &Glyph {
        self.lookup(ch).unwrap_or(&BLANK_GLYPH)
    }

    /// Horizontal advance per character in pixels
    pub fn font_width(&self) -> u32 {
        self.font_width
    }

    pub fn len(&self) -> usize {
        self.glyphs.iter().filter(|g| g.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
