//! Colour and coordinate helpers shared by cutout and synthesis.
//!
//! Layout bounds arrive as percentages of the slide. They are mapped either
//! onto raster pixels (for cropping) or onto EMU (for placement). Both
//! mappings round to the nearest integer and never produce a value outside
//! the target extent.

use serde::{Deserialize, Serialize};

/// An opaque RGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Upper-case `RRGGBB`, no leading `#`, as DrawingML expects.
    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Strict hex parse: exactly six hex digits, optionally prefixed by `#`.
pub fn parse_hex(s: &str) -> Option<Rgb> {
    let s = s.trim();
    let digits = s.strip_prefix('#').unwrap_or(s);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Rgb::new(channel(0)?, channel(2)?, channel(4)?))
}

/// Lenient parse used for backgrounds: anything malformed is white.
pub fn hex_to_rgb(s: &str) -> Rgb {
    parse_hex(s).unwrap_or(Rgb::WHITE)
}

/// Manhattan distance between two colours, in `[0, 765]`.
pub fn color_distance(a: Rgb, b: Rgb) -> u32 {
    a.r.abs_diff(b.r) as u32 + a.g.abs_diff(b.g) as u32 + a.b.abs_diff(b.b) as u32
}

/// Map a percentage onto `[0, dim]` pixels. Non-finite input maps to 0.
pub fn percent_to_pixels(percent: f64, dim: u32) -> u32 {
    if !percent.is_finite() {
        return 0;
    }
    let px = (percent / 100.0 * dim as f64).round();
    px.clamp(0.0, dim as f64) as u32
}

/// Like [`percent_to_pixels`], but an extent is never smaller than one pixel.
pub fn percent_to_extent(percent: f64, dim: u32) -> u32 {
    percent_to_pixels(percent, dim).max(1)
}

/// Map a percentage of a slide extent onto EMU.
pub fn percent_to_emu(percent: f64, extent_emu: i64) -> i64 {
    if !percent.is_finite() {
        return 0;
    }
    (percent / 100.0 * extent_emu as f64).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_hex_accepts_with_and_without_hash() {
        assert_eq!(parse_hex("#1A2b3C"), Some(Rgb::new(0x1a, 0x2b, 0x3c)));
        assert_eq!(parse_hex("ffffff"), Some(Rgb::WHITE));
    }

    #[test]
    fn parse_hex_rejects_malformed() {
        assert_eq!(parse_hex("#fff"), None);
        assert_eq!(parse_hex("#12345g"), None);
        assert_eq!(parse_hex(""), None);
        assert_eq!(parse_hex("#1234567"), None);
    }

    #[test]
    fn hex_to_rgb_falls_back_to_white() {
        assert_eq!(hex_to_rgb("teal"), Rgb::WHITE);
        assert_eq!(hex_to_rgb("#000000"), Rgb::new(0, 0, 0));
    }

    #[test]
    fn to_hex_is_upper_case_without_hash() {
        assert_eq!(Rgb::new(0x0a, 0xbc, 0xff).to_hex(), "0ABCFF");
    }

    #[test]
    fn distance_is_manhattan() {
        assert_eq!(color_distance(Rgb::new(10, 20, 30), Rgb::new(20, 10, 30)), 20);
        assert_eq!(color_distance(Rgb::new(0, 0, 0), Rgb::WHITE), 765);
    }

    #[test]
    fn percent_mapping_rounds_and_clamps() {
        assert_eq!(percent_to_pixels(50.0, 101), 51);
        assert_eq!(percent_to_pixels(150.0, 200), 200);
        assert_eq!(percent_to_pixels(-3.0, 200), 0);
        assert_eq!(percent_to_pixels(f64::NAN, 200), 0);
        assert_eq!(percent_to_extent(0.1, 100), 1);
    }

    #[test]
    fn percent_to_emu_on_widescreen() {
        assert_eq!(percent_to_emu(50.0, 9_144_000), 4_572_000);
        assert_eq!(percent_to_emu(100.0, 5_143_500), 5_143_500);
        assert_eq!(percent_to_emu(f64::INFINITY, 5_143_500), 0);
    }
}
