//! Float RGBA colors and hue helpers.
//!
//! Knob and field colors are computed in floating point with an alpha
//! channel. A terminal cell has no alpha, so colors are composited onto a
//! background before they are handed to ratatui.

use ratatui::style::Color;

/// An RGBA color with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

/// Hue, saturation and lightness, each in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Rgba {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Build an opaque color from 8-bit channels.
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Parse `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#')?;
        if !matches!(digits.len(), 6 | 8) || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        let a = if digits.len() == 8 { channel(6)? } else { 1.0 };
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?, a))
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    /// Per-channel average of two colors with the given alpha.
    pub fn mix(self, other: Rgba, a: f32) -> Self {
        Self::new(
            (self.r + other.r) / 2.0,
            (self.g + other.g) / 2.0,
            (self.b + other.b) / 2.0,
            a,
        )
    }

    /// Composite this color over an opaque background.
    pub fn over(self, bg: Rgba) -> Self {
        let a = self.a.clamp(0.0, 1.0);
        Self::rgb(
            self.r * a + bg.r * (1.0 - a),
            self.g * a + bg.g * (1.0 - a),
            self.b * a + bg.b * (1.0 - a),
        )
    }

    /// Invert the color channels, keeping alpha.
    pub fn invert(self) -> Self {
        Self::new(1.0 - self.r, 1.0 - self.g, 1.0 - self.b, self.a)
    }

    /// Convert to hue/saturation/lightness.
    pub fn to_hsl(self) -> Hsl {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let l = (max + min) / 2.0;
        if max == min {
            return Hsl { h: 0.0, s: 0.0, l };
        }
        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == self.r {
            (self.g - self.b) / d + if self.g < self.b { 6.0 } else { 0.0 }
        } else if max == self.g {
            (self.b - self.r) / d + 2.0
        } else {
            (self.r - self.g) / d + 4.0
        };
        Hsl { h: h / 6.0, s, l }
    }
}

impl From<Rgba> for Color {
    fn from(c: Rgba) -> Self {
        let to8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Color::Rgb(to8(c.r), to8(c.g), to8(c.b))
    }
}

fn hue_channel(mut h: f32, m1: f32, m2: f32) -> f32 {
    if h < 0.0 {
        h += 1.0;
    }
    if h > 1.0 {
        h -= 1.0;
    }
    if h < 1.0 / 6.0 {
        m1 + (m2 - m1) * h * 6.0
    } else if h < 3.0 / 6.0 {
        m2
    } else if h < 4.0 / 6.0 {
        m1 + (m2 - m1) * (2.0 / 3.0 - h) * 6.0
    } else {
        m1
    }
}

/// Color from hue/saturation/lightness. Hue wraps; `s` and `l` are clamped.
pub fn hsla(h: f32, s: f32, l: f32, a: f32) -> Rgba {
    let h = h.rem_euclid(1.0);
    let s = s.clamp(0.0, 1.0);
    let l = l.clamp(0.0, 1.0);
    let m2 = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let m1 = 2.0 * l - m2;
    Rgba::new(
        hue_channel(h + 1.0 / 3.0, m1, m2).clamp(0.0, 1.0),
        hue_channel(h, m1, m2).clamp(0.0, 1.0),
        hue_channel(h - 1.0 / 3.0, m1, m2).clamp(0.0, 1.0),
        a,
    )
}

/// Muted color for a hue in `0.0..=1.0`.
pub fn hue_to_color(hue: f32) -> Rgba {
    hsla(hue, 0.5, 0.5, 1.0)
}

pub fn hue_to_color_sl(hue: f32, saturation: f32, lightness: f32) -> Rgba {
    hsla(hue, saturation, lightness, 1.0)
}

/// Fully saturated color for gradient sweeps.
pub fn hue_to_color_gradient(hue: f32) -> Rgba {
    hsla(hue, 1.0, 0.5, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Rgba, b: Rgba) -> bool {
        (a.r - b.r).abs() < 1e-4
            && (a.g - b.g).abs() < 1e-4
            && (a.b - b.b).abs() < 1e-4
            && (a.a - b.a).abs() < 1e-4
    }

    #[test]
    fn primary_hues() {
        assert!(close(hue_to_color_gradient(0.0), Rgba::rgb(1.0, 0.0, 0.0)));
        assert!(close(hue_to_color_gradient(1.0 / 3.0), Rgba::rgb(0.0, 1.0, 0.0)));
        assert!(close(hue_to_color_gradient(2.0 / 3.0), Rgba::rgb(0.0, 0.0, 1.0)));
    }

    #[test]
    fn hue_wraps() {
        assert!(close(hue_to_color(1.25), hue_to_color(0.25)));
    }

    #[test]
    fn muted_red() {
        assert!(close(hue_to_color(0.0), Rgba::rgb(0.75, 0.25, 0.25)));
    }

    #[test]
    fn invert_keeps_alpha() {
        let c = Rgba::new(0.2, 0.4, 1.0, 0.3).invert();
        assert!(close(c, Rgba::new(0.8, 0.6, 0.0, 0.3)));
    }

    #[test]
    fn hsl_roundtrip() {
        for &(h, s, l) in &[(0.1, 0.5, 0.5), (0.6, 0.8, 0.3), (0.9, 0.2, 0.7)] {
            let hsl = hue_to_color_sl(h, s, l).to_hsl();
            assert!((hsl.h - h).abs() < 1e-4, "{hsl:?}");
            assert!((hsl.s - s).abs() < 1e-4, "{hsl:?}");
            assert!((hsl.l - l).abs() < 1e-4, "{hsl:?}");
        }
    }

    #[test]
    fn gray_has_no_hue() {
        let hsl = Rgba::rgb(0.5, 0.5, 0.5).to_hsl();
        assert_eq!(hsl.s, 0.0);
        assert_eq!(hsl.l, 0.5);
    }

    #[test]
    fn hex_parsing() {
        assert_eq!(Rgba::from_hex("#ff0000"), Some(Rgba::rgb(1.0, 0.0, 0.0)));
        assert_eq!(Rgba::from_hex("#00000000").map(|c| c.a), Some(0.0));
        assert_eq!(Rgba::from_hex("ff0000"), None);
        assert_eq!(Rgba::from_hex("#ff00"), None);
        assert_eq!(Rgba::from_hex("#gg0000"), None);
    }

    #[test]
    fn composite_over_background() {
        let c = Rgba::new(1.0, 1.0, 1.0, 0.5).over(Rgba::rgb(0.0, 0.0, 0.0));
        assert!(close(c, Rgba::rgb(0.5, 0.5, 0.5)));
        assert_eq!(Color::from(Rgba::rgb(1.0, 0.0, 0.0)), Color::Rgb(255, 0, 0));
    }
}
