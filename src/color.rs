use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (i as f32 / n as f32) * 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.45);
            let rgb: Srgb = hsl.into_color();
            Color32::from_rgb(
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
            )
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Colour specs: single letter codes or #rrggbb
// ---------------------------------------------------------------------------

/// Parse `b g r c m y k w` or `#rrggbb`.
pub fn parse_color(spec: &str) -> Result<Color32> {
    let color = match spec {
        "b" => Color32::from_rgb(0, 0, 255),
        "g" => Color32::from_rgb(0, 128, 0),
        "r" => Color32::from_rgb(255, 0, 0),
        "c" => Color32::from_rgb(0, 191, 191),
        "m" => Color32::from_rgb(191, 0, 191),
        "y" => Color32::from_rgb(191, 191, 0),
        "k" => Color32::BLACK,
        "w" => Color32::WHITE,
        hex => parse_hex(hex).ok_or_else(|| Error::Style(format!("unknown colour '{spec}'")))?,
    };
    Ok(color)
}

fn parse_hex(s: &str) -> Option<Color32> {
    let digits = s.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(digits.get(i..i + 2)?, 16).ok();
    Some(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_has_distinct_colours() {
        let palette = generate_palette(4);
        assert_eq!(palette.len(), 4);
        for (i, a) in palette.iter().enumerate() {
            for b in &palette[i + 1..] {
                assert_ne!(a, b);
            }
        }
        assert!(generate_palette(0).is_empty());
    }

    #[test]
    fn colour_codes_and_hex() {
        assert_eq!(parse_color("r").unwrap(), Color32::from_rgb(255, 0, 0));
        assert_eq!(parse_color("k").unwrap(), Color32::BLACK);
        assert_eq!(
            parse_color("#1f77b4").unwrap(),
            Color32::from_rgb(0x1f, 0x77, 0xb4)
        );
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("purple").is_err());
    }
}
