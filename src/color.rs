use image::Rgba;
use palette::{Hsl, IntoColor, Srgb};

use crate::data::model::AnomalyLabel;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

/// Generates `n` visually distinct colours using evenly spaced hues,
/// starting at `hue_offset` degrees.
pub fn generate_palette(n: usize, hue_offset: f32) -> Vec<Rgba<u8>> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| {
            let hue = (hue_offset + (i as f32 / n as f32) * 360.0) % 360.0;
            let hsl = Hsl::new(hue, 0.75, 0.55);
            let rgb: Srgb = hsl.into_color();
            Rgba([
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
                255,
            ])
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Label colours
// ---------------------------------------------------------------------------

/// One fixed colour per [`AnomalyLabel`], so every render looks the same.
#[derive(Debug, Clone)]
pub struct LabelPalette {
    colors: Vec<(AnomalyLabel, Rgba<u8>)>,
}

impl Default for LabelPalette {
    fn default() -> Self {
        // Normal lands on blue, Anomaly on the opposite (orange) hue.
        let palette = generate_palette(AnomalyLabel::ALL.len(), 210.0);
        LabelPalette {
            colors: AnomalyLabel::ALL.into_iter().zip(palette).collect(),
        }
    }
}

impl LabelPalette {
    pub fn color_for(&self, label: AnomalyLabel) -> Rgba<u8> {
        self.colors
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, c)| *c)
            .unwrap_or(Rgba([128, 128, 128, 255]))
    }

    /// Legend entries in the fixed label order.
    pub fn legend_entries(&self) -> Vec<(String, Rgba<u8>)> {
        self.colors
            .iter()
            .map(|(l, c)| (l.to_string(), *c))
            .collect()
    }
}
