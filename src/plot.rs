use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::color::LabelPalette;
use crate::config::PlotConfig;
use crate::data::model::AnomalyLabel;
use crate::error::{PipelineError, Result};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const AXIS: Rgba<u8> = Rgba([60, 60, 60, 255]);
const GRID: Rgba<u8> = Rgba([225, 225, 225, 255]);
const BAR_ALPHA: f32 = 0.6;
const MARGIN_LEFT: u32 = 60;
const MARGIN_RIGHT: u32 = 20;
const MARGIN_TOP: u32 = 40;
const MARGIN_BOTTOM: u32 = 50;

// ---------------------------------------------------------------------------
// Histogram binning
// ---------------------------------------------------------------------------

/// Frequency counts per label over shared bin edges.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `bins + 1` ascending edges.
    pub edges: Vec<f64>,
    /// One count vector per label, always in [`AnomalyLabel::ALL`] order.
    pub counts: Vec<(AnomalyLabel, Vec<usize>)>,
}

impl Histogram {
    /// Bin every series over the combined value range.
    ///
    /// Fails with [`PipelineError::NoValidData`] when no series has a value.
    pub fn build(series: &[(AnomalyLabel, Vec<f64>)], bins: usize) -> Result<Self> {
        let bins = bins.max(1);
        let (mut lo, mut hi) = series
            .iter()
            .flat_map(|(_, v)| v.iter().copied())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if lo > hi {
            return Err(PipelineError::NoValidData);
        }
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }
        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + i as f64 * width).collect();

        let counts = AnomalyLabel::ALL
            .into_iter()
            .map(|label| {
                let mut counts = vec![0usize; bins];
                for (_, values) in series.iter().filter(|(l, _)| *l == label) {
                    for &v in values {
                        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
                        counts[idx] += 1;
                    }
                }
                (label, counts)
            })
            .collect();
        Ok(Histogram { edges, counts })
    }

    pub fn bins(&self) -> usize {
        self.edges.len() - 1
    }

    pub fn max_count(&self) -> usize {
        self.counts
            .iter()
            .flat_map(|(_, c)| c.iter().copied())
            .max()
            .unwrap_or(0)
    }

    pub fn counts_for(&self, label: AnomalyLabel) -> &[usize] {
        self.counts
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, c)| c.as_slice())
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Draw the overlaid histogram and encode it as PNG.
///
/// Normal bars go down first and Anomaly bars are blended on top, so a
/// render of the same histogram is always pixel-identical.
pub fn render_png(histogram: &Histogram, config: &PlotConfig) -> Result<Vec<u8>> {
    let width = config.width.max(MARGIN_LEFT + MARGIN_RIGHT + 100);
    let height = config.height.max(MARGIN_TOP + MARGIN_BOTTOM + 100);
    let mut img = RgbaImage::from_pixel(width, height, BACKGROUND);

    let x0 = MARGIN_LEFT;
    let x1 = width - MARGIN_RIGHT;
    let y0 = MARGIN_TOP;
    let y1 = height - MARGIN_BOTTOM;
    let plot_w = (x1 - x0) as f64;
    let plot_h = (y1 - y0) as f64;

    // Horizontal grid at every fifth of the tallest bar.
    for step in 1..=4 {
        let y = y1 - (plot_h * step as f64 / 5.0) as u32;
        fill_rect(&mut img, x0, y, x1, y + 1, GRID, 1.0);
    }

    let palette = LabelPalette::default();
    let bins = histogram.bins();
    let max_count = histogram.max_count().max(1) as f64;
    let bar_w = plot_w / bins as f64;
    let gap = u32::from(bar_w >= 4.0);
    for (label, counts) in &histogram.counts {
        let color = palette.color_for(*label);
        for (i, &count) in counts.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let left = x0 + (i as f64 * bar_w) as u32;
            let right = (x0 + ((i + 1) as f64 * bar_w) as u32).saturating_sub(gap).max(left + 1);
            let top = y1 - ((count as f64 / max_count) * plot_h).round() as u32;
            fill_rect(&mut img, left, top, right, y1, color, BAR_ALPHA);
        }
    }

    // Axes and x ticks at the bin edges, thinned to stay legible.
    fill_rect(&mut img, x0, y1, x1, y1 + 2, AXIS, 1.0);
    fill_rect(&mut img, x0 - 2, y0, x0, y1 + 2, AXIS, 1.0);
    let tick_every = ((10.0 / bar_w).ceil() as usize).max(1);
    for i in (0..=bins).step_by(tick_every) {
        let x = x0 + (i as f64 * bar_w) as u32;
        fill_rect(&mut img, x.min(x1 - 1), y1 + 2, x.min(x1 - 1) + 1, y1 + 8, AXIS, 1.0);
    }

    // Legend swatches, top right, Normal then Anomaly.
    let swatch = 14;
    for (i, (_, color)) in palette.legend_entries().into_iter().enumerate() {
        let sx = x1 - (swatch + 6) * (2 - i as u32);
        fill_rect(&mut img, sx, 12, sx + swatch, 12 + swatch, color, BAR_ALPHA);
    }

    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| PipelineError::Render(e.to_string()))?;
    log::debug!("Rendered {width}x{height} histogram ({} bytes)", bytes.len());
    Ok(bytes)
}

/// Alpha-blend `color` over the half-open pixel rectangle, clipped to the image.
fn fill_rect(img: &mut RgbaImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgba<u8>, alpha: f32) {
    let (w, h) = img.dimensions();
    for y in y0.min(h)..y1.min(h) {
        for x in x0.min(w)..x1.min(w) {
            let px = img.get_pixel_mut(x, y);
            for c in 0..3 {
                let blended = alpha * color[c] as f32 + (1.0 - alpha) * px[c] as f32;
                px[c] = blended.round().clamp(0.0, 255.0) as u8;
            }
            px[3] = 255;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    #[test]
    fn bins_values_per_label_over_shared_edges() {
        let hist = Histogram::build(
            &[
                (AnomalyLabel::Normal, vec![0.0, 1.0, 2.0, 2.5]),
                (AnomalyLabel::Anomaly, vec![10.0]),
            ],
            5,
        )
        .unwrap();
        assert_eq!(hist.bins(), 5);
        assert_eq!(hist.edges[0], 0.0);
        assert_eq!(hist.edges[5], 10.0);
        assert_eq!(hist.counts_for(AnomalyLabel::Normal), &[2, 2, 0, 0, 0]);
        assert_eq!(hist.counts_for(AnomalyLabel::Anomaly), &[0, 0, 0, 0, 1]);
        assert_eq!(hist.max_count(), 2);
    }

    #[test]
    fn label_order_is_fixed_regardless_of_input_order() {
        let hist = Histogram::build(
            &[
                (AnomalyLabel::Anomaly, vec![5.0]),
                (AnomalyLabel::Normal, vec![1.0]),
            ],
            2,
        )
        .unwrap();
        let order: Vec<AnomalyLabel> = hist.counts.iter().map(|(l, _)| *l).collect();
        assert_eq!(order, vec![AnomalyLabel::Normal, AnomalyLabel::Anomaly]);
    }

    #[test]
    fn single_value_gets_a_unit_range() {
        let hist = Histogram::build(&[(AnomalyLabel::Normal, vec![3.0, 3.0])], 4).unwrap();
        assert_eq!(hist.edges[0], 2.5);
        assert_eq!(hist.edges[4], 3.5);
        assert_eq!(hist.counts_for(AnomalyLabel::Normal).iter().sum::<usize>(), 2);
        assert!(hist.counts_for(AnomalyLabel::Anomaly).iter().all(|&c| c == 0));
    }

    #[test]
    fn no_values_is_no_valid_data() {
        let err = Histogram::build(&[(AnomalyLabel::Normal, vec![])], 4).unwrap_err();
        assert!(matches!(err, PipelineError::NoValidData));
    }

    #[test]
    fn renders_png_of_configured_size() {
        let hist = Histogram::build(
            &[
                (AnomalyLabel::Normal, vec![1.0, 2.0, 2.0, 3.0]),
                (AnomalyLabel::Anomaly, vec![9.0]),
            ],
            10,
        )
        .unwrap();
        let config = PlotConfig::default();
        let png = render_png(&hist, &config).unwrap();
        assert!(png.starts_with(PNG_MAGIC));

        let decoded = image::load_from_memory_with_format(&png, ImageFormat::Png)
            .unwrap()
            .to_rgba8();
        assert_eq!(decoded.dimensions(), (config.width, config.height));
        // Repeat renders are byte-identical.
        assert_eq!(render_png(&hist, &config).unwrap(), png);
    }
}
