use anyhow::{Context, Result};

use rusty_anomaly::detect::rng::{detector_rng, gauss};

const ROWS: usize = 300;
const OUTLIER_EVERY: usize = 25;

fn main() -> Result<()> {
    let mut rng = detector_rng(Some(42));

    let categories = ["retail", "wholesale", "online"];

    let output_path = "sample_data.csv";
    let mut writer = csv::Writer::from_path(output_path)
        .with_context(|| format!("creating {output_path}"))?;
    // Mixed-case, padded headers on purpose: the loader normalizes them.
    writer.write_record([" Amount", "QTY ", "Discount", "Category"])?;

    let mut outliers = 0;
    for row in 0..ROWS {
        let category = categories[row % categories.len()];
        let (amount, qty, discount) = if row % OUTLIER_EVERY == OUTLIER_EVERY - 1 {
            outliers += 1;
            (
                gauss(&mut rng, 900.0, 150.0),
                gauss(&mut rng, 1.0, 0.5).abs().round(),
                gauss(&mut rng, 0.6, 0.1),
            )
        } else {
            (
                gauss(&mut rng, 120.0, 20.0),
                gauss(&mut rng, 8.0, 2.0).abs().round(),
                gauss(&mut rng, 0.1, 0.03).max(0.0),
            )
        };

        // Sprinkle a few unusable cells so coercion has rows to drop.
        let discount_cell = if row % 97 == 13 {
            "n/a".to_string()
        } else {
            format!("{discount:.3}")
        };
        writer.write_record([
            format!("{amount:.2}"),
            format!("{qty}"),
            discount_cell,
            category.to_string(),
        ])?;
    }
    writer.flush().context("flushing CSV writer")?;

    println!("Wrote {ROWS} rows ({outliers} injected outliers) to {output_path}");
    Ok(())
}
