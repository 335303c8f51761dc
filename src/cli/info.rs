use anyhow::{Context, Result};
use std::path::PathBuf;

#[cfg(feature = "colorized_output")]
use console::style;

use tomostream::writer::{SetManifest, MANIFEST_FILE};

/// Display the manifest of an output set
pub fn run(output: PathBuf) -> Result<()> {
    if !output.is_dir() {
        anyhow::bail!("Output set does not exist: {}", output.display());
    }

    let manifest = SetManifest::load(&output)
        .context("Failed to read manifest")?
        .with_context(|| format!("No {} in {}", MANIFEST_FILE, output.display()))?;

    #[cfg(feature = "colorized_output")]
    println!("{}", style("Tilt-series Output Set").bold().cyan());
    #[cfg(not(feature = "colorized_output"))]
    println!("Tilt-series Output Set");
    println!("======================");
    println!("Directory: {}", output.display());
    println!("Format version: {}", manifest.format_version);
    println!("Run ID: {}", manifest.run_id);
    println!("Created: {}", manifest.created.to_rfc3339());
    println!("Updated: {}", manifest.updated.to_rfc3339());
    println!(
        "Finalized: {}",
        if manifest.finalized { "yes" } else { "no (resumable)" }
    );
    println!("Consumed mdoc files: {}", manifest.consumed_files.len());
    println!();

    println!("Series ({}):", manifest.series.len());
    for entry in &manifest.series {
        let tilts = format!("{}/{} tilts", entry.angles_count, entry.frames_expected);

        #[cfg(feature = "colorized_output")]
        let tilts = if entry.is_partial() {
            style(tilts).yellow().to_string()
        } else {
            style(tilts).green().to_string()
        };

        println!(
            "  {:<16} {:>12}  {:.3} Å/px  {:.0} kV  tilt axis {:.2}°  {}",
            entry.ts_id,
            tilts,
            entry.sampling_rate,
            entry.acquisition.voltage,
            entry.acquisition.tilt_axis_angle,
            entry.table.display()
        );
    }

    Ok(())
}
