use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use aerotile_core::transform::InterpolationFilter;
use aerotile_core::{GeorefConfig, Georeferencer};
use anyhow::Context;
use clap::{Parser, ValueEnum};
use env_logger::Env;

#[derive(Parser)]
#[command(name = "aerotile")]
#[command(about = "Georeference aerial photos along a flight line as GeoTIFFs", long_about = None)]
#[command(version)]
struct Cli {
    /// Flight list: filename, center x, center y, ..., resolution
    #[arg(value_hint = clap::ValueHint::FilePath)]
    csv: PathBuf,

    /// TOML file with georeferencing parameters
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Directory the photo filenames are relative to
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    images_dir: Option<PathBuf>,

    /// Directory for the GeoTIFFs
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    output_dir: Option<PathBuf>,

    /// Crop window width in pixels
    #[arg(long)]
    crop_width: Option<u32>,

    /// Crop window height in pixels
    #[arg(long)]
    crop_height: Option<u32>,

    /// Ground resolution (m/px) for rows without one
    #[arg(long)]
    resolution: Option<f64>,

    /// Extra rotation added to every heading, degrees
    #[arg(long, allow_hyphen_values = true)]
    rotation: Option<f64>,

    /// Ground shift along the photo x axis
    #[arg(long, allow_hyphen_values = true)]
    x_shift: Option<f64>,

    /// Ground shift along the photo y axis
    #[arg(long, allow_hyphen_values = true)]
    y_shift: Option<f64>,

    /// Resampling filter for rotation
    #[arg(long)]
    filter: Option<FilterArg>,

    /// Worker threads (defaults to one per core)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// The flight list starts with a header row
    #[arg(long)]
    header: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum FilterArg {
    Bilinear,
    Lanczos3,
}

impl From<FilterArg> for InterpolationFilter {
    fn from(arg: FilterArg) -> Self {
        match arg {
            FilterArg::Bilinear => InterpolationFilter::Bilinear,
            FilterArg::Lanczos3 => InterpolationFilter::Lanczos3,
        }
    }
}

impl Cli {
    /// Load the config file, if any, and apply the flag overrides.
    fn georef_config(&self) -> anyhow::Result<GeorefConfig> {
        let mut config = match &self.config {
            Some(path) => GeorefConfig::load(path)?,
            None => GeorefConfig::default(),
        };

        if let Some(dir) = &self.images_dir {
            config.images_dir = dir.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(width) = self.crop_width {
            config.crop_width = width;
        }
        if let Some(height) = self.crop_height {
            config.crop_height = height;
        }
        if let Some(resolution) = self.resolution {
            config.default_resolution = resolution;
        }
        if let Some(rotation) = self.rotation {
            config.extra_rotation_deg = rotation;
        }
        if let Some(x) = self.x_shift {
            config.x_shift = x;
        }
        if let Some(y) = self.y_shift {
            config.y_shift = y;
        }
        if let Some(filter) = self.filter {
            config.filter = filter.into();
        }
        if self.jobs.is_some() {
            config.jobs = self.jobs;
        }
        if self.header {
            config.has_header = true;
        }

        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logger with default level (overridden by RUST_LOG)
    let env = Env::default().default_filter_or("info");
    env_logger::Builder::from_env(env).init();

    let config = cli.georef_config()?;
    let georef = Georeferencer::new(config)?;

    let file = File::open(&cli.csv)
        .with_context(|| format!("Failed to open flight list {}", cli.csv.display()))?;
    let report = georef.run_reader(BufReader::new(file));

    println!(
        "{} of {} photos georeferenced into {}",
        report.succeeded(),
        report.photos.len(),
        georef.config().output_dir.display()
    );

    if !report.is_success() {
        for failure in report.failures() {
            if let Err(e) = &failure.outcome {
                eprintln!(
                    "  row {}: {}: {e}",
                    failure.row,
                    failure.filename.as_deref().unwrap_or("-")
                );
            }
        }
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "aerotile",
            "flight.csv",
            "--crop-width",
            "800",
            "--rotation",
            "-2.5",
            "--filter",
            "lanczos3",
            "--header",
        ]);
        let config = cli.georef_config().unwrap();

        assert_eq!(config.crop_width, 800);
        assert_eq!(config.crop_height, 1000);
        assert_eq!(config.extra_rotation_deg, -2.5);
        assert_eq!(config.filter, InterpolationFilter::Lanczos3);
        assert!(config.has_header);
        assert_eq!(config.jobs, None);
    }

    #[test]
    fn test_no_flags_is_default() {
        let cli = Cli::parse_from(["aerotile", "flight.csv"]);
        assert_eq!(cli.georef_config().unwrap(), GeorefConfig::default());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
