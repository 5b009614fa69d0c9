mod prompt;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use histeq::image::io::{load, save};
use histeq::{BackendPreference, EqualizeConfig, HistogramEqualization, ProcessingContext};

use crate::prompt::prompt_bin_count;

#[derive(Parser)]
#[command(name = "equalize")]
#[command(version, about = "Histogram equalization on GPU or CPU", long_about = None)]
struct Cli {
    /// Platform index, see --list
    #[arg(short, long, value_name = "N")]
    platform: Option<usize>,

    /// Device index within the platform
    #[arg(short, long, value_name = "N")]
    device: Option<usize>,

    /// Print all platforms and devices
    #[arg(short, long)]
    list: bool,

    /// Input image
    #[arg(short, long, value_name = "FILE", default_value = "test.pgm")]
    file: PathBuf,

    /// Output image [default: <input stem>_equalized.png]
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Number of histogram bins (1-256); asked for when omitted
    #[arg(short, long, value_name = "N")]
    bins: Option<u16>,

    /// Compute backend: auto, cpu or gpu
    #[arg(long, value_name = "BACKEND")]
    backend: Option<BackendPreference>,

    /// WGSL file replacing the built-in kernels
    #[arg(long, value_name = "FILE")]
    kernels: Option<PathBuf>,

    /// CPU worker threads
    #[arg(short = 'j', long, value_name = "N")]
    threads: Option<usize>,

    /// YAML or JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print every bin of each stage
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Loads the config file, if any, and applies command line overrides.
    fn config(&self) -> Result<EqualizeConfig> {
        let mut config = match &self.config {
            Some(path) => EqualizeConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => EqualizeConfig::default(),
        };

        if self.platform.is_some() {
            config.platform = self.platform;
        }
        if self.device.is_some() {
            config.device = self.device;
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if self.kernels.is_some() {
            config.kernel_source = self.kernels.clone();
        }
        if self.bins.is_some() {
            config.bins = self.bins;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }

        Ok(config)
    }
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{}_equalized.png", stem))
}

fn print_platforms() {
    let platforms = histeq::list_platforms();
    if platforms.is_empty() {
        println!("No GPU platforms found.");
    }
    for platform in &platforms {
        println!("{}", platform);
    }
}

fn print_bins<T: std::fmt::Display>(name: &str, values: &[T]) {
    let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    println!("{} = [{}]", name, values.join(", "));
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    common::log_setup::setup_logging("equalize", "warn", Some(Path::new("logs")));

    let config = cli.config()?;
    if cli.list {
        print_platforms();
    }

    let mut ctx = ProcessingContext::from_config(&config)?;
    println!("Running on {}", ctx.device_description());

    let source = load(&cli.file)?;
    tracing::info!(file = %cli.file.display(), size = %source.desc(), "image loaded");
    if source.is_color() {
        println!("Image is RGB.");
    } else {
        println!("Image is Greyscale.");
    }

    let bins = match config.bin_count()? {
        Some(bins) => bins,
        None => prompt_bin_count(&mut io::stdin().lock(), &mut io::stdout())?,
    };

    let result = HistogramEqualization::new(bins).execute(&mut ctx, source.luma())?;

    if cli.verbose {
        print_bins("Histogram", &result.histogram[..]);
        print_bins("Cumulative Histogram", &result.cumulative[..]);
        print_bins("LUT", &result.lut[..]);
    }
    println!("{}", result.timings);

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&cli.file));
    let raster = source.recombine(&result.output)?;
    save(&output, &raster)?;
    println!("Saved {}", output.display());

    Ok(())
}
