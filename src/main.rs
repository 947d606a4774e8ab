use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use calgrid::config::VisualConfig;
use calgrid::core::model::MonthContext;
use calgrid::export::summarize;
use calgrid::ocr::check_engines;
use calgrid::pipeline::{build_calendar, export_calendar, MonthSource, PipelineConfig};
use calgrid::raster::{is_pdf, pdf_info};

#[derive(Parser, Debug)]
#[command(name = "calgrid")]
#[command(version, about = "School calendar extraction from color-coded calendar grids", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors, no progress lines
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract the calendar from one PDF or image
    Convert {
        /// Input PDF or image path
        input: PathBuf,

        /// Output directory (default: ./<input_name>_output)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Extract calendars from several files
    Batch {
        /// Input PDF or image files
        inputs: Vec<PathBuf>,

        /// Output directory for all results
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        options: RunOptions,
    },

    /// Check that the recognition and rendering engines are installed
    Probe {
        /// Also check the PDF rendering tools
        #[arg(long)]
        pdf: bool,

        /// Configuration file (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show information about an input file
    Info {
        /// Input PDF or image path
        input: PathBuf,
    },

    /// Print the default configuration as TOML
    Config,
}

#[derive(Args, Debug, Clone)]
struct RunOptions {
    /// Month shown on the first page, e.g. 2025-08; later pages follow
    #[arg(long, value_parser = parse_month, required_unless_present = "header_year", conflicts_with = "header_year")]
    first_month: Option<MonthContext>,

    /// Read each page's month from its header; this year is used when the
    /// header shows none
    #[arg(long)]
    header_year: Option<i32>,

    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Rendering DPI (overrides the config file)
    #[arg(long)]
    dpi: Option<u32>,

    /// Grid rows (overrides the config file)
    #[arg(long)]
    rows: Option<usize>,

    /// Grid columns (overrides the config file)
    #[arg(long)]
    cols: Option<usize>,

    /// Treat every page as a single month, never as a year view
    #[arg(long)]
    no_year_view: bool,
}

impl RunOptions {
    fn month_source(&self) -> Result<MonthSource> {
        match (self.first_month, self.header_year) {
            (Some(first), _) => Ok(MonthSource::Sequential(first)),
            (None, Some(fallback_year)) => Ok(MonthSource::Header { fallback_year }),
            (None, None) => anyhow::bail!("either --first-month or --header-year is required"),
        }
    }

    fn visual_config(&self) -> Result<VisualConfig> {
        let mut config = load_config(self.config.as_ref())?;
        if let Some(dpi) = self.dpi {
            config.raster.dpi = dpi;
        }
        if let Some(rows) = self.rows {
            config.grid.rows = rows;
        }
        if let Some(cols) = self.cols {
            config.grid.cols = cols;
        }
        if self.no_year_view {
            config.year_view.enabled = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn parse_month(raw: &str) -> Result<MonthContext, String> {
    let (year, month) = raw
        .split_once('-')
        .ok_or_else(|| format!("expected YYYY-MM, got '{raw}'"))?;
    let year: i32 = year.parse().map_err(|_| format!("invalid year in '{raw}'"))?;
    let month: u32 = month.parse().map_err(|_| format!("invalid month in '{raw}'"))?;
    MonthContext::new(year, month).map_err(|e| e.to_string())
}

fn load_config(path: Option<&PathBuf>) -> Result<VisualConfig> {
    match path {
        Some(path) => VisualConfig::load(path),
        None => Ok(VisualConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set tracing subscriber")?;

    let quiet = cli.quiet;
    match cli.command {
        Commands::Convert {
            input,
            output,
            options,
        } => convert_single(input, output, &options, quiet),
        Commands::Batch {
            inputs,
            output,
            options,
        } => convert_batch(inputs, output, &options),
        Commands::Probe { pdf, config } => probe(pdf, config),
        Commands::Info { input } => show_info(input),
        Commands::Config => print_config(),
    }
}

fn convert_single(input: PathBuf, output: Option<PathBuf>, options: &RunOptions, quiet: bool) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }
    if !input.is_file() {
        anyhow::bail!("Input is not a file: {}", input.display());
    }

    let output_dir = match output {
        Some(dir) => dir,
        None => {
            let stem = input
                .file_stem()
                .with_context(|| format!("Input has no file name: {}", input.display()))?
                .to_string_lossy();
            PathBuf::from(format!("{}_output", stem))
        }
    };

    let visual = options.visual_config()?;
    let months = options.month_source()?;

    if !quiet {
        println!("[*] Processing: {}", input.display());
        println!("[*] Output: {}", output_dir.display());
        println!("[*] DPI: {}", visual.raster.dpi);
        println!("[*] Grid: {}x{}", visual.grid.rows, visual.grid.cols);
        match months {
            MonthSource::Sequential(first) => println!("[*] First month: {}", first),
            MonthSource::Header { fallback_year } => {
                println!("[*] Months from page headers (fallback year {})", fallback_year)
            }
        }
    }

    let config = PipelineConfig::new(input.clone(), output_dir.clone(), months, visual);

    check_engines(&config.visual.ocr, is_pdf(&input))
        .into_result()
        .context("Visual calendar path unavailable")?;

    if !quiet {
        println!("\n[+] Building calendar...");
    }

    let run = build_calendar(&config)
        .with_context(|| format!("Failed to process calendar: {}", input.display()))?;

    if !quiet {
        println!("[+] Exporting results...");
    }

    export_calendar(&run, &config.output)
        .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;

    if !quiet {
        println!("\n[*] {} day(s)", run.days.len());
        for (day_type, count) in summarize(&run.days) {
            println!("    {:<18} {}", day_type.as_str(), count);
        }
        for failure in &run.failures {
            println!("  [!] Page {} failed: {}", failure.page_idx + 1, failure.error);
        }
        println!("\n[✓] Done! Results saved to: {}", output_dir.display());
    }

    Ok(())
}

fn convert_batch(inputs: Vec<PathBuf>, output: Option<PathBuf>, options: &RunOptions) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("No input files specified");
    }

    let base_output = output.unwrap_or_else(|| PathBuf::from("batch_output"));

    println!("[*] Batch processing {} file(s)", inputs.len());
    println!("[*] Base output: {}\n", base_output.display());

    let mut success = 0;
    let mut failed = 0;

    for (i, input) in inputs.iter().enumerate() {
        println!("[{}/{}] Processing: {}", i + 1, inputs.len(), input.display());

        let Some(stem) = input.file_stem() else {
            eprintln!("  [!] Skipped: not a file path");
            failed += 1;
            continue;
        };
        if !input.exists() {
            eprintln!("  [!] Skipped: file does not exist");
            failed += 1;
            continue;
        }

        let output_dir = base_output.join(stem);

        match convert_single(input.clone(), Some(output_dir), options, true) {
            Ok(_) => {
                println!("  [✓] Success");
                success += 1;
            }
            Err(e) => {
                eprintln!("  [✗] Failed: {:#}", e);
                failed += 1;
            }
        }
        println!();
    }

    println!("\n[*] Summary: {} succeeded, {} failed", success, failed);

    if failed > 0 {
        anyhow::bail!("{} file(s) failed to process", failed);
    }

    Ok(())
}

fn probe(pdf: bool, config: Option<PathBuf>) -> Result<()> {
    let config = load_config(config.as_ref())?;
    let availability = check_engines(&config.ocr, pdf);

    println!("{}", serde_json::to_string_pretty(&availability)?);
    availability.into_result()?;
    Ok(())
}

fn show_info(input: PathBuf) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }

    println!("Calendar Source Information");
    println!("===========================");
    println!("File: {}", input.display());

    if is_pdf(&input) {
        let page_count = pdf_info::page_count(&input)
            .with_context(|| format!("Failed to read PDF: {}", input.display()))?;
        println!("Type: PDF");
        println!("Pages: {}", page_count);
    } else {
        let (width, height) = image::image_dimensions(&input)
            .with_context(|| format!("Failed to read image: {}", input.display()))?;
        println!("Type: image");
        println!("Pages: 1");
        println!("Size: {}x{} px", width, height);
    }

    Ok(())
}

fn print_config() -> Result<()> {
    print!("{}", VisualConfig::default().to_toml()?);
    Ok(())
}
