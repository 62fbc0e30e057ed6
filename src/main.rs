use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use tabulated::downloader::{points_to_csv, statistics_to_markdown};
use tabulated::loader::points_from_csv;
use tabulated::saving::{load_points, save_points};
use tabulated::tabulate::tabulate_by_name;
use tabulated::validation::validate_points;
use tabulated::{ChunkedPointProcessor, MathFunctionMapper, Point, ProcessorConfig, report};

#[derive(Parser)]
#[command(name = "tabulated", about = "Process tabulated function point sets")]
struct Cli {
    /// JSON file with processor settings
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the maximum number of points
    #[arg(long, global = true)]
    max_points: Option<usize>,

    /// Override the processing chunk size
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print statistics of a point set
    Stats {
        input: PathBuf,
        /// Emit JSON instead of a Markdown table
        #[arg(long)]
        json: bool,
    },
    /// Keep only points with min_x <= x <= max_x
    FilterRange {
        input: PathBuf,
        #[arg(long, allow_hyphen_values = true, default_value_t = f64::NEG_INFINITY)]
        min_x: f64,
        #[arg(long, allow_hyphen_values = true, default_value_t = f64::INFINITY)]
        max_x: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sort points by x (or y)
    Sort {
        input: PathBuf,
        #[arg(long)]
        by_y: bool,
        #[arg(long)]
        descending: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remove exact duplicate points
    Dedupe {
        input: PathBuf,
        /// Also remove repeats that fall into different chunks
        #[arg(long)]
        global: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fill missing y values by linear interpolation
    Interpolate {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Average the set down to a fixed number of points
    Compress {
        input: PathBuf,
        #[arg(long)]
        target: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Take every n-th point so that at most `max` remain
    Decimate {
        input: PathBuf,
        #[arg(long, default_value_t = 1000)]
        max: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sample a registered math function
    Tabulate {
        #[arg(long)]
        function: String,
        #[arg(long, allow_hyphen_values = true)]
        left: f64,
        #[arg(long, allow_hyphen_values = true)]
        right: f64,
        #[arg(long)]
        count: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List registered math functions
    Functions {
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Check that a point set describes a valid function
    Validate { input: PathBuf },
    /// Build performance reports from a Newman JSON export
    Report {
        input: PathBuf,
        #[arg(long, default_value = "test-results")]
        out_dir: PathBuf,
        #[arg(long, default_value = "performance")]
        prefix: String,
        #[arg(long, default_value = "API Performance Report")]
        title: String,
    },
    /// Render a PNG preview of a point set (needs the `plot` feature)
    Preview {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long)]
        scatter: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ProcessorConfig::from_json_file(path)?,
        None => ProcessorConfig::default(),
    };
    if let Some(max_points) = cli.max_points {
        config.max_points = max_points;
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    config.validate()?;

    match cli.command {
        Command::Stats { input, json } => {
            let points = read_points(&input)?;
            match tabulated::compute_statistics(&points) {
                Some(stats) if json => println!("{}", serde_json::to_string_pretty(&stats)?),
                Some(stats) => print!("{}", statistics_to_markdown(&stats)),
                None => println!("Point set is empty"),
            }
        }
        Command::FilterRange {
            input,
            min_x,
            max_x,
            output,
        } => {
            let processor = open_processor(&input, config)?;
            let watcher = watch_progress(&processor);
            processor
                .filter_points(|p| p.x >= min_x && p.x <= max_x)
                .await?;
            watcher.abort();
            write_points(&processor.points(), output.as_deref())?;
        }
        Command::Sort {
            input,
            by_y,
            descending,
            output,
        } => {
            let processor = open_processor(&input, config)?;
            let watcher = watch_progress(&processor);
            processor
                .sort_points(|a, b| {
                    let ordering = if by_y {
                        a.y.total_cmp(&b.y)
                    } else {
                        a.x.total_cmp(&b.x)
                    };
                    if descending { ordering.reverse() } else { ordering }
                })
                .await?;
            watcher.abort();
            write_points(&processor.points(), output.as_deref())?;
        }
        Command::Dedupe {
            input,
            global,
            output,
        } => {
            let processor = open_processor(&input, config)?;
            let before = processor.len();
            if global {
                processor.remove_duplicates_global().await?;
            } else {
                processor.remove_duplicates().await?;
            }
            log::info!("Removed {} duplicate points", before - processor.len());
            write_points(&processor.points(), output.as_deref())?;
        }
        Command::Interpolate { input, output } => {
            let processor = open_processor(&input, config)?;
            processor.interpolate_missing().await?;
            write_points(&processor.points(), output.as_deref())?;
        }
        Command::Compress {
            input,
            target,
            output,
        } => {
            let processor = open_processor(&input, config)?;
            processor.compress_data(target)?;
            write_points(&processor.points(), output.as_deref())?;
        }
        Command::Decimate { input, max, output } => {
            let processor = open_processor(&input, config)?;
            write_points(&processor.points_for_rendering(max), output.as_deref())?;
        }
        Command::Tabulate {
            function,
            left,
            right,
            count,
            output,
        } => {
            let mapper = MathFunctionMapper::with_defaults();
            let points = tabulate_by_name(&mapper, &function, left, right, count)?;
            write_points(&points, output.as_deref())?;
        }
        Command::Functions { category, query } => {
            let mapper = MathFunctionMapper::with_defaults();
            for info in mapper.search(category.as_deref(), &query) {
                println!(
                    "{:<20} {:<10} {:<15} {}",
                    info.label, info.key, info.category, info.example
                );
            }
        }
        Command::Validate { input } => {
            let points = read_points(&input)?;
            let result = validate_points(&points);
            match (&result.message, result.is_valid) {
                (Some(message), false) => {
                    eprintln!("invalid: {}", message);
                    std::process::exit(1);
                }
                _ => println!("ok"),
            }
        }
        Command::Report {
            input,
            out_dir,
            prefix,
            title,
        } => {
            let summary = report::load_run(&input)?;
            let performance = report::analyze(&summary)?;
            let paths = report::write_reports(
                &performance,
                &out_dir,
                &prefix,
                &title,
                chrono::Local::now(),
            )?;
            for path in paths {
                println!("{}", path.display());
            }
        }
        Command::Preview {
            input,
            output,
            scatter,
        } => render(&input, &output, scatter)?,
    }

    Ok(())
}

#[cfg(feature = "plot")]
fn render(input: &Path, output: &Path, scatter: bool) -> Result<(), Box<dyn Error>> {
    use tabulated::graph::{PreviewOptions, PreviewStyle, save_preview};

    let points = read_points(input)?;
    let options = PreviewOptions {
        style: if scatter {
            PreviewStyle::Scatter
        } else {
            PreviewStyle::Line
        },
        ..PreviewOptions::default()
    };
    save_preview(&points, &options, output)
}

#[cfg(not(feature = "plot"))]
fn render(_input: &Path, _output: &Path, _scatter: bool) -> Result<(), Box<dyn Error>> {
    Err("preview rendering needs the `plot` feature".into())
}

fn is_snapshot(path: &Path) -> bool {
    path.to_string_lossy().ends_with(".gz")
}

fn read_points(path: &Path) -> Result<Vec<Point>, Box<dyn Error>> {
    if is_snapshot(path) {
        Ok(load_points(path)?)
    } else {
        Ok(points_from_csv(path)?)
    }
}

fn write_points(points: &[Point], output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match output {
        Some(path) if is_snapshot(path) => save_points(points, path)?,
        Some(path) => std::fs::write(path, points_to_csv(points))?,
        None => print!("{}", points_to_csv(points)),
    }
    Ok(())
}

fn open_processor(
    input: &Path,
    config: ProcessorConfig,
) -> Result<ChunkedPointProcessor, Box<dyn Error>> {
    let points = read_points(input)?;
    Ok(ChunkedPointProcessor::try_new(points, config)?)
}

fn watch_progress(processor: &ChunkedPointProcessor) -> tokio::task::JoinHandle<()> {
    let mut progress = processor.subscribe_progress();
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            log::debug!("Progress: {:.0}%", *progress.borrow());
        }
    })
}
