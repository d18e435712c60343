//! obj2cloud CLI - OBJ meshes to labeled voxel point clouds
//!
//! `convert` handles one mesh; `batch` converts a dataset listed in a file or
//! found in a directory, in parallel.

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use obj2cloud::{discover, output_path, BatchConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;
use voxcloud::{
    convert, convert_mesh, spacing_grid, BatchDriver, CategorySource, ColorSource, GridSpec,
    LabelTable, Mesh, PointFormat, VoxelizeError,
};

#[derive(Parser)]
#[command(name = "obj2cloud")]
#[command(
    author,
    version,
    about = "Convert OBJ meshes into labeled, colored voxel point clouds"
)]
struct Cli {
    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a single mesh
    Convert {
        /// Input OBJ file
        mesh: PathBuf,

        /// Output file (default: mesh path with .bin/.txt extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Derive the grid from this cell edge length instead of --grid
        /// (0 = longest padded axis / 256)
        #[arg(long, conflicts_with = "grid")]
        spacing: Option<f64>,

        /// Upper bound on cells along the longest axis with --spacing (0 = none)
        #[arg(long, default_value_t = 0, requires = "spacing")]
        max_resolution: u32,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Convert every mesh of a dataset
    Batch {
        /// Mesh list file (one id per line) or directory of meshes
        input: PathBuf,

        /// Dataset root for list files, meshes at <root>/<id>/<id>.obj
        /// (default: the list file's directory)
        #[arg(long)]
        root: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Worker threads (0 = one per core)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        #[command(flatten)]
        settings: SettingsArgs,
    },
}

/// Flags shared by both subcommands; each overrides the config value.
#[derive(Args)]
struct SettingsArgs {
    /// Label definition file
    #[arg(short, long)]
    labels: Option<PathBuf>,

    /// Grid resolution
    #[arg(short, long, num_args = 3, value_names = ["NX", "NY", "NZ"])]
    grid: Option<Vec<u32>>,

    /// Output encoding
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Where face colors come from
    #[arg(long, value_enum)]
    color_source: Option<ColorArg>,

    /// Which name faces are labeled by
    #[arg(long, value_enum)]
    category_source: Option<CategoryArg>,

    /// Bounding box padding in world units
    #[arg(long)]
    padding: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    /// Little-endian f64, 7 per point
    Bin,
    /// One point per line
    Txt,
}

#[derive(Clone, Copy, ValueEnum)]
enum ColorArg {
    Ambient,
    Diffuse,
    Normal,
}

#[derive(Clone, Copy, ValueEnum)]
enum CategoryArg {
    Object,
    Material,
}

impl SettingsArgs {
    fn apply(self, config: &mut BatchConfig) -> anyhow::Result<()> {
        if let Some(labels) = self.labels {
            config.labels = Some(labels);
        }
        if let Some(grid) = self.grid {
            config.grid = match grid.as_slice() {
                &[nx, ny, nz] => GridSpec::new(nx, ny, nz)?,
                other => bail!("--grid takes three values, got {}", other.len()),
            };
        }
        if let Some(format) = self.format {
            config.format = match format {
                FormatArg::Bin => PointFormat::Binary,
                FormatArg::Txt => PointFormat::Text,
            };
        }
        if let Some(source) = self.color_source {
            config.convert.color_source = match source {
                ColorArg::Ambient => ColorSource::Ambient,
                ColorArg::Diffuse => ColorSource::Diffuse,
                ColorArg::Normal => ColorSource::Normal,
            };
        }
        if let Some(source) = self.category_source {
            config.convert.category_source = match source {
                CategoryArg::Object => CategorySource::Object,
                CategoryArg::Material => CategorySource::Material,
            };
        }
        if let Some(padding) = self.padding {
            config.convert.boundary_padding = padding;
        }
        config.convert.validate()?;
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = BatchConfig::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Convert {
            mesh,
            output,
            spacing,
            max_resolution,
            settings,
        } => {
            settings.apply(&mut config)?;
            let sizing = match spacing {
                Some(spacing) => GridSizing::Spacing {
                    spacing,
                    max_resolution,
                },
                None => GridSizing::Fixed,
            };
            run_convert(&config, &mesh, output, sizing)
        }
        Commands::Batch {
            input,
            root,
            output,
            threads,
            settings,
        } => {
            settings.apply(&mut config)?;
            if let Some(output) = output {
                config.output_dir = output;
            }
            if let Some(threads) = threads {
                config.threads = threads;
            }
            run_batch(&config, &input, root.as_deref())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn label_path(config: &BatchConfig) -> anyhow::Result<&Path> {
    config
        .labels
        .as_deref()
        .context("No label file given (use --labels, OBJ2CLOUD_LABELS or the config file)")
}

/// How the `convert` subcommand picks its grid.
#[derive(Clone, Copy)]
enum GridSizing {
    /// The configured `grid`
    Fixed,
    /// Cells of a given edge length over the padded mesh box
    Spacing { spacing: f64, max_resolution: u32 },
}

fn run_convert(
    config: &BatchConfig,
    mesh: &Path,
    output: Option<PathBuf>,
    sizing: GridSizing,
) -> anyhow::Result<()> {
    let labels = label_path(config)?;
    let output = output.unwrap_or_else(|| mesh.with_extension(config.format.extension()));

    let start = Instant::now();
    let (cloud, grid) = match sizing {
        GridSizing::Fixed => {
            let cloud = convert(mesh, labels, config.grid, &config.convert)
                .with_context(|| format!("Failed to convert {}", mesh.display()))?;
            (cloud, config.grid)
        }
        GridSizing::Spacing {
            spacing,
            max_resolution,
        } => {
            let table = LabelTable::load(labels)?.with_fallback(config.convert.fallback_label);
            let loaded = Mesh::load(mesh, &config.convert)?;
            let grid = spacing_grid(&loaded, spacing, max_resolution, &config.convert)
                .with_context(|| format!("Failed to size grid for {}", mesh.display()))?;
            let cloud = convert_mesh(&loaded, &table, grid, &config.convert)
                .with_context(|| format!("Failed to convert {}", mesh.display()))?;
            (cloud, grid)
        }
    };
    cloud
        .write(&output, config.format)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Converted {}", mesh.display());
    println!("  Grid:    {}", grid);
    println!("  Points:  {}", cloud.len());
    println!("  Output:  {}", output.display());
    println!("  Time:    {:.2?}", start.elapsed());
    Ok(())
}

fn run_batch(config: &BatchConfig, input: &Path, root: Option<&Path>) -> anyhow::Result<()> {
    let labels = label_path(config)?;
    let tasks = discover(input, root, labels, config.grid)?;
    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    info!(
        "Converting {} meshes on a {} grid into {}",
        tasks.len(),
        config.grid,
        config.output_dir.display()
    );

    let progress = ProgressBar::new(tasks.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
            .progress_chars("=> "),
    );

    let mut driver = BatchDriver::new(config.convert.clone()).with_threads(config.threads);
    driver.enqueue_all(tasks);

    let results = driver.run_map(|outcome| {
        let written = outcome.result.and_then(|cloud| {
            let path = output_path(&config.output_dir, &outcome.id, config.format);
            cloud.write(&path, config.format)?;
            Ok::<_, VoxelizeError>(cloud.len())
        });
        progress.set_message(outcome.id.clone());
        progress.inc(1);
        (outcome.id, written)
    });
    progress.finish_and_clear();

    let mut points = 0;
    let mut failed = 0;
    for (id, written) in &results {
        match written {
            Ok(count) => points += count,
            Err(err) => {
                failed += 1;
                eprintln!("FAILED {id}: {err}");
            }
        }
    }

    println!();
    println!("Batch complete:");
    println!("  Meshes:     {}", results.len());
    println!("  Succeeded:  {}", results.len() - failed);
    println!("  Failed:     {}", failed);
    println!("  Points:     {}", points);
    println!("  Output:     {}", config.output_dir.display());

    if failed > 0 {
        bail!("{failed} of {} conversions failed", results.len());
    }
    Ok(())
}
