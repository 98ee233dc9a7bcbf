use clap::{Parser, Subcommand};
use renditions::config::{self, RenditionsConfig};
use renditions::imaging::RustCodec;
use renditions::{
    FileSystemStorage, Location, Ppoi, ProcessorRegistry, ProcessorSpec, Renderer, batch, output,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "renditions")]
#[command(about = "Point-of-interest aware image renditions")]
#[command(long_about = "\
Point-of-interest aware image renditions

Each rendition is the source run through an ordered list of processors,
after a fixed prefix (autorotate, preprocess_jpeg, preprocess_gif,
preserve_icc_profile). Outputs keep the source's format and are written to
a __processed__ directory next to the source:

  photos/
  ├── renditions.toml              # Formats, default ppoi, prefix (optional)
  ├── cat.jpg
  └── __processed__/
      ├── cat-square-08d1c2e4aa90.jpg
      └── cat-thumb-3f2a9c0d41b7.jpg

Processors are written name:arg,arg on the command line:

  thumbnail:300x300    fit within 300x300, never upscaling
  crop:200x200         exact size, centered on the point of interest

Set RUST_LOG=renditions=debug to trace each pipeline run.

Run 'renditions gen-config' to generate a documented renditions.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: <root>/renditions.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Re-render targets that already exist
    #[arg(long, global = true)]
    force: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render one source into one target
    Render {
        /// Source name, relative to --root
        source: String,
        /// Target name, relative to --root
        target: String,
        /// Storage root directory
        #[arg(long, default_value = ".")]
        root: PathBuf,
        /// Processor to apply after the fixed prefix (repeatable, in order)
        #[arg(short, long = "processor", value_name = "NAME[:ARGS]")]
        processors: Vec<ProcessorSpec>,
        /// Point of interest, e.g. 0.3x0.6 (default: from config)
        #[arg(long)]
        ppoi: Option<Ppoi>,
    },
    /// Render every configured format for every image under a directory
    Build {
        /// Root directory to walk
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// List registered processors
    Processors,
    /// Print a stock renditions.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Render {
            source,
            target,
            root,
            processors,
            ppoi,
        } => {
            let config = load(cli.config.as_deref(), &root)?;
            let storage = FileSystemStorage::new(&root);
            let renderer = Renderer::new(RustCodec::new()).with_always(config.always.clone());
            let outcome = renderer.render(
                Location::new(&storage, &source),
                Location::new(&storage, &target),
                &processors,
                ppoi.unwrap_or(config.ppoi),
                cli.force || config.force,
            )?;
            println!("{}", output::format_render_output(&target, &outcome));
        }
        Command::Build { root } => {
            let mut config = load(cli.config.as_deref(), &root)?;
            config.force |= cli.force;
            config.validate_processors(ProcessorRegistry::global())?;
            init_thread_pool(&config.processing);

            println!("==> Building renditions in {}", root.display());
            let renderer = Renderer::new(RustCodec::new()).with_always(config.always.clone());
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_batch_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let summary = batch::build(&root, &config, &renderer, Some(tx))?;
            printer.join().map_err(|_| "output thread panicked")?;
            println!("==> {}", summary);
            if summary.failed > 0 {
                return Err(format!("{} rendition(s) failed", summary.failed).into());
            }
        }
        Command::Processors => {
            output::print_processors(&ProcessorRegistry::global().names());
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default: warnings only).
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// `--config` if given, else `renditions.toml` under `root`, else stock defaults.
fn load(explicit: Option<&Path>, root: &Path) -> Result<RenditionsConfig, config::ConfigError> {
    match explicit {
        Some(path) => config::load_config_file(path),
        None => config::load_config(root),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
