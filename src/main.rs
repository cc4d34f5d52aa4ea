//! cacao-caldera - convert CACAO playbooks into Caldera artifacts.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cacao_caldera::caldera::{FsEmitter, MemoryEmitter};
use cacao_caldera::convert::{convert_batch, BatchConfig, BatchOutcome, Converter};
use cacao_caldera::playbook::{discover_playbooks, parse_playbook, FsGraphLoader};
use cacao_caldera::Config;

/// Convert CACAO security playbooks into Caldera abilities, profiles and sources
#[derive(Parser)]
#[command(name = "cacao-caldera")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file to use instead of the default lookup
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert playbooks into Caldera abilities, profiles and sources
    Convert {
        /// Playbook files, or directories of playbooks
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Root directory of the generated data/ tree
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Directory sub-playbook references are resolved against
        #[arg(short, long)]
        playbooks_dir: Option<PathBuf>,

        /// Number of playbooks converted at once
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Convert without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Skip writing conversion manifests
        #[arg(long)]
        no_manifest: bool,
    },

    /// Show the steps a conversion would visit, in order
    Inspect {
        /// Playbook file
        path: PathBuf,

        /// Directory sub-playbook references are resolved against
        #[arg(short, long)]
        playbooks_dir: Option<PathBuf>,
    },

    /// Show configuration
    Config {
        /// Show config directory path
        #[arg(long)]
        path: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    let config = match cli.config {
        Some(ref path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Convert { paths, output_dir, playbooks_dir, jobs, dry_run, no_manifest } => {
            let mut config = config;
            if let Some(dir) = output_dir {
                config.output.dir = dir;
            }
            if let Some(dir) = playbooks_dir {
                config.playbooks.dir = dir;
            }
            if no_manifest {
                config.output.write_manifest = false;
            }
            cmd_convert(&config, &paths, jobs, dry_run)?;
        }
        Commands::Inspect { path, playbooks_dir } => {
            let mut config = config;
            if let Some(dir) = playbooks_dir {
                config.playbooks.dir = dir;
            }
            cmd_inspect(&config, &path)?;
        }
        Commands::Config { path } => {
            cmd_config(&config, path)?;
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
        }
    }

    Ok(())
}

/// Convert every playbook named by `paths`.
fn cmd_convert(config: &Config, paths: &[PathBuf], jobs: Option<usize>, dry_run: bool) -> Result<()> {
    let files = discover_playbooks(paths);
    if files.is_empty() {
        anyhow::bail!("No playbooks found");
    }

    let batch = jobs.map_or_else(BatchConfig::default, |jobs| BatchConfig { max_concurrency: jobs });
    let settings = config.convert_settings();
    let loader = FsGraphLoader::new(&config.playbooks.dir);

    let outcomes = if dry_run {
        convert_batch(&files, &batch, || {
            Converter::new(loader.clone(), MemoryEmitter::new(), settings.clone())
        })
    } else {
        let emitter =
            FsEmitter::new(&config.output.dir).write_manifest(config.output.write_manifest);
        convert_batch(&files, &batch, || {
            Converter::new(loader.clone(), emitter.clone(), settings.clone())
        })
    };

    print_outcomes(&outcomes);

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} playbooks failed to convert", outcomes.len());
    }

    if dry_run {
        println!("\nDRY RUN - nothing was written");
    } else {
        println!("\nWrote artifacts to {}", config.output.dir.display());
    }
    Ok(())
}

fn print_outcomes(outcomes: &[BatchOutcome]) {
    for outcome in outcomes {
        match outcome.result {
            Ok(ref report) => println!(
                "ok   {} -> adversary {} ({} abilities, {} facts)",
                outcome.path.display(),
                report.profile.adversary_id,
                report.abilities_emitted,
                report.sources.facts.len()
            ),
            Err(ref e) => eprintln!("FAIL {}: {e}", outcome.path.display()),
        }
    }
}

/// Show the traversal of one playbook without writing anything.
fn cmd_inspect(config: &Config, path: &Path) -> Result<()> {
    let playbook = parse_playbook(path)?;
    let mut converter = Converter::new(
        FsGraphLoader::new(&config.playbooks.dir),
        MemoryEmitter::new(),
        config.convert_settings(),
    )?;
    let report = converter.convert_playbook(&path.to_string_lossy())?;

    println!("Playbook: {} ({})", playbook.name, playbook.id);
    if let Some(ref desc) = playbook.description {
        println!("Description: {desc}");
    }
    println!(
        "Steps: {} declared, {} reachable\n",
        playbook.step_count(),
        report.dispatch_order.len()
    );

    for (i, id) in report.dispatch_order.iter().enumerate() {
        let (kind, name) =
            playbook.step(id).map_or(("?", ""), |s| (s.kind.as_str(), s.name.as_str()));
        println!("  {}. {id} [{kind}] {name}", i + 1);
    }

    println!("\nAbilities: {}", report.abilities_emitted);
    println!("Facts: {}", report.sources.facts.len());
    Ok(())
}

/// Show configuration.
fn cmd_config(config: &Config, show_path: bool) -> Result<()> {
    if show_path {
        match Config::config_dir() {
            Some(path) => println!("{}", path.display()),
            None => anyhow::bail!("Could not determine config directory"),
        }
        return Ok(());
    }

    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "cacao-caldera", &mut io::stdout());
}
