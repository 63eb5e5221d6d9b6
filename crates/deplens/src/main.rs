use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use deplens_core::cache::AnalysisCache;
use deplens_core::config::Config;
use deplens_core::pipeline::AnalysisPipeline;
use deplens_typescript::TypeScriptAnalyzer;

use deplens_report::{json, text};

#[derive(Parser)]
#[command(name = "deplens")]
#[command(about = "Analyze import/export dependencies in TypeScript and JavaScript projects")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project and print the dependency report
    Analyze {
        /// Path to the project root
        path: PathBuf,
        /// Config file path (defaults to .deplens.toml in the project root
        /// or an ancestor)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Directory for the JSON snapshot (defaults to the project root)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Override the configured batch size
        #[arg(long)]
        batch_size: Option<usize>,
        /// Analyze without writing the snapshot
        #[arg(long)]
        dry_run: bool,
        /// Emit the report as JSON instead of the text summary
        #[arg(long)]
        json: bool,
        /// With --json, emit compact single-line output
        #[arg(long)]
        compact: bool,
    },
    /// Create a default .deplens.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            path,
            config,
            output_dir,
            batch_size,
            dry_run,
            json,
            compact,
        } => cmd_analyze(
            &path,
            config.as_deref(),
            output_dir,
            batch_size,
            dry_run,
            json,
            compact,
        ),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn cmd_analyze(
    path: &Path,
    config_path: Option<&Path>,
    output_dir: Option<PathBuf>,
    batch_size: Option<usize>,
    dry_run: bool,
    json: bool,
    compact: bool,
) -> Result<()> {
    let mut config = load_config(path, config_path)?;
    if let Some(batch_size) = batch_size {
        config.analysis.batch_size = batch_size;
    }

    let analyzer = TypeScriptAnalyzer::new().context("failed to initialize TypeScript analyzer")?;
    let pipeline = AnalysisPipeline::new(vec![Box::new(analyzer)], config).with_progress(|p| {
        eprintln!(
            "  batch {}/{}: {}/{} files ({:.0}%)",
            p.batch,
            p.total_batches,
            p.files_processed,
            p.total_files,
            p.percent(),
        );
    });

    let mut cache = AnalysisCache::new();
    let analysis = pipeline.analyze_with_cache(path, &mut cache)?;

    if json {
        println!("{}", json::format_report(&analysis.report, compact));
    } else {
        print!("{}", text::format_report(&analysis.report));
    }

    if !dry_run {
        let output_dir = output_dir.unwrap_or_else(|| path.to_path_buf());
        // Best effort only: a failed snapshot never fails the run
        if let Err(e) = cache.write_snapshot(&output_dir) {
            eprintln!("Warning: failed to write analysis snapshot: {e:#}");
        }
    }

    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(".deplens.toml");
    if target.exists() && !force {
        anyhow::bail!(".deplens.toml already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())?;
    println!("Created .deplens.toml with default configuration.");
    Ok(())
}

fn load_config(project_path: &Path, config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => Ok(Config::load_or_default(project_path)),
    }
}
