//! gofetch command-line tool

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use gofetch::{
    CommandVcs, Config, DefaultResolver, FetchOptions, Fetcher, FilterKind, InferOutput, Inferrer,
    PathFilter, RemapTable, ScanOptions,
};

#[derive(Parser)]
#[command(name = "gofetch")]
#[command(about = "Fetch Go packages and everything they import", long_about = None)]
#[command(version, infer_subcommands = true)]
struct Cli {
    /// Configuration file (defaults to ./gofetch.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log debugging detail to stderr
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check out packages and their transitive imports
    Fetch {
        /// Directory to check repositories out into
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        /// Update repositories that are already checked out; with VCS
        /// stripping they are deleted and fetched again
        #[arg(short, long)]
        update: bool,

        /// Keep VCS metadata in fetched repositories
        #[arg(long)]
        keep_vcs: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// List the transitive imports of packages already on disk
    Infer {
        /// Directory package sources are found in
        #[arg(long, value_name = "DIR")]
        source: Option<PathBuf>,

        /// List directories instead of import paths
        #[arg(long)]
        paths: bool,

        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Substitute one import path for another before resolving it
    #[arg(long = "remap", value_name = "FROM=TO")]
    remap: Vec<String>,

    /// Which imports to follow
    #[arg(long, value_name = "domain|all")]
    filter: Option<FilterKind>,

    /// Allow plain-HTTP repository discovery
    #[arg(long)]
    insecure: bool,

    /// Import paths to start from
    #[arg(required = true, value_name = "PACKAGE")]
    packages: Vec<String>,
}

impl CommonArgs {
    /// Command-line remaps layered over the configured ones
    fn remap(&self, config: &Config) -> Result<RemapTable> {
        let mut table = config.remap.clone();
        table.extend(&RemapTable::from_entries(&self.remap)?);
        Ok(table)
    }

    fn scan_options(&self, config: &Config) -> ScanOptions {
        let kind = self.filter.unwrap_or(config.filter);
        ScanOptions::new()
            .with_exclude(PathFilter::public_source())
            .with_include(kind.import_filter(&config.deny))
    }
}

fn init_logging(verbose: bool, debug: bool) {
    let default = if debug {
        "gofetch=debug"
    } else if verbose {
        "gofetch=info"
    } else {
        "gofetch=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.debug);

    let cwd = std::env::current_dir().context("could not determine working directory")?;
    let config = Config::load(cli.config.as_deref(), &cwd)?;
    debug!("configuration: {:?}", config);

    match cli.command {
        Commands::Fetch {
            output,
            update,
            keep_vcs,
            common,
        } => {
            let base = output.or_else(|| config.output.clone()).unwrap_or_else(|| cwd.clone());
            let base = std::path::absolute(&base)
                .with_context(|| format!("invalid output directory {}", base.display()))?;
            let options = FetchOptions {
                allow_update: update || config.update,
                strip_vcs: !(keep_vcs || config.keep_vcs),
                insecure: common.insecure || config.insecure,
            };
            fetch(&base, options, &common, &config)
        }
        Commands::Infer {
            source,
            paths,
            common,
        } => {
            let base = source.or_else(|| config.source.clone()).unwrap_or_else(|| cwd.clone());
            let output = if paths {
                InferOutput::Paths
            } else {
                InferOutput::Packages
            };
            infer(&base, output, &common, &config)
        }
    }
}

fn fetch(base: &Path, options: FetchOptions, common: &CommonArgs, config: &Config) -> Result<()> {
    let mut fetcher = Fetcher::new(DefaultResolver::new()?, CommandVcs::new(), base)
        .with_remap(common.remap(config)?)
        .with_options(options)
        .with_scan_options(common.scan_options(config));

    let report = fetcher.fetch_all(&common.packages)?;

    let mut out = io::stdout().lock();
    for repo in report.iter() {
        if repo.import_path == repo.root {
            writeln!(out, " + {}", repo.import_path)?;
        } else {
            writeln!(out, " + {} ({})", repo.import_path, repo.root)?;
        }
    }
    Ok(())
}

fn infer(base: &Path, output: InferOutput, common: &CommonArgs, config: &Config) -> Result<()> {
    let mut inferrer = Inferrer::new(DefaultResolver::new()?, base)
        .with_remap(common.remap(config)?)
        .with_scan_options(common.scan_options(config))
        .with_output(output)
        .insecure(common.insecure || config.insecure);

    let mut out = io::stdout().lock();
    let mut written: io::Result<()> = Ok(());
    inferrer.infer_all(&common.packages, |line| {
        if written.is_ok() {
            written = writeln!(out, "{}", line);
        }
    })?;
    written?;
    Ok(())
}
