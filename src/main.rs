// Copyright 2026 Partgrab Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use partgrab::batch;
use partgrab::config::{
    BatchConfig, DownloadConfig, ScrapeConfig, SiteConfig, BATCH_CONCURRENCY, SCRAPE_CONCURRENCY,
};
use partgrab::extractor::chromium::ChromiumExtractor;
use partgrab::fetcher::Fetcher;
use partgrab::ledger::Ledger;
use partgrab::scheduler;
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

#[derive(Parser)]
#[command(
    name = "partgrab",
    about = "Partgrab — resumable product-image scraper",
    version,
    after_help = "Run 'partgrab <command> --help' for details on each command."
)]
struct Cli {
    /// Enable verbose/debug logging
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape carousel images for every part number in a work list
    Scrape {
        /// CSV work list with a part_number column
        #[arg(long)]
        work_list: PathBuf,
        /// Directory downloaded images are written to
        #[arg(long, default_value = "supersprint_images")]
        out_dir: PathBuf,
        /// Ledger of already processed part numbers
        #[arg(long, default_value = "processed_part_numbers.csv")]
        ledger: PathBuf,
        /// Concurrent workers, each owning a private browser page
        #[arg(long, default_value_t = SCRAPE_CONCURRENCY)]
        concurrency: usize,
        /// Override the site entry page
        #[arg(long)]
        entry_url: Option<String>,
        /// Override the origin that relative image URLs resolve against
        #[arg(long)]
        origin: Option<Url>,
    },
    /// Download images whose URLs are already known from a CSV
    Batch {
        /// CSV with a part_number column plus one or more URL columns
        #[arg(long)]
        input: PathBuf,
        /// Directory downloaded images are written to
        #[arg(long, default_value = "downloaded_images")]
        out_dir: PathBuf,
        /// CSV receiving one row per permanently failed URL
        #[arg(long, default_value = "failed_downloads.csv")]
        failure_log: PathBuf,
        /// Concurrent download workers
        #[arg(long, default_value_t = BATCH_CONCURRENCY)]
        concurrency: usize,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let directive = if cli.verbose {
        "partgrab=debug"
    } else {
        "partgrab=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(directive.parse().unwrap()),
        )
        .init();

    match cli.command {
        Commands::Scrape {
            work_list,
            out_dir,
            ledger,
            concurrency,
            entry_url,
            origin,
        } => {
            let mut site = SiteConfig::default();
            if let Some(entry_url) = entry_url {
                site.entry_url = entry_url;
            }
            if let Some(origin) = origin {
                site.origin = origin;
            }
            let cfg = ScrapeConfig {
                site,
                work_list,
                ledger_path: ledger,
                out_dir,
                concurrency,
                download: DownloadConfig::default(),
            };

            let ledger = Arc::new(Ledger::new(&cfg.ledger_path));

            // Diff first: a work list with nothing pending never pays for a
            // browser launch.
            let plan = scheduler::plan(&cfg, &ledger)?;
            if plan.pending.is_empty() {
                tracing::info!("no unprocessed part numbers found");
                return Ok(());
            }

            let extractor = Arc::new(ChromiumExtractor::launch(cfg.site.clone()).await?);
            let fetcher = Arc::new(Fetcher::new(
                Some(cfg.site.origin.clone()),
                cfg.download.clone(),
            ));

            let summary = scheduler::run_plan(&cfg, plan, extractor, fetcher, ledger).await?;
            if summary.failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::Batch {
            input,
            out_dir,
            failure_log,
            concurrency,
        } => {
            let cfg = BatchConfig {
                input,
                out_dir,
                failure_log,
                concurrency,
                download: DownloadConfig::default(),
            };
            let summary = batch::run(&cfg).await?;
            if summary.failed > 0 {
                std::process::exit(1);
            }
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "partgrab", &mut std::io::stdout());
        }
    }

    Ok(())
}
