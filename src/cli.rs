//! Command-line interface: serve the HTTP surface, run batch analysis, manage the cache.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::sync::Arc;

use crate::config::Settings;
use crate::lifecycle::{self, AppState};
use crate::service::backend::BackendSelector;
use crate::service::batch::{BatchReport, BatchRunner};
use crate::{db, server};

#[derive(Debug, Parser)]
#[command(name = "sitescore", version, about = "AI-assisted content quality scoring for site pages")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the HTTP API
    Serve {
        /// Listen address (overrides server.bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Analyze a page, and optionally its subpages, in every available language
    Analyze {
        /// Page identifier to analyze
        page_id: i64,
        /// Recursion depth (0: current page, 1: current and one level below, 999: all subpages)
        #[arg(default_value_t = 0)]
        recursion: u32,
    },
    /// Delete every cached analysis
    Truncate {
        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
    /// Print the cached analysis of a page as JSON
    Show {
        page_id: i64,
        #[arg(long, default_value_t = 0)]
        language: i64,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load()?;
    let pool = db::init_pool(&settings.database).await?;
    let state = lifecycle::build_state(&settings, pool, &BackendSelector::with_builtins())?;

    match cli.command {
        Command::Serve { bind } => cmd_serve(state, bind.unwrap_or(settings.server.bind)).await,
        Command::Analyze { page_id, recursion } => cmd_analyze(state, page_id, recursion).await,
        Command::Truncate { yes } => cmd_truncate(state, yes).await,
        Command::Show { page_id, language } => cmd_show(state, page_id, language).await,
    }
}

async fn cmd_serve(state: AppState, bind: String) -> Result<()> {
    let app = server::build_app(state);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    tracing::info!("Listening on http://{}", bind);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn cmd_analyze(state: AppState, page_id: i64, recursion: u32) -> Result<()> {
    let runner = BatchRunner::new(state.orchestrator.clone(), state.site.clone());
    let combinations = runner.combinations(page_id, recursion);
    if combinations.is_empty() {
        println!("No page/language combinations found for page {}", page_id);
        return Ok(());
    }

    let progress = Arc::new(ProgressBar::new(combinations.len() as u64));
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
            .context("invalid progress template")?
            .progress_chars("█▓░"),
    );

    let bar = progress.clone();
    let report = runner
        .run(&combinations, move |c| {
            bar.set_message(format!("page {} / language {}", c.page_id, c.language_id));
            bar.inc(1);
        })
        .await;
    progress.finish_and_clear();

    print_report(&report);
    Ok(())
}

fn print_report(report: &BatchReport) {
    println!("Analyzed {}/{} combinations", report.succeeded, report.total);
    for failure in &report.failures {
        println!(
            "  failed: page {} language {}: {} ({})",
            failure.page_id, failure.language_id, failure.message, failure.code
        );
    }
}

async fn cmd_truncate(state: AppState, yes: bool) -> Result<()> {
    if !yes {
        print!("Delete all cached analyses? [y/N] ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled");
            return Ok(());
        }
    }

    let removed = state.store.truncate_all().await?;
    println!("Removed {} cached analyses", removed);
    Ok(())
}

async fn cmd_show(state: AppState, page_id: i64, language: i64) -> Result<()> {
    match state.store.find_latest(page_id, language.max(0)).await? {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => println!("No analysis cached for page {} (language {})", page_id, language),
    }
    Ok(())
}
