//! Interactive front end: discover links, confirm a selection, extract rows.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use console::Term;
use dialoguer::{theme::ColorfulTheme, Input, MultiSelect};
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use link_harvest::{
    columns, to_csv, to_tsv, ClassifiedLinks, ExtractionRequest, FetcherExt, FieldSchema,
    HarvestConfig, Harvester, HttpFetcher, LinkRecord, OpenAiEngine, ProgressReceiver,
    RateLimitedFetcher, Relevance, ResultSink,
};

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "harvest",
    about = "Rank the links on a page and extract a table from the ones you pick"
)]
struct Args {
    /// Seed page URL
    url: String,

    /// What you are looking for (used to rank links)
    #[arg(short, long)]
    goal: Option<String>,

    /// Comma-separated column names, e.g. "Name, Founded, CEO"
    #[arg(short, long)]
    columns: Option<String>,

    /// Extra guidance for filling the columns
    #[arg(long)]
    guidance: Option<String>,

    /// Select links without prompting
    #[arg(long, value_enum)]
    select: Option<SelectMode>,

    /// Accept defaults instead of prompting
    #[arg(short = 'y', long)]
    yes: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Write output here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Links per batch (overrides HARVEST_BATCH_SIZE)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Links in flight per batch (overrides HARVEST_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SelectMode {
    High,
    #[value(name = "high+mid")]
    HighMid,
    All,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Tsv,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays clean for table output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,link_harvest=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();
    tracing::info!(url = %args.url, "starting harvest");
    let config = Config::from_env()?;
    let term = Term::stderr();

    let mut harvest_config = config.harvest_config();
    if let Some(size) = args.batch_size {
        harvest_config = harvest_config.with_batch_size(size);
    }
    if let Some(concurrency) = args.concurrency {
        harvest_config = harvest_config.with_concurrency(concurrency);
    }

    let harvester = build_harvester(&config, harvest_config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let goal = match args.goal.clone() {
        Some(goal) => goal,
        None if args.yes => String::new(),
        None => prompt_text("What are you looking for on this page?", true)?,
    };

    term.write_line(&format!("{} {}", "Discovering links on".bright_cyan(), args.url))?;
    let discovery = harvester
        .discover_with_cancel(&args.url, &goal, cancel.clone())
        .await
        .with_context(|| format!("Discovery failed for {}", args.url))?;

    if discovery.links.is_empty() {
        term.write_line(&"No same-site links found on that page.".yellow().to_string())?;
        return Ok(());
    }
    print_ranking(&term, &discovery.classified)?;

    let selected = match (args.select, args.yes) {
        (Some(mode), _) => select_by_mode(&discovery.classified, mode),
        (None, true) => discovery.classified.preselected(),
        (None, false) => select_interactively(&discovery.classified)?,
    };
    if selected.is_empty() {
        term.write_line(&"Nothing selected.".yellow().to_string())?;
        return Ok(());
    }

    let column_list = match args.columns.clone() {
        Some(list) => list,
        None => prompt_text("Columns to extract (comma-separated)", false)?,
    };
    let schema = FieldSchema::parse_list(&column_list).context("Invalid column list")?;

    let guidance = match args.guidance.clone() {
        Some(g) => g,
        None if args.yes => String::new(),
        None => prompt_text("Extraction guidance (optional)", true)?,
    };
    let request = ExtractionRequest::new(schema.clone()).with_guidance(guidance);

    let progress_task = spawn_progress_printer(harvester.progress(), term.clone());

    let sink = ResultSink::new();
    let summary = harvester.extract(selected, request, &sink, cancel).await;
    let _ = progress_task.await;

    let rows = sink.snapshot();
    let header = columns(&schema);
    let rendered = match args.format {
        Format::Csv => to_csv(&rows, &header),
        Format::Tsv => to_tsv(&rows, &header),
    };

    match &args.output {
        Some(path) => {
            std::fs::write(path, format!("{rendered}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            term.write_line(&format!("{} {}", "Wrote".bright_green(), path.display()))?;
        }
        None => println!("{rendered}"),
    }

    let status = format!(
        "{} rows ({} ok, {} failed){}",
        summary.rows,
        summary.succeeded,
        summary.failed,
        if summary.cancelled { ", cancelled" } else { "" }
    );
    term.write_line(&status.bold().to_string())?;

    Ok(())
}

fn build_harvester(
    config: &Config,
    harvest_config: HarvestConfig,
) -> Result<Harvester<OpenAiEngine, RateLimitedFetcher<HttpFetcher>>> {
    let mut engine = OpenAiEngine::new(config.openai_api_key.clone());
    if let Some(model) = &config.openai_model {
        engine = engine.with_model(model);
    }
    if let Some(base_url) = &config.openai_base_url {
        engine = engine.with_base_url(base_url);
    }
    tracing::debug!(model = engine.model(), "engine configured");

    let fetcher = HttpFetcher::new(&harvest_config)
        .context("Failed to create HTTP client")?
        .rate_limited(config.fetch_rps);

    Harvester::new(engine, fetcher, harvest_config).context("Invalid harvest configuration")
}

fn print_ranking(term: &Term, classified: &ClassifiedLinks) -> Result<()> {
    term.write_line(&format!(
        "{} high, {} possible, {} other links",
        classified.high.len().to_string().bright_green(),
        classified.mid.len().to_string().yellow(),
        classified.remaining.len()
    ))?;
    Ok(())
}

fn select_by_mode(classified: &ClassifiedLinks, mode: SelectMode) -> Vec<LinkRecord> {
    classified
        .ranked()
        .filter(|(relevance, _)| match mode {
            SelectMode::High => *relevance == Relevance::High,
            SelectMode::HighMid => *relevance != Relevance::Unranked,
            SelectMode::All => true,
        })
        .map(|(_, link)| link.clone())
        .collect()
}

fn select_interactively(classified: &ClassifiedLinks) -> Result<Vec<LinkRecord>> {
    let ranked: Vec<(Relevance, &LinkRecord)> = classified.ranked().collect();
    let items: Vec<String> = ranked
        .iter()
        .map(|(relevance, link)| {
            let tag = match relevance {
                Relevance::High => relevance.as_str().bright_green().to_string(),
                Relevance::Mid => relevance.as_str().yellow().to_string(),
                Relevance::Unranked => relevance.as_str().dimmed().to_string(),
            };
            format!("[{tag}] {} {}", link.display_label(), link.url.dimmed())
        })
        .collect();
    let defaults: Vec<bool> = ranked.iter().map(|(r, _)| r.preselected()).collect();

    let picked = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Select links to extract (space to toggle, enter to confirm)")
        .items(&items)
        .defaults(&defaults)
        .interact()
        .context("Link selection aborted")?;

    Ok(picked.into_iter().map(|i| ranked[i].1.clone()).collect())
}

fn prompt_text(prompt: &str, allow_empty: bool) -> Result<String> {
    Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .allow_empty(allow_empty)
        .interact_text()
        .context("Input aborted")
}

fn spawn_progress_printer(progress: ProgressReceiver, term: Term) -> JoinHandle<()> {
    watch_progress(progress, move |line| {
        let _ = term.write_line(&line.bright_blue().to_string());
    })
}

/// Emit one line per completed batch until the run reports `finished`.
fn watch_progress<W>(mut progress: ProgressReceiver, mut emit: W) -> JoinHandle<()>
where
    W: FnMut(String) + Send + 'static,
{
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let p = progress.borrow_and_update().clone();
            if p.current_batch > 0 {
                emit(format!(
                    "Batch {}/{} done, {} rows",
                    p.current_batch, p.total_batches, p.rows_collected
                ));
            }
            if p.finished {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use link_harvest::BatchProgress;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn classified() -> ClassifiedLinks {
        ClassifiedLinks {
            high: vec![LinkRecord::new("A", "https://a.com/a")],
            mid: vec![LinkRecord::new("B", "https://a.com/b")],
            remaining: vec![LinkRecord::new("C", "https://a.com/c")],
        }
    }

    fn labels(links: Vec<LinkRecord>) -> Vec<String> {
        links.into_iter().map(|l| l.label).collect()
    }

    #[test]
    fn test_select_by_mode() {
        let c = classified();
        assert_eq!(labels(select_by_mode(&c, SelectMode::High)), vec!["A"]);
        assert_eq!(
            labels(select_by_mode(&c, SelectMode::HighMid)),
            vec!["A", "B"]
        );
        assert_eq!(
            labels(select_by_mode(&c, SelectMode::All)),
            vec!["A", "B", "C"]
        );
    }

    #[test]
    fn test_args_parse_select_value() {
        let args = Args::parse_from(["harvest", "https://a.com", "--select", "high+mid", "-y"]);
        assert!(matches!(args.select, Some(SelectMode::HighMid)));
        assert!(args.yes);
        assert!(matches!(args.format, Format::Csv));
    }

    #[tokio::test]
    async fn test_progress_watch_stops_on_finish_before_first_batch() {
        let (tx, rx) = link_harvest::progress_channel();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let handle = watch_progress(rx, move |line| sink.lock().unwrap().push(line));

        tx.send_replace(BatchProgress {
            finished: true,
            cancelled: true,
            ..Default::default()
        });

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("watcher should exit on finished")
            .unwrap();
        assert!(lines.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_progress_watch_prints_each_batch() {
        let (tx, rx) = link_harvest::progress_channel();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let sink = lines.clone();
        let handle = watch_progress(rx, move |line| sink.lock().unwrap().push(line));

        tx.send_replace(BatchProgress {
            current_batch: 1,
            total_batches: 1,
            rows_collected: 3,
            finished: true,
            ..Default::default()
        });

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(*lines.lock().unwrap(), vec!["Batch 1/1 done, 3 rows"]);
    }
}
