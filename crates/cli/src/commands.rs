//! Subcommand implementations.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use quire_client::{
    CleanRules, Cleaner, Credential, HoverPrefetcher, LmsClient, ReadSource, Reader, SyncOrchestrator, SyncProgress,
    SyncResult,
};
use quire_core::{AppConfig, CacheService, ClientStore, CourseSnapshot, open_adapter};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use crate::cli::Command;

/// Wire the local store, server cache tier and origin client together.
pub async fn build_reader(config: &AppConfig, token: Option<String>) -> Result<Reader> {
    let store = ClientStore::open(&config.client_store_path)
        .await
        .with_context(|| format!("opening client store {}", config.client_store_path.display()))?;

    let adapter = open_adapter(config).await?;
    let origin = LmsClient::from_app_config(config)?;
    let rules = CleanRules::from_optional_file(config.clean_rules_file.as_deref())?;
    let cleaner = Cleaner::new(&rules)?.with_origin(origin.base_url());
    let orchestrator =
        SyncOrchestrator::from_config(config, CacheService::new(adapter), Arc::new(origin), Arc::new(cleaner));

    let credential = token.map(Credential::new).transpose()?;
    Ok(Reader::new(store, Arc::new(orchestrator), credential))
}

pub async fn run(reader: &Arc<Reader>, config: &AppConfig, command: Command) -> Result<()> {
    match command {
        Command::Read { locator } => {
            let (html, source) = reader.read(&locator).await?;
            tracing::debug!(locator, local = source == ReadSource::Local, "read");
            let mut out = std::io::stdout().lock();
            out.write_all(html.as_bytes())?;
            writeln!(out)?;
        }
        Command::Course { course_id, refresh } => {
            let course = reader.read_course(course_id, refresh).await?;
            print!("{}", render_course(reader, &course).await);
        }
        Command::Browse { course_id } => {
            let prefetcher = HoverPrefetcher::new(reader.clone(), config.prefetch_delay());
            let stdin = BufReader::new(tokio::io::stdin());
            browse(reader, &prefetcher, course_id, stdin, &mut std::io::stdout()).await?;
        }
        Command::Courses => {
            let credential = reader_credential(reader)?;
            let courses = reader.orchestrator().enrolled_courses(&credential).await?;
            for course in courses {
                let progress = course.progress.map(|p| format!("{p:.0}%")).unwrap_or_default();
                println!("{:>8}  {:<16} {} {progress}", course.id, course.shortname, course.fullname);
            }
        }
        Command::Prefetch { locators, course } => {
            let cancel = CancellationToken::new();
            let watcher = tokio::spawn({
                let cancel = cancel.clone();
                async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        eprintln!("\ncancelling after the current batch...");
                        cancel.cancel();
                    }
                }
            });

            let result = match course {
                Some(course_id) => reader.prefetch_course(course_id, &cancel, print_progress).await,
                None => reader.prefetch_many(&locators, &cancel, print_progress).await,
            };
            watcher.abort();
            eprintln!("{}", summarize(&result?));
        }
        Command::Clear { server_cache } => {
            let removed = reader.clear().await?;
            println!("removed {removed} entries from the local store");
            if server_cache {
                let cleared = reader.orchestrator().clear_cache().await;
                println!("server cache {}", if cleared { "cleared" } else { "partially cleared" });
            }
        }
    }
    Ok(())
}

/// Read a course interactively. Opening an activity warms the one after it
/// through the prefetcher; opening something else first cancels that.
async fn browse<I, W>(
    reader: &Reader, prefetcher: &HoverPrefetcher, course_id: i64, input: I, out: &mut W,
) -> Result<()>
where
    I: AsyncBufRead + Unpin,
    W: Write,
{
    let course = reader.read_course(course_id, false).await?;
    let activities: Vec<_> = course
        .sections
        .iter()
        .flat_map(|section| section.activities.iter())
        .filter(|activity| !activity.url.is_empty())
        .collect();
    if activities.is_empty() {
        writeln!(out, "course {course_id} has no readable activities")?;
        return Ok(());
    }

    writeln!(out, "{} (#{})", course.title, course.id)?;
    for (i, activity) in activities.iter().enumerate() {
        writeln!(out, "{:>4}. {}", i + 1, activity.name)?;
    }

    let mut warming: Option<&str> = None;
    let mut lines = input.lines();
    loop {
        eprint!("open #> ");
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "q" | "quit") {
            break;
        }

        let picked = line.parse::<usize>().ok().and_then(|n| n.checked_sub(1));
        let Some((index, activity)) = picked.and_then(|i| activities.get(i).map(|a| (i, *a))) else {
            eprintln!("enter a number between 1 and {}, or q", activities.len());
            continue;
        };

        match reader.read(&activity.url).await {
            Ok((html, _)) => writeln!(out, "{html}")?,
            Err(e) => eprintln!("{}: {e}", activity.name),
        }

        let next = activities.get(index + 1).map(|a| a.url.as_str());
        if let Some(previous) = warming
            && next != Some(previous)
        {
            prefetcher.hover_end(previous);
        }
        if let Some(next) = next {
            prefetcher.hover_start(next);
        }
        warming = next;
    }
    Ok(())
}

fn reader_credential(reader: &Reader) -> Result<Credential> {
    reader
        .credential()
        .cloned()
        .context("an LMS token is required: pass --token or set QUIRE_LMS_TOKEN")
}

fn print_progress(progress: SyncProgress) {
    let mut line = format!("[{:>4}/{:<4}] {:>5.1}%", progress.current, progress.total, progress.percentage);
    if let Some(speed) = progress.speed_items_per_sec {
        line.push_str(&format!("  {speed:.1} items/s"));
    }
    if let Some(eta) = progress.eta_seconds {
        line.push_str(&format!("  eta {eta}s"));
    }
    eprintln!("{line}");
}

fn summarize(result: &SyncResult) -> String {
    let stats = result.stats;
    let state = if result.cancelled { "cancelled" } else { "done" };
    format!(
        "{state}: {} attempted, {} ok ({} already cached), {} failed",
        stats.total, stats.success, stats.cached, stats.failed
    )
}

async fn render_course(reader: &Reader, course: &CourseSnapshot) -> String {
    let mut out = format!("{} (#{})\n", course.title, course.id);
    for section in &course.sections {
        out.push_str(&format!("\n  {}\n", section.name));
        for activity in &section.activities {
            let stored = if reader.is_stored(&activity.url).await { "*" } else { " " };
            let done = match activity.completed {
                Some(true) => " (done)",
                _ => "",
            };
            out.push_str(&format!("  {stored} {:<8} {}{done}\n", activity.kind, activity.name));
        }
    }
    out
}
