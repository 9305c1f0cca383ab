//! Subcommand implementations

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use fleet_core::api::{ApiClient, BuildStatus};
use fleet_core::feed::{
    export_file_name, shared, spawn_ticker, starter_entries, FeedSimulator, LogEntry, LogFilter,
    LogLevel, SyntheticSource,
};
use fleet_core::{FleetConfig, StreamConsumer, StreamOutcome, StreamSnapshot};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

// ============================================================================
// build-logs
// ============================================================================

/// Tracks how much of the streamed text has already been written out
#[derive(Debug, Default)]
struct DeltaWriter {
    session: u64,
    written: usize,
}

impl DeltaWriter {
    /// The part of `snapshot.text` not written yet
    fn delta<'a>(&mut self, snapshot: &'a StreamSnapshot) -> &'a str {
        if snapshot.session != self.session {
            self.session = snapshot.session;
            self.written = 0;
        }
        let fresh = snapshot.text.get(self.written..).unwrap_or_default();
        self.written = snapshot.text.len();
        fresh
    }
}

async fn write_out<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    out.write_all(text.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}

/// Follow a build log until it ends, fails, or Ctrl+C aborts it
pub async fn build_logs(config: &FleetConfig, script_id: &str) -> Result<()> {
    let consumer = Arc::new(
        StreamConsumer::from_config(&config.api).context("Failed to create stream client")?,
    );
    let mut view = consumer.subscribe();
    let mut stdout = tokio::io::stdout();
    let mut delta = DeltaWriter::default();

    let runner = {
        let consumer = Arc::clone(&consumer);
        let script_id = script_id.to_string();
        tokio::spawn(async move { consumer.follow_build(&script_id).await })
    };
    tokio::pin!(runner);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    let outcome = loop {
        tokio::select! {
            res = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                if let Err(e) = res {
                    warn!(error = %e, "failed to listen for Ctrl+C");
                } else {
                    info!("interrupt received, aborting build log stream");
                    consumer.abort();
                }
            }

            changed = view.changed() => {
                if changed.is_err() {
                    continue;
                }
                let snapshot = view.borrow_and_update().clone();
                write_out(&mut stdout, delta.delta(&snapshot)).await?;
            }

            joined = &mut runner => {
                break joined.context("build log task panicked")?;
            }
        }
    };

    // Whatever arrived between the last change notification and the end
    let snapshot = consumer.snapshot();
    write_out(&mut stdout, delta.delta(&snapshot)).await?;

    match outcome {
        StreamOutcome::Completed => Ok(()),
        StreamOutcome::Cancelled => {
            eprintln!("\nbuild log stream aborted");
            Ok(())
        }
        StreamOutcome::Failed(e) => Err(e).context(format!("build log stream for '{script_id}' failed")),
    }
}

// ============================================================================
// tail
// ============================================================================

/// Options for [`tail`]
#[derive(Debug)]
pub struct TailOptions {
    pub level: Option<LogLevel>,
    pub search: String,
    pub count: Option<u64>,
    pub seed: Option<u64>,
    pub export: Option<PathBuf>,
    pub instance: String,
}

fn format_entry(entry: &LogEntry) -> String {
    match entry.source() {
        Some(source) => format!("{} [{source}]", entry.to_line()),
        None => entry.to_line(),
    }
}

/// Run the feed simulator and print newly visible entries
pub async fn tail(config: &FleetConfig, options: TailOptions) -> Result<()> {
    let filter = LogFilter::all()
        .with_level(options.level)
        .with_search(&options.search);
    let source = options
        .seed
        .map_or_else(SyntheticSource::new, SyntheticSource::with_seed);

    let mut simulator = FeedSimulator::new(source, config.feed.retention).with_entries(starter_entries());
    simulator.start();
    let feed = shared(simulator);

    let mut stdout = tokio::io::stdout();
    let initial: Vec<String> = feed.lock().visible(&filter).into_iter().map(format_entry).collect();
    for line in initial {
        write_out(&mut stdout, &format!("{line}\n")).await?;
    }

    let cancel = CancellationToken::new();
    let ticker = spawn_ticker(Arc::clone(&feed), config.feed.interval, cancel.clone());
    let mut updates = ticker.updates();
    let mut mark = 0;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupt received, stopping feed");
                break;
            }

            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let emitted = *updates.borrow_and_update();
                let lines: Vec<String> = {
                    let sim = feed.lock();
                    sim.recent_since(mark)
                        .filter(|e| filter.matches(e))
                        .map(format_entry)
                        .collect()
                };
                mark = emitted;
                for line in lines {
                    write_out(&mut stdout, &format!("{line}\n")).await?;
                }
                if options.count.is_some_and(|n| emitted >= n) {
                    debug!(emitted, "emission limit reached");
                    break;
                }
            }
        }
    }

    feed.lock().stop();
    cancel.cancel();
    ticker.join().await;

    if let Some(dir) = options.export {
        let name = export_file_name(&options.instance, chrono::Local::now().date_naive());
        let path = dir.join(name);
        let text = feed.lock().export(&filter);
        tokio::fs::write(&path, text)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("exported feed to {}", path.display());
    }

    Ok(())
}

// ============================================================================
// list
// ============================================================================

/// Resources `list` can show
#[derive(Clone, Copy, Debug)]
pub enum ListResource {
    Instances,
    Credentials,
    Scripts,
    Templates,
}

/// Print one resource collection
pub async fn list(config: &FleetConfig, resource: ListResource, json: bool) -> Result<()> {
    let client = ApiClient::from_config(&config.api).context("Failed to create API client")?;

    let lines: Vec<String> = match resource {
        ListResource::Instances => {
            let items = client.list_instances().await.context("Failed to list instances")?;
            if json {
                vec![serde_json::to_string_pretty(&items)?]
            } else {
                items
                    .iter()
                    .map(|i| format!("{}\t{}\t{}\t{}", i.id, i.name, i.status, i.url))
                    .collect()
            }
        }
        ListResource::Credentials => {
            let items = client
                .list_credentials()
                .await
                .context("Failed to list credentials")?;
            // Tokens are never printed, not even with --json
            items
                .iter()
                .map(|c| {
                    format!(
                        "{}\t{:?}\t{}\t{}",
                        c.id.as_deref().unwrap_or("-"),
                        c.credential_type,
                        c.name,
                        c.username
                    )
                })
                .collect()
        }
        ListResource::Scripts => {
            let items = client.list_scripts().await.context("Failed to list scripts")?;
            if json {
                vec![serde_json::to_string_pretty(&items)?]
            } else {
                items
                    .iter()
                    .map(|s| {
                        let status = s
                            .latest_build()
                            .map_or("NEVER BUILT", |b| build_status_label(b.status));
                        format!("{}\t{}\t{status}", s.id, s.name)
                    })
                    .collect()
            }
        }
        ListResource::Templates => {
            let items = client.list_templates().await.context("Failed to list templates")?;
            if json {
                vec![serde_json::to_string_pretty(&items)?]
            } else {
                items
                    .iter()
                    .map(|t| format!("{:?}\t{} steps", t.template_type, t.instructions.len()))
                    .collect()
            }
        }
    };

    let mut stdout = tokio::io::stdout();
    for line in lines {
        write_out(&mut stdout, &format!("{line}\n")).await?;
    }
    Ok(())
}

fn build_status_label(status: BuildStatus) -> &'static str {
    match status {
        BuildStatus::Draft => "DRAFT",
        BuildStatus::Building => "BUILDING",
        BuildStatus::Success => "SUCCESS",
        BuildStatus::Failed => "FAILED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(session: u64, text: &str) -> StreamSnapshot {
        StreamSnapshot {
            session,
            text: text.to_string(),
            chunks: 1,
            active: true,
            outcome: None::<StreamOutcome>,
        }
    }

    #[test]
    fn test_delta_writer_emits_only_new_text() {
        let mut delta = DeltaWriter::default();
        assert_eq!(delta.delta(&snap(1, "Step 1/3")), "Step 1/3");
        assert_eq!(delta.delta(&snap(1, "Step 1/3\nStep 2/3")), "\nStep 2/3");
        assert_eq!(delta.delta(&snap(1, "Step 1/3\nStep 2/3")), "");
    }

    #[test]
    fn test_delta_writer_restarts_with_new_session() {
        let mut delta = DeltaWriter::default();
        delta.delta(&snap(1, "old build output"));
        assert_eq!(delta.delta(&snap(2, "new")), "new");
    }

    #[test]
    fn test_format_entry_includes_source() {
        let entry = LogEntry::new(LogLevel::Info, "Memory usage: 245MB").with_source("system");
        assert!(format_entry(&entry).ends_with("INFO: Memory usage: 245MB [system]"));
    }

    #[tokio::test]
    async fn test_write_out_skips_empty() {
        let mut buf: Vec<u8> = Vec::new();
        write_out(&mut buf, "").await.unwrap();
        write_out(&mut buf, "abc").await.unwrap();
        assert_eq!(buf, b"abc");
    }
}
