//! ip sync command implementation
//!
//! The full fetch-and-sync pass: lock the document, enumerate its tracker
//! declarations, pull each tracker's issues, route them through the
//! task-tree synchronizer, recompute the project start, and write the
//! document back atomically.

use std::path::PathBuf;

use crate::bitbucket::BitbucketClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::lock::FileLock;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::planner::PlannerDoc;
use crate::sync::{sync_document, SyncReport};

pub struct SyncOptions {
    pub file: PathBuf,
    pub tracker: Option<String>,
    pub dry_run: bool,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct SyncCommandReport {
    document: PathBuf,
    dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    written_to: Option<PathBuf>,
    sync: SyncReport,
}

pub fn run(opts: SyncOptions) -> Result<()> {
    let config = Config::resolve(&opts.file, opts.config.as_ref())?;

    // The document is owned exclusively for the whole load-sync-save window.
    let lock_path = PathBuf::from(format!("{}.lock", opts.file.display()));
    let _lock = FileLock::acquire(&lock_path, config.sync.lock_timeout_ms)?;

    let mut doc = PlannerDoc::load(&opts.file)?;

    let mut trackers = doc.trackers();
    if let Some(prefix) = &opts.tracker {
        trackers.retain(|tracker| &tracker.prefix == prefix);
        if trackers.is_empty() {
            return Err(Error::TrackerNotFound(prefix.clone()));
        }
    }

    let (username, password) = config.auth.credentials();
    let client = BitbucketClient::new(&config.bitbucket, username, password);

    let report = sync_document(&mut doc, &client, &trackers)?;

    let written_to = if opts.dry_run {
        None
    } else {
        let target = opts.output.clone().unwrap_or_else(|| opts.file.clone());
        doc.save(&target)?;
        Some(target)
    };

    let header = if opts.dry_run {
        "ip sync: dry run, document not written".to_string()
    } else {
        format!("ip sync: {} tracker(s) synced", report.trackers.len())
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("document", opts.file.display().to_string());
    if let Some(start) = &report.project_start {
        human.push_summary("project-start", start.clone());
    }
    for tracker in &report.trackers {
        human.push_detail(format!(
            "{} ({}): {} issues, {} created, {} updated, {} skipped",
            tracker.prefix,
            tracker.repository,
            tracker.issues_total,
            tracker.created,
            tracker.updated,
            tracker.skipped
        ));
    }
    for warning in &report.warnings {
        human.push_warning(warning.clone());
    }
    for tracker in &report.trackers {
        for warning in &tracker.warnings {
            human.push_warning(format!("{}: {}", tracker.prefix, warning));
        }
    }
    for failure in &report.failures {
        human.push_warning(format!(
            "{} ({}) failed: {}",
            failure.prefix, failure.repository, failure.error
        ));
    }
    if opts.dry_run {
        human.push_next_step(format!("ip sync {}", opts.file.display()));
    }

    let command_report = SyncCommandReport {
        document: opts.file.clone(),
        dry_run: opts.dry_run,
        written_to,
        sync: report,
    };

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "sync",
        &command_report,
        Some(&human),
    )?;

    Ok(())
}
