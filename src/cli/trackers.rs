//! ip trackers command implementation
//!
//! Lists the tracker identities declared as document properties.

use std::path::PathBuf;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::planner::PlannerDoc;
use crate::tracker::TrackerIdentity;

pub struct TrackersOptions {
    pub file: PathBuf,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct TrackersReport {
    document: PathBuf,
    trackers: Vec<TrackerIdentity>,
}

pub fn run(opts: TrackersOptions) -> Result<()> {
    let doc = PlannerDoc::load(&opts.file)?;
    let trackers = doc.trackers();

    let header = if trackers.is_empty() {
        "ip trackers: no trackers declared".to_string()
    } else {
        format!("ip trackers: {} declared", trackers.len())
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("document", opts.file.display().to_string());
    for tracker in &trackers {
        human.push_detail(format!(
            "{}: {}:{}/{}",
            tracker.prefix, tracker.scm, tracker.owner, tracker.slug
        ));
    }
    if trackers.is_empty() {
        human.push_next_step(
            "declare one as a project property: name=<prefix> description=scm:owner/slug",
        );
    } else {
        human.push_next_step(format!("ip sync {}", opts.file.display()));
    }

    let report = TrackersReport {
        document: opts.file.clone(),
        trackers,
    };

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "trackers",
        &report,
        Some(&human),
    )?;

    Ok(())
}
