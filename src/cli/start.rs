//! ip start command implementation
//!
//! Recomputes the document-level project start from task start times.

use std::path::PathBuf;

use crate::error::Result;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::planner::PlannerDoc;

pub struct StartOptions {
    pub file: PathBuf,
    pub write: bool,
    pub json: bool,
    pub quiet: bool,
}

#[derive(serde::Serialize)]
struct StartReport {
    document: PathBuf,
    project_start: String,
    written: bool,
}

pub fn run(opts: StartOptions) -> Result<()> {
    let mut doc = PlannerDoc::load(&opts.file)?;
    let project_start = doc.recompute_project_start()?;

    if opts.write {
        doc.save(&opts.file)?;
    }

    let mut human = HumanOutput::new(format!("ip start: {project_start}"));
    human.push_summary("document", opts.file.display().to_string());
    human.push_summary("project-start", project_start.clone());
    if !opts.write {
        human.push_next_step(format!("ip start {} --write", opts.file.display()));
    }

    let report = StartReport {
        document: opts.file.clone(),
        project_start,
        written: opts.write,
    };

    emit_success(
        OutputOptions {
            json: opts.json,
            quiet: opts.quiet,
        },
        "start",
        &report,
        Some(&human),
    )?;

    Ok(())
}
