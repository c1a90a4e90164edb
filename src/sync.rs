//! Task-tree synchronization engine
//!
//! Routes issues into the planner document's task hierarchy: project task
//! per tracked repository, milestone bucket (or "Unplanned") beneath it,
//! one leaf task per issue. The whole engine is a stateless tree-upsert;
//! the document is the only state that persists between runs.
//!
//! Re-running a sync against an unchanged issue set leaves the document
//! byte-identical: path segments are found before they are created, and
//! issue leaves are keyed by their embedded `[PREFIX-id]` tag and updated
//! in place rather than appended again.

use serde::Serialize;
use tracing::{debug, warn};

use crate::bitbucket::{Issue, IssueSource};
use crate::classify::{self, elapsed_work_seconds, priority_class, status_class};
use crate::document::NodeId;
use crate::error::{Error, Result};
use crate::planner::PlannerDoc;
use crate::timestamp::to_planner_ts;
use crate::tracker::TrackerIdentity;

/// Milestone bucket for issues without one
pub const UNPLANNED: &str = "Unplanned";

/// Constraint type for issue leaves: an issue cannot start before it was
/// filed
pub const START_NO_EARLIER_THAN: &str = "start-no-earlier-than";

/// Decompose a dotted milestone into nested bucket names
///
/// `1.2.3` nests under its minor-version bucket: `["1.2", "1.2.3"]`.
/// A two-part milestone is its own bucket: `["2.0"]`.
pub fn milestone_path_names(milestone: &str) -> Vec<String> {
    let parts: Vec<&str> = milestone.split('.').collect();
    (1..parts.len()).map(|i| parts[..=i].join(".")).collect()
}

/// Bucket names for an issue's milestone
///
/// No milestone falls back to the "Unplanned" bucket; dotted milestones
/// decompose into nested buckets; anything else is a single literal bucket.
pub fn milestone_path(milestone: Option<&str>) -> Vec<String> {
    match milestone {
        None => vec![UNPLANNED.to_string()],
        Some(label) if label.contains('.') => milestone_path_names(label),
        Some(label) => vec![label.to_string()],
    }
}

/// What happened to one issue during sync
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    Created,
    Updated,
    Skipped(String),
}

/// Per-tracker sync result
#[derive(Debug, Clone, Serialize)]
pub struct TrackerSyncReport {
    pub prefix: String,
    pub repository: String,
    pub issues_total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// A tracker whose sync failed without affecting its siblings
#[derive(Debug, Clone, Serialize)]
pub struct TrackerFailure {
    pub prefix: String,
    pub repository: String,
    pub error: String,
}

/// Whole-document sync result
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub trackers: Vec<TrackerSyncReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<TrackerFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_start: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Tree-upsert operations over one planner document
pub struct SyncEngine<'a> {
    doc: &'a mut PlannerDoc,
}

impl<'a> SyncEngine<'a> {
    pub fn new(doc: &'a mut PlannerDoc) -> Self {
        Self { doc }
    }

    /// Walk a sequence of child task names from `parent`, creating missing
    /// segments, and return the deepest node
    ///
    /// Exactly one match descends; zero matches creates the segment as the
    /// last child; two or more matches is a data-integrity violation and
    /// fails without guessing.
    pub fn resolve_path(&mut self, parent: NodeId, names: &[String]) -> Result<NodeId> {
        let mut current = parent;
        for name in names {
            let matches: Vec<NodeId> = self
                .doc
                .document()
                .children_named(current, "task")
                .filter(|&child| self.doc.document().attr(child, "name") == Some(name.as_str()))
                .collect();

            current = match matches.len() {
                1 => matches[0],
                0 => {
                    debug!(name = name.as_str(), "creating task path segment");
                    let created = self.doc.create_task(name, &[]);
                    self.doc.document_mut().append_child(current, created);
                    created
                }
                _ => {
                    return Err(Error::DuplicateTaskName {
                        parent: self.node_label(current),
                        name: name.clone(),
                    });
                }
            };
        }
        Ok(current)
    }

    /// Find or create the project task for a tracked repository
    ///
    /// Project tasks sit directly under the `tasks` region, named
    /// `<owner>/<slug>`.
    pub fn project_task(&mut self, tracker: &TrackerIdentity) -> Result<NodeId> {
        let tasks_root = self.doc.tasks_root()?;
        self.resolve_path(tasks_root, &[tracker.fqrn()])
    }

    /// Find or create the milestone task for an issue under a project task
    pub fn milestone_task(&mut self, project: NodeId, milestone: Option<&str>) -> Result<NodeId> {
        self.resolve_path(project, &milestone_path(milestone))
    }

    /// Place one issue beneath its milestone bucket
    ///
    /// The leaf is keyed by the `[PREFIX-id]` tag embedded in its name:
    /// an existing leaf is updated in place, otherwise a new one is
    /// appended. Issues whose labels or timestamps cannot be interpreted
    /// are skipped, never written half-classified.
    pub fn upsert_issue(
        &mut self,
        project: NodeId,
        tracker: &TrackerIdentity,
        issue: &Issue,
    ) -> Result<IssueOutcome> {
        let tag = tracker.issue_tag(issue.local_id);

        let Some(status) = status_class(&issue.status) else {
            return Ok(IssueOutcome::Skipped(format!(
                "{tag}: unknown status '{}'",
                issue.status
            )));
        };
        let Some(priority) = priority_class(&issue.priority) else {
            return Ok(IssueOutcome::Skipped(format!(
                "{tag}: unknown priority '{}'",
                issue.priority
            )));
        };
        let work = match elapsed_work_seconds(issue) {
            Ok(seconds) => seconds,
            Err(err) => {
                return Ok(IssueOutcome::Skipped(format!("{tag}: {err}")));
            }
        };
        let start = match to_planner_ts(&issue.utc_created_on) {
            Ok(ts) => ts,
            Err(err) => {
                return Ok(IssueOutcome::Skipped(format!("{tag}: {err}")));
            }
        };

        let milestone = self.milestone_task(project, issue.milestone.as_deref())?;

        let title = issue.title.trim();
        let name = if title.is_empty() {
            tag.clone()
        } else {
            format!("{tag} {title}")
        };

        let existing: Vec<NodeId> = self
            .doc
            .document()
            .children_named(milestone, "task")
            .filter(|&child| {
                self.doc
                    .document()
                    .attr(child, "name")
                    .is_some_and(|value| value.starts_with(&tag))
            })
            .collect();

        let percent = status.percent_complete.to_string();
        let priority_level = priority.level.to_string();
        let work = work.to_string();

        let (leaf, outcome) = match existing.len() {
            1 => (existing[0], IssueOutcome::Updated),
            0 => {
                let created = self.doc.create_task(&name, &[]);
                self.doc.document_mut().append_child(milestone, created);
                (created, IssueOutcome::Created)
            }
            _ => {
                return Err(Error::DuplicateTaskName {
                    parent: self.node_label(milestone),
                    name: tag,
                });
            }
        };

        let document = self.doc.document_mut();
        document.set_attr(leaf, "name", name);
        document.set_attr(leaf, "work", work);
        document.set_attr(leaf, "start", start.clone());
        document.set_attr(leaf, "work-start", start.clone());
        document.set_attr(leaf, "percent-complete", percent);
        document.set_attr(leaf, "priority", priority_level);
        self.doc
            .set_task_constraint(leaf, START_NO_EARLIER_THAN, &start);

        Ok(outcome)
    }

    fn node_label(&self, id: NodeId) -> String {
        match self.doc.document().attr(id, "name") {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => self.doc.document().name(id).to_string(),
        }
    }
}

/// Sync one tracker's issues into the document
///
/// The issue sequence is consumed fully; a fetch failure aborts this
/// tracker only. Issues are inserted in canonical triage order.
pub fn sync_tracker(
    doc: &mut PlannerDoc,
    source: &dyn IssueSource,
    tracker: &TrackerIdentity,
) -> Result<TrackerSyncReport> {
    let mut issues: Vec<Issue> = Vec::new();
    for item in source.issues(&tracker.owner, &tracker.slug)? {
        issues.push(item?);
    }
    classify::sort_issues(&mut issues);

    let mut engine = SyncEngine::new(doc);
    let project = engine.project_task(tracker)?;

    let mut report = TrackerSyncReport {
        prefix: tracker.prefix.clone(),
        repository: tracker.fqrn(),
        issues_total: issues.len(),
        created: 0,
        updated: 0,
        skipped: 0,
        warnings: Vec::new(),
    };

    for issue in &issues {
        match engine.upsert_issue(project, tracker, issue)? {
            IssueOutcome::Created => report.created += 1,
            IssueOutcome::Updated => report.updated += 1,
            IssueOutcome::Skipped(reason) => {
                warn!(tracker = tracker.prefix.as_str(), %reason, "issue skipped");
                report.skipped += 1;
                report.warnings.push(reason);
            }
        }
    }

    Ok(report)
}

/// Sync every given tracker into the document, then recompute the
/// document-level start date
///
/// Source failures are isolated per tracker; integrity violations abort the
/// whole pass, since the document needs manual correction.
pub fn sync_document(
    doc: &mut PlannerDoc,
    source: &dyn IssueSource,
    trackers: &[TrackerIdentity],
) -> Result<SyncReport> {
    let mut report = SyncReport {
        trackers: Vec::new(),
        failures: Vec::new(),
        project_start: None,
        warnings: Vec::new(),
    };

    for tracker in trackers {
        match sync_tracker(doc, source, tracker) {
            Ok(tracker_report) => report.trackers.push(tracker_report),
            Err(err @ (Error::DuplicateTaskName { .. } | Error::MalformedDocument(_))) => {
                return Err(err);
            }
            Err(err) => {
                warn!(tracker = tracker.prefix.as_str(), error = %err, "tracker sync failed");
                report.failures.push(TrackerFailure {
                    prefix: tracker.prefix.clone(),
                    repository: tracker.fqrn(),
                    error: err.to_string(),
                });
            }
        }
    }

    match doc.recompute_project_start() {
        Ok(start) => report.project_start = Some(start),
        Err(Error::NoScheduledTasks) => {
            report
                .warnings
                .push("no scheduled tasks; project start left unchanged".to_string());
        }
        Err(err) => return Err(err),
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_doc() -> PlannerDoc {
        PlannerDoc::parse(
            r#"<?xml version="1.0"?>
<project name="demo" project-start="">
  <properties/>
  <tasks/>
  <resources/>
  <allocations/>
</project>
"#,
        )
        .expect("doc")
    }

    #[test]
    fn milestone_names_decompose_dotted_versions() {
        assert_eq!(milestone_path_names("1.2.3"), vec!["1.2", "1.2.3"]);
        assert_eq!(milestone_path_names("2.0"), vec!["2.0"]);
    }

    #[test]
    fn milestone_path_falls_back_to_unplanned() {
        assert_eq!(milestone_path(None), vec!["Unplanned"]);
        assert_eq!(milestone_path(Some("sprint9")), vec!["sprint9"]);
        assert_eq!(milestone_path(Some("1.2.3")), vec!["1.2", "1.2.3"]);
    }

    #[test]
    fn resolve_path_creates_then_reuses() {
        let mut doc = empty_doc();
        let tasks_root = doc.tasks_root().unwrap();
        let mut engine = SyncEngine::new(&mut doc);

        let names = vec!["1.2".to_string(), "1.2.3".to_string()];
        let deep = engine.resolve_path(tasks_root, &names).unwrap();
        let again = engine.resolve_path(tasks_root, &names).unwrap();
        assert_eq!(deep, again);

        let document = doc.document();
        let outer = document.child_named(tasks_root, "task").unwrap();
        assert_eq!(document.attr(outer, "name"), Some("1.2"));
        let inner = document.child_named(outer, "task").unwrap();
        assert_eq!(document.attr(inner, "name"), Some("1.2.3"));
        assert_eq!(inner, deep);
        // exactly two tasks were created
        assert_eq!(doc.tasks().len(), 2);
    }

    #[test]
    fn resolve_path_rejects_duplicate_siblings() {
        let mut doc = empty_doc();
        let tasks_root = doc.tasks_root().unwrap();
        for _ in 0..2 {
            let task = doc.create_task("twin", &[]);
            doc.document_mut().append_child(tasks_root, task);
        }

        let mut engine = SyncEngine::new(&mut doc);
        let err = engine
            .resolve_path(tasks_root, &["twin".to_string()])
            .unwrap_err();
        match err {
            Error::DuplicateTaskName { parent, name } => {
                assert_eq!(parent, "tasks");
                assert_eq!(name, "twin");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn resolve_path_with_no_names_returns_parent() {
        let mut doc = empty_doc();
        let tasks_root = doc.tasks_root().unwrap();
        let mut engine = SyncEngine::new(&mut doc);
        assert_eq!(engine.resolve_path(tasks_root, &[]).unwrap(), tasks_root);
    }
}
