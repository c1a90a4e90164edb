//! Planner document facade
//!
//! Reads, writes, and manipulates GNOME Planner documents through the
//! generic [`Document`] tree. A planner document is a `<project>` root with
//! four regions: `properties` (tracker declarations), `tasks` (the
//! project/milestone/issue hierarchy), `resources`, and `allocations`.
//!
//! Structural conventions for synced documents:
//!
//! - each tracked repository has a top-level task named `<owner>/<slug>`
//! - repository tasks may have child tasks named for `X.Y` milestones,
//!   with `X.Y.Z` milestones nested beneath their `X.Y` parent
//! - issues without a milestone live under an "Unplanned" child task
//! - issue task names carry tags like `[PRJ-123]`, which key re-sync

use std::path::Path;

use crate::document::{Document, NodeId};
use crate::error::{Error, Result};
use crate::tracker::{parse_tracker_spec, TrackerIdentity};

/// Default attributes for a freshly created task
///
/// Eight work-hours, unstarted, unscheduled, fixed-work. Callers layer
/// their own attributes over these.
pub const TASK_DEFAULTS: [(&str, &str); 9] = [
    ("note", ""),
    ("work", "28800"),
    ("start", ""),
    ("end", ""),
    ("work-start", ""),
    ("percent-complete", "0"),
    ("priority", "0"),
    ("type", "normal"),
    ("scheduling", "fixed-work"),
];

/// Facade over a planner document
#[derive(Debug, Clone)]
pub struct PlannerDoc {
    doc: Document,
}

impl PlannerDoc {
    /// Parse a planner document from XML text
    pub fn parse(xml: &str) -> Result<Self> {
        let doc = Document::parse(xml)?;
        if doc.name(doc.root()) != "project" {
            return Err(Error::MalformedDocument("project".to_string()));
        }
        Ok(PlannerDoc { doc })
    }

    /// Load a planner document from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let doc = Document::load(path)?;
        if doc.name(doc.root()) != "project" {
            return Err(Error::MalformedDocument("project".to_string()));
        }
        Ok(PlannerDoc { doc })
    }

    /// Serialize back to XML text
    pub fn to_xml_string(&self) -> Result<String> {
        self.doc.to_xml_string()
    }

    /// Atomically write the document to a file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.doc.save(path)
    }

    /// Access the underlying document tree
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    fn region(&self, name: &str) -> Result<NodeId> {
        self.doc
            .child_named(self.doc.root(), name)
            .ok_or_else(|| Error::MalformedDocument(name.to_string()))
    }

    /// The `tasks` region that roots the project/milestone/issue hierarchy
    pub fn tasks_root(&self) -> Result<NodeId> {
        self.region("tasks")
    }

    /// Every task in the document, in depth-first order
    pub fn tasks(&self) -> Vec<NodeId> {
        let Ok(tasks_root) = self.tasks_root() else {
            return Vec::new();
        };
        self.doc
            .descendants(tasks_root)
            .into_iter()
            .filter(|&id| self.doc.name(id) == "task")
            .collect()
    }

    /// Property declarations in the `properties` region
    pub fn properties(&self) -> Vec<NodeId> {
        self.region("properties")
            .map(|region| self.doc.children_named(region, "property").collect())
            .unwrap_or_default()
    }

    /// Resource declarations in the `resources` region
    pub fn resources(&self) -> Vec<NodeId> {
        self.region("resources")
            .map(|region| self.doc.children_named(region, "resource").collect())
            .unwrap_or_default()
    }

    /// Allocation entries in the `allocations` region
    pub fn allocations(&self) -> Vec<NodeId> {
        self.region("allocations")
            .map(|region| self.doc.children_named(region, "allocation").collect())
            .unwrap_or_default()
    }

    /// Tracker identities declared as document properties
    ///
    /// A property declares a tracker when its description parses as
    /// `scm:owner/slug`; the property name becomes the issue prefix.
    /// Properties that are not tracker declarations are skipped.
    pub fn trackers(&self) -> Vec<TrackerIdentity> {
        self.properties()
            .into_iter()
            .filter_map(|id| {
                let prefix = self.doc.attr(id, "name")?;
                let description = self.doc.attr(id, "description")?;
                let spec = parse_tracker_spec(description)?;
                Some(TrackerIdentity::new(prefix, spec))
            })
            .collect()
    }

    /// Next task identifier: one past the highest numeric id in the document
    ///
    /// An empty document starts numbering at 1.
    pub fn next_task_id(&self) -> u64 {
        let max_id = self
            .tasks()
            .into_iter()
            .filter_map(|id| self.doc.attr(id, "id"))
            .filter_map(|raw| raw.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        max_id + 1
    }

    /// Create a new unattached task with default scheduling attributes
    ///
    /// Supplied attributes are merged over [`TASK_DEFAULTS`]. The id is
    /// allocated monotonically across the whole document and never reused.
    /// The caller appends the task to its parent.
    pub fn create_task(&mut self, name: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.next_task_id();
        let task = self.doc.create_element("task");
        self.doc.set_attr(task, "id", id.to_string());
        self.doc.set_attr(task, "name", name);
        for (key, value) in TASK_DEFAULTS {
            self.doc.set_attr(task, key, value);
        }
        for (key, value) in attrs {
            self.doc.set_attr(task, key, *value);
        }
        task
    }

    /// Ensure a task has exactly one constraint child with the given type
    /// and time
    ///
    /// Creates the constraint element if absent, otherwise overwrites it in
    /// place; repeated calls with the same arguments are no-ops in effect.
    pub fn set_task_constraint(&mut self, task: NodeId, ctype: &str, time: &str) {
        let constraint = match self.doc.child_named(task, "constraint") {
            Some(existing) => existing,
            None => {
                let created = self.doc.create_element("constraint");
                self.doc.append_child(task, created);
                created
            }
        };
        self.doc.set_attr(constraint, "type", ctype);
        self.doc.set_attr(constraint, "time", time);
    }

    /// Recompute the document-level start date
    ///
    /// Scans every task's `start` attribute, ignoring empty values, and sets
    /// the project's `project-start` to the earliest one found. The compact
    /// timestamp form is fixed-width, so the lexicographic minimum is also
    /// the chronological minimum. Fails when no task is scheduled.
    pub fn recompute_project_start(&mut self) -> Result<String> {
        let earliest = self
            .tasks()
            .into_iter()
            .filter_map(|id| self.doc.attr(id, "start"))
            .filter(|start| !start.is_empty())
            .min()
            .map(|start| start.to_string())
            .ok_or(Error::NoScheduledTasks)?;

        let root = self.doc.root();
        self.doc.set_attr(root, "project-start", earliest.clone());
        Ok(earliest)
    }
}
