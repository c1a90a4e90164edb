#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use issueplanner::bitbucket::{Issue, IssueSource};
use issueplanner::error::{Error, Result};
use tempfile::TempDir;

/// A planner document on disk inside a temp directory
pub struct TestDoc {
    dir: TempDir,
    path: PathBuf,
}

impl TestDoc {
    pub fn with_xml(xml: &str) -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let path = dir.path().join("project.planner");
        fs::write(&path, xml).expect("write planner doc");
        Self { dir, path }
    }

    /// Document with the given `(name, description)` properties and an
    /// empty task tree
    pub fn with_properties(properties: &[(&str, &str)]) -> Self {
        Self::with_xml(&planner_xml(properties))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn read(&self) -> String {
        fs::read_to_string(&self.path).expect("read planner doc")
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        let path = self.dir.path().join(".ip.toml");
        fs::write(&path, contents).expect("write config");
        path
    }
}

/// Minimal planner XML with the given project properties
pub fn planner_xml(properties: &[(&str, &str)]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<project name=\"demo\" company=\"\" project-start=\"\">\n  <properties>\n");
    for (name, description) in properties {
        xml.push_str(&format!(
            "    <property name=\"{name}\" type=\"text\" owner=\"project\" description=\"{description}\"/>\n"
        ));
    }
    xml.push_str("  </properties>\n  <tasks/>\n  <resources/>\n  <allocations/>\n</project>\n");
    xml
}

/// Issue with sensible defaults for tests
pub fn issue(local_id: u64, status: &str, priority: &str, milestone: Option<&str>) -> Issue {
    Issue {
        local_id,
        status: status.to_string(),
        priority: priority.to_string(),
        title: format!("issue {local_id}"),
        milestone: milestone.map(|value| value.to_string()),
        utc_created_on: "2015-06-01 10:00:00+00:00".to_string(),
        utc_last_updated: "2015-06-01 12:00:00+00:00".to_string(),
    }
}

/// In-memory issue source keyed by `owner/slug`
#[derive(Default)]
pub struct StaticSource {
    repos: HashMap<String, Vec<Issue>>,
    failing: Vec<String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repo(mut self, owner: &str, slug: &str, issues: Vec<Issue>) -> Self {
        self.repos.insert(format!("{owner}/{slug}"), issues);
        self
    }

    /// Make fetches for this repository fail mid-stream
    pub fn with_failing_repo(mut self, owner: &str, slug: &str) -> Self {
        self.failing.push(format!("{owner}/{slug}"));
        self
    }
}

impl IssueSource for StaticSource {
    fn issues(
        &self,
        owner: &str,
        slug: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<Issue>> + '_>> {
        let key = format!("{owner}/{slug}");
        if self.failing.contains(&key) {
            let err = Error::TrackerFetch {
                owner: owner.to_string(),
                slug: slug.to_string(),
                reason: "simulated outage".to_string(),
            };
            return Ok(Box::new(std::iter::once(Err(err))));
        }
        let issues = self.repos.get(&key).cloned().unwrap_or_default();
        Ok(Box::new(issues.into_iter().map(Ok)))
    }
}

/// assert_cmd command for the ip binary
pub fn ip_cmd() -> assert_cmd::Command {
    assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("ip"))
}
