//! Issue source client for Bitbucket-style trackers
//!
//! The tracker API pages issues in batches: `GET
//! /repositories/{owner}/{slug}/issues?start=N&limit=B` returns `{count,
//! issues}`. Consumers see a lazy, finite, forward-only iterator of
//! `Result<Issue>`; pagination state lives entirely in the iterator, never
//! in the synchronizer.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::BitbucketConfig;
use crate::error::{Error, Result};

/// An issue as consumed by the synchronizer
///
/// Timestamps stay in tracker form; conversion happens at the point of use
/// so a malformed timestamp fails that issue, not the fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub local_id: u64,
    pub status: String,
    pub priority: String,
    pub title: String,
    pub milestone: Option<String>,
    pub utc_created_on: String,
    pub utc_last_updated: String,
}

/// A source of issues for one repository
///
/// Implementations handle pagination internally and yield an exhausted
/// iterator once all batches are consumed. The sequence is forward-only and
/// non-restartable.
pub trait IssueSource {
    fn issues(
        &self,
        owner: &str,
        slug: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<Issue>> + '_>>;
}

// Wire types for the tracker response; `metadata.milestone` is flattened
// into `Issue::milestone`.

#[derive(Debug, Deserialize)]
struct WireIssue {
    local_id: u64,
    status: String,
    priority: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    metadata: WireMetadata,
    utc_created_on: String,
    utc_last_updated: String,
}

#[derive(Debug, Default, Deserialize)]
struct WireMetadata {
    #[serde(default)]
    milestone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IssuePage {
    count: u64,
    issues: Vec<WireIssue>,
}

impl From<WireIssue> for Issue {
    fn from(wire: WireIssue) -> Self {
        let milestone = wire
            .metadata
            .milestone
            .filter(|value| !value.trim().is_empty());
        Issue {
            local_id: wire.local_id,
            status: wire.status,
            priority: wire.priority,
            title: wire.title,
            milestone,
            utc_created_on: wire.utc_created_on,
            utc_last_updated: wire.utc_last_updated,
        }
    }
}

/// Blocking Bitbucket issue client
#[derive(Debug, Clone)]
pub struct BitbucketClient {
    http: reqwest::blocking::Client,
    base_url: String,
    batch_size: u64,
    username: Option<String>,
    password: Option<String>,
}

impl BitbucketClient {
    pub fn new(config: &BitbucketConfig, username: Option<String>, password: Option<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            batch_size: config.batch_size,
            username,
            password,
        }
    }

    fn fetch_page(&self, owner: &str, slug: &str, start: u64) -> Result<IssuePage> {
        let url = format!("{}/repositories/{}/{}/issues", self.base_url, owner, slug);
        tracing::debug!(%url, start, "fetching issue batch");

        let mut request = self.http.get(&url).query(&[
            ("start", start.to_string()),
            ("limit", self.batch_size.to_string()),
        ]);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request.send().map_err(|err| Error::TrackerFetch {
            owner: owner.to_string(),
            slug: slug.to_string(),
            reason: err.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::TrackerFetch {
                owner: owner.to_string(),
                slug: slug.to_string(),
                reason: format!("HTTP {status}"),
            });
        }

        response.json().map_err(|err| Error::TrackerFetch {
            owner: owner.to_string(),
            slug: slug.to_string(),
            reason: format!("malformed response: {err}"),
        })
    }
}

impl IssueSource for BitbucketClient {
    fn issues(
        &self,
        owner: &str,
        slug: &str,
    ) -> Result<Box<dyn Iterator<Item = Result<Issue>> + '_>> {
        Ok(Box::new(IssueIter {
            client: self,
            owner: owner.to_string(),
            slug: slug.to_string(),
            buffer: VecDeque::new(),
            start: 0,
            count: None,
            done: false,
        }))
    }
}

/// Lazy pagination over one repository's issues
///
/// Each exhausted buffer triggers at most one request. A fetch error is
/// yielded once and terminates the sequence.
struct IssueIter<'a> {
    client: &'a BitbucketClient,
    owner: String,
    slug: String,
    buffer: VecDeque<Issue>,
    start: u64,
    count: Option<u64>,
    done: bool,
}

impl Iterator for IssueIter<'_> {
    type Item = Result<Issue>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(issue) = self.buffer.pop_front() {
                return Some(Ok(issue));
            }
            if self.done {
                return None;
            }
            if let Some(count) = self.count {
                if self.start >= count {
                    self.done = true;
                    return None;
                }
            }

            match self.client.fetch_page(&self.owner, &self.slug, self.start) {
                Ok(page) => {
                    self.count = Some(page.count);
                    self.start += self.client.batch_size;
                    if page.issues.is_empty() {
                        self.done = true;
                        return None;
                    }
                    self.buffer.extend(page.issues.into_iter().map(Issue::from));
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
