//! Issue status/priority classification
//!
//! Two fixed tables map an issue's textual status and priority onto triage
//! levels, completion percentages, and display glyphs. Levels sort into a
//! natural triage order: fresh work first, terminal states last for
//! statuses; blocker first, trivial last for priorities.

use crate::bitbucket::Issue;
use crate::error::{Error, Result};
use crate::timestamp::parse_tracker_ts;

/// Classification entry for an issue status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusClass {
    pub name: &'static str,
    pub level: usize,
    pub percent_complete: u8,
    pub symbol: &'static str,
}

/// Classification entry for an issue priority
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriorityClass {
    pub name: &'static str,
    pub level: usize,
    pub symbol: &'static str,
}

/// Status table, in triage order
///
/// "on hold" counts as fully allocated but paused, hence 100%.
pub const STATUSES: [StatusClass; 8] = [
    StatusClass { name: "new", level: 1, percent_complete: 0, symbol: "○" },
    StatusClass { name: "open", level: 2, percent_complete: 0, symbol: "◔" },
    StatusClass { name: "on hold", level: 3, percent_complete: 100, symbol: "⏸" },
    StatusClass { name: "resolved", level: 4, percent_complete: 75, symbol: "◕" },
    StatusClass { name: "closed", level: 5, percent_complete: 100, symbol: "●" },
    StatusClass { name: "invalid", level: 6, percent_complete: 100, symbol: "✕" },
    StatusClass { name: "wontfix", level: 7, percent_complete: 100, symbol: "⊘" },
    StatusClass { name: "duplicate", level: 8, percent_complete: 100, symbol: "≡" },
];

/// Priority table, blocker(1) < critical(2) < major(3) < minor(4) < trivial(5)
pub const PRIORITIES: [PriorityClass; 5] = [
    PriorityClass { name: "blocker", level: 1, symbol: "█" },
    PriorityClass { name: "critical", level: 2, symbol: "▇" },
    PriorityClass { name: "major", level: 3, symbol: "▅" },
    PriorityClass { name: "minor", level: 4, symbol: "▂" },
    PriorityClass { name: "trivial", level: 5, symbol: "▁" },
];

/// One standard workday, in seconds
pub const WORKDAY_SECONDS: i64 = 8 * 3600;

/// Working hours per calendar week (40 of 168)
const WORK_HOURS_PER_WEEK: i64 = 40;
const CALENDAR_HOURS_PER_WEEK: i64 = 168;

/// Look up a status by name (case-insensitive)
pub fn status_class(name: &str) -> Option<&'static StatusClass> {
    let trimmed = name.trim();
    STATUSES
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(trimmed))
}

/// Look up a priority by name (case-insensitive)
pub fn priority_class(name: &str) -> Option<&'static PriorityClass> {
    let trimmed = name.trim();
    PRIORITIES
        .iter()
        .find(|entry| entry.name.eq_ignore_ascii_case(trimmed))
}

fn status_rank(status: &str) -> usize {
    status_class(status)
        .map(|entry| entry.level)
        .unwrap_or(STATUSES.len() + 1)
}

fn priority_rank(priority: &str) -> usize {
    priority_class(priority)
        .map(|entry| entry.level)
        .unwrap_or(PRIORITIES.len() + 1)
}

/// Canonical issue ordering key: status level, then priority level, then
/// ascending numeric local id
///
/// Unrecognized labels rank after every known one rather than failing, so a
/// listing never drops issues.
pub fn sort_key(issue: &Issue) -> (usize, usize, u64) {
    (
        status_rank(&issue.status),
        priority_rank(&issue.priority),
        issue.local_id,
    )
}

/// Sort issues into canonical triage order
pub fn sort_issues(issues: &mut [Issue]) {
    issues.sort_by_key(sort_key);
}

/// Estimate the work time consumed by an issue, in seconds
///
/// The wall-clock span between creation and last update is scaled by the
/// standard workweek ratio (40 working hours per 168 calendar hours) once it
/// exceeds one workday, then rounded up to the next whole hour. A multi-day
/// span is assumed to contain only its work-time share, not the full
/// wall-clock duration.
///
/// Fails if either timestamp is absent or unparseable; the caller decides
/// whether that fails the issue or the whole pass.
pub fn elapsed_work_seconds(issue: &Issue) -> Result<i64> {
    let created = parse_tracker_ts(&issue.utc_created_on)?;
    let updated = parse_tracker_ts(&issue.utc_last_updated)?;

    let elapsed = (updated - created).num_seconds();
    if elapsed < 0 {
        return Err(Error::InvalidTimestamp(format!(
            "issue {} updated before created",
            issue.local_id
        )));
    }

    let scaled = if elapsed > WORKDAY_SECONDS {
        elapsed * WORK_HOURS_PER_WEEK / CALENDAR_HOURS_PER_WEEK
    } else {
        elapsed
    };

    // Round up to the next whole hour
    Ok(((scaled + 3599) / 3600) * 3600)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(local_id: u64, status: &str, priority: &str) -> Issue {
        Issue {
            local_id,
            status: status.to_string(),
            priority: priority.to_string(),
            title: format!("issue {local_id}"),
            milestone: None,
            utc_created_on: "2015-06-01 10:00:00+00:00".to_string(),
            utc_last_updated: "2015-06-01 12:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn status_lookup_is_case_insensitive() {
        assert_eq!(status_class("Resolved").unwrap().percent_complete, 75);
        assert_eq!(status_class("WONTFIX").unwrap().percent_complete, 100);
        assert!(status_class("unheard-of").is_none());
    }

    #[test]
    fn priority_levels_order_blocker_first() {
        let levels: Vec<usize> = ["blocker", "critical", "major", "minor", "trivial"]
            .iter()
            .map(|name| priority_class(name).unwrap().level)
            .collect();
        assert_eq!(levels, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn status_level_dominates_priority() {
        // A new blocker sorts before a closed trivial issue even with a
        // higher local id.
        let closed = issue(1, "closed", "trivial");
        let fresh = issue(2, "new", "blocker");
        assert!(sort_key(&fresh) < sort_key(&closed));
    }

    #[test]
    fn local_id_breaks_ties() {
        let a = issue(7, "open", "major");
        let b = issue(3, "open", "major");
        let mut issues = vec![a, b];
        sort_issues(&mut issues);
        assert_eq!(issues[0].local_id, 3);
        assert_eq!(issues[1].local_id, 7);
    }

    #[test]
    fn unknown_labels_rank_last() {
        let strange = issue(1, "mystery", "mystery");
        let terminal = issue(2, "duplicate", "trivial");
        assert!(sort_key(&terminal) < sort_key(&strange));
    }

    #[test]
    fn short_spans_are_not_scaled() {
        // Two hours elapsed, under one workday: kept as-is.
        let subject = issue(1, "open", "major");
        assert_eq!(elapsed_work_seconds(&subject).unwrap(), 2 * 3600);
    }

    #[test]
    fn long_spans_are_scaled_to_work_time() {
        let mut subject = issue(1, "open", "major");
        subject.utc_created_on = "2015-06-01 00:00:00+00:00".to_string();
        subject.utc_last_updated = "2015-06-08 00:00:00+00:00".to_string();
        // One calendar week scales to one working week, rounded to hours.
        assert_eq!(elapsed_work_seconds(&subject).unwrap(), 40 * 3600);
    }

    #[test]
    fn scaled_spans_round_up_to_whole_hours() {
        let mut subject = issue(1, "open", "major");
        subject.utc_created_on = "2015-06-01 00:00:00+00:00".to_string();
        subject.utc_last_updated = "2015-06-02 03:30:00+00:00".to_string();
        // 27.5h elapsed -> x 40/168 = 23571s -> ceil to 7h.
        assert_eq!(elapsed_work_seconds(&subject).unwrap(), 7 * 3600);
    }

    #[test]
    fn malformed_timestamps_fail_loudly() {
        let mut subject = issue(1, "open", "major");
        subject.utc_last_updated = "yesterday-ish".to_string();
        assert!(matches!(
            elapsed_work_seconds(&subject),
            Err(Error::InvalidTimestamp(_))
        ));
    }
}
