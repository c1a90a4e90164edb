//! Tracker specs and identities
//!
//! A tracker is declared inside a planner document as a property whose
//! description has the form `scm:owner/slug` (e.g.
//! `bitbucket:biocommons/eutils`). The property's name doubles as the
//! human-readable issue prefix for that tracker.

use serde::Serialize;

/// A parsed `scm:owner/slug` tracker spec
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerSpec {
    pub scm: String,
    pub owner: String,
    pub slug: String,
}

/// A tracker spec paired with its document property name
///
/// The prefix labels issue tasks (`[<prefix>-<id>] ...`) and identifies the
/// tracker in CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackerIdentity {
    pub prefix: String,
    pub scm: String,
    pub owner: String,
    pub slug: String,
}

impl TrackerIdentity {
    pub fn new(prefix: impl Into<String>, spec: TrackerSpec) -> Self {
        Self {
            prefix: prefix.into(),
            scm: spec.scm,
            owner: spec.owner,
            slug: spec.slug,
        }
    }

    /// Fully-qualified repository name, used as the project task name
    ///
    /// Qualified with the owner so same-named repositories under different
    /// owners never collide within one document.
    pub fn fqrn(&self) -> String {
        format!("{}/{}", self.owner, self.slug)
    }

    /// The tag embedded in an issue task's name, e.g. `[PRJ-123]`
    ///
    /// Re-syncs key existing issue leaves by this tag.
    pub fn issue_tag(&self, local_id: u64) -> String {
        format!("[{}-{}]", self.prefix, local_id)
    }
}

/// Parse a tracker spec string
///
/// Returns `None` for non-matching input; document properties that are not
/// tracker declarations are expected and not an error. Each component is
/// restricted to word characters and the pattern is anchored at both ends.
pub fn parse_tracker_spec(raw: &str) -> Option<TrackerSpec> {
    let (scm, rest) = raw.split_once(':')?;
    let (owner, slug) = rest.split_once('/')?;

    if !is_word(scm) || !is_word(owner) || !is_word(slug) {
        return None;
    }

    Some(TrackerSpec {
        scm: scm.to_string(),
        owner: owner.to_string(),
        slug: slug.to_string(),
    })
}

fn is_word(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_spec() {
        let spec = parse_tracker_spec("bitbucket:def/abc").expect("spec");
        assert_eq!(spec.scm, "bitbucket");
        assert_eq!(spec.owner, "def");
        assert_eq!(spec.slug, "abc");
    }

    #[test]
    fn allows_underscores_and_digits() {
        let spec = parse_tracker_spec("github:my_org2/repo_3").expect("spec");
        assert_eq!(spec.owner, "my_org2");
        assert_eq!(spec.slug, "repo_3");
    }

    #[test]
    fn rejects_non_specs() {
        assert!(parse_tracker_spec("not-a-spec").is_none());
        assert!(parse_tracker_spec("bitbucket:missing-slash").is_none());
        assert!(parse_tracker_spec("scm:owner/").is_none());
        assert!(parse_tracker_spec(":owner/slug").is_none());
        assert!(parse_tracker_spec("scm:owner/slug/extra").is_none());
        assert!(parse_tracker_spec("scm:ow ner/slug").is_none());
        assert!(parse_tracker_spec("").is_none());
    }

    #[test]
    fn identity_builds_fqrn_and_tag() {
        let spec = parse_tracker_spec("bitbucket:reece/issueplanner").expect("spec");
        let identity = TrackerIdentity::new("PRJ", spec);
        assert_eq!(identity.fqrn(), "reece/issueplanner");
        assert_eq!(identity.issue_tag(123), "[PRJ-123]");
    }
}
