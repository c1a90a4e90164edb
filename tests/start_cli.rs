mod support;

use predicates::str::contains;

use support::{ip_cmd, TestDoc};

const SCHEDULED_DOC: &str = r#"<?xml version="1.0"?>
<project name="demo" company="" project-start="">
  <properties/>
  <tasks>
    <task id="1" name="a" start="20150603T000000Z"/>
    <task id="2" name="b" start=""/>
    <task id="3" name="c" start="20150601T000000Z"/>
  </tasks>
  <resources/>
  <allocations/>
</project>
"#;

#[test]
fn start_prints_earliest_task_start() {
    let doc = TestDoc::with_xml(SCHEDULED_DOC);

    ip_cmd()
        .args(["start", doc.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("ip start: 20150601T000000Z"));

    // Without --write the document is untouched.
    assert_eq!(doc.read(), SCHEDULED_DOC);
}

#[test]
fn start_write_persists_project_start() {
    let doc = TestDoc::with_xml(SCHEDULED_DOC);

    ip_cmd()
        .args(["start", doc.path().to_str().unwrap(), "--write"])
        .assert()
        .success();

    assert!(doc.read().contains(r#"project-start="20150601T000000Z""#));
}

#[test]
fn start_fails_when_nothing_is_scheduled() {
    let doc = TestDoc::with_properties(&[]);

    ip_cmd()
        .args(["start", doc.path().to_str().unwrap()])
        .assert()
        .failure()
        .code(3)
        .stderr(contains("No scheduled tasks"));
}
