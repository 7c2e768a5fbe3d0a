use anyhow::Result;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;

use crate::common::TestProject;
use memofill::test_utils::{DealFixture, TemplateFixture};

fn memofill(project: &TestProject) -> Command {
    Command::from_std(project.command())
}

#[test]
fn test_fill_writes_unique_outputs() -> Result<()> {
    let project = TestProject::new()?;
    DealFixture::sparse().write_to(project.dir())?;
    TemplateFixture::memo().write_to(project.dir())?;

    memofill(&project)
        .args(["fill", "--template", "memo.md", "--input", "sparse.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Wrote"))
        .stdout(predicate::str::contains("sparse_memo.md"))
        .stdout(predicate::str::contains("Checksum: sha256:"))
        .stdout(predicate::str::contains("Sponsors found: 0"));

    let memo = project.read_file("sparse_memo.md")?;
    assert!(memo.contains("Property: Example Plaza"));

    memofill(&project)
        .args(["fill", "-t", "memo.md", "-i", "sparse.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sparse_memo_2.md"));
    assert_eq!(project.read_file("sparse_memo_2.md")?, memo);
    Ok(())
}

#[test]
fn test_fill_json_report() -> Result<()> {
    let project = TestProject::new()?;
    DealFixture::extractions().write_to(project.dir())?;
    TemplateFixture::memo().write_to(project.dir())?;

    let output = project.run_memofill(&[
        "fill",
        "-t",
        "memo.md",
        "-i",
        "extractions.json",
        "--output-dir",
        "out",
        "--output-name",
        "harbor.md",
        "--format",
        "json",
    ])?;
    output.assert_success();

    let report = output.json()?;
    assert_eq!(report["sponsors_found"], 2);
    assert_eq!(report["sponsor_names"], json!(["Steve Hudson", "Charles Ladd"]));
    assert!(report["checksum"].as_str().unwrap().starts_with("sha256:"));
    assert!(report["output"].as_str().unwrap().ends_with("harbor.md"));
    assert!(project.dir().join("out/harbor.md").exists());
    Ok(())
}

#[test]
fn test_fill_selects_deal_index() -> Result<()> {
    let project = TestProject::new()?;
    DealFixture::wrapped(0).write_to(project.dir())?;
    project.write_file("cover.txt", "{{ cover.property_name }}")?;

    project
        .run_memofill(&["fill", "-t", "cover.txt", "-i", "wrapped.json", "--deal-index", "1"])?
        .assert_success();
    assert_eq!(project.read_file("wrapped_memo.txt")?, "Second Plaza");

    project
        .run_memofill(&["fill", "-t", "cover.txt", "-i", "wrapped.json", "--deal-index", "9"])?
        .assert_failure()
        .assert_stderr_contains("Deal index 9 is out of range (2 deal(s) supplied)");
    Ok(())
}

#[test]
fn test_fill_reports_render_errors() -> Result<()> {
    let project = TestProject::new()?;
    DealFixture::sparse().write_to(project.dir())?;
    project.write_file("broken.md", "{{ sponsr.name }}")?;

    memofill(&project)
        .args(["fill", "-t", "broken.md", "-i", "sparse.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template rendering failed"))
        .stderr(predicate::str::contains("sponsr"));
    assert!(!project.dir().join("sparse_memo.md").exists());
    Ok(())
}

#[test]
fn test_missing_template_and_bad_input() -> Result<()> {
    let project = TestProject::new()?;
    DealFixture::sparse().write_to(project.dir())?;
    project.write_file("scalar.json", "42")?;
    TemplateFixture::memo().write_to(project.dir())?;

    memofill(&project)
        .args(["fill", "-t", "nope.md", "-i", "sparse.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Template not found: nope.md"));

    memofill(&project)
        .args(["fill", "-t", "memo.md", "-i", "scalar.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid input shape"));
    Ok(())
}

#[test]
fn test_transform_prints_schema_document() -> Result<()> {
    let project = TestProject::new()?;
    DealFixture::with_leverage().write_to(project.dir())?;

    let output = project.run_memofill(&["transform", "-i", "leverage.json"])?;
    output.assert_success();
    let doc = output.json()?;
    assert_eq!(doc["LTV"], "62.50%");
    assert_eq!(doc["sections"]["cover"]["property_name"], "Harbor Point");
    assert!(doc.get("images").is_none());

    let output = project.run_memofill(&["transform", "-i", "leverage.json", "--flatten"])?;
    output.assert_success();
    let context = output.json()?;
    assert_eq!(context["images"], json!([]));
    assert_eq!(context["deal_facts"]["property_type"], "Retail");
    assert!(context["deal_facts"]["items"].is_array());
    Ok(())
}

#[test]
fn test_variables_report() -> Result<()> {
    let project = TestProject::new()?;
    DealFixture::sparse().write_to(project.dir())?;
    TemplateFixture::memo().write_to(project.dir())?;
    project.write_file("extra.md", "{{ cover.property_name }} {{ appraisal_summary }}")?;

    memofill(&project)
        .args(["variables", "-t", "memo.md"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Referenced variables:"))
        .stdout(predicate::str::contains("  sponsors"));

    memofill(&project)
        .args(["variables", "-t", "memo.md", "-i", "sparse.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ Every referenced variable is in the context"));

    let output = project.run_memofill(&[
        "variables",
        "-t",
        "extra.md",
        "-i",
        "sparse.json",
        "--format",
        "json",
    ])?;
    output.assert_failure().assert_stderr_contains("appraisal_summary");
    assert_eq!(output.json()?["missing"], json!(["appraisal_summary"]));
    Ok(())
}
