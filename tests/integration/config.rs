use anyhow::Result;
use memofill::test_utils::{DealFixture, TemplateFixture};

use crate::common::TestProject;

#[test]
fn test_config_sets_cover_and_output_directory() -> Result<()> {
    let project = TestProject::new()?;
    project.write_config(
        r#"
[memo]
title = "CONSTRUCTION LOAN REQUEST"
memo_date = "January 15, 2026"

[output]
directory = "rendered"
"#,
    )?;
    DealFixture::sparse().write_to(project.dir())?;
    project.write_file("cover.md", "{{ cover.memo_title }} | {{ cover.memo_date }}")?;

    project.run_memofill(&["fill", "-t", "cover.md", "-i", "sparse.json"])?.assert_success();

    assert_eq!(
        project.read_file("rendered/sparse_memo.md")?,
        "CONSTRUCTION LOAN REQUEST | January 15, 2026"
    );
    Ok(())
}

#[test]
fn test_config_flag_overrides_environment() -> Result<()> {
    let project = TestProject::new()?;
    project.write_config("[memo]\ntitle = \"FROM ENV\"\n")?;
    let flag_config = project.write_file("team.toml", "[memo]\ntitle = \"FROM FLAG\"\n")?;
    DealFixture::sparse().write_to(project.dir())?;
    project.write_file("title.md", "{{ cover.memo_title }}")?;

    project
        .run_memofill(&[
            "--config",
            flag_config.to_str().unwrap(),
            "fill",
            "-t",
            "title.md",
            "-i",
            "sparse.json",
        ])?
        .assert_success();

    assert_eq!(project.read_file("sparse_memo.md")?, "FROM FLAG");
    Ok(())
}

#[test]
fn test_missing_config_uses_defaults() -> Result<()> {
    let project = TestProject::new()?;
    DealFixture::sparse().write_to(project.dir())?;
    TemplateFixture::memo().write_to(project.dir())?;

    project
        .run_memofill(&["fill", "-t", "memo.md", "-i", "sparse.json"])?
        .assert_success();

    assert!(project.read_file("sparse_memo.md")?.starts_with("# BRIDGE LOAN REQUEST"));
    Ok(())
}

#[test]
fn test_malformed_config_is_reported() -> Result<()> {
    let project = TestProject::new()?;
    project.write_config("[memo\ntitle = ")?;
    DealFixture::sparse().write_to(project.dir())?;
    TemplateFixture::memo().write_to(project.dir())?;

    project
        .run_memofill(&["fill", "-t", "memo.md", "-i", "sparse.json"])?
        .assert_failure()
        .assert_stderr_contains("Configuration error");
    Ok(())
}
