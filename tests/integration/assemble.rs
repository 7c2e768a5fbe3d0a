use anyhow::Result;
use memofill::config::{ImageSettings, MemoConfig, MemoSettings};
use memofill::core::MemoError;
use memofill::templating::images::{parse_manifest, prepare_images};
use memofill::templating::variables::{missing_variables, referenced_variables};
use memofill::templating::{ContextAssembler, TeraRenderer, assemble_context};
use memofill::input::InputShape;
use memofill::test_utils::{DealFixture, TemplateFixture};

fn config() -> MemoConfig {
    MemoConfig {
        memo: MemoSettings {
            memo_date: Some("June 30, 2026".to_string()),
            ..MemoSettings::default()
        },
        ..MemoConfig::default()
    }
}

fn render_memo(fixture: DealFixture) -> Result<String> {
    let config = config();
    let assembled = assemble_context(fixture.value, &config)?;
    let template = TemplateFixture::memo().content;
    Ok(TeraRenderer::new().render_str(&template, &assembled.to_value())?)
}

#[test]
fn test_sparse_deal_renders_with_defaults() -> Result<()> {
    let memo = render_memo(DealFixture::sparse())?;

    assert!(memo.starts_with("# BRIDGE LOAN REQUEST\n"), "unexpected memo:\n{memo}");
    assert!(memo.contains("Property: Example Plaza\n"));
    assert!(memo.contains("LTV: N/A\n"));
    assert!(!memo.contains("Sponsor:"));
    Ok(())
}

#[test]
fn test_leverage_rows_render() -> Result<()> {
    let memo = render_memo(DealFixture::with_leverage())?;

    assert!(memo.contains("LTV: 62.50%\n"));
    assert!(memo.contains("- LTV at Closing: 62.50%\n"), "unexpected memo:\n{memo}");
    assert!(memo.contains("- LTC at Closing: 70.0%\n"));
    Ok(())
}

#[test]
fn test_wrapper_selects_deal() -> Result<()> {
    let config = config();

    let assembled = assemble_context(DealFixture::wrapped(1).value, &config)?;
    assert_eq!(assembled.context["cover"]["property_name"], "Second Plaza");

    let err = assemble_context(DealFixture::wrapped(5).value, &config).unwrap_err();
    assert_eq!(
        err,
        MemoError::DealIndexOutOfRange {
            index: 5,
            len: 2
        }
    );
    Ok(())
}

#[test]
fn test_extraction_records_name_sponsors() -> Result<()> {
    let assembled = assemble_context(DealFixture::extractions().value, &config())?;

    assert_eq!(assembled.sponsor_names, vec!["Steve Hudson", "Charles Ladd"]);
    assert_eq!(
        assembled.context["sections"]["sponsorship"]["name"],
        "Steve Hudson & Charles Ladd"
    );
    assert_eq!(assembled.context["cover"]["memo_date"], "June 30, 2026");
    Ok(())
}

#[test]
fn test_image_manifest_is_sized_and_merged() -> Result<()> {
    let config = config();
    let manifest = parse_manifest(
        r#"{
            "IMAGE_SITE_PLAN": {"src": "site.png", "width_px": 1600, "height_px": 1200},
            "logo": {"src": "logo.png", "width_px": 100, "height_px": 100}
        }"#,
    )?;
    let images = prepare_images(&manifest, &ImageSettings::default());
    assert_eq!(images.len(), 1);

    let assembled = ContextAssembler::new(&config).assemble_value(
        DealFixture::sparse().value,
        InputShape::Auto,
        None,
        &images,
    )?;
    let handle = &assembled.context["IMAGE_SITE_PLAN"];
    assert_eq!(handle["src"], "site.png");
    assert_eq!(handle["width_in"], 5.5);
    assert_eq!(handle["height_in"], 4.125);
    assert!(assembled.context.get("logo").is_none());
    Ok(())
}

#[test]
fn test_memo_template_variables_are_all_provided() -> Result<()> {
    let template = TemplateFixture::memo().content;
    let referenced: Vec<String> = referenced_variables(&template).into_iter().collect();
    assert_eq!(referenced, vec!["LTV", "cover", "sections", "sponsors"]);

    for fixture in [DealFixture::sparse(), DealFixture::extractions()] {
        let assembled = assemble_context(fixture.value, &config())?;
        assert!(missing_variables(&template, &assembled.context).is_empty());
    }
    Ok(())
}
