mod common;

use anyhow::Result;
use common::{write_hwpx, HWPML_SECTION};
use hwpx_automation::core::hwpx::text::extract_text;
use hwpx_automation::core::processor::BATCH_SUMMARY_FILE;
use hwpx_automation::core::reference::ReferenceSource;
use hwpx_automation::domain::model::ReplaceOptions;
use hwpx_automation::{HwpxPackage, HwpxProcessor};
use tempfile::TempDir;

const TERMS_CSV: &str = "검색어,치환어\nHWPX,한글문서파일\n구용어,신용어\nAI,인공지능\n";

fn setup() -> Result<TempDir> {
    let dir = TempDir::new()?;
    write_hwpx(&dir.path().join("doc.hwpx"), &[("BodyText/Section0.xml", HWPML_SECTION)]);
    std::fs::write(dir.path().join("terms.csv"), TERMS_CSV)?;
    Ok(dir)
}

#[test]
fn test_replace_rewrites_document_and_backs_up() -> Result<()> {
    let dir = setup()?;
    let input = dir.path().join("doc.hwpx");
    let output = dir.path().join("doc_processed.hwpx");
    let source = ReferenceSource::File(dir.path().join("terms.csv"));

    let summary = HwpxProcessor::new(false).search_and_replace(
        &input,
        &source,
        Some(&output),
        &ReplaceOptions::default(),
    );

    assert!(summary.success, "{:?}", summary.error);
    assert_eq!(summary.total_terms_processed, 3);
    assert_eq!(summary.total_replacements, 4);
    let counts: Vec<_> = summary
        .replacements
        .iter()
        .map(|r| (r.search_term.as_str(), r.count))
        .collect();
    assert_eq!(
        counts,
        vec![("HWPX", Some(1)), ("구용어", Some(2)), ("AI", Some(1))]
    );

    let text = extract_text(&HwpxPackage::open(&output)?)?.text;
    assert_eq!(text, "한글문서파일 문서의 신용어를 바꿉니다. 신용어 목록과 인공지능 소개");

    assert!(dir.path().join("doc.hwpx.backup").exists());
    assert_eq!(summary.output_file.as_deref(), Some(output.display().to_string().as_str()));
    Ok(())
}

#[test]
fn test_preview_reports_positions_without_writing() -> Result<()> {
    let dir = setup()?;
    let input = dir.path().join("doc.hwpx");
    let output = dir.path().join("preview.hwpx");
    let options = ReplaceOptions {
        preview_only: true,
        ..Default::default()
    };

    let summary = HwpxProcessor::new(false).search_and_replace(
        &input,
        &ReferenceSource::File(dir.path().join("terms.csv")),
        Some(&output),
        &options,
    );

    assert!(summary.success);
    assert!(summary.preview_only);
    let old_term = summary
        .replacements
        .iter()
        .find(|r| r.search_term == "구용어")
        .expect("구용어 record");
    assert_eq!(old_term.matches, Some(2));
    assert_eq!(old_term.positions.as_deref(), Some(&[9, 20][..]));

    assert!(!output.exists());
    assert!(!dir.path().join("doc.hwpx.backup").exists());
    Ok(())
}

#[test]
fn test_text_and_json_outputs() -> Result<()> {
    let dir = setup()?;
    let input = dir.path().join("doc.hwpx");
    let source = ReferenceSource::Pairs(vec![("구용어".to_string(), "새말".to_string())]);
    let options = ReplaceOptions {
        backup_original: false,
        max_replacements_per_term: Some(1),
        ..Default::default()
    };
    let processor = HwpxProcessor::new(false);

    let txt = dir.path().join("out/doc.txt");
    let summary = processor.search_and_replace(&input, &source, Some(&txt), &options);
    assert_eq!(summary.total_replacements, 1);
    assert!(std::fs::read_to_string(&txt)?.contains("새말를 바꿉니다. 구용어 목록"));

    let json = dir.path().join("out/doc.json");
    processor.search_and_replace(&input, &source, Some(&json), &options);
    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&json)?)?;
    assert_eq!(value["total_replacements"], 1);
    assert_eq!(value["replacements"][0]["replacement_term"], "새말");

    let unsupported = dir.path().join("out/doc.pdf");
    let summary = processor.search_and_replace(&input, &source, Some(&unsupported), &options);
    assert!(summary.success);
    assert!(summary.output_error.is_some());
    assert!(!unsupported.exists());
    Ok(())
}

#[test]
fn test_missing_document_is_reported_in_summary() -> Result<()> {
    let dir = setup()?;
    let summary = HwpxProcessor::new(false).search_and_replace(
        &dir.path().join("missing.hwpx"),
        &ReferenceSource::File(dir.path().join("terms.csv")),
        None,
        &ReplaceOptions::default(),
    );
    assert!(!summary.success);
    assert!(summary.error.unwrap().contains("missing.hwpx"));
    Ok(())
}

#[test]
fn test_batch_continues_after_failures() -> Result<()> {
    let dir = setup()?;
    let docs = dir.path().join("docs");
    std::fs::create_dir_all(&docs)?;
    write_hwpx(&docs.join("a.hwpx"), &[("BodyText/Section0.xml", HWPML_SECTION)]);
    write_hwpx(&docs.join("c.hwpx"), &[("BodyText/Section0.xml", HWPML_SECTION)]);
    std::fs::write(docs.join("b.hwpx"), b"not a zip archive")?;
    std::fs::write(docs.join("notes.txt"), "HWPX")?;

    let output = dir.path().join("processed");
    let batch = HwpxProcessor::new(false).batch_process_folder(
        &docs,
        &ReferenceSource::File(dir.path().join("terms.csv")),
        Some(&output),
        "*.hwpx",
        &ReplaceOptions::default(),
    )?;

    let stats = &batch.processing_stats;
    assert_eq!(stats.files_processed, 3);
    assert_eq!(stats.files_successful, 2);
    assert_eq!(stats.files_failed, 1);
    assert_eq!(stats.total_replacements, 8);
    assert!(stats.start_time.is_some() && stats.end_time.is_some());

    assert!(output.join("a_processed.hwpx").exists());
    assert!(output.join("c_processed.hwpx").exists());
    assert!(!output.join("b_processed.hwpx").exists());

    let summary: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(output.join(BATCH_SUMMARY_FILE))?)?;
    assert_eq!(summary["processing_stats"]["files_failed"], 1);
    assert_eq!(summary["detailed_results"].as_array().map(Vec::len), Some(3));
    Ok(())
}

const INDENTED_SECTION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<SECTION>\n  <P><TEXT>a b</TEXT></P>\n</SECTION>";

#[test]
fn test_regex_terms_leave_markup_whitespace_alone() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("indented.hwpx");
    let output = dir.path().join("indented_out.hwpx");
    write_hwpx(&input, &[("BodyText/Section0.xml", INDENTED_SECTION)]);

    let options = ReplaceOptions {
        use_regex: true,
        backup_original: false,
        ..Default::default()
    };
    let summary = HwpxProcessor::new(false).search_and_replace(
        &input,
        &ReferenceSource::Pairs(vec![(r"\s+".to_string(), "_".to_string())]),
        Some(&output),
        &options,
    );

    assert!(summary.success, "{:?}", summary.error);
    assert_eq!(summary.total_replacements, 1);

    let xml = HwpxPackage::open(&output)?
        .read_xml("BodyText/Section0.xml")?
        .unwrap_or_default();
    assert!(xml.starts_with("<?xml"));
    assert!(xml.contains("?>\n<SECTION>\n  <P><TEXT>a_b</TEXT></P>\n</SECTION>"));
    Ok(())
}

#[test]
fn test_preview_and_apply_agree_on_spaced_terms() -> Result<()> {
    let dir = TempDir::new()?;
    let input = dir.path().join("contract.hwpx");
    write_hwpx(
        &input,
        &[(
            "BodyText/Section0.xml",
            "<SECTION><P><TEXT>계약   당사자 안내</TEXT></P>\n<P><TEXT>계약\n당사자 서명</TEXT></P></SECTION>",
        )],
    );
    let source = ReferenceSource::Pairs(vec![("계약 당사자".to_string(), "갑".to_string())]);
    let processor = HwpxProcessor::new(false);

    let preview = processor.search_and_replace(
        &input,
        &source,
        None,
        &ReplaceOptions {
            preview_only: true,
            ..Default::default()
        },
    );
    let applied = processor.search_and_replace(
        &input,
        &source,
        None,
        &ReplaceOptions {
            backup_original: false,
            ..Default::default()
        },
    );

    assert_eq!(preview.replacements[0].matches, Some(2));
    assert_eq!(applied.total_replacements, 2);
    assert_eq!(applied.modified_text.as_deref(), Some("갑 안내 갑 서명"));
    Ok(())
}
