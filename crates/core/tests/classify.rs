use std::path::PathBuf;
use std::sync::Mutex;

use organizer_core::model::{
    ArchiveFormat, ArchiveListing, ExecutableInfo, FileTimes, ImageInfo, PdfInfo,
};
use organizer_core::services::classify::{parse_response, render_choices, render_context};
use organizer_core::{
    ClassificationEngine, FileRecord, LabelTree, OracleError, OracleErrorKind, OracleRequest,
};

fn flat(names: &[&str]) -> LabelTree {
    LabelTree::from_paths(names).unwrap()
}

fn hierarchical() -> LabelTree {
    LabelTree::from_paths(["Documents/Work", "Documents/Personal", "Images", "Other"]).unwrap()
}

fn record(name: &str, extension: Option<&str>, mime: &str) -> FileRecord {
    FileRecord {
        path: PathBuf::from("/input").join(name),
        name: name.to_string(),
        extension: extension.map(str::to_string),
        size_bytes: 2048,
        mime_type: mime.to_string(),
        is_executable: false,
        archive: None,
        executable_info: None,
        image_info: None,
        pdf_info: None,
        times: FileTimes::default(),
        sha256: None,
    }
}

#[test]
fn exact_flat_label() {
    let tree = flat(&["Documents", "Images", "Other"]);
    let c = parse_response("Images", &tree, "Other");
    assert_eq!(c.label_path, vec!["Images"]);
    assert!(!c.is_fallback);
    assert_eq!(c.raw_response, "Images");
}

#[test]
fn exact_match_ignores_case_and_returns_configured_spelling() {
    let tree = flat(&["Documents", "Images"]);
    assert_eq!(parse_response("  images\n", &tree, "Other").label_path, vec!["Images"]);
    assert_eq!(parse_response("DOCUMENTS", &tree, "Other").label_path, vec!["Documents"]);
}

#[test]
fn hierarchical_path() {
    let c = parse_response("Documents/Work", &hierarchical(), "Other");
    assert_eq!(c.label_path, vec!["Documents", "Work"]);
    assert!(!c.is_fallback);
}

#[test]
fn hierarchical_path_with_spaces_and_decoration() {
    let c = parse_response("Category: **documents / personal**.", &hierarchical(), "Other");
    assert_eq!(c.label_path, vec!["Documents", "Personal"]);
}

#[test]
fn bare_category_is_valid_even_with_children() {
    let c = parse_response("Documents", &hierarchical(), "Other");
    assert_eq!(c.label_path, vec!["Documents"]);
    assert!(!c.is_fallback);
}

#[test]
fn unknown_sub_category_falls_back_to_parent() {
    let c = parse_response("Documents/Travel", &hierarchical(), "Other");
    assert_eq!(c.label_path, vec!["Documents"]);
    assert!(!c.is_fallback);
}

#[test]
fn quoted_and_prefixed_answers() {
    let tree = flat(&["Documents", "Images"]);
    assert_eq!(parse_response("\"Images\"", &tree, "Other").label_path, vec!["Images"]);
    assert_eq!(parse_response("Label: `Documents`", &tree, "Other").label_path, vec!["Documents"]);
    assert_eq!(parse_response("'Images'.", &tree, "Other").label_path, vec!["Images"]);
}

#[test]
fn free_text_containment_matches_singular() {
    let tree = flat(&["Images", "Audio"]);
    let c = parse_response("I think this is an Image file", &tree, "Other");
    assert_eq!(c.label_path, vec!["Images"]);
    assert!(!c.is_fallback);
}

#[test]
fn containment_requires_whole_words() {
    let tree = flat(&["Art", "Images"]);
    let c = parse_response("Looks like a partial upload", &tree, "Other");
    assert!(c.is_fallback);
}

#[test]
fn ambiguous_containment_falls_back() {
    let tree = flat(&["Images", "Audio"]);
    let c = parse_response("Either Images or Audio, hard to say", &tree, "Other");
    assert!(c.is_fallback);
    assert_eq!(c.label_path, vec!["Other"]);
}

#[test]
fn no_match_uses_fallback_bucket() {
    let tree = flat(&["Documents", "Images"]);
    let c = parse_response("Spreadsheet", &tree, "Other");
    assert!(c.is_fallback);
    assert_eq!(c.label_path, vec!["Other"]);
    assert_eq!(c.raw_response, "Spreadsheet");

    let custom = parse_response("", &tree, "Unsorted");
    assert!(custom.is_fallback);
    assert_eq!(custom.label_path, vec!["Unsorted"]);
}

#[test]
fn containment_refines_with_a_single_sub_category() {
    let c = parse_response("This is a Documents file, Work related", &hierarchical(), "Other");
    assert_eq!(c.label_path, vec!["Documents", "Work"]);
}

#[test]
fn containment_keeps_category_when_subs_are_ambiguous() {
    let c = parse_response(
        "Documents, could be Work or Personal",
        &hierarchical(),
        "Other",
    );
    assert_eq!(c.label_path, vec!["Documents"]);
}

#[test]
fn sub_category_alone_is_found_across_the_forest() {
    let c = parse_response("Probably personal stuff", &hierarchical(), "Other");
    assert_eq!(c.label_path, vec!["Documents", "Personal"]);
}

#[test]
fn context_is_deterministic_and_metadata_only() {
    let mut rec = record("bundle.zip", Some("zip"), "application/zip");
    rec.archive = Some(ArchiveListing {
        format: ArchiveFormat::Zip,
        entries: vec!["a.txt".into(), "b/c.png".into()],
        truncated: true,
    });
    rec.sha256 = Some("deadbeef".into());

    let ctx = render_context(&rec);
    assert_eq!(ctx, render_context(&rec));
    assert!(ctx.contains("name: bundle.zip\n"));
    assert!(ctx.contains("mime_type: application/zip\n"));
    assert!(ctx.contains("archive_format: zip\n"));
    assert!(ctx.contains("archive_entries: a.txt, b/c.png (truncated)\n"));
    assert!(!ctx.contains("deadbeef"));
    assert!(!ctx.contains("/input"));
}

#[test]
fn context_includes_executable_details() {
    let mut rec = record("setup.exe", Some("exe"), "application/x-msdownload");
    rec.is_executable = true;
    rec.executable_info = Some(ExecutableInfo {
        format: "PE32".into(),
        description: Some("Contoso Setup".into()),
        publisher: Some("Contoso Ltd.".into()),
        ..Default::default()
    });

    let ctx = render_context(&rec);
    assert!(ctx.contains("executable: true\n"));
    assert!(ctx.contains("executable_description: Contoso Setup\n"));
    assert!(ctx.contains("executable_publisher: Contoso Ltd.\n"));
    assert!(!ctx.contains("executable_version"));
}

#[test]
fn context_includes_image_and_pdf_metadata() {
    let mut photo = record("IMG_0042.jpg", Some("jpg"), "image/jpeg");
    photo.image_info = Some(ImageInfo {
        format: "Jpeg".into(),
        width: 4032,
        height: 3024,
        exif: [
            ("Make".to_string(), "Canon".to_string()),
            ("LensModel".to_string(), "EF 50mm".to_string()),
            ("DateTimeOriginal".to_string(), "2023-06-01 10:00:00".to_string()),
        ]
        .into_iter()
        .collect(),
    });
    let ctx = render_context(&photo);
    assert!(ctx.contains("image_format: Jpeg\n"));
    assert!(ctx.contains("image_dimensions: 4032x3024\n"));
    assert!(ctx.contains("exif_make: Canon\n"));
    assert!(ctx.contains("exif_lens_model: EF 50mm\n"));
    assert!(!ctx.contains("2023-06-01"));

    let mut doc = record("q3.pdf", Some("pdf"), "application/pdf");
    doc.pdf_info = Some(PdfInfo {
        page_count: 12,
        info: [("Title".to_string(), "Quarterly Report".to_string())].into_iter().collect(),
    });
    let ctx = render_context(&doc);
    assert!(ctx.contains("pdf_page_count: 12\n"));
    assert!(ctx.contains("pdf_title: Quarterly Report\n"));
    assert!(!ctx.contains("pdf_author"));
}

#[test]
fn fallback_bucket_is_offered_when_missing_from_tree() {
    let tree = flat(&["Documents", "Images"]);
    assert_eq!(render_choices(&tree, "Unsorted"), "Documents, Images, Unsorted");
    assert_eq!(render_choices(&tree, "images"), "Documents, Images");

    let seen: Mutex<Vec<OracleRequest>> = Mutex::new(Vec::new());
    let oracle = |req: &OracleRequest| -> Result<String, OracleError> {
        seen.lock().unwrap().push(req.clone());
        Ok("Unsorted".to_string())
    };
    let engine = ClassificationEngine::new(&oracle, &tree).with_fallback_label("Unsorted");
    let c = engine.classify(&record("misc.bin", Some("bin"), "application/octet-stream")).unwrap();

    assert_eq!(seen.into_inner().unwrap()[0].labels, "Documents, Images, Unsorted");
    assert_eq!(c.label_path, vec!["Unsorted"]);
    assert!(c.is_fallback);
}

#[test]
fn engine_sends_enumeration_and_parses_answer() {
    let tree = hierarchical();
    let seen: Mutex<Vec<OracleRequest>> = Mutex::new(Vec::new());
    let oracle = |req: &OracleRequest| -> Result<String, OracleError> {
        seen.lock().unwrap().push(req.clone());
        Ok("Documents/Work".to_string())
    };

    let engine = ClassificationEngine::new(&oracle, &tree);
    let c = engine.classify(&record("report.docx", Some("docx"), "application/msword")).unwrap();
    assert_eq!(c.label_path, vec!["Documents", "Work"]);

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].file_name, "report.docx");
    assert_eq!(seen[0].labels, "Documents (sub-categories: Work, Personal), Images, Other");
    assert!(seen[0].hierarchical);
}

#[test]
fn engine_propagates_oracle_errors() {
    let tree = flat(&["Documents"]);
    let oracle = |_: &OracleRequest| -> Result<String, OracleError> {
        Err(OracleError::network("connection refused"))
    };
    let engine = ClassificationEngine::new(&oracle, &tree);
    let err = engine.classify(&record("a.txt", Some("txt"), "text/plain")).unwrap_err();
    assert_eq!(err.kind, OracleErrorKind::Network);
}

#[test]
fn engine_uses_custom_fallback() {
    let tree = flat(&["Documents"]);
    let oracle =
        |_: &OracleRequest| -> Result<String, OracleError> { Ok("no idea".to_string()) };
    let engine = ClassificationEngine::new(&oracle, &tree).with_fallback_label("Misc");
    let c = engine.classify(&record("a.bin", Some("bin"), "application/octet-stream")).unwrap();
    assert!(c.is_fallback);
    assert_eq!(c.label_path, vec!["Misc"]);
}
