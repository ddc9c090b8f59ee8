//! Classification engine: renders a file's context, asks the oracle, and maps
//! the free-text answer back onto the label tree.
//!
//! [`parse_response`] is pure and carries all the matching rules:
//!
//! 1. normalize the answer (prefixes, quotes, punctuation, whitespace);
//! 2. exact `Category/Sub` path, case-insensitive;
//! 3. exact category name;
//! 4. `Category/<unknown>` repaired to the category alone;
//! 5. whole-word containment of exactly one category (and optionally exactly
//!    one of its sub-categories), or of exactly one sub-category anywhere;
//! 6. otherwise the fallback bucket.

use std::fmt::Write as _;

use regex::Regex;
use tracing::{debug, warn};

use crate::config::DEFAULT_FALLBACK_LABEL;
use crate::labels::{LabelNode, LabelTree};
use crate::model::{Classification, FileRecord};
use crate::services::oracle::{LabelingOracle, OracleError, OracleRequest};

/// Archive entries listed in the context.
const CONTEXT_ARCHIVE_ENTRIES: usize = 50;

/// `/Info` keys passed on from PDFs.
const CONTEXT_PDF_KEYS: [&str; 6] =
    ["Title", "Author", "Subject", "Keywords", "Creator", "Producer"];

/// EXIF tags passed on from images. Dates stay out of the context.
const CONTEXT_EXIF_TAGS: [&str; 6] =
    ["Make", "Model", "LensModel", "Software", "Artist", "ImageDescription"];

pub struct ClassificationEngine<'a> {
    oracle: &'a dyn LabelingOracle,
    tree: &'a LabelTree,
    fallback_label: String,
}

impl<'a> ClassificationEngine<'a> {
    pub fn new(oracle: &'a dyn LabelingOracle, tree: &'a LabelTree) -> Self {
        Self { oracle, tree, fallback_label: DEFAULT_FALLBACK_LABEL.to_string() }
    }

    pub fn with_fallback_label(mut self, label: impl Into<String>) -> Self {
        self.fallback_label = label.into();
        self
    }

    pub fn fallback_label(&self) -> &str {
        &self.fallback_label
    }

    /// The request the oracle receives for `record`.
    pub fn request_for(&self, record: &FileRecord) -> OracleRequest {
        OracleRequest {
            file_name: record.name.clone(),
            context: render_context(record),
            labels: render_choices(self.tree, &self.fallback_label),
            hierarchical: self.tree.is_hierarchical(),
        }
    }

    /// Classify one file. Only a failed oracle call is an error; an answer
    /// that matches nothing becomes a fallback classification.
    pub fn classify(&self, record: &FileRecord) -> Result<Classification, OracleError> {
        let request = self.request_for(record);
        let raw = self.oracle.request(&request)?;
        debug!("Oracle ({}) answered {:?} for {}", self.oracle.name(), raw, record.name);

        let classification = parse_response(&raw, self.tree, &self.fallback_label);
        if classification.is_fallback {
            warn!(
                "File '{}': could not match response {:?} to a label, using '{}'",
                record.name, raw, self.fallback_label
            );
        }
        Ok(classification)
    }
}

/// The label enumeration offered to the oracle. The fallback bucket is
/// appended when the tree does not already name it.
pub fn render_choices(tree: &LabelTree, fallback_label: &str) -> String {
    let enumeration = tree.render_enumeration();
    if fallback_label.is_empty() || tree.category_ignore_case(fallback_label).is_some() {
        enumeration
    } else {
        format!("{enumeration}, {fallback_label}")
    }
}

/// Deterministic `key: value` description of a file for the oracle.
///
/// Only metadata is included: no filesystem timestamps, hashes or file
/// contents.
pub fn render_context(record: &FileRecord) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "name: {}", record.name);
    let _ = writeln!(out, "extension: {}", record.extension.as_deref().unwrap_or("(none)"));
    let _ = writeln!(out, "size_bytes: {}", record.size_bytes);
    let _ = writeln!(out, "mime_type: {}", record.mime_type);
    let _ = writeln!(out, "executable: {}", record.is_executable);

    if let Some(archive) = &record.archive {
        let _ = writeln!(out, "archive_format: {}", archive.format.as_str());
        let shown: Vec<&str> =
            archive.entries.iter().take(CONTEXT_ARCHIVE_ENTRIES).map(String::as_str).collect();
        let _ = write!(out, "archive_entries: {}", shown.join(", "));
        if archive.truncated || archive.entries.len() > shown.len() {
            out.push_str(" (truncated)");
        }
        out.push('\n');
    }

    if let Some(info) = &record.executable_info {
        let _ = writeln!(out, "executable_format: {}", info.format);
        let fields = [
            ("executable_description", &info.description),
            ("executable_publisher", &info.publisher),
            ("executable_product", &info.product_name),
            ("executable_version", &info.version),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                let _ = writeln!(out, "{key}: {value}");
            }
        }
    }

    if let Some(image) = &record.image_info {
        let _ = writeln!(out, "image_format: {}", image.format);
        let _ = writeln!(out, "image_dimensions: {}x{}", image.width, image.height);
        for tag in CONTEXT_EXIF_TAGS {
            if let Some(value) = image.exif.get(tag) {
                let _ = writeln!(out, "exif_{}: {value}", snake_case(tag));
            }
        }
    }

    if let Some(pdf) = &record.pdf_info {
        let _ = writeln!(out, "pdf_page_count: {}", pdf.page_count);
        for key in CONTEXT_PDF_KEYS {
            if let Some(value) = pdf.info.get(key) {
                let _ = writeln!(out, "pdf_{}: {value}", key.to_ascii_lowercase());
            }
        }
    }

    out
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            out.push('_');
        }
        out.push(c.to_ascii_lowercase());
    }
    out
}

/// Map a raw oracle answer onto the tree. Never fails.
pub fn parse_response(raw: &str, tree: &LabelTree, fallback_label: &str) -> Classification {
    let answer = normalize(raw);
    if answer.is_empty() {
        return Classification::fallback(fallback_label, raw);
    }

    if let Some((head, tail)) = answer.split_once('/') {
        if let Some(category) = tree.category_ignore_case(head) {
            if let Some(sub) = category.child_ignore_case(tail) {
                return Classification::new(vec![category.name.clone(), sub.name.clone()], raw);
            }
            warn!(
                "Sub-category '{tail}' not found in '{}', using main category only",
                category.name
            );
            return Classification::new(vec![category.name.clone()], raw);
        }
    } else if let Some(category) = tree.category_ignore_case(&answer) {
        return Classification::new(vec![category.name.clone()], raw);
    }

    match containment_match(&answer, tree) {
        Some(path) => Classification::new(path, raw),
        None => Classification::fallback(fallback_label, raw),
    }
}

fn containment_match(answer: &str, tree: &LabelTree) -> Option<Vec<String>> {
    let mentioned: Vec<&LabelNode> =
        tree.roots().iter().filter(|r| mentions(answer, &r.name)).collect();

    match mentioned.as_slice() {
        [category] => {
            let subs: Vec<&LabelNode> =
                category.children.iter().filter(|c| mentions(answer, &c.name)).collect();
            match subs.as_slice() {
                [sub] => Some(vec![category.name.clone(), sub.name.clone()]),
                _ => Some(vec![category.name.clone()]),
            }
        }
        [] => {
            let subs: Vec<(&LabelNode, &LabelNode)> = tree
                .roots()
                .iter()
                .flat_map(|r| r.children.iter().map(move |c| (r, c)))
                .filter(|(_, c)| mentions(answer, &c.name))
                .collect();
            match subs.as_slice() {
                [(category, sub)] => Some(vec![category.name.clone(), sub.name.clone()]),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Whole-word, case-insensitive search for `name` or its singular form.
fn mentions(text: &str, name: &str) -> bool {
    let mut alternatives = vec![regex::escape(name)];
    if let Some(singular) = singular(name) {
        alternatives.push(regex::escape(singular));
    }
    let pattern = format!(r"(?i)(?:^|[^\w])(?:{})(?:[^\w]|$)", alternatives.join("|"));
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    }
}

fn singular(name: &str) -> Option<&str> {
    let stripped = name.strip_suffix('s').or_else(|| name.strip_suffix('S'))?;
    (stripped.chars().count() > 1).then_some(stripped)
}

fn normalize(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut text = trim_decoration(&collapsed);

    for prefix in ["category:", "label:"] {
        if let Some(head) = text.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                text = trim_decoration(&text[prefix.len()..]);
                break;
            }
        }
    }

    text.split('/').map(str::trim).collect::<Vec<_>>().join("/")
}

fn trim_decoration(text: &str) -> &str {
    text.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '"' | '\'' | '`' | '*' | '.' | ',' | ';' | ':' | '!')
    })
}
