//! User-defined categories, normalized into a small forest.
//!
//! Configuration may describe labels either as a flat list
//! (`[Documents, Images]`) or as an ordered mapping of category to
//! sub-categories (`{Documents: [Work, Personal], Other: []}`). Both shapes are
//! validated once by [`LabelTree::build`]; nothing downstream branches on the
//! original shape again.

use std::fmt;

use serde::de::{MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::ConfigurationError;

/// Labels exactly as the user wrote them, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawLabels {
    Flat(Vec<String>),
    /// Category -> sub-categories, in document order.
    Nested(Vec<(String, Vec<String>)>),
}

impl RawLabels {
    /// Build raw labels from `Category` / `Category/Sub` strings.
    ///
    /// Produces `Flat` when no entry contains a `/`. Sub-categories of a
    /// repeated category are merged in order of appearance.
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths: Vec<String> = paths.into_iter().map(|p| p.as_ref().trim().to_string()).collect();
        if !paths.iter().any(|p| p.contains('/')) {
            return RawLabels::Flat(paths);
        }

        let mut nested: Vec<(String, Vec<String>)> = Vec::new();
        for path in paths {
            let (category, sub) = match path.split_once('/') {
                Some((c, s)) => (c.trim().to_string(), Some(s.trim().to_string())),
                None => (path, None),
            };
            let idx = match nested.iter().position(|(c, _)| *c == category) {
                Some(idx) => idx,
                None => {
                    nested.push((category, Vec::new()));
                    nested.len() - 1
                }
            };
            if let Some(sub) = sub {
                nested[idx].1.push(sub);
            }
        }
        RawLabels::Nested(nested)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RawLabels::Flat(v) => v.is_empty(),
            RawLabels::Nested(v) => v.is_empty(),
        }
    }
}

impl<'de> Deserialize<'de> for RawLabels {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RawLabelsVisitor;

        impl<'de> Visitor<'de> for RawLabelsVisitor {
            type Value = RawLabels;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a list of labels or a mapping of label to sub-labels")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut labels = Vec::new();
                while let Some(label) = seq.next_element::<String>()? {
                    labels.push(label);
                }
                Ok(RawLabels::Flat(labels))
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut labels = Vec::new();
                // `Other:` with no value deserializes as null.
                while let Some((name, subs)) = map.next_entry::<String, Option<Vec<String>>>()? {
                    labels.push((name, subs.unwrap_or_default()));
                }
                Ok(RawLabels::Nested(labels))
            }
        }

        deserializer.deserialize_any(RawLabelsVisitor)
    }
}

impl Serialize for RawLabels {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RawLabels::Flat(labels) => {
                let mut seq = serializer.serialize_seq(Some(labels.len()))?;
                for label in labels {
                    seq.serialize_element(label)?;
                }
                seq.end()
            }
            RawLabels::Nested(labels) => {
                let mut map = serializer.serialize_map(Some(labels.len()))?;
                for (name, subs) in labels {
                    map.serialize_entry(name, subs)?;
                }
                map.end()
            }
        }
    }
}

/// One category. Names are unique among siblings, not globally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelNode {
    pub name: String,
    pub children: Vec<LabelNode>,
}

impl LabelNode {
    fn leaf(name: String) -> Self {
        Self { name, children: Vec::new() }
    }

    /// Case-insensitive child lookup.
    pub fn child_ignore_case(&self, name: &str) -> Option<&LabelNode> {
        self.children.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Validated label forest of depth one (flat) or two (category/sub-category).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelTree {
    roots: Vec<LabelNode>,
    /// Built from a category mapping rather than a flat list.
    #[serde(default)]
    nested: bool,
}

impl LabelTree {
    /// Validate raw labels and build the forest.
    pub fn build(raw: RawLabels) -> Result<Self, ConfigurationError> {
        if raw.is_empty() {
            return Err(ConfigurationError::EmptyLabels);
        }

        let (pairs, nested): (Vec<(String, Vec<String>)>, bool) = match raw {
            RawLabels::Flat(names) => (names.into_iter().map(|n| (n, Vec::new())).collect(), false),
            RawLabels::Nested(pairs) => (pairs, true),
        };

        let mut roots: Vec<LabelNode> = Vec::with_capacity(pairs.len());
        for (name, subs) in pairs {
            let name = validate_name(&name, None)?;
            if roots.iter().any(|r| r.name.eq_ignore_ascii_case(&name)) {
                return Err(ConfigurationError::DuplicateLabel { parent: None, name });
            }

            let mut children: Vec<LabelNode> = Vec::with_capacity(subs.len());
            for sub in subs {
                let sub = validate_name(&sub, Some(&name))?;
                if children.iter().any(|c| c.name.eq_ignore_ascii_case(&sub)) {
                    return Err(ConfigurationError::DuplicateLabel {
                        parent: Some(name.clone()),
                        name: sub,
                    });
                }
                children.push(LabelNode::leaf(sub));
            }

            roots.push(LabelNode { name, children });
        }

        Ok(Self { roots, nested })
    }

    /// Build from `Category` / `Category/Sub` strings, as given on the command line.
    pub fn from_paths<I, S>(paths: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::build(RawLabels::from_paths(paths))
    }

    pub fn roots(&self) -> &[LabelNode] {
        &self.roots
    }

    /// Top-level names in configuration order.
    pub fn all_category_names(&self) -> Vec<&str> {
        self.roots.iter().map(|r| r.name.as_str()).collect()
    }

    /// Sub-category names of `name`, or `None` when the category is unknown.
    pub fn subcategories_of(&self, name: &str) -> Option<Vec<&str>> {
        self.roots
            .iter()
            .find(|r| r.name == name)
            .map(|r| r.children.iter().map(|c| c.name.as_str()).collect())
    }

    /// True when the labels came from a mapping or any category has sub-categories.
    pub fn is_hierarchical(&self) -> bool {
        self.nested || self.roots.iter().any(|r| !r.children.is_empty())
    }

    /// Resolve `[category]` or `[category, sub]` to its node (exact names).
    pub fn resolve<S: AsRef<str>>(&self, label_path: &[S]) -> Option<&LabelNode> {
        match label_path {
            [category] => self.roots.iter().find(|r| r.name == category.as_ref()),
            [category, sub] => self
                .roots
                .iter()
                .find(|r| r.name == category.as_ref())
                .and_then(|r| r.children.iter().find(|c| c.name == sub.as_ref())),
            _ => None,
        }
    }

    /// Case-insensitive category lookup.
    pub fn category_ignore_case(&self, name: &str) -> Option<&LabelNode> {
        self.roots.iter().find(|r| r.name.eq_ignore_ascii_case(name))
    }

    /// Deterministic enumeration used in oracle prompts, e.g.
    /// `Documents (sub-categories: Work, Personal), Images, Other`.
    pub fn render_enumeration(&self) -> String {
        self.roots
            .iter()
            .map(|root| {
                if root.children.is_empty() {
                    root.name.clone()
                } else {
                    let subs: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
                    format!("{} (sub-categories: {})", root.name, subs.join(", "))
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Every valid `Category` and `Category/Sub` string, in order.
    pub fn label_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        for root in &self.roots {
            out.push(root.name.clone());
            for child in &root.children {
                out.push(format!("{}/{}", root.name, child.name));
            }
        }
        out
    }
}

fn validate_name(raw: &str, parent: Option<&str>) -> Result<String, ConfigurationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ConfigurationError::EmptyLabelName { parent: parent.map(str::to_string) });
    }
    // Labels become path components under the output folder.
    if name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ConfigurationError::InvalidLabelName(name.to_string()));
    }
    Ok(name.to_string())
}
