use organizer_core::config::ConfigurationError;
use organizer_core::{LabelTree, RawLabels};

fn flat(names: &[&str]) -> RawLabels {
    RawLabels::Flat(names.iter().map(|s| s.to_string()).collect())
}

#[test]
fn flat_labels_preserve_order() {
    let tree = LabelTree::build(flat(&["Documents", "Images", "Other"])).unwrap();
    assert_eq!(tree.all_category_names(), vec!["Documents", "Images", "Other"]);
    assert!(!tree.is_hierarchical());
    assert_eq!(tree.subcategories_of("Images"), Some(vec![]));
    assert_eq!(tree.subcategories_of("Videos"), None);
}

#[test]
fn names_are_trimmed() {
    let tree = LabelTree::build(flat(&["  Documents ", "Images"])).unwrap();
    assert_eq!(tree.all_category_names(), vec!["Documents", "Images"]);
}

#[test]
fn rejects_empty_duplicate_and_slashed_names() {
    assert!(matches!(LabelTree::build(flat(&[])), Err(ConfigurationError::EmptyLabels)));
    assert!(matches!(
        LabelTree::build(flat(&["Documents", "  "])),
        Err(ConfigurationError::EmptyLabelName { parent: None })
    ));
    assert!(matches!(
        LabelTree::build(flat(&["Images", "images"])),
        Err(ConfigurationError::DuplicateLabel { parent: None, .. })
    ));
    assert!(matches!(
        LabelTree::build(flat(&["Docs/Work"])),
        Err(ConfigurationError::InvalidLabelName(_))
    ));
}

#[test]
fn rejects_names_that_escape_the_output_folder() {
    for bad in ["..", ".", " .. ", "Docs\\Work"] {
        assert!(
            matches!(
                LabelTree::build(flat(&["Images", bad])),
                Err(ConfigurationError::InvalidLabelName(_))
            ),
            "{bad:?} was accepted"
        );
    }

    let raw = RawLabels::Nested(vec![("Documents".into(), vec!["..".into()])]);
    assert!(matches!(LabelTree::build(raw), Err(ConfigurationError::InvalidLabelName(_))));
    assert!(LabelTree::build(flat(&["v1.0", ".config"])).is_ok());
}

#[test]
fn rejects_duplicate_sub_categories() {
    let raw = RawLabels::Nested(vec![(
        "Documents".into(),
        vec!["Work".into(), "WORK".into()],
    )]);
    let err = LabelTree::build(raw).unwrap_err();
    match err {
        ConfigurationError::DuplicateLabel { parent, name } => {
            assert_eq!(parent.as_deref(), Some("Documents"));
            assert_eq!(name, "WORK");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn same_sub_name_allowed_under_different_parents() {
    let raw = RawLabels::Nested(vec![
        ("Documents".into(), vec!["Archive".into()]),
        ("Images".into(), vec!["Archive".into()]),
    ]);
    assert!(LabelTree::build(raw).is_ok());
}

#[test]
fn yaml_mapping_keeps_document_order() {
    let yaml = "Zeta: [One, Two]\nAlpha:\nMiddle: []\n";
    let raw: RawLabels = serde_yaml::from_str(yaml).unwrap();
    let tree = LabelTree::build(raw).unwrap();

    assert_eq!(tree.all_category_names(), vec!["Zeta", "Alpha", "Middle"]);
    assert_eq!(tree.subcategories_of("Zeta"), Some(vec!["One", "Two"]));
    assert!(tree.is_hierarchical());
}

#[test]
fn mapping_without_children_is_still_hierarchical() {
    let raw: RawLabels = serde_yaml::from_str("Documents: []\nOther: []\n").unwrap();
    let tree = LabelTree::build(raw).unwrap();
    assert!(tree.is_hierarchical());
}

#[test]
fn yaml_sequence_is_flat() {
    let raw: RawLabels = serde_yaml::from_str("[Documents, Images]").unwrap();
    assert_eq!(raw, RawLabels::Flat(vec!["Documents".into(), "Images".into()]));
}

#[test]
fn resolve_uses_exact_names() {
    let tree = LabelTree::from_paths(["Documents/Work", "Documents/Personal", "Other"]).unwrap();

    let work = tree.resolve(&["Documents", "Work"]).unwrap();
    assert_eq!(work.name, "Work");
    assert_eq!(tree.resolve(&["Other"]).unwrap().name, "Other");
    assert!(tree.resolve(&["Documents", "Travel"]).is_none());
    assert!(tree.resolve(&["documents"]).is_none());
    assert!(tree.resolve::<&str>(&[]).is_none());
    assert!(tree.resolve(&["Documents", "Work", "Extra"]).is_none());
}

#[test]
fn enumeration_is_deterministic() {
    let tree = LabelTree::from_paths(["Documents/Work", "Documents/Personal", "Images", "Other"])
        .unwrap();
    let expected = "Documents (sub-categories: Work, Personal), Images, Other";
    assert_eq!(tree.render_enumeration(), expected);
    assert_eq!(tree.render_enumeration(), expected);
    assert_eq!(
        tree.label_paths(),
        vec!["Documents", "Documents/Work", "Documents/Personal", "Images", "Other"]
    );
}

#[test]
fn from_paths_merges_repeated_categories() {
    let raw = RawLabels::from_paths(["Documents/Work", "Images", "Documents / Personal"]);
    assert_eq!(
        raw,
        RawLabels::Nested(vec![
            ("Documents".into(), vec!["Work".into(), "Personal".into()]),
            ("Images".into(), vec![]),
        ])
    );
}
