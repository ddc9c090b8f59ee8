use crate::services::oracle::OracleRequest;

const PREAMBLE: &str = "You are an expert at organizing files. \n Given the following file information, choose the most appropriate category from the list of categories. \n";

const HIERARCHICAL_RULES: &str = "If a category has sub-categories, choose the most specific sub-category using the format 'Category/SubCategory'. \nIf no sub-category fits, use just the main category name. \nReturn only the category name (or category/sub-category), and nothing else.\n\n";

const FLAT_RULES: &str = "Return only the category name, and nothing else.\n\n";

const EXAMPLE_FILE: &str = "name: work_report.pdf\nextension: pdf\nsize_bytes: 2048\nmime_type: application/pdf\nexecutable: false";

/// One-shot prompt sent by the HTTP oracles.
pub fn build_prompt(request: &OracleRequest) -> String {
    let (rules, example_labels, example_answer) = if request.hierarchical {
        (
            HIERARCHICAL_RULES,
            "Documents (sub-categories: Work, Personal), Images, Videos, Other",
            "Documents/Work",
        )
    } else {
        (FLAT_RULES, "Documents, Images, Videos, Other", "Documents")
    };

    format!(
        "{PREAMBLE}{rules}Example:\nCategories: {example_labels}\nFile information:\n{EXAMPLE_FILE}\nCategory: {example_answer}\n\nNow categorize this file:\nCategories: {}\nFile information:\n{}\nCategory:",
        request.labels,
        request.context.trim_end(),
    )
}
