//! Markdown rendering of catalog entities.
//!
//! Pure and deterministic: the same entity always renders to the same text.
//! Optional lines are left out entirely when their source field is empty,
//! never rendered as blank placeholders.

use berlin_ckan::models::{Dataset, Resource, find_extra};

/// Extra holding the Berlin-specific dataset type
pub const EXTRA_TYPE: &str = "berlin_type";
/// Extra holding the date the data itself was last updated
pub const EXTRA_DATE_UPDATED: &str = "date_updated";
/// Extra holding the geographic coverage
pub const EXTRA_GEO_COVERAGE: &str = "geographical_coverage";

/// Sentinel for missing dataset fields
pub const UNKNOWN: &str = "Unknown";
/// Sentinel for resources without a name
pub const UNNAMED: &str = "Unnamed";
/// Sentinel for resources without a format
pub const UNKNOWN_FORMAT: &str = "?";
/// Sentinel for resources without a URL
pub const NO_URL: &str = "No URL";
/// Sentinel for missing fields in analysis reports
pub const MISSING: &str = "?";

const MAX_TAGS: usize = 10;
const MAX_DESCRIPTION_CHARS: usize = 300;

/// The field's text, or `default` when it is missing or empty.
pub fn field_or<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    match value {
        Some(text) if !text.is_empty() => text,
        _ => default,
    }
}

/// The first `max` characters of `text`.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Date portion (first ten characters) of an ISO-8601 timestamp.
pub fn date_part(timestamp: &str) -> &str {
    truncate_chars(timestamp, 10)
}

/// Public page of a dataset on the portal
pub fn dataset_url(portal_url: &str, name: &str) -> String {
    format!("{}/datensaetze/{}", portal_url.trim_end_matches('/'), name)
}

fn extra_line(lines: &mut Vec<String>, dataset: &Dataset, key: &str, label: &str) {
    if let Some(value) = find_extra(&dataset.extras, key).filter(|v| !v.is_empty()) {
        lines.push(format!("- **{label}**: {value}"));
    }
}

/// Render a dataset as a Markdown block.
///
/// Fixed order: heading, ID, author, license, resource count, last change,
/// then the optional type / data-updated / coverage / categories / tags /
/// description lines, and finally the portal link.
pub fn format_dataset_summary(dataset: &Dataset, portal_url: &str) -> String {
    let modified = dataset.metadata_modified.as_deref().unwrap_or_default();

    let mut lines = vec![
        format!("### {}", field_or(dataset.title.as_deref(), UNKNOWN)),
        format!("- **ID**: `{}`", dataset.name),
        format!("- **Author**: {}", field_or(dataset.author.as_deref(), UNKNOWN)),
        format!(
            "- **License**: {}",
            field_or(dataset.license_title.as_deref(), UNKNOWN)
        ),
        format!("- **Resources**: {}", dataset.num_resources.unwrap_or(0)),
        format!("- **Last modified**: {}", date_part(modified)),
    ];

    extra_line(&mut lines, dataset, EXTRA_TYPE, "Type");
    extra_line(&mut lines, dataset, EXTRA_DATE_UPDATED, "Data updated");
    extra_line(&mut lines, dataset, EXTRA_GEO_COVERAGE, "Geographic coverage");

    let categories: Vec<&str> = dataset
        .groups
        .iter()
        .map(|g| field_or(g.title.as_deref(), &g.name))
        .collect();
    if !categories.is_empty() {
        lines.push(format!("- **Categories**: {}", categories.join(", ")));
    }

    let tags: Vec<&str> = dataset
        .tags
        .iter()
        .take(MAX_TAGS)
        .map(|t| field_or(t.display_name.as_deref(), &t.name))
        .collect();
    if !tags.is_empty() {
        lines.push(format!("- **Tags**: {}", tags.join(", ")));
    }

    if let Some(notes) = dataset.notes.as_deref().filter(|n| !n.is_empty()) {
        lines.push(format!(
            "- **Description**: {}...",
            truncate_chars(notes, MAX_DESCRIPTION_CHARS)
        ));
    }

    lines.push(format!("- **URL**: {}", dataset_url(portal_url, &dataset.name)));
    lines.join("\n")
}

/// Render a resource as one list line: name, format, download URL.
pub fn format_resource_info(resource: &Resource) -> String {
    format!(
        "  - **{}** ({}) – {}",
        field_or(resource.name.as_deref(), UNNAMED),
        field_or(resource.format.as_deref(), UNKNOWN_FORMAT),
        field_or(resource.url.as_deref(), NO_URL)
    )
}

/// Render a resource for the structural breakdown of an analysis.
pub fn format_resource_structure(resource: &Resource) -> String {
    format!(
        "  - {} ({}): {}",
        field_or(resource.name.as_deref(), UNNAMED),
        field_or(resource.format.as_deref(), UNKNOWN_FORMAT),
        resource.url.as_deref().unwrap_or_default()
    )
}

/// Sorted, de-duplicated formats of a dataset's resources.
pub fn resource_formats(resources: &[Resource]) -> Vec<&str> {
    let mut formats: Vec<&str> = resources
        .iter()
        .map(|r| field_or(r.format.as_deref(), UNKNOWN_FORMAT))
        .collect();
    formats.sort_unstable();
    formats.dedup();
    formats
}
