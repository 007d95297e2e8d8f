use berlin_ckan::models::{find_extra, unique_extras};
use berlin_ckan::{Action, CatalogQuery, CkanClient};

use crate::config::BerlinConfig;
use crate::error::{BerlinError, Result, describe_failure};
use crate::format::{
    self, EXTRA_DATE_UPDATED, EXTRA_GEO_COVERAGE, format_dataset_summary, format_resource_info,
    format_resource_structure,
};
use crate::params::{AnalyzeDatasets, GetDataset, ListCategories, ListTags, SearchDatasets};

const FACET_FIELDS: [&str; 3] = ["groups", "res_format", "tags"];
const FACET_LIMIT: u32 = 15;
const TOP_FORMATS: usize = 10;

/// High-level client for the Berlin open data catalog
///
/// Wraps the CKAN client. Every operation returns Markdown text: on failure
/// the text is a diagnostic produced by [`describe_failure`] instead of an
/// error, so a failed call never affects later ones.
///
/// ```rust,no_run
/// # use berlin_opendata::{BerlinClient, SearchDatasets};
/// # #[tokio::main]
/// # async fn main() {
/// let client = BerlinClient::new();
/// let text = client.search_datasets(&SearchDatasets::new("Einwohner")).await;
/// println!("{text}");
/// # }
/// ```
#[derive(Debug)]
pub struct BerlinClient {
    ckan: CkanClient,
    config: BerlinConfig,
}

impl Default for BerlinClient {
    fn default() -> Self {
        Self::new()
    }
}

impl BerlinClient {
    /// Create a new client with default configuration
    pub fn new() -> Self {
        Self::with_config(BerlinConfig::new())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: BerlinConfig) -> Self {
        let ckan = CkanClient::new(config.ckan_config.clone());
        Self { ckan, config }
    }

    pub fn config(&self) -> &BerlinConfig {
        &self.config
    }

    fn render(&self, outcome: Result<String>, context: &str) -> String {
        match outcome {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(context, error = %err, "catalog operation failed");
                describe_failure(&err, context)
            }
        }
    }

    // === Search and Discovery ===

    /// Search datasets and summarise the returned page
    pub async fn search_datasets(&self, params: &SearchDatasets) -> String {
        self.render(self.try_search_datasets(params).await, "dataset search")
    }

    async fn try_search_datasets(&self, params: &SearchDatasets) -> Result<String> {
        let fq = params.filter_group.as_ref().map(|g| format!("groups:{g}"));
        let result = self
            .ckan
            .package_search(
                Some(params.query.as_str()),
                Some(params.rows),
                Some(params.offset),
                params.sort.as_deref(),
                fq.as_deref(),
            )
            .await?;

        let total = result.count;
        let shown = result.results.len() as u64;
        let offset = u64::from(params.offset);

        let mut lines = vec![
            format!("## Search results: {total} datasets for '{}'", params.query),
            format!("Showing {shown} of {total} (offset: {offset})\n"),
        ];
        if result.results.is_empty() {
            lines.push(format!("No datasets found for '{}'.", params.query));
        }
        for dataset in &result.results {
            lines.push(format_dataset_summary(dataset, &self.config.portal_url));
            lines.push(String::new());
        }
        if shown > 0 && total > offset + shown {
            lines.push(format!("*→ More results with offset={}*", offset + shown));
        }

        Ok(lines.join("\n"))
    }

    /// Full metadata of one dataset, with all resources and extra metadata
    pub async fn get_dataset(&self, params: &GetDataset) -> String {
        self.render(self.try_get_dataset(&params.dataset_id).await, "dataset details")
    }

    async fn try_get_dataset(&self, dataset_id: &str) -> Result<String> {
        let dataset = self.ckan.package_show(dataset_id).await?;

        let mut lines = vec![
            format_dataset_summary(&dataset, &self.config.portal_url),
            "\n#### Resources / Downloads\n".to_string(),
        ];
        lines.extend(dataset.resources.iter().map(format_resource_info));

        let extras: Vec<_> = unique_extras(&dataset.extras)
            .into_iter()
            .filter(|(key, _)| !key.starts_with("harvest"))
            .collect();
        if !extras.is_empty() {
            lines.push("\n#### Additional metadata".to_string());
            for (key, value) in extras {
                lines.push(format!("- **{key}**: {value}"));
            }
        }

        Ok(lines.join("\n"))
    }

    // === Categories and Tags ===

    /// All categories with dataset counts, or one category's datasets
    pub async fn list_categories(&self, params: &ListCategories) -> String {
        let outcome = match params.group_id.as_deref() {
            Some(group_id) => self.try_show_category(group_id).await,
            None => self.try_list_categories().await,
        };
        self.render(outcome, "categories")
    }

    async fn try_show_category(&self, group_id: &str) -> Result<String> {
        let group = self.ckan.group_show(group_id, true).await?;

        let mut lines = vec![
            format!(
                "## Category: {}",
                format::field_or(group.title.as_deref(), &group.name)
            ),
            format!("**Datasets**: {}\n", group.package_count.unwrap_or(0)),
        ];
        for dataset in &group.packages {
            lines.push(format!(
                "- **{}** (`{}`)",
                format::field_or(dataset.title.as_deref(), format::UNKNOWN),
                dataset.name
            ));
        }

        Ok(lines.join("\n"))
    }

    async fn try_list_categories(&self) -> Result<String> {
        let groups = self.ckan.group_list().await?;

        let mut lines = vec!["## Data categories of the State of Berlin\n".to_string()];
        // catalog order is kept as-is
        for group in &groups {
            lines.push(format!(
                "- **{}** (`{}`) – {} datasets",
                format::field_or(group.title.as_deref(), &group.name),
                group.name,
                group.package_count.unwrap_or(0)
            ));
        }

        Ok(lines.join("\n"))
    }

    /// Tags matching an optional substring, capped at `limit`
    pub async fn list_tags(&self, params: &ListTags) -> String {
        self.render(self.try_list_tags(params).await, "tag search")
    }

    async fn try_list_tags(&self, params: &ListTags) -> Result<String> {
        let tags = self.ckan.tag_list(params.query.as_deref()).await?;

        if tags.is_empty() {
            return Ok(match &params.query {
                Some(query) => format!("No tags found for '{query}'."),
                None => "No tags found.".to_string(),
            });
        }

        let tags = &tags[..tags.len().min(params.limit)];
        let mut lines = vec![format!("## Tags ({} results)\n", tags.len())];
        lines.extend(tags.iter().map(|tag| format!("- `{tag}`")));
        lines.push(
            "\n*Tip: use `berlin_search_datasets` with `filter_group` or the Solr query `tags:tagname`*"
                .to_string(),
        );

        Ok(lines.join("\n"))
    }

    // === Analysis ===

    /// Relevance-ranked report on the top matches: formats, freshness, structure
    pub async fn analyze_datasets(&self, params: &AnalyzeDatasets) -> String {
        self.render(self.try_analyze_datasets(params).await, "dataset analysis")
    }

    async fn try_analyze_datasets(&self, params: &AnalyzeDatasets) -> Result<String> {
        let result = self
            .ckan
            .package_search(
                Some(params.query.as_str()),
                Some(params.max_datasets),
                None,
                Some("score desc"),
                None,
            )
            .await?;

        if result.results.is_empty() {
            return Ok(format!("No datasets found for '{}'.", params.query));
        }

        let mut lines = vec![
            format!("## Analysis: '{}'", params.query),
            format!(
                "**{} datasets found**, top {} analyzed:\n",
                result.count,
                result.results.len()
            ),
        ];

        for (rank, dataset) in result.results.iter().enumerate() {
            lines.push(format!(
                "### {}. {}",
                rank + 1,
                format::field_or(dataset.title.as_deref(), format::MISSING)
            ));
            lines.push(format!("- **ID**: `{}`", dataset.name));
            lines.push(format!(
                "- **Formats**: {}",
                format::resource_formats(&dataset.resources).join(", ")
            ));
            lines.push(format!("- **Resources**: {}", dataset.resources.len()));

            if params.include_freshness {
                let modified =
                    format::field_or(dataset.metadata_modified.as_deref(), format::MISSING);
                lines.push(format!("- **Last modified**: {}", format::date_part(modified)));
                if let Some(updated) =
                    find_extra(&dataset.extras, EXTRA_DATE_UPDATED).filter(|v| !v.is_empty())
                {
                    lines.push(format!("- **Data updated**: {updated}"));
                }
            }

            if params.include_structure {
                lines.extend(dataset.resources.iter().map(format_resource_structure));
            }

            if let Some(coverage) =
                find_extra(&dataset.extras, EXTRA_GEO_COVERAGE).filter(|v| !v.is_empty())
            {
                lines.push(format!("- **Geographic coverage**: {coverage}"));
            }

            lines.push(format!(
                "- **URL**: {}\n",
                format::dataset_url(&self.config.portal_url, &dataset.name)
            ));
        }

        Ok(lines.join("\n"))
    }

    /// Catalog-wide totals and facet breakdowns
    pub async fn catalog_stats(&self) -> String {
        self.render(self.try_catalog_stats().await, "catalog statistics")
    }

    async fn try_catalog_stats(&self) -> Result<String> {
        let result = self
            .ckan
            .package_facets("*:*", &FACET_FIELDS, FACET_LIMIT)
            .await?;

        let mut lines = vec![
            "## Open Data Catalog – State of Berlin".to_string(),
            format!("**Total datasets**: {}\n", result.count),
            format!("**Portal**: {}", self.config.portal_url),
            "**Licenses**: CC0, CC-BY, Datenlizenz Deutschland (Zero/Attribution), GeoNutzV and others\n"
                .to_string(),
        ];

        let sections = [
            ("groups", "### Categories", None),
            ("res_format", "\n### Most frequent formats", Some(TOP_FORMATS)),
            ("tags", "\n### Most frequent tags", None),
        ];
        let Some(table) = result.facet_table() else {
            return Ok(lines.join("\n"));
        };
        for (field, heading, cap) in sections {
            let Some(facet) = table.get(field) else {
                continue;
            };
            lines.push(heading.to_string());
            let items = facet.items_by_count();
            let cap = cap.unwrap_or(items.len());
            for item in items.iter().take(cap) {
                lines.push(format!("- **{}**: {}", item.label(), item.count));
            }
        }

        Ok(lines.join("\n"))
    }

    // === Raw resources ===

    /// Raw metadata of one dataset as pretty-printed JSON
    pub async fn dataset_json(&self, name: &str) -> Result<String> {
        let query = CatalogQuery::new(Action::PackageShow).param("id", name);
        self.raw_json(&query).await
    }

    /// Raw details of one category, including its datasets, as pretty-printed JSON
    pub async fn category_json(&self, group_id: &str) -> Result<String> {
        let query = CatalogQuery::new(Action::GroupShow)
            .param("id", group_id)
            .param("include_datasets", true);
        self.raw_json(&query).await
    }

    async fn raw_json(&self, query: &CatalogQuery) -> Result<String> {
        let value = self.ckan.request(query).await?;
        serde_json::to_string_pretty(&value).map_err(BerlinError::from)
    }
}
