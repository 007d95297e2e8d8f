//! Operation tests against a mocked catalog.

use berlin_opendata::{
    AnalyzeDatasets, BerlinClient, BerlinConfig, BerlinError, GetDataset, ListCategories,
    ListTags, SearchDatasets, describe_failure,
};
use berlin_opendata::ckan::CkanError;
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> BerlinClient {
    let config = BerlinConfig::new()
        .with_base_url(server.uri())
        .expect("mock server URI is valid")
        .with_portal_url("https://daten.example");
    BerlinClient::with_config(config)
}

fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"success": true, "result": result}))
}

fn not_found() -> ResponseTemplate {
    ResponseTemplate::new(404).set_body_json(json!({
        "success": false,
        "error": {"message": "Not found", "__type": "Not Found Error"}
    }))
}

fn sample_dataset(i: usize) -> Value {
    json!({
        "name": format!("einwohner-{i}"),
        "title": format!("Einwohner {i}"),
        "author": "Amt für Statistik Berlin-Brandenburg",
        "license_title": "CC BY 3.0 DE",
        "num_resources": 2,
        "metadata_modified": "2024-05-01T08:00:00.000000",
        "extras": [
            {"key": "date_updated", "value": format!("2024-04-0{i}")},
            {"key": "geographical_coverage", "value": format!("Bezirk {i}")}
        ],
        "resources": [
            {"name": "Tabelle", "format": "CSV", "url": format!("https://example.org/{i}.csv")},
            {"name": "Karte", "format": "WMS", "url": format!("https://example.org/{i}/wms")}
        ]
    })
}

#[tokio::test]
async fn test_search_reports_total_and_next_offset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_search"))
        .and(query_param("q", "Einwohner"))
        .and(query_param("rows", "3"))
        .and(query_param("start", "0"))
        .respond_with(ok(json!({
            "count": 120,
            "results": [sample_dataset(1), sample_dataset(2), sample_dataset(3)]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let params = SearchDatasets {
        rows: 3,
        ..SearchDatasets::new("Einwohner")
    };
    let text = client_for(&server).search_datasets(&params).await;

    assert!(text.starts_with("## Search results: 120 datasets for 'Einwohner'"));
    assert!(text.contains("Showing 3 of 120 (offset: 0)"));
    assert_eq!(text.matches("\n### ").count(), 3);
    assert!(text.ends_with("*→ More results with offset=3*"));
    assert!(text.contains("https://daten.example/datensaetze/einwohner-2"));
}

#[tokio::test]
async fn test_search_passes_sort_and_category_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_search"))
        .and(query_param("sort", "metadata_modified desc"))
        .and(query_param("fq", "groups:verkehr"))
        .and(query_param("start", "10"))
        .respond_with(ok(json!({"count": 11, "results": [sample_dataset(1)]})))
        .expect(1)
        .mount(&server)
        .await;

    let params = SearchDatasets {
        offset: 10,
        sort: Some("metadata_modified desc".to_string()),
        filter_group: Some("verkehr".to_string()),
        ..SearchDatasets::new("Rad")
    };
    let text = client_for(&server).search_datasets(&params).await;

    assert!(text.contains("Showing 1 of 11 (offset: 10)"));
    assert!(!text.contains("More results"));
}

#[tokio::test]
async fn test_search_with_zero_rows_still_reports_total() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_search"))
        .respond_with(ok(json!({"count": 42, "results": []})))
        .mount(&server)
        .await;

    let params = SearchDatasets {
        rows: 0,
        ..SearchDatasets::new("Kita")
    };
    let text = client_for(&server).search_datasets(&params).await;

    assert!(text.contains("42 datasets for 'Kita'"));
    assert!(!text.contains("### "));
}

#[tokio::test]
async fn test_get_dataset_lists_resources_and_extras() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_show"))
        .and(query_param("id", "kurse"))
        .respond_with(ok(json!({
            "name": "kurse",
            "title": "Volkshochschulkurse",
            "num_resources": 2,
            "resources": [
                {"name": "Kurse CSV", "format": "CSV", "url": "https://example.org/kurse.csv"},
                {"format": "JSON"}
            ],
            "extras": [
                {"key": "harvest_source", "value": "x"},
                {"key": "contact_email", "value": "info@example.org"},
                {"key": "temporal_coverage_from", "value": "2010-01-01"}
            ]
        })))
        .mount(&server)
        .await;

    let params = GetDataset {
        dataset_id: "kurse".to_string(),
    };
    let text = client_for(&server).get_dataset(&params).await;

    assert!(text.contains("#### Resources / Downloads"));
    assert!(text.contains("  - **Kurse CSV** (CSV) – https://example.org/kurse.csv"));
    assert!(text.contains("  - **Unnamed** (JSON) – No URL"));
    assert!(text.contains("#### Additional metadata"));
    assert!(text.contains("- **contact_email**: info@example.org"));
    assert!(!text.contains("harvest_source"));
}

#[tokio::test]
async fn test_get_missing_dataset_is_translated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_show"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let params = GetDataset {
        dataset_id: "gibt-es-nicht".to_string(),
    };
    let text = client_for(&server).get_dataset(&params).await;

    assert_eq!(
        text,
        "Error during dataset details: Resource not found. Please check the ID/name."
    );
}

#[tokio::test]
async fn test_list_categories_keeps_catalog_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/group_list"))
        .respond_with(ok(json!([
            {"name": "wohnen", "title": "Wohnen", "package_count": 5},
            {"name": "arbeit", "title": "Arbeit", "package_count": 50}
        ])))
        .mount(&server)
        .await;

    let text = client_for(&server)
        .list_categories(&ListCategories::default())
        .await;

    let wohnen = text.find("Wohnen").unwrap();
    let arbeit = text.find("Arbeit").unwrap();
    assert!(wohnen < arbeit);
    assert!(text.contains("- **Arbeit** (`arbeit`) – 50 datasets"));
}

#[tokio::test]
async fn test_show_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/group_show"))
        .and(query_param("id", "bildung"))
        .and(query_param("include_datasets", "true"))
        .and(query_param("include_dataset_count", "true"))
        .respond_with(ok(json!({
            "name": "bildung",
            "title": "Bildung",
            "package_count": 2,
            "packages": [
                {"name": "kurse", "title": "Volkshochschulkurse"},
                {"name": "schulen", "title": "Schulen"}
            ]
        })))
        .mount(&server)
        .await;

    let params = ListCategories {
        group_id: Some("bildung".to_string()),
    };
    let text = client_for(&server).list_categories(&params).await;

    assert!(text.starts_with("## Category: Bildung\n**Datasets**: 2"));
    assert!(text.contains("- **Schulen** (`schulen`)"));
}

#[tokio::test]
async fn test_unknown_category_takes_error_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/group_show"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let params = ListCategories {
        group_id: Some("raumfahrt".to_string()),
    };
    let text = client_for(&server).list_categories(&params).await;

    assert!(text.starts_with("Error during categories: "));
}

#[tokio::test]
async fn test_list_tags_respects_limit() {
    let server = MockServer::start().await;
    let tags: Vec<String> = (0..40).map(|i| format!("tag-{i}")).collect();
    Mock::given(method("GET"))
        .and(path("/api/3/action/tag_list"))
        .and(query_param("query", "tag"))
        .respond_with(ok(json!(tags)))
        .mount(&server)
        .await;

    let params = ListTags {
        query: Some("tag".to_string()),
        limit: 5,
    };
    let text = client_for(&server).list_tags(&params).await;

    assert!(text.starts_with("## Tags (5 results)"));
    assert_eq!(text.matches("- `tag-").count(), 5);
    assert!(!text.contains("tag-5`"));
}

#[tokio::test]
async fn test_list_tags_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/tag_list"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;

    let params = ListTags {
        query: Some("xyz".to_string()),
        ..ListTags::default()
    };
    let text = client_for(&server).list_tags(&params).await;
    assert_eq!(text, "No tags found for 'xyz'.");
}

#[tokio::test]
async fn test_analyze_with_structure_without_freshness() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_search"))
        .and(query_param("q", "Verkehr"))
        .and(query_param("rows", "3"))
        .and(query_param("sort", "score desc"))
        .respond_with(ok(json!({
            "count": 77,
            "results": [sample_dataset(1), sample_dataset(2), sample_dataset(3)]
        })))
        .mount(&server)
        .await;

    let params = AnalyzeDatasets {
        max_datasets: 3,
        include_structure: true,
        include_freshness: false,
        ..AnalyzeDatasets::new("Verkehr")
    };
    let text = client_for(&server).analyze_datasets(&params).await;

    assert!(text.starts_with("## Analysis: 'Verkehr'\n**77 datasets found**, top 3 analyzed:"));
    assert!(text.contains("### 1. Einwohner 1"));
    assert!(text.contains("### 3. Einwohner 3"));
    assert!(!text.contains("Last modified"));
    assert!(!text.contains("Data updated"));
    assert_eq!(text.matches("- **Formats**: CSV, WMS").count(), 3);
    assert!(text.contains("  - Tabelle (CSV): https://example.org/2.csv"));
    assert!(text.contains("  - Karte (WMS): https://example.org/3/wms"));
    assert!(text.contains("- **URL**: https://daten.example/datensaetze/einwohner-3\n"));
}

#[tokio::test]
async fn test_analyze_marks_missing_title_and_date() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_search"))
        .respond_with(ok(json!({
            "count": 1,
            "results": [{"name": "ohne-titel", "title": "", "resources": []}]
        })))
        .mount(&server)
        .await;

    let text = client_for(&server)
        .analyze_datasets(&AnalyzeDatasets::new("x"))
        .await;

    assert!(text.contains("### 1. ?\n"));
    assert!(text.contains("- **Last modified**: ?\n"));
    assert!(text.contains("- **Formats**: \n"));
    assert!(text.contains("- **Resources**: 0\n"));
    assert!(text.contains("- **URL**: https://daten.example/datensaetze/ohne-titel\n"));
}

#[tokio::test]
async fn test_configured_user_agent_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/tag_list"))
        .and(header("user-agent", "berlin-test/1.0"))
        .respond_with(ok(json!(["kita"])))
        .expect(1)
        .mount(&server)
        .await;

    let config = BerlinConfig::new()
        .with_base_url(server.uri())
        .expect("mock server URI is valid")
        .with_user_agent("berlin-test/1.0");
    let text = BerlinClient::with_config(config)
        .list_tags(&ListTags::default())
        .await;

    assert!(text.contains("- `kita`"));
}

#[tokio::test]
async fn test_analyze_places_coverage_per_dataset() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_search"))
        .respond_with(ok(json!({
            "count": 2,
            "results": [sample_dataset(1), sample_dataset(2)]
        })))
        .mount(&server)
        .await;

    let params = AnalyzeDatasets {
        include_structure: false,
        ..AnalyzeDatasets::new("Einwohner")
    };
    let text = client_for(&server).analyze_datasets(&params).await;

    let first = text.find("### 1.").unwrap();
    let second = text.find("### 2.").unwrap();
    let bezirk1 = text.find("- **Geographic coverage**: Bezirk 1").unwrap();
    let bezirk2 = text.find("- **Geographic coverage**: Bezirk 2").unwrap();
    assert!(first < bezirk1 && bezirk1 < second && second < bezirk2);
    assert!(text.contains("- **Last modified**: 2024-05-01"));
    assert!(text.contains("- **Data updated**: 2024-04-02"));
    assert!(!text.contains("(CSV):"));
}

#[tokio::test]
async fn test_catalog_stats_sorts_facets() {
    let server = MockServer::start().await;
    let formats: Vec<Value> = (1..=12)
        .map(|i| json!({"name": format!("F{i}"), "display_name": format!("F{i}"), "count": i}))
        .collect();
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_search"))
        .and(query_param("q", "*:*"))
        .and(query_param("rows", "0"))
        .and(query_param("facet.limit", "15"))
        .respond_with(ok(json!({
            "count": 2600,
            "results": [],
            "search_facets": {
                "groups": {"title": "groups", "items": [
                    {"name": "arbeit", "display_name": "Arbeit", "count": 10},
                    {"name": "verkehr", "display_name": "Verkehr", "count": 300}
                ]},
                "res_format": {"title": "res_format", "items": formats},
                "tags": [{"name": "berlin", "count": 1000}]
            }
        })))
        .mount(&server)
        .await;

    let text = client_for(&server).catalog_stats().await;

    assert!(text.contains("**Total datasets**: 2600"));
    assert!(text.contains("**Portal**: https://daten.example"));
    let verkehr = text.find("- **Verkehr**: 300").unwrap();
    let arbeit = text.find("- **Arbeit**: 10").unwrap();
    assert!(verkehr < arbeit);
    assert!(text.contains("- **F12**: 12"));
    assert!(text.contains("- **F3**: 3"));
    assert!(!text.contains("- **F2**: 2"));
    assert!(text.contains("### Most frequent tags\n- **berlin**: 1000"));
}

#[tokio::test]
async fn test_catalog_stats_without_facets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_search"))
        .respond_with(ok(json!({"count": 5, "results": []})))
        .mount(&server)
        .await;

    let text = client_for(&server).catalog_stats().await;
    assert!(text.contains("**Total datasets**: 5"));
    assert!(!text.contains("### "));
}

#[tokio::test]
async fn test_envelope_error_is_translated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": {"message": "Solr returned an error"}
        })))
        .mount(&server)
        .await;

    let text = client_for(&server).catalog_stats().await;
    assert_eq!(
        text,
        "Error during catalog statistics: CatalogApiError: CKAN API error: Solr returned an error"
    );
}

#[tokio::test]
async fn test_timeout_is_translated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ok(json!([])).set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let config = BerlinConfig::new()
        .with_base_url(server.uri())
        .unwrap()
        .with_timeout(Duration::from_millis(50));
    let text = BerlinClient::with_config(config)
        .list_tags(&ListTags::default())
        .await;

    assert_eq!(text, "Error during tag search: Request timed out. Please try again.");
}

#[tokio::test]
async fn test_failure_does_not_affect_next_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/tag_list"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/tag_list"))
        .respond_with(ok(json!(["kita"])))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let first = client.list_tags(&ListTags::default()).await;
    let second = client.list_tags(&ListTags::default()).await;

    assert_eq!(first, "Error during tag search: HTTP error 500");
    assert!(second.contains("- `kita`"));
}

#[tokio::test]
async fn test_raw_resources_keep_catalog_key_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/package_show"))
        .and(query_param("id", "strassen"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"success": true, "result": {"title": "Straßen", "name": "strassen", "num_resources": 2}}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/3/action/group_show"))
        .and(query_param("include_datasets", "true"))
        .respond_with(not_found())
        .mount(&server)
        .await;

    let client = client_for(&server);
    let json = client.dataset_json("strassen").await.unwrap();
    assert_eq!(
        json,
        "{\n  \"title\": \"Straßen\",\n  \"name\": \"strassen\",\n  \"num_resources\": 2\n}"
    );

    let err = client.category_json("raumfahrt").await.unwrap_err();
    assert!(matches!(
        err,
        BerlinError::CkanError(CkanError::HttpStatus { status: 404, .. })
    ));
}

#[test]
fn test_describe_failure_prefixes() {
    let forbidden = BerlinError::from(CkanError::HttpStatus {
        status: 403,
        message: String::new(),
    });
    assert_eq!(describe_failure(&forbidden, ""), "Error: Access denied.");

    let limited = BerlinError::from(CkanError::HttpStatus {
        status: 429,
        message: String::new(),
    });
    assert_eq!(
        describe_failure(&limited, "dataset search"),
        "Error during dataset search: Too many requests. Please wait and retry later."
    );

    let invalid = BerlinError::validation_error("rows must be between 1 and 50, got 0");
    assert_eq!(
        describe_failure(&invalid, "x"),
        "Error during x: ValidationError: Validation error: rows must be between 1 and 50, got 0"
    );
}

#[test]
fn test_params_validation() {
    let params: SearchDatasets =
        serde_json::from_value(json!({"query": "  Kita  ", "filter_group": "bildung"})).unwrap();
    let params = params.validated().unwrap();
    assert_eq!(params.query, "Kita");
    assert_eq!(params.rows, 10);
    assert_eq!(params.offset, 0);

    let too_many: SearchDatasets =
        serde_json::from_value(json!({"query": "Kita", "rows": 51})).unwrap();
    assert!(too_many.validated().is_err());

    let bad_group = SearchDatasets {
        filter_group: Some("raumfahrt".to_string()),
        ..SearchDatasets::new("Kita")
    };
    assert!(bad_group.validated().is_err());

    let blank = SearchDatasets::new("   ");
    assert!(blank.validated().is_err());

    assert!(serde_json::from_value::<SearchDatasets>(json!({"query": "a", "page": 2})).is_err());

    let tags: ListTags = serde_json::from_value(json!({})).unwrap();
    assert_eq!(tags.limit, 30);
    assert!(ListTags { limit: 101, query: None }.validated().is_err());

    let analyze: AnalyzeDatasets = serde_json::from_value(json!({"query": "Wohnen"})).unwrap();
    assert_eq!(analyze.max_datasets, 5);
    assert!(analyze.include_structure && analyze.include_freshness);
    assert!(
        AnalyzeDatasets {
            max_datasets: 21,
            ..analyze
        }
        .validated()
        .is_err()
    );

    let get = GetDataset {
        dataset_id: " ".to_string(),
    };
    assert!(get.validated().is_err());

    let categories = ListCategories {
        group_id: Some("  ".to_string()),
    };
    assert_eq!(categories.validated().unwrap().group_id, None);
}
