// Documentation search API client module
// Author: kelexine (https://github.com/kelexine)

mod client;
mod fetcher;

pub use client::SearchClient;
pub use fetcher::{FetchFailure, RetryableFetcher};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Returned in place of formatted results when the search comes back empty.
pub const NO_RESULTS: &str = "No results found.";

/// Separator placed between formatted hits.
pub const RESULT_SEPARATOR: &str = "\n\n---\n\n";

/// Request body for the documentation search endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub query: String,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<SearchFilter>,
}

/// Optional narrowing of a search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl SearchRequest {
    pub fn new(query: &str, page_size: u32, language: &str, version: Option<&str>) -> Self {
        let filter = SearchFilter {
            version: version.map(str::to_string),
            language: Some(language.to_string()).filter(|l| !l.is_empty()),
        };
        let has_filter = filter.version.is_some() || filter.language.is_some();

        Self {
            query: query.to_string(),
            page_size,
            filter: has_filter.then_some(filter),
        }
    }
}

/// A single ranked document returned by the search service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub path: String,
    pub metadata: HitMetadata,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitMetadata {
    pub title: String,
}

/// The external ranked-document search service.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>>;
}

/// Render hits as `Title / Link / Content` blocks for the agent.
pub fn format_results(hits: &[SearchHit], link_base_url: &str) -> String {
    if hits.is_empty() {
        return NO_RESULTS.to_string();
    }

    let base = link_base_url.trim_end_matches('/');
    hits.iter()
        .map(|hit| {
            let path = hit.path.trim_start_matches('/');
            format!(
                "Title: {}\nLink: {}/{}\nContent: {}",
                hit.metadata.title, base, path, hit.content
            )
        })
        .collect::<Vec<_>>()
        .join(RESULT_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(path: &str, title: &str, content: &str) -> SearchHit {
        SearchHit {
            path: path.to_string(),
            metadata: HitMetadata {
                title: title.to_string(),
            },
            content: content.to_string(),
        }
    }

    #[test]
    fn test_format_empty_results() {
        assert_eq!(format_results(&[], "https://docs.example.com"), NO_RESULTS);
    }

    #[test]
    fn test_format_results_blocks() {
        let hits = vec![
            hit("/guides/middleware", "Middleware", "Add middleware with..."),
            hit("reference/app", "App", "The app object"),
        ];
        let text = format_results(&hits, "https://docs.example.com/");

        assert_eq!(
            text,
            "Title: Middleware\nLink: https://docs.example.com/guides/middleware\nContent: Add middleware with...\
             \n\n---\n\n\
             Title: App\nLink: https://docs.example.com/reference/app\nContent: The app object"
        );
    }

    #[test]
    fn test_request_serialization() {
        let request = SearchRequest::new("auth", 5, "python", Some("1.2"));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["query"], "auth");
        assert_eq!(json["pageSize"], 5);
        assert_eq!(json["filter"]["version"], "1.2");
        assert_eq!(json["filter"]["language"], "python");
    }

    #[test]
    fn test_request_without_filter() {
        let request = SearchRequest::new("auth", 5, "", None);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("filter").is_none());
    }
}
