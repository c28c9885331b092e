// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Web search tool handler.
//!
//! Wraps the Google Custom Search JSON API the same way
//! `providers::anthropic`/`providers::openai` wrap their respective HTTP
//! APIs: a `reqwest::Client` built once with a fixed timeout, a typed
//! response struct, and errors mapped to [`ToolError`].

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[cfg(feature = "telemetry")]
use tracing::{debug, instrument};

use crate::error::ToolError;
use crate::tools::invocation::ToolKind;
use crate::tools::parse_arguments;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::types::{InputSchema, ToolDefinition};

const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_RESULT_COUNT: usize = 5;

/// Handler for the `google_web_search` tool.
pub struct WebSearchHandler {
    client: Client,
}

impl WebSearchHandler {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("reqwest client config is valid");
        Self { client }
    }
}

impl Default for WebSearchHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Arguments for the google_web_search tool.
#[derive(Debug, Deserialize)]
struct WebSearchArgs {
    /// The search query.
    query: String,

    /// Maximum number of results to return.
    #[serde(default = "default_result_count")]
    num_results: usize,
}

fn default_result_count() -> usize {
    DEFAULT_RESULT_COUNT
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize, Serialize)]
struct SearchItem {
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

#[async_trait]
impl ToolHandler for WebSearchHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new("google_web_search", "Search the web and return matching page titles, links, and snippets")
            .with_schema(
                InputSchema::new()
                    .with_property("query", serde_json::json!({
                        "type": "string",
                        "description": "The search query"
                    }))
                    .with_property("num_results", serde_json::json!({
                        "type": "integer",
                        "description": "Maximum number of results (default: 5)"
                    }))
                    .with_required(vec!["query".to_string()]),
            )
    }

    fn kind(&self) -> ToolKind {
        ToolKind::Fetch
    }

    #[cfg_attr(feature = "telemetry", instrument(skip(self, input), fields(query)))]
    async fn execute(&self, input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let args: WebSearchArgs = parse_arguments(&input)?;

        #[cfg(feature = "telemetry")]
        tracing::Span::current().record("query", args.query.as_str());

        let api_key = std::env::var("GOOGLE_SEARCH_API_KEY").map_err(|_| {
            ToolError::ExecutionFailed(
                "GOOGLE_SEARCH_API_KEY is not set; google_web_search requires a Custom Search API key".to_string(),
            )
        })?;
        let cx = std::env::var("GOOGLE_SEARCH_CX").map_err(|_| {
            ToolError::ExecutionFailed(
                "GOOGLE_SEARCH_CX is not set; google_web_search requires a Custom Search engine id".to_string(),
            )
        })?;

        let response = self
            .client
            .get("https://www.googleapis.com/customsearch/v1")
            .query(&[
                ("key", api_key.as_str()),
                ("cx", cx.as_str()),
                ("q", args.query.as_str()),
                ("num", &args.num_results.min(10).max(1).to_string()),
            ])
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("web search request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(ToolError::ExecutionFailed(format!(
                "web search failed with status {}",
                response.status()
            )));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("failed to parse search response: {e}")))?;

        #[cfg(feature = "telemetry")]
        debug!(results = parsed.items.len(), "web search completed");

        if parsed.items.is_empty() {
            return Ok(ToolOutput::success("No results found."));
        }

        let rendered: Vec<String> = parsed
            .items
            .iter()
            .take(args.num_results)
            .map(|item| format!("- {}\n  {}\n  {}", item.title, item.link, item.snippet))
            .collect();

        Ok(ToolOutput::success(rendered.join("\n\n")))
    }
}
