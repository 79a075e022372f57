//! `search_code` built-in tool.
//!
//! Embeds a natural-language query and returns the best-matching chunks
//! from the session's index.

use crate::index::{CodeIndex, EmbeddingProvider, SearchHit};
use crate::messages::ToolDefinition;
use crate::tools::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const TOOL: &str = "search_code";

fn default_top_k() -> usize {
    5
}

/// Arguments for the search_code tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCodeArgs {
    /// Natural-language or code query
    pub query: String,
    /// Number of results to return
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Glob patterns restricting results by relative path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_patterns: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct SearchCodeOutput {
    query: String,
    results: Vec<SearchHit>,
}

/// Returns the schema offered to the model.
#[must_use]
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL.to_string(),
        description: "Search indexed workspace code by meaning. Run index_files first."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "What to look for, in natural language or code"
                },
                "top_k": {
                    "type": "integer",
                    "description": "Number of results to return (default: 5)",
                    "minimum": 1
                },
                "file_patterns": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Glob patterns on relative paths, e.g. \"src/**/*.py\""
                }
            },
            "required": ["query"]
        }),
    }
}

/// Ranks indexed chunks against the query.
///
/// # Errors
///
/// - validation if nothing is indexed or a pattern is malformed
/// - upstream if the query cannot be embedded
pub async fn run(
    index: &CodeIndex,
    provider: &dyn EmbeddingProvider,
    args: SearchCodeArgs,
) -> Result<Value, ToolError> {
    if index.is_empty() {
        return Err(ToolError::not_indexed());
    }

    let patterns = args
        .file_patterns
        .as_deref()
        .unwrap_or_default()
        .iter()
        .map(|p| {
            glob::Pattern::new(p).map_err(|e| {
                ToolError::invalid_arguments(TOOL, format!("invalid pattern '{p}': {e}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let query = provider
        .embed(&args.query)
        .await
        .map_err(|e| ToolError::upstream(e.to_string()))?;

    let results = index.search(&query, args.top_k.max(1), |metadata| {
        patterns.is_empty() || patterns.iter().any(|p| p.matches(&metadata.rel_path))
    });

    serde_json::to_value(SearchCodeOutput {
        query: args.query,
        results,
    })
    .map_err(|e| ToolError::internal(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{ChunkMetadata, IndexedChunk, LocalEmbeddingProvider};
    use crate::tools::ToolErrorCategory;

    async fn index_with(provider: &LocalEmbeddingProvider, files: &[(&str, &str)]) -> CodeIndex {
        let mut index = CodeIndex::new();
        for (rel_path, content) in files {
            let chunk = IndexedChunk {
                content: content.to_string(),
                metadata: ChunkMetadata {
                    source: format!("/ws/{rel_path}"),
                    file_name: rel_path.rsplit('/').next().unwrap().to_string(),
                    language: "python".into(),
                    rel_path: rel_path.to_string(),
                    chunk_id: 0,
                },
                embedding: provider.embed(content).await.unwrap(),
            };
            index.replace_file(rel_path, vec![chunk]);
        }
        index
    }

    fn args(query: &str) -> SearchCodeArgs {
        serde_json::from_value(json!({ "query": query })).unwrap()
    }

    #[test]
    fn top_k_defaults_to_five() {
        assert_eq!(args("x").top_k, 5);
    }

    #[tokio::test]
    async fn empty_index_asks_for_indexing() {
        let error = run(&CodeIndex::new(), &LocalEmbeddingProvider::new(8), args("x"))
            .await
            .unwrap_err();
        assert_eq!(error.category(), ToolErrorCategory::Validation);
        assert_eq!(
            error.to_string(),
            "No indexed files found. Please index files first."
        );
    }

    #[tokio::test]
    async fn returns_best_match_first() {
        let provider = LocalEmbeddingProvider::default();
        let index = index_with(
            &provider,
            &[
                ("src/db.py", "def connect_database(url): return pool.open(url)"),
                ("src/ui.py", "def render_button(label): return html.button(label)"),
            ],
        )
        .await;

        let result = run(&index, &provider, args("connect database"))
            .await
            .unwrap();

        assert_eq!(result["query"], "connect database");
        assert_eq!(result["results"][0]["file"], "src/db.py");
        assert!(result["results"][0]["score"].as_f64().unwrap() > 0.0);
        assert_eq!(result["results"][0]["metadata"]["rel_path"], "src/db.py");
    }

    #[tokio::test]
    async fn file_patterns_filter_results() {
        let provider = LocalEmbeddingProvider::default();
        let index = index_with(
            &provider,
            &[("src/a.py", "alpha beta"), ("tests/a.py", "alpha beta")],
        )
        .await;

        let result = run(
            &index,
            &provider,
            SearchCodeArgs {
                query: "alpha".into(),
                top_k: 5,
                file_patterns: Some(vec!["tests/*".into()]),
            },
        )
        .await
        .unwrap();

        let results = result["results"].as_array().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0]["file"], "tests/a.py");
    }

    #[tokio::test]
    async fn malformed_pattern_is_validation_error() {
        let provider = LocalEmbeddingProvider::new(8);
        let index = index_with(&provider, &[("a.py", "x")]).await;
        let error = run(
            &index,
            &provider,
            SearchCodeArgs {
                query: "x".into(),
                top_k: 5,
                file_patterns: Some(vec!["[".into()]),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(error.category(), ToolErrorCategory::Validation);
    }
}
