//! `search_files` built-in tool.
//!
//! Walks a directory tree and returns every file whose name matches a
//! regular expression.

use crate::messages::ToolDefinition;
use crate::tools::ToolError;
use crate::workspace::{file_info, FileInfo, WorkspaceSandbox};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use walkdir::WalkDir;

/// Maximum number of matches returned.
const MAX_MATCHES: usize = 1000;

/// Arguments for the search_files tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilesArgs {
    /// Regex matched against file names
    pub pattern: String,
    /// Directory to search from, relative to the workspace
    #[serde(default = "super::current_dir")]
    pub directory: String,
}

#[derive(Debug, Serialize)]
struct SearchFilesOutput {
    pattern: String,
    matches: Vec<FileInfo>,
    count: usize,
    truncated: bool,
}

/// Returns the schema offered to the model.
#[must_use]
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "search_files".to_string(),
        description: "Find files whose names match a regular expression, searching a \
                      directory and all of its subdirectories."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "pattern": {
                    "type": "string",
                    "description": "Regular expression matched against file names (e.g. \"\\\\.py$\")"
                },
                "directory": {
                    "type": "string",
                    "description": "Directory to search from (default: \".\")"
                }
            },
            "required": ["pattern"]
        }),
    }
}

/// Searches file names under a directory.
///
/// # Errors
///
/// - validation if the pattern is not a valid regex
/// - not found if the directory does not exist
pub async fn run(sandbox: &WorkspaceSandbox, args: SearchFilesArgs) -> Result<Value, ToolError> {
    let regex = Regex::new(&args.pattern)
        .map_err(|e| ToolError::invalid_arguments("search_files", format!("invalid regex: {e}")))?;

    let base = sandbox.resolve(&args.directory)?;
    if !tokio::fs::metadata(&base).await.is_ok_and(|m| m.is_dir()) {
        return Err(ToolError::directory_not_found(&args.directory));
    }

    let (paths, truncated) = tokio::task::spawn_blocking(move || walk_matching(base, &regex))
        .await
        .map_err(|e| ToolError::internal(format!("search task failed: {e}")))?;

    let mut matches = Vec::with_capacity(paths.len());
    for path in paths {
        if let Ok(info) = file_info(sandbox, &path).await {
            matches.push(info);
        }
    }

    serde_json::to_value(SearchFilesOutput {
        pattern: args.pattern,
        count: matches.len(),
        matches,
        truncated,
    })
    .map_err(|e| ToolError::internal(e.to_string()))
}

fn walk_matching(base: PathBuf, regex: &Regex) -> (Vec<PathBuf>, bool) {
    let mut found = Vec::new();
    for entry in WalkDir::new(&base)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        if regex.is_match(&entry.file_name().to_string_lossy()) {
            if found.len() >= MAX_MATCHES {
                return (found, true);
            }
            found.push(entry.into_path());
        }
    }
    (found, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtins::testing;
    use crate::tools::ToolErrorCategory;

    #[tokio::test]
    async fn finds_files_recursively() {
        let (_dir, sandbox) = testing::sandbox().await;
        let root = sandbox.root();
        tokio::fs::create_dir_all(root.join("pkg/sub")).await.unwrap();
        tokio::fs::write(root.join("a.py"), "").await.unwrap();
        tokio::fs::write(root.join("pkg/sub/b.py"), "").await.unwrap();
        tokio::fs::write(root.join("pkg/c.txt"), "").await.unwrap();

        let result = run(
            &sandbox,
            SearchFilesArgs {
                pattern: r"\.py$".into(),
                directory: ".".into(),
            },
        )
        .await
        .unwrap();

        assert_eq!(result["count"], 2);
        assert_eq!(result["pattern"], r"\.py$");
        let paths: Vec<_> = result["matches"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["path"].as_str().unwrap().to_string())
            .collect();
        assert!(paths.contains(&"a.py".to_string()));
        assert!(paths.contains(&"pkg/sub/b.py".to_string()));
    }

    #[tokio::test]
    async fn no_matches_is_success() {
        let (_dir, sandbox) = testing::sandbox().await;
        let result = run(
            &sandbox,
            SearchFilesArgs {
                pattern: "nothing".into(),
                directory: ".".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(result["count"], 0);
    }

    #[tokio::test]
    async fn invalid_regex_is_validation_error() {
        let (_dir, sandbox) = testing::sandbox().await;
        let error = run(
            &sandbox,
            SearchFilesArgs {
                pattern: "([".into(),
                directory: ".".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(error.category(), ToolErrorCategory::Validation);
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let (_dir, sandbox) = testing::sandbox().await;
        let error = run(
            &sandbox,
            SearchFilesArgs {
                pattern: ".*".into(),
                directory: "nowhere".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(error.category(), ToolErrorCategory::NotFound);
    }
}
