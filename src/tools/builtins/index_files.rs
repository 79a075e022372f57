//! `index_files` built-in tool.
//!
//! Chunks workspace text files and stores their embeddings in the session's
//! [`CodeIndex`]. Re-indexing a file replaces its previous chunks.

use crate::config::EmbeddingConfig;
use crate::index::{chunk_text, ChunkMetadata, CodeIndex, EmbeddingProvider, IndexedChunk};
use crate::messages::ToolDefinition;
use crate::tools::ToolError;
use crate::workspace::{
    detect_language, is_binary_file, EscapePolicy, SandboxError, WorkspaceSandbox,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Files larger than this are not indexed.
const MAX_INDEX_FILE_BYTES: u64 = 1024 * 1024;

/// Arguments for the index_files tool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexFilesArgs {
    /// Files, directories or glob patterns to index (default: the whole workspace)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_paths: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
struct IndexFilesOutput {
    message: String,
    files: Vec<String>,
    chunks: usize,
}

/// Returns the schema offered to the model.
#[must_use]
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: "index_files".to_string(),
        description: "Index workspace files for semantic code search. Indexes every text \
                      file when no paths are given."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "file_paths": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Files, directories or glob patterns relative to the workspace root"
                }
            }
        }),
    }
}

/// Indexes files into `index`.
///
/// Binary files, files over 1 MiB and files that are not valid UTF-8 are
/// skipped silently. `.git` directories are never walked.
///
/// # Errors
///
/// - not found if an explicitly listed path does not exist
/// - validation if a glob pattern is malformed or a path escapes
/// - upstream if the embedding provider fails
pub async fn run(
    sandbox: &WorkspaceSandbox,
    index: &mut CodeIndex,
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    args: IndexFilesArgs,
) -> Result<Value, ToolError> {
    let targets = collect_targets(sandbox, args.file_paths.as_deref()).await?;

    // Nothing reaches the index until every file has been embedded.
    let mut staged = Vec::new();
    let mut total_chunks = 0;
    for path in targets {
        let Some(text) = read_indexable(&path).await else {
            continue;
        };
        let pieces = chunk_text(&text, config.chunk_size, config.chunk_overlap);
        if pieces.is_empty() {
            continue;
        }

        let embeddings = provider
            .embed_batch(&pieces)
            .await
            .map_err(|e| ToolError::upstream(e.to_string()))?;

        let rel_path = sandbox.relative(&path);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let language = detect_language(&path).to_string();

        let chunks: Vec<IndexedChunk> = pieces
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(chunk_id, (content, embedding))| IndexedChunk {
                content,
                metadata: ChunkMetadata {
                    source: path.display().to_string(),
                    file_name: file_name.clone(),
                    language: language.clone(),
                    rel_path: rel_path.clone(),
                    chunk_id,
                },
                embedding,
            })
            .collect();

        total_chunks += chunks.len();
        staged.push((rel_path, chunks));
    }

    let mut indexed = Vec::with_capacity(staged.len());
    for (rel_path, chunks) in staged {
        index.replace_file(&rel_path, chunks);
        indexed.push(rel_path);
    }

    tracing::info!(
        files = indexed.len(),
        chunks = total_chunks,
        provider = provider.name(),
        "indexed workspace files"
    );

    serde_json::to_value(IndexFilesOutput {
        message: format!(
            "Indexed {} files with {} chunks",
            indexed.len(),
            total_chunks
        ),
        files: indexed,
        chunks: total_chunks,
    })
    .map_err(|e| ToolError::internal(e.to_string()))
}

/// Expands the requested paths into a sorted, de-duplicated file list.
async fn collect_targets(
    sandbox: &WorkspaceSandbox,
    requested: Option<&[String]>,
) -> Result<Vec<PathBuf>, ToolError> {
    let Some(requested) = requested else {
        return walk(sandbox.root().to_path_buf()).await;
    };

    let mut files = BTreeSet::new();
    for entry in requested {
        if entry.contains(['*', '?', '[']) {
            for path in expand_glob(sandbox, entry)? {
                files.insert(path);
            }
            continue;
        }

        let path = sandbox.resolve(entry)?;
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => files.extend(walk(path).await?),
            Ok(_) => {
                files.insert(path);
            }
            Err(_) => return Err(ToolError::not_found(entry)),
        }
    }
    Ok(files.into_iter().collect())
}

fn expand_glob(sandbox: &WorkspaceSandbox, pattern: &str) -> Result<Vec<PathBuf>, ToolError> {
    let requested = Path::new(pattern);
    let relative = match requested.strip_prefix(sandbox.root()) {
        Ok(inside) => inside,
        Err(_) if requested.is_absolute() && sandbox.policy() == EscapePolicy::Reject => {
            return Err(SandboxError::escape(requested).into());
        }
        Err(_) => Path::new(pattern.trim_start_matches('/')),
    };
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(ToolError::invalid_arguments(
            "index_files",
            format!("pattern '{pattern}' must stay inside the workspace"),
        ));
    }
    let anchored = relative
        .components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .fold(sandbox.root().to_path_buf(), |acc, c| acc.join(c));

    let paths = glob::glob(&anchored.to_string_lossy()).map_err(|e| {
        ToolError::invalid_arguments("index_files", format!("invalid pattern '{pattern}': {e}"))
    })?;

    // A hit counts only if it resolves to itself; rebased or symlinked
    // paths point somewhere else.
    Ok(paths
        .filter_map(Result::ok)
        .filter(|path| path.is_file() && !in_git_dir(sandbox.root(), path))
        .filter(|path| sandbox.resolve(path).is_ok_and(|resolved| resolved == *path))
        .collect())
}

async fn walk(base: PathBuf) -> Result<Vec<PathBuf>, ToolError> {
    tokio::task::spawn_blocking(move || {
        WalkDir::new(&base)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != ".git")
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(walkdir::DirEntry::into_path)
            .collect()
    })
    .await
    .map_err(|e| ToolError::internal(format!("index walk failed: {e}")))
}

fn in_git_dir(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .map(|rel| rel.components().any(|c| c.as_os_str() == ".git"))
        .unwrap_or(false)
}

async fn read_indexable(path: &Path) -> Option<String> {
    let metadata = tokio::fs::metadata(path).await.ok()?;
    if metadata.len() > MAX_INDEX_FILE_BYTES {
        tracing::debug!(path = %path.display(), "skipping large file");
        return None;
    }
    if is_binary_file(path).await.unwrap_or(true) {
        return None;
    }
    tokio::fs::read_to_string(path).await.ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{EmbeddingError, LocalEmbeddingProvider};
    use crate::tools::builtins::testing;
    use crate::tools::ToolErrorCategory;
    use async_trait::async_trait;

    async fn populate(sandbox: &WorkspaceSandbox) {
        let root = sandbox.root();
        tokio::fs::create_dir_all(root.join("src")).await.unwrap();
        tokio::fs::create_dir_all(root.join(".git/objects")).await.unwrap();
        tokio::fs::write(root.join("src/app.py"), "def main():\n    print('hi')\n")
            .await
            .unwrap();
        tokio::fs::write(root.join("README.md"), "# Demo\n").await.unwrap();
        tokio::fs::write(root.join("logo.png"), [0x89u8, 0x50, 0x4e, 0x47, 0xff, 0xfe])
            .await
            .unwrap();
        tokio::fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn indexes_text_files_and_skips_git_and_binary() {
        let (_dir, sandbox) = testing::sandbox().await;
        populate(&sandbox).await;
        let mut index = CodeIndex::new();

        let result = run(
            &sandbox,
            &mut index,
            &LocalEmbeddingProvider::new(32),
            &EmbeddingConfig::default(),
            IndexFilesArgs::default(),
        )
        .await
        .unwrap();

        assert_eq!(result["message"], "Indexed 2 files with 2 chunks");
        assert_eq!(
            index.files(),
            vec!["README.md".to_string(), "src/app.py".to_string()]
        );
        let query = LocalEmbeddingProvider::new(32).embed("def main").await.unwrap();
        let hits = index.search(&query, 1, |m| m.rel_path == "src/app.py");
        assert_eq!(hits[0].metadata.language, "python");
        assert_eq!(hits[0].metadata.file_name, "app.py");
        assert_eq!(hits[0].metadata.chunk_id, 0);
    }

    #[tokio::test]
    async fn empty_workspace_indexes_nothing() {
        let (_dir, sandbox) = testing::sandbox().await;
        let mut index = CodeIndex::new();
        let result = run(
            &sandbox,
            &mut index,
            &LocalEmbeddingProvider::new(8),
            &EmbeddingConfig::default(),
            IndexFilesArgs::default(),
        )
        .await
        .unwrap();
        assert_eq!(result["message"], "Indexed 0 files with 0 chunks");
        assert!(index.is_empty());
    }

    #[tokio::test]
    async fn explicit_paths_and_globs() {
        let (_dir, sandbox) = testing::sandbox().await;
        populate(&sandbox).await;
        let mut index = CodeIndex::new();

        run(
            &sandbox,
            &mut index,
            &LocalEmbeddingProvider::new(8),
            &EmbeddingConfig::default(),
            IndexFilesArgs {
                file_paths: Some(vec!["src/**/*.py".into()]),
            },
        )
        .await
        .unwrap();

        assert_eq!(index.files(), vec!["src/app.py".to_string()]);
    }

    #[tokio::test]
    async fn missing_explicit_path_fails() {
        let (_dir, sandbox) = testing::sandbox().await;
        let mut index = CodeIndex::new();
        let error = run(
            &sandbox,
            &mut index,
            &LocalEmbeddingProvider::new(8),
            &EmbeddingConfig::default(),
            IndexFilesArgs {
                file_paths: Some(vec!["ghost.py".into()]),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(error.category(), ToolErrorCategory::NotFound);
    }

    #[tokio::test]
    async fn glob_cannot_climb_out_of_workspace() {
        let (_dir, sandbox) = testing::sandbox().await;
        let outside = sandbox.root().parent().unwrap().join("secret.txt");
        tokio::fs::write(&outside, "TOPSECRET outside the workspace")
            .await
            .unwrap();
        let mut index = CodeIndex::new();

        let error = run(
            &sandbox,
            &mut index,
            &LocalEmbeddingProvider::new(8),
            &EmbeddingConfig::default(),
            IndexFilesArgs {
                file_paths: Some(vec!["../*.txt".into()]),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(error.category(), ToolErrorCategory::Validation);
        assert!(index.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn glob_skips_symlinks_leaving_workspace() {
        let (_dir, sandbox) = testing::sandbox().await;
        let outside = sandbox.root().parent().unwrap().join("secret.txt");
        tokio::fs::write(&outside, "TOPSECRET outside the workspace")
            .await
            .unwrap();
        std::os::unix::fs::symlink(&outside, sandbox.root().join("link.txt")).unwrap();
        tokio::fs::write(sandbox.root().join("notes.txt"), "inside")
            .await
            .unwrap();
        let mut index = CodeIndex::new();

        let result = run(
            &sandbox,
            &mut index,
            &LocalEmbeddingProvider::new(8),
            &EmbeddingConfig::default(),
            IndexFilesArgs {
                file_paths: Some(vec!["*.txt".into()]),
            },
        )
        .await
        .unwrap();

        assert_eq!(result["files"], json!(["notes.txt"]));
        assert_eq!(index.files(), vec!["notes.txt".to_string()]);
    }

    struct FailingProvider;

    #[async_trait]
    impl EmbeddingProvider for FailingProvider {
        async fn embed(&self, _text: &str) -> Result<crate::index::Embedding, EmbeddingError> {
            Err(EmbeddingError::GenerationFailed {
                provider: "failing".into(),
                message: "service unavailable".into(),
            })
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    #[tokio::test]
    async fn provider_failure_is_upstream() {
        let (_dir, sandbox) = testing::sandbox().await;
        populate(&sandbox).await;
        let mut index = CodeIndex::new();

        let error = run(
            &sandbox,
            &mut index,
            &FailingProvider,
            &EmbeddingConfig::default(),
            IndexFilesArgs::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(error.category(), ToolErrorCategory::Upstream);
        assert!(error.to_string().contains("service unavailable"));
    }

    /// Embeds the first batch, then fails.
    #[derive(Default)]
    struct FlakyProvider {
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        async fn embed(&self, text: &str) -> Result<crate::index::Embedding, EmbeddingError> {
            LocalEmbeddingProvider::new(8).embed(text).await
        }

        async fn embed_batch(
            &self,
            texts: &[String],
        ) -> Result<Vec<crate::index::Embedding>, EmbeddingError> {
            if self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst) > 0 {
                return Err(EmbeddingError::GenerationFailed {
                    provider: "flaky".into(),
                    message: "connection reset".into(),
                });
            }
            LocalEmbeddingProvider::new(8).embed_batch(texts).await
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn failure_midway_leaves_index_untouched() {
        let (_dir, sandbox) = testing::sandbox().await;
        populate(&sandbox).await;
        let mut index = CodeIndex::new();

        let error = run(
            &sandbox,
            &mut index,
            &FlakyProvider::default(),
            &EmbeddingConfig::default(),
            IndexFilesArgs::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(error.category(), ToolErrorCategory::Upstream);
        assert!(index.is_empty());
    }
}
