//! `clone_repository` built-in tool.
//!
//! Clones a git repository into a new directory of the workspace. The URL
//! is checked against the configured prefixes before any process is
//! spawned, and `git` is invoked directly rather than through a shell.

use crate::config::ToolsConfig;
use crate::messages::ToolDefinition;
use crate::tools::builtins::list_directory::{self, DirectoryListing};
use crate::tools::process::run_bounded;
use crate::tools::ToolError;
use crate::workspace::WorkspaceSandbox;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Component, Path};
use tokio::process::Command;

const TOOL: &str = "clone_repository";

/// Arguments for the clone_repository tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloneRepositoryArgs {
    /// Repository URL
    #[serde(alias = "url")]
    pub repository_url: String,
    /// Target directory name (default: `<repo>_<timestamp>`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_name: Option<String>,
    /// Branch to check out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// A completed clone, before indexing.
#[derive(Debug, Clone, Serialize)]
pub struct ClonedRepository {
    /// Human-readable summary
    pub message: String,
    /// Absolute path of the clone
    pub directory: String,
    /// Path relative to the workspace root
    pub relative_path: String,
    /// Top-level listing of the clone
    pub listing: DirectoryListing,
}

impl ClonedRepository {
    /// Builds the tool payload, recording whether the clone was indexed.
    #[must_use]
    pub fn into_payload(self, indexed: bool) -> Value {
        let mut payload = serde_json::to_value(self).unwrap_or_else(|_| json!({}));
        if let Value::Object(ref mut map) = payload {
            map.insert("indexed".to_string(), Value::Bool(indexed));
        }
        payload
    }
}

/// Returns the schema offered to the model.
#[must_use]
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL.to_string(),
        description: "Clone a GitHub repository into the workspace. The clone is indexed \
                      for semantic code search afterwards."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "repository_url": {
                    "type": "string",
                    "description": "Repository URL (https://github.com/... or git@github.com:...)"
                },
                "directory_name": {
                    "type": "string",
                    "description": "Directory to clone into (default: repository name plus a timestamp)"
                },
                "branch": {
                    "type": "string",
                    "description": "Branch to check out"
                }
            },
            "required": ["repository_url"]
        }),
    }
}

/// Clones a repository into the sandbox.
///
/// # Errors
///
/// - validation if the URL is not allowed, the branch or directory name is
///   malformed, or the target directory already exists
/// - timeout if `git` runs past the clone budget
/// - resource if `git` cannot be started or exits non-zero
pub async fn run(
    sandbox: &WorkspaceSandbox,
    config: &ToolsConfig,
    args: CloneRepositoryArgs,
) -> Result<ClonedRepository, ToolError> {
    let repo_name = repository_name(&args.repository_url, &config.allowed_clone_prefixes)?;

    if let Some(branch) = &args.branch {
        if branch.is_empty() || branch.starts_with('-') || branch.contains(char::is_whitespace) {
            return Err(ToolError::invalid_arguments(
                TOOL,
                format!("invalid branch name '{branch}'"),
            ));
        }
    }

    let directory_name = match &args.directory_name {
        Some(name) => name.clone(),
        None => format!(
            "{repo_name}_{}",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ),
    };
    if !is_single_component(&directory_name) {
        return Err(ToolError::invalid_arguments(
            TOOL,
            format!("directory_name must be a single path component, got '{directory_name}'"),
        ));
    }

    let target = sandbox.resolve(&directory_name)?;
    if tokio::fs::symlink_metadata(&target).await.is_ok() {
        return Err(ToolError::invalid_arguments(
            TOOL,
            format!("Directory already exists: {directory_name}"),
        ));
    }

    let mut command = Command::new("git");
    command.arg("clone");
    if let Some(branch) = &args.branch {
        command.arg("--branch").arg(branch);
    }
    command
        .arg("--")
        .arg(&args.repository_url)
        .arg(&target)
        .current_dir(sandbox.root())
        .env("GIT_TERMINAL_PROMPT", "0");

    tracing::info!(
        url = %args.repository_url,
        target = %directory_name,
        branch = ?args.branch,
        "cloning repository"
    );
    clone_into(command, &target, config).await?;

    let relative_path = sandbox.relative(&target);
    let listing = list_directory::list(sandbox, &relative_path).await?;

    Ok(ClonedRepository {
        message: format!("Successfully cloned repository to {relative_path}"),
        directory: target.display().to_string(),
        relative_path,
        listing,
    })
}

/// Runs the clone command. On timeout or a non-zero exit, whatever it
/// wrote to `target` is removed; `target` must not exist beforehand.
async fn clone_into(
    command: Command,
    target: &Path,
    config: &ToolsConfig,
) -> Result<(), ToolError> {
    let result = run_bounded(
        command,
        config.clone_timeout(),
        config.max_output_bytes,
        "Clone",
    )
    .await
    .and_then(|output| {
        if output.success {
            Ok(())
        } else {
            Err(ToolError::resource(format!(
                "Failed to clone repository: {}",
                output.stderr.trim()
            )))
        }
    });

    if result.is_err() {
        discard_partial(target).await;
    }
    result
}

async fn discard_partial(target: &Path) {
    match tokio::fs::remove_dir_all(target).await {
        Ok(()) => tracing::debug!(target = %target.display(), "removed partial clone"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            target = %target.display(),
            error = %e,
            "failed to remove partial clone"
        ),
    }
}

/// Checks `url` against `allowed` and returns the repository name.
///
/// # Errors
///
/// Returns a validation error if no prefix matches, an `https` URL does not
/// parse or has an empty path, or no usable name can be derived.
pub fn repository_name(url: &str, allowed: &[String]) -> Result<String, ToolError> {
    if !allowed.iter().any(|prefix| url.starts_with(prefix.as_str())) {
        return Err(ToolError::invalid_arguments(
            TOOL,
            format!(
                "Invalid repository URL '{url}'; allowed prefixes: {}",
                allowed.join(", ")
            ),
        ));
    }

    if url.starts_with("https://") || url.starts_with("http://") {
        let parsed = url::Url::parse(url)
            .map_err(|e| ToolError::invalid_arguments(TOOL, format!("invalid URL: {e}")))?;
        if parsed.path().trim_matches('/').is_empty() {
            return Err(ToolError::invalid_arguments(
                TOOL,
                "repository URL has no path",
            ));
        }
    }

    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let name = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default()
        .to_string();

    if is_single_component(&name) {
        Ok(name)
    } else {
        Err(ToolError::invalid_arguments(
            TOOL,
            format!("cannot derive a repository name from '{url}'"),
        ))
    }
}

fn is_single_component(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtins::testing;
    use crate::tools::ToolErrorCategory;

    fn defaults() -> Vec<String> {
        ToolsConfig::default().allowed_clone_prefixes
    }

    #[test]
    fn names_from_https_and_ssh() {
        assert_eq!(
            repository_name("https://github.com/rust-lang/cargo.git", &defaults()).unwrap(),
            "cargo"
        );
        assert_eq!(
            repository_name("https://github.com/rust-lang/cargo/", &defaults()).unwrap(),
            "cargo"
        );
        assert_eq!(
            repository_name("git@github.com:tokio-rs/tokio.git", &defaults()).unwrap(),
            "tokio"
        );
    }

    #[test]
    fn disallowed_prefixes_are_rejected() {
        for url in [
            "ftp://example.com/repo.git",
            "https://gitlab.com/a/b",
            "file:///etc",
            "https://github.com.evil.io/a/b",
        ] {
            let error = repository_name(url, &defaults()).unwrap_err();
            assert_eq!(error.category(), ToolErrorCategory::Validation, "{url}");
        }
    }

    #[test]
    fn bare_host_is_rejected() {
        assert!(repository_name("https://github.com/", &defaults()).is_err());
    }

    #[tokio::test]
    async fn rejected_url_creates_nothing() {
        let (_dir, sandbox) = testing::sandbox().await;
        let error = run(
            &sandbox,
            &ToolsConfig::default(),
            CloneRepositoryArgs {
                repository_url: "ftp://example.com/repo.git".into(),
                directory_name: Some("repo".into()),
                branch: None,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(error.category(), ToolErrorCategory::Validation);
        assert!(!sandbox.root().join("repo").exists());
    }

    #[tokio::test]
    async fn option_like_branch_is_rejected() {
        let (_dir, sandbox) = testing::sandbox().await;
        let error = run(
            &sandbox,
            &ToolsConfig::default(),
            CloneRepositoryArgs {
                repository_url: "https://github.com/a/b".into(),
                directory_name: None,
                branch: Some("--upload-pack=evil".into()),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(error.category(), ToolErrorCategory::Validation);
    }

    #[tokio::test]
    async fn nested_directory_name_is_rejected() {
        let (_dir, sandbox) = testing::sandbox().await;
        let error = run(
            &sandbox,
            &ToolsConfig::default(),
            CloneRepositoryArgs {
                repository_url: "https://github.com/a/b".into(),
                directory_name: Some("../b".into()),
                branch: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(error.category(), ToolErrorCategory::Validation);
    }

    #[tokio::test]
    async fn existing_directory_is_rejected() {
        let (_dir, sandbox) = testing::sandbox().await;
        tokio::fs::create_dir(sandbox.root().join("b")).await.unwrap();

        let error = run(
            &sandbox,
            &ToolsConfig::default(),
            CloneRepositoryArgs {
                repository_url: "https://github.com/a/b".into(),
                directory_name: Some("b".into()),
                branch: None,
            },
        )
        .await
        .unwrap_err();
        assert!(error.to_string().contains("already exists"));
    }

    #[tokio::test]
    async fn clones_local_repository_when_allowed() {
        let (dir, sandbox) = testing::sandbox().await;
        let origin = dir.path().join("origin.git");
        let init = std::process::Command::new("git")
            .arg("init")
            .arg("--bare")
            .arg(&origin)
            .output();
        if !init.is_ok_and(|o| o.status.success()) {
            // git is not installed here
            return;
        }

        let config = ToolsConfig {
            allowed_clone_prefixes: vec![dir.path().display().to_string()],
            ..ToolsConfig::default()
        };
        let cloned = run(
            &sandbox,
            &config,
            CloneRepositoryArgs {
                repository_url: origin.display().to_string(),
                directory_name: None,
                branch: None,
            },
        )
        .await
        .unwrap();

        assert!(cloned.relative_path.starts_with("origin_"));
        assert!(sandbox.root().join(&cloned.relative_path).join(".git").is_dir());

        let payload = cloned.into_payload(false);
        assert_eq!(payload["indexed"], false);
        assert!(payload["listing"]["current_path"]
            .as_str()
            .unwrap()
            .starts_with("origin_"));
    }

    #[cfg(unix)]
    fn partial_writer(target: &Path, tail: &str) -> Command {
        let mut command = Command::new("sh");
        command
            .arg("-c")
            .arg(format!("mkdir -p \"$1/.git\" && echo partial > \"$1/README\" && {tail}"))
            .arg("sh")
            .arg(target);
        command
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timed_out_clone_leaves_no_directory() {
        let (_dir, sandbox) = testing::sandbox().await;
        let target = sandbox.resolve("slow").unwrap();
        let config = ToolsConfig {
            clone_timeout_secs: 1,
            ..ToolsConfig::default()
        };

        let error = clone_into(partial_writer(&target, "sleep 10"), &target, &config)
            .await
            .unwrap_err();

        assert_eq!(error.category(), ToolErrorCategory::Timeout);
        assert!(tokio::fs::symlink_metadata(&target).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failed_clone_leaves_no_directory() {
        let (_dir, sandbox) = testing::sandbox().await;
        let target = sandbox.resolve("broken").unwrap();

        let error = clone_into(
            partial_writer(&target, "echo 'fatal: early EOF' >&2; exit 128"),
            &target,
            &ToolsConfig::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(error.category(), ToolErrorCategory::Resource);
        assert!(error.to_string().contains("early EOF"));
        assert!(tokio::fs::symlink_metadata(&target).await.is_err());
    }
}
