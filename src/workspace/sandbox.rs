//! Path resolution and containment for a session workspace.

use super::error::SandboxError;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// What to do with a path that would resolve outside the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EscapePolicy {
    /// Re-interpret the path as relative to the sandbox root.
    #[default]
    Rebase,
    /// Refuse the path with a containment error.
    Reject,
}

/// A directory that confines all file operations of one session.
///
/// The root is canonicalized when the sandbox is provisioned, so
/// containment checks compare canonical forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceSandbox {
    root: PathBuf,
    policy: EscapePolicy,
}

impl WorkspaceSandbox {
    /// Creates the sandbox directory if needed and returns a handle to it.
    ///
    /// Idempotent: provisioning an existing directory leaves its contents
    /// untouched.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::io` if the directory cannot be created or
    /// canonicalized.
    pub async fn provision(
        root: impl Into<PathBuf>,
        policy: EscapePolicy,
    ) -> Result<Self, SandboxError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| SandboxError::io(&root, e.to_string()))?;
        let root = tokio::fs::canonicalize(&root)
            .await
            .map_err(|e| SandboxError::io(&root, e.to_string()))?;
        Ok(Self { root, policy })
    }

    /// Returns the canonical sandbox root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the escape policy in effect.
    #[must_use]
    pub fn policy(&self) -> EscapePolicy {
        self.policy
    }

    /// Resolves a tool-supplied path to an absolute path inside the sandbox.
    ///
    /// - Relative paths are joined to the root; `.` and `..` are applied
    ///   lexically.
    /// - Absolute paths already inside the root are kept.
    /// - Anything else is handled by the [`EscapePolicy`].
    ///
    /// Symlinks are checked after resolution: if the deepest existing
    /// ancestor of the result canonicalizes outside the root, the path is
    /// refused under either policy.
    ///
    /// This is a synchronous call. The symlink check does blocking metadata
    /// lookups (`canonicalize`, `symlink_metadata`) on at most the ancestors
    /// between the path and the root; they are short and run inline on the
    /// calling task.
    ///
    /// # Errors
    ///
    /// Returns an escape error under [`EscapePolicy::Reject`] or when a
    /// symlink leaves the sandbox.
    pub fn resolve(&self, candidate: impl AsRef<Path>) -> Result<PathBuf, SandboxError> {
        let candidate = candidate.as_ref();

        let lexical = if candidate.is_absolute() {
            let normalized = normalize_absolute(candidate);
            if normalized.starts_with(&self.root) {
                Some(normalized)
            } else {
                None
            }
        } else {
            join_within(&self.root, candidate)
        };

        let resolved = match lexical {
            Some(path) => path,
            None => match self.policy {
                EscapePolicy::Rebase => {
                    tracing::debug!(
                        path = %candidate.display(),
                        root = %self.root.display(),
                        "rebasing out-of-sandbox path onto workspace root"
                    );
                    rebase(&self.root, candidate)
                }
                EscapePolicy::Reject => return Err(SandboxError::escape(candidate)),
            },
        };

        self.check_symlinks(&resolved)?;
        Ok(resolved)
    }

    /// Returns `path` relative to the sandbox root, using `/` separators.
    ///
    /// The root itself is rendered as `.`.
    #[must_use]
    pub fn relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if rel.as_os_str().is_empty() => ".".to_string(),
            Ok(rel) => rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => path.display().to_string(),
        }
    }

    /// Returns true if `path` is the sandbox root itself.
    #[must_use]
    pub fn is_root(&self, path: &Path) -> bool {
        path == self.root
    }

    /// Creates the parent directories of `path`.
    ///
    /// # Errors
    ///
    /// Returns `SandboxError::io` if a directory cannot be created.
    pub async fn ensure_parent(&self, path: &Path) -> Result<(), SandboxError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SandboxError::io(parent, e.to_string()))?;
        }
        Ok(())
    }

    /// Blocking; see [`resolve`](Self::resolve).
    fn check_symlinks(&self, resolved: &Path) -> Result<(), SandboxError> {
        for ancestor in resolved.ancestors() {
            match std::fs::canonicalize(ancestor) {
                Ok(canonical) => {
                    if canonical.starts_with(&self.root) {
                        return Ok(());
                    }
                    return Err(SandboxError::symlink_escape(resolved));
                }
                Err(_) => {
                    // A dangling symlink cannot be canonicalized but would still be
                    // followed on write.
                    if std::fs::symlink_metadata(ancestor).is_ok() {
                        return Err(SandboxError::symlink_escape(resolved));
                    }
                }
            }
            if ancestor == self.root {
                break;
            }
        }
        Ok(())
    }
}

/// Joins `relative` to `root`, applying `.` and `..` lexically.
///
/// Returns `None` if a `..` would climb above `root`.
fn join_within(root: &Path, relative: &Path) -> Option<PathBuf> {
    let mut out = root.to_path_buf();
    let mut depth = 0usize;
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if depth == 0 {
                    return None;
                }
                out.pop();
                depth -= 1;
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}

/// Re-anchors any path under `root`, clamping `..` at the root.
fn rebase(root: &Path, path: &Path) -> PathBuf {
    let mut out = root.to_path_buf();
    let mut depth = 0usize;
    for component in path.components() {
        match component {
            Component::Normal(part) => {
                out.push(part);
                depth += 1;
            }
            Component::ParentDir if depth > 0 => {
                out.pop();
                depth -= 1;
            }
            _ => {}
        }
    }
    out
}

fn normalize_absolute(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn sandbox(policy: EscapePolicy) -> (TempDir, WorkspaceSandbox) {
        let dir = TempDir::new().unwrap();
        let sandbox = WorkspaceSandbox::provision(dir.path().join("sess"), policy)
            .await
            .unwrap();
        (dir, sandbox)
    }

    #[tokio::test]
    async fn provision_creates_directory_and_is_idempotent() {
        let (dir, first) = sandbox(EscapePolicy::Rebase).await;
        assert!(first.root().is_dir());
        std::fs::write(first.root().join("keep.txt"), "x").unwrap();

        let second = WorkspaceSandbox::provision(dir.path().join("sess"), EscapePolicy::Rebase)
            .await
            .unwrap();
        assert_eq!(first.root(), second.root());
        assert!(second.root().join("keep.txt").exists());
    }

    #[tokio::test]
    async fn relative_path_joins_root() {
        let (_dir, sandbox) = sandbox(EscapePolicy::Rebase).await;
        for rel in ["a.py", "src/main.rs", "deep/nested/dir/file.txt"] {
            assert_eq!(sandbox.resolve(rel).unwrap(), sandbox.root().join(rel));
        }
    }

    #[tokio::test]
    async fn dot_segments_are_applied() {
        let (_dir, sandbox) = sandbox(EscapePolicy::Rebase).await;
        assert_eq!(
            sandbox.resolve("./src/../lib/./x.rs").unwrap(),
            sandbox.root().join("lib/x.rs")
        );
        assert_eq!(sandbox.resolve(".").unwrap(), sandbox.root());
    }

    #[tokio::test]
    async fn absolute_path_inside_root_is_kept() {
        let (_dir, sandbox) = sandbox(EscapePolicy::Reject).await;
        let inside = sandbox.root().join("a/b.txt");
        assert_eq!(sandbox.resolve(&inside).unwrap(), inside);
    }

    #[tokio::test]
    async fn absolute_path_outside_root_is_rebased() {
        let (_dir, sandbox) = sandbox(EscapePolicy::Rebase).await;
        let resolved = sandbox.resolve("/etc/passwd").unwrap();
        assert_eq!(resolved, sandbox.root().join("etc/passwd"));
    }

    #[tokio::test]
    async fn parent_traversal_is_clamped_under_rebase() {
        let (_dir, sandbox) = sandbox(EscapePolicy::Rebase).await;
        let resolved = sandbox.resolve("../../outside.txt").unwrap();
        assert_eq!(resolved, sandbox.root().join("outside.txt"));
    }

    #[tokio::test]
    async fn reject_policy_refuses_escapes() {
        let (_dir, sandbox) = sandbox(EscapePolicy::Reject).await;
        assert!(sandbox.resolve("/etc/passwd").unwrap_err().is_escape());
        assert!(sandbox.resolve("../x").unwrap_err().is_escape());
        assert!(sandbox.resolve("ok/../fine.txt").is_ok());
    }

    #[tokio::test]
    async fn absolute_path_with_parent_dirs_escaping_root_is_not_inside() {
        let (_dir, sandbox) = sandbox(EscapePolicy::Reject).await;
        let sneaky = sandbox.root().join("../elsewhere");
        assert!(sandbox.resolve(&sneaky).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_leaving_sandbox_is_refused() {
        let (dir, sandbox) = sandbox(EscapePolicy::Rebase).await;
        let outside = dir.path().join("outside");
        std::fs::create_dir(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, sandbox.root().join("link")).unwrap();

        let error = sandbox.resolve("link/secret.txt").unwrap_err();
        assert!(error.is_escape());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlink_within_sandbox_is_allowed() {
        let (_dir, sandbox) = sandbox(EscapePolicy::Rebase).await;
        std::fs::create_dir(sandbox.root().join("real")).unwrap();
        std::os::unix::fs::symlink(sandbox.root().join("real"), sandbox.root().join("alias"))
            .unwrap();
        assert!(sandbox.resolve("alias/file.txt").is_ok());
    }

    #[tokio::test]
    async fn relative_renders_with_forward_slashes() {
        let (_dir, sandbox) = sandbox(EscapePolicy::Rebase).await;
        assert_eq!(sandbox.relative(sandbox.root()), ".");
        assert_eq!(sandbox.relative(&sandbox.root().join("a").join("b.rs")), "a/b.rs");
    }

    #[tokio::test]
    async fn ensure_parent_creates_missing_directories() {
        let (_dir, sandbox) = sandbox(EscapePolicy::Rebase).await;
        let target = sandbox.resolve("x/y/z.txt").unwrap();
        sandbox.ensure_parent(&target).await.unwrap();
        assert!(sandbox.root().join("x/y").is_dir());
        sandbox.ensure_parent(&target).await.unwrap();
    }
}
