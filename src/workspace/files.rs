//! File metadata, language detection and binary sniffing.

use super::error::SandboxError;
use super::sandbox::WorkspaceSandbox;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;
use tokio::io::AsyncReadExt;

/// Number of leading bytes inspected when classifying a file as binary.
const SNIFF_LEN: usize = 1024;

/// Metadata describing one file in a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Path relative to the sandbox root
    pub path: String,
    /// File name
    pub name: String,
    /// Size in bytes
    pub size: u64,
    /// Creation time (RFC 3339), when the platform records it
    pub created: Option<String>,
    /// Last modification time (RFC 3339)
    pub modified: Option<String>,
    /// Whether the content is not valid UTF-8
    pub is_binary: bool,
    /// Extension including the leading dot, or empty
    pub extension: String,
}

/// Maps a file extension to a language name.
///
/// Unknown extensions map to `plaintext`.
#[must_use]
pub fn detect_language(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "html" => "html",
        "css" => "css",
        "java" => "java",
        "c" => "c",
        "cpp" => "cpp",
        "cs" => "csharp",
        "go" => "go",
        "rs" => "rust",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" => "kotlin",
        "scala" => "scala",
        "md" => "markdown",
        "json" => "json",
        "yml" | "yaml" => "yaml",
        "sh" => "bash",
        "sql" => "sql",
        _ => "plaintext",
    }
}

/// Returns true if `bytes` do not decode as UTF-8.
///
/// A multi-byte sequence truncated at the end of the buffer is not counted
/// as a decode failure, since the buffer is usually a prefix of the file.
#[must_use]
pub fn is_binary_bytes(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(_) => false,
        Err(e) => e.error_len().is_some(),
    }
}

/// Classifies a file by decoding its first kilobyte.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be opened or read.
pub async fn is_binary_file(path: &Path) -> std::io::Result<bool> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < SNIFF_LEN {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(is_binary_bytes(&buf[..filled]))
}

/// Builds the metadata record for a file inside `sandbox`.
///
/// # Errors
///
/// Returns `SandboxError::io` if the file cannot be inspected.
pub async fn file_info(sandbox: &WorkspaceSandbox, path: &Path) -> Result<FileInfo, SandboxError> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| SandboxError::io(path, e.to_string()))?;

    let is_binary = if metadata.is_file() {
        is_binary_file(path)
            .await
            .map_err(|e| SandboxError::io(path, e.to_string()))?
    } else {
        false
    };

    Ok(FileInfo {
        path: sandbox.relative(path),
        name: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size: metadata.len(),
        created: metadata.created().ok().map(rfc3339),
        modified: metadata.modified().ok().map(rfc3339),
        is_binary,
        extension: path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default(),
    })
}

pub(crate) fn rfc3339(time: SystemTime) -> String {
    DateTime::<Utc>::from(time).to_rfc3339()
}
