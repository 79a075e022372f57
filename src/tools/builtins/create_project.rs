//! `create_project_structure` built-in tool.
//!
//! Materializes a nested JSON object as a file tree: string values become
//! files with that content, object values become directories.
//!
//! The whole structure is validated before anything is written, so a
//! malformed leaf deep in the tree does not leave a half-built project.

use crate::messages::ToolDefinition;
use crate::tools::ToolError;
use crate::workspace::WorkspaceSandbox;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Component, Path, PathBuf};

const TOOL: &str = "create_project_structure";

/// Arguments for the create_project_structure tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateProjectArgs {
    /// Nested object describing the tree
    pub structure: Value,
    /// Directory the tree is created under, relative to the workspace
    #[serde(default = "super::current_dir")]
    pub base_dir: String,
}

/// One created entry, mirroring the input tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProjectItem {
    /// A file with its content length in bytes
    File {
        /// Path relative to the workspace root
        path: String,
        /// Entry name
        name: String,
        /// Bytes written
        size: usize,
    },
    /// A directory and its children
    Directory {
        /// Path relative to the workspace root
        path: String,
        /// Entry name
        name: String,
        /// Children in input order
        items: Vec<ProjectItem>,
    },
}

#[derive(Debug, Serialize)]
struct CreateProjectOutput {
    base_directory: String,
    structure: Vec<ProjectItem>,
}

enum Step<'a> {
    Dir(PathBuf),
    File(PathBuf, &'a str),
}

/// Returns the schema offered to the model.
#[must_use]
pub fn definition() -> ToolDefinition {
    ToolDefinition {
        name: TOOL.to_string(),
        description: "Create a project file tree from a nested object. String values are \
                      file contents; object values are subdirectories."
            .to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "structure": {
                    "type": "object",
                    "description": "Nested mapping of names to file contents (string) or subdirectories (object)"
                },
                "base_dir": {
                    "type": "string",
                    "description": "Directory to create the project in, relative to the workspace root"
                }
            },
            "required": ["structure", "base_dir"]
        }),
    }
}

/// Creates the tree inside the sandbox.
///
/// # Errors
///
/// - validation if the structure is not an object, a leaf is neither a
///   string nor an object, or an entry name is not a plain relative path
/// - resource if any directory or file cannot be created
pub async fn run(sandbox: &WorkspaceSandbox, args: CreateProjectArgs) -> Result<Value, ToolError> {
    let Value::Object(structure) = &args.structure else {
        return Err(ToolError::invalid_arguments(
            TOOL,
            "structure must be an object",
        ));
    };

    let base = sandbox.resolve(&args.base_dir)?;
    let mut steps = Vec::new();
    let items = plan(sandbox, structure, &base, &mut steps)?;

    tokio::fs::create_dir_all(&base)
        .await
        .map_err(|e| ToolError::resource(format!("Error creating project structure: {e}")))?;

    for step in &steps {
        let written = match step {
            Step::Dir(path) => tokio::fs::create_dir_all(path).await,
            Step::File(path, content) => tokio::fs::write(path, content.as_bytes()).await,
        };
        written
            .map_err(|e| ToolError::resource(format!("Error creating project structure: {e}")))?;
    }

    tracing::info!(
        base = %sandbox.relative(&base),
        entries = steps.len(),
        "project structure created"
    );

    serde_json::to_value(CreateProjectOutput {
        base_directory: sandbox.relative(&base),
        structure: items,
    })
    .map_err(|e| ToolError::internal(e.to_string()))
}

/// Validates one level of the tree, appending the writes it needs.
fn plan<'a>(
    sandbox: &WorkspaceSandbox,
    level: &'a Map<String, Value>,
    dir: &Path,
    steps: &mut Vec<Step<'a>>,
) -> Result<Vec<ProjectItem>, ToolError> {
    let mut items = Vec::with_capacity(level.len());
    for (name, value) in level {
        check_name(name)?;
        let path = sandbox.resolve(dir.join(name))?;
        let rel = sandbox.relative(&path);
        match value {
            Value::Object(children) => {
                steps.push(Step::Dir(path.clone()));
                let nested = plan(sandbox, children, &path, steps)?;
                items.push(ProjectItem::Directory {
                    path: rel,
                    name: name.clone(),
                    items: nested,
                });
            }
            Value::String(content) => {
                if let Some(parent) = path.parent() {
                    steps.push(Step::Dir(parent.to_path_buf()));
                }
                steps.push(Step::File(path, content));
                items.push(ProjectItem::File {
                    path: rel,
                    name: name.clone(),
                    size: content.len(),
                });
            }
            other => {
                return Err(ToolError::invalid_arguments(
                    TOOL,
                    format!(
                        "entry '{name}' must be a string (file) or object (directory), got {}",
                        json_type(other)
                    ),
                ));
            }
        }
    }
    Ok(items)
}

fn check_name(name: &str) -> Result<(), ToolError> {
    let path = Path::new(name);
    let plain = !name.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if plain {
        Ok(())
    } else {
        Err(ToolError::invalid_arguments(
            TOOL,
            format!("invalid entry name '{name}'"),
        ))
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::builtins::testing;
    use crate::tools::ToolErrorCategory;

    #[tokio::test]
    async fn creates_nested_tree() {
        let (_dir, sandbox) = testing::sandbox().await;

        let result = run(
            &sandbox,
            CreateProjectArgs {
                structure: json!({
                    "src": { "main.py": "print(1)\n", "lib": {} },
                    "README.md": "# demo"
                }),
                base_dir: "demo".into(),
            },
        )
        .await
        .unwrap();

        let root = sandbox.root();
        assert_eq!(
            std::fs::read_to_string(root.join("demo/src/main.py")).unwrap(),
            "print(1)\n"
        );
        assert!(root.join("demo/src/lib").is_dir());
        assert_eq!(result["base_directory"], "demo");

        let structure = result["structure"].as_array().unwrap();
        let src = structure.iter().find(|i| i["name"] == "src").unwrap();
        assert_eq!(src["type"], "directory");
        assert_eq!(src["path"], "demo/src");
        let readme = structure.iter().find(|i| i["name"] == "README.md").unwrap();
        assert_eq!(readme["type"], "file");
        assert_eq!(readme["size"], 6);
    }

    #[tokio::test]
    async fn non_object_structure_is_rejected() {
        let (_dir, sandbox) = testing::sandbox().await;
        let error = run(
            &sandbox,
            CreateProjectArgs {
                structure: json!(["a", "b"]),
                base_dir: ".".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(error.category(), ToolErrorCategory::Validation);
    }

    #[tokio::test]
    async fn bad_leaf_writes_nothing() {
        let (_dir, sandbox) = testing::sandbox().await;
        let error = run(
            &sandbox,
            CreateProjectArgs {
                structure: json!({ "a.txt": "ok", "b": { "c.txt": 42 } }),
                base_dir: "proj".into(),
            },
        )
        .await
        .unwrap_err();

        assert_eq!(error.category(), ToolErrorCategory::Validation);
        assert!(error.to_string().contains("c.txt"));
        assert!(!sandbox.root().join("proj").exists());
    }

    #[tokio::test]
    async fn parent_dir_names_are_rejected() {
        let (_dir, sandbox) = testing::sandbox().await;
        let error = run(
            &sandbox,
            CreateProjectArgs {
                structure: json!({ "../escape.txt": "x" }),
                base_dir: ".".into(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(error.category(), ToolErrorCategory::Validation);
    }
}
