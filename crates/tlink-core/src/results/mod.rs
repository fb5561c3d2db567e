//! Result tree produced by a finished test run.
//!
//! Leaves are individual test cases; every other node (assembly, namespace,
//! fixture) only groups its children.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while reading a result file.
#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// How a test finished, as reported by the test framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultState {
    Success,
    Failure,
    Error,
    Skipped,
    Ignored,
    NotRunnable,
}

/// One node of the result tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultNode {
    /// Short name; for a parameterised case, the parameterised display name.
    pub name: String,

    /// Qualifying name, e.g. `Acme.Tests.LoginTests.RejectsBadPassword`.
    pub full_name: String,

    /// Name of the test method, when it differs from `name`.
    #[serde(default)]
    pub method_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    pub state: ResultState,

    /// Failure message.
    #[serde(default)]
    pub message: Option<String>,

    /// Captured console output of this test.
    #[serde(default)]
    pub output: Option<String>,

    #[serde(default)]
    pub children: Vec<TestResultNode>,
}

impl TestResultNode {
    /// Creates a leaf whose method name equals its name.
    pub fn leaf(full_name: impl Into<String>, state: ResultState) -> Self {
        let full_name = full_name.into();
        let name = full_name
            .rsplit('.')
            .next()
            .unwrap_or(full_name.as_str())
            .to_string();
        Self {
            name,
            full_name,
            method_name: None,
            description: None,
            state,
            message: None,
            output: None,
            children: Vec::new(),
        }
    }

    /// Creates a grouping node.
    pub fn group(full_name: impl Into<String>, children: Vec<TestResultNode>) -> Self {
        let full_name = full_name.into();
        Self {
            name: full_name.clone(),
            full_name,
            method_name: None,
            description: None,
            state: ResultState::Success,
            message: None,
            output: None,
            children,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_method_name(mut self, method_name: impl Into<String>) -> Self {
        self.method_name = Some(method_name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of leaves below (or at) this node.
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(TestResultNode::leaf_count).sum()
        }
    }

    /// The fixture owning this test: the qualifying name without its last
    /// segment. Empty when there is nothing before the last dot.
    pub fn fixture_name(&self) -> &str {
        match self.full_name.rfind('.') {
            Some(index) if index >= 1 => &self.full_name[..index],
            _ => "",
        }
    }

    /// Name the test case is recorded under.
    ///
    /// Parameterised cases only carry the parameter text in `name`, so the
    /// method name is prepended when the two differ.
    pub fn test_case_name(&self) -> String {
        match &self.method_name {
            Some(method) if *method != self.name => format!("{}.{}", method, self.name),
            _ => self.name.clone(),
        }
    }

    /// Reads a result tree from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ResultsError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Ok(serde_yaml::from_str(&content)?),
            _ => Ok(serde_json::from_str(&content)?),
        }
    }
}

/// Joins failure message and captured output into execution notes.
pub fn build_notes(message: Option<&str>, output: Option<&str>) -> String {
    let mut notes = String::new();
    for part in [message, output].into_iter().flatten() {
        notes.push_str(part);
        if !part.ends_with('\n') {
            notes.push('\n');
        }
    }
    notes
}
