//! Pluggable spec linters and the task that stores their reports.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use apireg_engine::Registry;
use apireg_models::ArtifactMessage;
use apireg_types::{ArtifactParent, SpecRevisionName};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::TaskContext;
use crate::error::{TaskError, TaskResult};
use crate::pool::Task;
use crate::blocking;

pub const REPORT_MIME_TYPE: &str = "application/json";

/// One finding reported by a linter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintProblem {
    pub rule_id: String,
    pub message: String,
    /// 1-based line, or 0 for findings about the whole document.
    pub line: usize,
}

/// Stored as the `lint-{linter}` artifact of a spec revision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintReport {
    pub linter: String,
    pub spec: String,
    pub file: String,
    pub problems: Vec<LintProblem>,
}

/// A linter runnable over spec contents.
pub trait Linter: Send + Sync {
    fn name(&self) -> &str;

    fn supports_mime_type(&self, mime_type: &str) -> bool;

    /// Lint `contents`, restricted to `rules` unless it is empty.
    fn lint_spec(&self, contents: &[u8], rules: &[String]) -> TaskResult<Vec<LintProblem>>;
}

/// Line-oriented checks for any text spec.
#[derive(Clone, Debug)]
pub struct TextLinter {
    pub max_line_length: usize,
}

impl TextLinter {
    pub const NAME: &'static str = "text";
    pub const RULES: &'static [&'static str] = &[
        "no-empty-contents",
        "no-tabs",
        "no-trailing-whitespace",
        "max-line-length",
    ];
}

impl Default for TextLinter {
    fn default() -> Self {
        Self { max_line_length: 200 }
    }
}

impl Linter for TextLinter {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn supports_mime_type(&self, mime_type: &str) -> bool {
        mime_type.is_empty()
            || mime_type.starts_with("text/")
            || ["yaml", "json", "xml", "graphql", "openapi", "protobuf"]
                .iter()
                .any(|kind| mime_type.contains(kind))
    }

    fn lint_spec(&self, contents: &[u8], rules: &[String]) -> TaskResult<Vec<LintProblem>> {
        if let Some(unknown) = rules.iter().find(|r| !Self::RULES.contains(&r.as_str())) {
            return Err(TaskError::Lint {
                linter: Self::NAME.to_string(),
                reason: format!("unknown rule {unknown:?}"),
            });
        }
        let enabled = |rule: &str| rules.is_empty() || rules.iter().any(|r| r == rule);
        let text = std::str::from_utf8(contents).map_err(|e| TaskError::Lint {
            linter: Self::NAME.to_string(),
            reason: format!("contents are not UTF-8: {e}"),
        })?;

        let mut problems = Vec::new();
        if text.trim().is_empty() {
            if enabled("no-empty-contents") {
                problems.push(LintProblem {
                    rule_id: "no-empty-contents".into(),
                    message: "document is empty".into(),
                    line: 0,
                });
            }
            return Ok(problems);
        }
        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            if enabled("no-tabs") && line.contains('\t') {
                problems.push(LintProblem {
                    rule_id: "no-tabs".into(),
                    message: "line contains a tab character".into(),
                    line: line_no,
                });
            }
            if enabled("no-trailing-whitespace") && line.ends_with([' ', '\t']) {
                problems.push(LintProblem {
                    rule_id: "no-trailing-whitespace".into(),
                    message: "line ends with whitespace".into(),
                    line: line_no,
                });
            }
            let width = line.chars().count();
            if enabled("max-line-length") && width > self.max_line_length {
                problems.push(LintProblem {
                    rule_id: "max-line-length".into(),
                    message: format!("line is {width} characters, limit is {}", self.max_line_length),
                    line: line_no,
                });
            }
        }
        Ok(problems)
    }
}

/// Linters available to lint and conformance tasks, by name.
#[derive(Clone, Default)]
pub struct Linters {
    by_name: BTreeMap<String, Arc<dyn Linter>>,
}

impl Linters {
    /// The in-process linters shipped with the registry.
    pub fn builtin() -> Self {
        let mut linters = Self::default();
        linters.register(TextLinter::default());
        linters
    }

    pub fn register(&mut self, linter: impl Linter + 'static) {
        self.by_name.insert(linter.name().to_string(), Arc::new(linter));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Linter>> {
        self.by_name.get(name).cloned()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }
}

impl fmt::Debug for Linters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.by_name.keys()).finish()
    }
}

/// Runs one linter over a spec revision and replaces its `lint-{linter}` artifact.
pub struct LintTask {
    registry: Registry,
    spec: SpecRevisionName,
    linter: Arc<dyn Linter>,
}

impl LintTask {
    pub fn new(registry: Registry, spec: SpecRevisionName, linter: Arc<dyn Linter>) -> Self {
        Self { registry, spec, linter }
    }

    pub fn artifact_id(linter: &str) -> String {
        format!("lint-{linter}")
    }
}

impl fmt::Display for LintTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compute {}/artifacts/{}", self.spec, Self::artifact_id(self.linter.name()))
    }
}

#[async_trait]
impl Task for LintTask {
    async fn run(&self, ctx: &TaskContext) -> TaskResult<()> {
        ctx.check()?;
        let name = self.spec.clone();
        let (spec, contents) = blocking(&self.registry, move |r| {
            Ok((r.get_spec(&name)?, r.get_spec_contents(&name, false)?))
        })
        .await?;
        if !self.linter.supports_mime_type(&contents.mime_type) {
            debug!(spec = %self.spec, mime_type = %contents.mime_type, linter = self.linter.name(), "unsupported, skipped");
            return Ok(());
        }
        ctx.check()?;

        let report = LintReport {
            linter: self.linter.name().to_string(),
            spec: self.spec.to_string(),
            file: spec.filename,
            problems: self.linter.lint_spec(&contents.data, &[])?,
        };
        let artifact = ArtifactMessage {
            name: ArtifactParent::Spec(self.spec.clone())
                .artifact(Self::artifact_id(self.linter.name()))
                .to_string(),
            mime_type: REPORT_MIME_TYPE.to_string(),
            contents: serde_json::to_vec(&report)?,
            ..Default::default()
        };
        blocking(&self.registry, move |r| r.replace_artifact(&artifact)).await?;
        debug!(spec = %self.spec, problems = report.problems.len(), "lint report stored");
        Ok(())
    }
}
