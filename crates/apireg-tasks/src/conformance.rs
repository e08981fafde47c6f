//! Style guides and conformance reports.
//!
//! A style guide groups linter rules into guidelines. Conformance runs every
//! linter a guide references over a spec revision and files each problem
//! under the guideline and severity of the rule that reported it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use apireg_engine::Registry;
use apireg_models::ArtifactMessage;
use apireg_types::{validate_identifier, ArtifactParent, SpecRevisionName};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::blocking;
use crate::context::TaskContext;
use crate::error::{TaskError, TaskResult};
use crate::lint::{Linters, REPORT_MIME_TYPE};
use crate::pool::Task;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidelineState {
    Proposed,
    #[default]
    Active,
    Deprecated,
    Disabled,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Hint => "hint",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub linter: String,
    pub linter_rulename: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guideline {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub state: GuidelineState,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleGuide {
    pub id: String,
    #[serde(default)]
    pub display_name: String,
    /// MIME types the guide applies to; empty applies to all.
    #[serde(default)]
    pub mime_types: Vec<String>,
    #[serde(default)]
    pub guidelines: Vec<Guideline>,
}

impl StyleGuide {
    pub fn from_toml(source: &str) -> TaskResult<Self> {
        let guide: Self = toml::from_str(source).map_err(|e| TaskError::StyleGuide(e.to_string()))?;
        guide.validate()?;
        Ok(guide)
    }

    pub fn load(path: &Path) -> TaskResult<Self> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> TaskResult<()> {
        validate_identifier(&self.id).map_err(|e| TaskError::StyleGuide(e.to_string()))?;
        for guideline in &self.guidelines {
            if guideline.id.is_empty() {
                return Err(TaskError::StyleGuide(format!("{}: guideline without id", self.id)));
            }
            for rule in &guideline.rules {
                if rule.linter.is_empty() || rule.linter_rulename.is_empty() {
                    return Err(TaskError::StyleGuide(format!(
                        "{}/{}: rule {:?} needs linter and linter_rulename",
                        self.id, guideline.id, rule.id
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn applies_to(&self, mime_type: &str) -> bool {
        self.mime_types.is_empty() || self.mime_types.iter().any(|m| mime_type.starts_with(m.as_str()))
    }

    /// Linter rule names per linter, over guidelines that are not disabled.
    fn rules_by_linter(&self) -> BTreeMap<&str, Vec<String>> {
        let mut by_linter: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for rule in self.enabled_rules().map(|(_, r)| r) {
            let rules = by_linter.entry(rule.linter.as_str()).or_default();
            if !rules.contains(&rule.linter_rulename) {
                rules.push(rule.linter_rulename.clone());
            }
        }
        by_linter
    }

    fn enabled_rules(&self) -> impl Iterator<Item = (&Guideline, &Rule)> {
        self.guidelines
            .iter()
            .filter(|g| g.state != GuidelineState::Disabled)
            .flat_map(|g| g.rules.iter().map(move |r| (g, r)))
    }

    fn find_rule(&self, linter: &str, linter_rule: &str) -> Vec<(&Guideline, &Rule)> {
        self.enabled_rules()
            .filter(|(_, r)| r.linter == linter && r.linter_rulename == linter_rule)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleReport {
    pub rule_id: String,
    pub severity: Severity,
    pub linter: String,
    pub linter_rulename: String,
    pub message: String,
    pub line: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidelineReport {
    pub guideline_id: String,
    pub state: GuidelineState,
    /// Violation counts keyed by severity.
    pub counts: BTreeMap<String, usize>,
    pub rule_reports: Vec<RuleReport>,
}

/// Stored as the `conformance-{styleguide}` artifact of a spec revision.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConformanceReport {
    pub id: String,
    pub styleguide: String,
    pub spec: String,
    pub guideline_reports: Vec<GuidelineReport>,
}

impl ConformanceReport {
    pub fn violations(&self) -> usize {
        self.guideline_reports.iter().map(|g| g.rule_reports.len()).sum()
    }
}

pub struct ConformanceTask {
    registry: Registry,
    spec: SpecRevisionName,
    guide: Arc<StyleGuide>,
    linters: Linters,
}

impl ConformanceTask {
    pub fn new(registry: Registry, spec: SpecRevisionName, guide: Arc<StyleGuide>, linters: Linters) -> Self {
        Self {
            registry,
            spec,
            guide,
            linters,
        }
    }

    pub fn artifact_id(styleguide: &str) -> String {
        format!("conformance-{styleguide}")
    }

    /// Run the guide's linters over `contents`. A missing or failing linter
    /// is logged and skipped so the others still contribute.
    pub fn evaluate(&self, contents: &[u8], mime_type: &str) -> ConformanceReport {
        let mut reports: Vec<GuidelineReport> = Vec::new();
        for (linter_name, rules) in self.guide.rules_by_linter() {
            let Some(linter) = self.linters.get(linter_name) else {
                warn!(styleguide = %self.guide.id, linter = linter_name, "linter not available");
                continue;
            };
            if !linter.supports_mime_type(mime_type) {
                continue;
            }
            let problems = match linter.lint_spec(contents, &rules) {
                Ok(problems) => problems,
                Err(err) => {
                    error!(spec = %self.spec, linter = linter_name, error = %err, "linter failed");
                    continue;
                }
            };
            for problem in problems {
                for (guideline, rule) in self.guide.find_rule(linter_name, &problem.rule_id) {
                    let index = match reports.iter().position(|r| r.guideline_id == guideline.id) {
                        Some(i) => i,
                        None => {
                            reports.push(GuidelineReport {
                                guideline_id: guideline.id.clone(),
                                state: guideline.state,
                                counts: BTreeMap::new(),
                                rule_reports: Vec::new(),
                            });
                            reports.len() - 1
                        }
                    };
                    let report = &mut reports[index];
                    *report.counts.entry(rule.severity.as_str().to_string()).or_default() += 1;
                    report.rule_reports.push(RuleReport {
                        rule_id: rule.id.clone(),
                        severity: rule.severity,
                        linter: linter_name.to_string(),
                        linter_rulename: rule.linter_rulename.clone(),
                        message: problem.message.clone(),
                        line: problem.line,
                    });
                }
            }
        }
        // Reports follow guideline order in the guide.
        reports.sort_by_key(|r| {
            self.guide
                .guidelines
                .iter()
                .position(|g| g.id == r.guideline_id)
        });
        ConformanceReport {
            id: Self::artifact_id(&self.guide.id),
            styleguide: format!(
                "projects/{}/locations/global/artifacts/{}",
                self.spec.spec.project_id, self.guide.id
            ),
            spec: self.spec.to_string(),
            guideline_reports: reports,
        }
    }
}

impl fmt::Display for ConformanceTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compute {}/artifacts/{}", self.spec, Self::artifact_id(&self.guide.id))
    }
}

#[async_trait]
impl Task for ConformanceTask {
    async fn run(&self, ctx: &TaskContext) -> TaskResult<()> {
        ctx.check()?;
        let name = self.spec.clone();
        let contents = blocking(&self.registry, move |r| r.get_spec_contents(&name, false)).await?;
        if !self.guide.applies_to(&contents.mime_type) {
            debug!(spec = %self.spec, mime_type = %contents.mime_type, "style guide does not apply");
            return Ok(());
        }
        ctx.check()?;

        let report = self.evaluate(&contents.data, &contents.mime_type);
        let artifact = ArtifactMessage {
            name: ArtifactParent::Spec(self.spec.clone())
                .artifact(report.id.clone())
                .to_string(),
            mime_type: REPORT_MIME_TYPE.to_string(),
            contents: serde_json::to_vec(&report)?,
            ..Default::default()
        };
        blocking(&self.registry, move |r| r.replace_artifact(&artifact)).await?;
        debug!(spec = %self.spec, violations = report.violations(), "conformance report stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{registry_with_specs, VERSION};

    const GUIDE: &str = r#"
id = "house-style"
display_name = "House style"

[[guidelines]]
id = "formatting"
rules = [
    { id = "tabs", linter = "text", linter_rulename = "no-tabs", severity = "warning" },
    { id = "trailing", linter = "text", linter_rulename = "no-trailing-whitespace" },
]

[[guidelines]]
id = "width"
state = "disabled"
rules = [
    { id = "width", linter = "text", linter_rulename = "max-line-length" },
]

[[guidelines]]
id = "external"
rules = [
    { id = "naming", linter = "spectral", linter_rulename = "operation-id" },
]
"#;

    fn guide() -> Arc<StyleGuide> {
        Arc::new(StyleGuide::from_toml(GUIDE).unwrap())
    }

    fn task(registry: Registry, spec: SpecRevisionName) -> ConformanceTask {
        ConformanceTask::new(registry, spec, guide(), Linters::builtin())
    }

    #[test]
    fn parses_guide() {
        let guide = guide();
        assert_eq!(guide.guidelines.len(), 3);
        assert_eq!(guide.guidelines[0].rules[0].severity, Severity::Warning);
        assert_eq!(guide.guidelines[0].rules[1].severity, Severity::Error);
        assert_eq!(guide.guidelines[1].state, GuidelineState::Disabled);
    }

    #[test]
    fn rejects_incomplete_rules() {
        let bad = r#"
id = "g"
[[guidelines]]
id = "x"
rules = [{ id = "r", linter = "", linter_rulename = "no-tabs" }]
"#;
        assert!(matches!(StyleGuide::from_toml(bad), Err(TaskError::StyleGuide(_))));
        assert!(StyleGuide::from_toml("id = \"Bad Id\"").is_err());
    }

    #[test]
    fn evaluate_groups_by_guideline_and_severity() {
        let (registry, _) = registry_with_specs(&[]);
        let spec = SpecRevisionName::parse(&format!("{VERSION}/specs/a@r")).unwrap();
        let report = task(registry, spec).evaluate(b"\tone\ntwo \n\tthree \n", "text/plain");
        assert_eq!(report.id, "conformance-house-style");
        assert_eq!(
            report.styleguide,
            "projects/demo/locations/global/artifacts/house-style"
        );
        assert_eq!(report.guideline_reports.len(), 1);
        let formatting = &report.guideline_reports[0];
        assert_eq!(formatting.guideline_id, "formatting");
        assert_eq!(formatting.counts["warning"], 2);
        assert_eq!(formatting.counts["error"], 2);
        assert_eq!(report.violations(), 4);
    }

    #[tokio::test]
    async fn task_stores_report() {
        let (registry, revisions) = registry_with_specs(&["a"]);
        let spec = SpecRevisionName::parse(&format!("{VERSION}/specs/a@{}", revisions[0])).unwrap();
        let task = task(registry.clone(), spec.clone());
        assert!(task.to_string().ends_with("/artifacts/conformance-house-style"));
        task.run(&TaskContext::detached()).await.unwrap();

        let name = ArtifactParent::Spec(spec).artifact("conformance-house-style");
        let stored = registry.get_artifact_contents(&name, false).unwrap();
        let report: ConformanceReport = serde_json::from_slice(&stored.data).unwrap();
        assert_eq!(report.violations(), 1);
        assert_eq!(report.guideline_reports[0].rule_reports[0].rule_id, "trailing");
    }
}
