use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// External command template.
///
/// `args` and `env` values may reference `{job}`, `{slot}` and `{stage}`;
/// they are substituted per invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Executable name or path.
    pub program: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    /// Arguments, with placeholders expanded per invocation.
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    /// Extra environment, with placeholders expanded per invocation.
    pub env: BTreeMap<String, String>,
}

impl CommandSpec {
    /// Command with no arguments or extra environment.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Replaces the argument list.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Adds one environment variable.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Anchors a relative program path such as `R/generate.R` at `base`.
    ///
    /// Bare names (`Rscript`) are left for `PATH` lookup. Child processes run
    /// with a job or slot directory as cwd, so relative paths must be fixed
    /// before dispatch.
    pub fn resolve_against(&self, base: &Path) -> Self {
        let program = Path::new(&self.program);
        let mut resolved = self.clone();
        if program.is_relative() && program.components().count() > 1 {
            resolved.program = base.join(program).to_string_lossy().into_owned();
        }
        resolved
    }
}

/// Placeholder values for one invocation.
#[derive(Debug, Clone, Default)]
pub(crate) struct Vars<'a> {
    pub job: &'a str,
    pub slot: Option<&'a str>,
    pub stage: &'a str,
}

impl Vars<'_> {
    pub fn expand(&self, template: &str) -> String {
        template
            .replace("{job}", self.job)
            .replace("{slot}", self.slot.unwrap_or(""))
            .replace("{stage}", self.stage)
    }

    pub fn env(&self) -> Vec<(&'static str, String)> {
        let mut env = vec![
            ("GSW_JOB_ID", self.job.to_string()),
            ("GSW_STAGE", self.stage.to_string()),
        ];
        if let Some(slot) = self.slot {
            env.push(("GSW_SLOT", slot.to_string()));
        }
        env
    }
}
