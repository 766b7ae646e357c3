use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category of a verification step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Lint,
    Typecheck,
    Compile,
    Build,
    Test,
    Format,
    Audit,
    #[default]
    Custom,
}

impl StepKind {
    pub const ALL: [StepKind; 8] = [
        StepKind::Lint,
        StepKind::Typecheck,
        StepKind::Compile,
        StepKind::Build,
        StepKind::Test,
        StepKind::Format,
        StepKind::Audit,
        StepKind::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Lint => "lint",
            StepKind::Typecheck => "typecheck",
            StepKind::Compile => "compile",
            StepKind::Build => "build",
            StepKind::Test => "test",
            StepKind::Format => "format",
            StepKind::Audit => "audit",
            StepKind::Custom => "custom",
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for StepKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown step kind '{s}'"))
    }
}

/// Immutable definition of one runnable step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: String,

    /// Display name; falls back to `id` when empty.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub kind: StepKind,

    pub command: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// Environment overrides applied on top of the inherited environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    #[serde(default)]
    pub cwd: Option<PathBuf>,

    /// 0 means no task-specific limit; the engine default still applies.
    #[serde(default)]
    pub timeout_ms: u64,

    #[serde(default)]
    pub max_retries: u32,

    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl TaskSpec {
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            kind: StepKind::Custom,
            command: command.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
            timeout_ms: 0,
            max_retries: 0,
            dependencies: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_kind(mut self, kind: StepKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let spec: TaskSpec = toml::from_str(
            r#"
            id = "lint"
            command = "eslint"
            args = ["src"]
            "#,
        )
        .unwrap();
        assert_eq!(spec.kind, StepKind::Custom);
        assert_eq!(spec.timeout_ms, 0);
        assert_eq!(spec.max_retries, 0);
        assert!(spec.dependencies.is_empty());
        assert_eq!(spec.display_name(), "lint");
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let res: Result<TaskSpec, _> = toml::from_str(
            r#"
            id = "x"
            command = "true"
            kind = "deploy"
            "#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn step_kind_parses_case_insensitively() {
        assert_eq!("TypeCheck".parse::<StepKind>().unwrap(), StepKind::Typecheck);
        assert!("unknown".parse::<StepKind>().is_err());
    }
}
