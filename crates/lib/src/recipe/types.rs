use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Raw recipe as written in a TOML file, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecipeDef {
  pub id: String,
  pub description: String,
  pub homepage: String,
  pub url: String,
  pub sha256: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub version: Option<String>,
  #[serde(default)]
  pub depends_on: Vec<String>,
  pub install: Vec<StepTemplate>,
}

/// One install step whose strings may still contain placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepTemplate {
  pub program: String,
  #[serde(default)]
  pub args: Vec<String>,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub env: BTreeMap<String, String>,
}

impl StepTemplate {
  pub fn new(program: &str, args: &[&str]) -> Self {
    Self {
      program: program.to_string(),
      args: args.iter().map(|a| a.to_string()).collect(),
      env: BTreeMap::new(),
    }
  }

  pub fn with_env(mut self, key: &str, value: &str) -> Self {
    self.env.insert(key.to_string(), value.to_string());
    self
  }

  /// Every template string of the step, in program, args, env order.
  pub fn strings(&self) -> impl Iterator<Item = &str> {
    std::iter::once(self.program.as_str())
      .chain(self.args.iter().map(String::as_str))
      .chain(self.env.values().map(String::as_str))
  }
}
