//! Variable interpolation for tool argument templates.
//!
//! Supports variables like:
//! - `${input}` - Input file of the current invocation
//! - `${output}` - Output file of the current invocation
//! - `${variant}` - Full variant (e.g. `release-main`)
//! - `${target}` - Variant name segment (e.g. `main`)
//! - `${mode}` - `release` or `debug`
//! - `${bundle}` - Bundle file name
//! - `${config}` - Test runner configuration file
//! - `${env.VAR_NAME}` - Environment variable
//! - `${timestamp}` - Unix timestamp
//! - `${date}` - ISO date (YYYY-MM-DD)

use crate::options::ToolCommand;
use frontforge_core::Variant;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Variables available to a tool invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolVariables {
    pub input: Option<String>,
    pub output: Option<String>,
    pub variant: Option<Variant>,
    pub bundle: Option<String>,
    pub config: Option<String>,
    /// Environment variables
    pub env: HashMap<String, String>,
    /// Custom variables
    pub custom: HashMap<String, String>,
}

// Regex for matching ${...} variables
static VAR_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z_][a-zA-Z0-9_]*)?)\}").unwrap()
});

impl ToolVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate environment variables from the current process environment.
    pub fn populate_env(&mut self) {
        for (key, value) in std::env::vars() {
            self.env.insert(key, value);
        }
    }

    /// Add a custom variable.
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.custom.insert(name.to_string(), value.into());
    }

    /// Resolve a variable name to its value.
    pub fn resolve(&self, var_name: &str) -> Option<String> {
        let parts: Vec<&str> = var_name.split('.').collect();

        match parts.as_slice() {
            ["input"] => self.input.clone(),
            ["output"] => self.output.clone(),
            ["variant"] => self.variant.as_ref().map(|v| v.to_string()),
            ["target"] => self.variant.as_ref().map(|v| v.name().to_string()),
            ["mode"] => self.variant.as_ref().map(|v| v.mode().to_string()),
            ["bundle"] => self.bundle.clone(),
            ["config"] => self.config.clone(),

            ["env", name] => self.env.get(*name).cloned(),

            ["timestamp"] => Some(chrono::Utc::now().timestamp().to_string()),
            ["date"] => Some(chrono::Utc::now().format("%Y-%m-%d").to_string()),

            [name] => self.custom.get(*name).cloned(),

            _ => None,
        }
    }

    /// Interpolate all variables in a string. Unknown variables are kept
    /// verbatim.
    pub fn interpolate(&self, input: &str) -> String {
        VAR_REGEX
            .replace_all(input, |caps: &regex::Captures| {
                let var_name = &caps[1];
                self.resolve(var_name)
                    .unwrap_or_else(|| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    /// Interpolate variables in a list of strings.
    pub fn interpolate_vec(&self, inputs: &[String]) -> Vec<String> {
        inputs.iter().map(|s| self.interpolate(s)).collect()
    }

    /// Render a command template into a program and its arguments.
    pub fn render(&self, command: &ToolCommand) -> (String, Vec<String>) {
        (
            self.interpolate(&command.program),
            self.interpolate_vec(&command.args),
        )
    }
}

/// Builder for [`ToolVariables`].
#[derive(Debug, Default)]
pub struct ToolVariablesBuilder {
    vars: ToolVariables,
}

impl ToolVariablesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.vars.input = Some(input.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.vars.output = Some(output.into());
        self
    }

    pub fn with_variant(mut self, variant: &Variant) -> Self {
        self.vars.variant = Some(variant.clone());
        self
    }

    pub fn with_bundle(mut self, bundle: impl Into<String>) -> Self {
        self.vars.bundle = Some(bundle.into());
        self
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.vars.config = Some(config.into());
        self
    }

    pub fn with_env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.env.insert(key.to_string(), value.into());
        self
    }

    /// Add a custom variable, available as `${name}`.
    pub fn with_var(mut self, name: &str, value: impl Into<String>) -> Self {
        self.vars.set(name, value);
        self
    }

    pub fn with_process_env(mut self) -> Self {
        self.vars.populate_env();
        self
    }

    pub fn build(self) -> ToolVariables {
        self.vars
    }
}
