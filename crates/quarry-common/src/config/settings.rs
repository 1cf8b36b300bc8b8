//! Quarry configuration structures.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_ALIAS_PREFIX, DEFAULT_DIALECT, SUPPORTED_DIALECTS};
use crate::error::{ConfigError, ConfigResult};

/// When identifiers are wrapped in the dialect's quote characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierQuoting {
    /// Quote every identifier.
    #[default]
    Always,
    /// Quote only reserved words, non-simple names, and names whose case
    /// differs from the dialect's folding.
    AsNeeded,
}

/// SQL compiler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Target dialect name (`ansi`, `snowflake`, `postgres`, `mysql`, `mssql`).
    #[serde(default = "default_dialect")]
    pub dialect: String,

    /// Emit literals as placeholders and return them as parameters.
    #[serde(default)]
    pub parameterize_literals: bool,

    /// Identifier quoting policy.
    #[serde(default)]
    pub identifier_quoting: IdentifierQuoting,

    /// Prefix for generated derived-table aliases.
    #[serde(default = "default_alias_prefix")]
    pub alias_prefix: String,
}

fn default_dialect() -> String {
    DEFAULT_DIALECT.to_string()
}

fn default_alias_prefix() -> String {
    DEFAULT_ALIAS_PREFIX.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            dialect: default_dialect(),
            parameterize_literals: false,
            identifier_quoting: IdentifierQuoting::default(),
            alias_prefix: default_alias_prefix(),
        }
    }
}

impl CompilerConfig {
    /// Validates the compiler section.
    pub fn validate(&self) -> ConfigResult<()> {
        let dialect = self.dialect.to_ascii_lowercase();
        if !SUPPORTED_DIALECTS.contains(&dialect.as_str()) {
            return Err(ConfigError::invalid(
                "compiler.dialect",
                format!(
                    "unknown dialect '{}', expected one of {}",
                    self.dialect,
                    SUPPORTED_DIALECTS.join(", ")
                ),
            ));
        }

        let mut chars = self.alias_prefix.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() => {}
            _ => {
                return Err(ConfigError::invalid(
                    "compiler.alias_prefix",
                    "must start with an ASCII letter",
                ))
            }
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::invalid(
                "compiler.alias_prefix",
                "may only contain ASCII letters, digits and underscores",
            ));
        }

        Ok(())
    }
}

/// Optimizer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizerSettings {
    /// Run the optimizer before compiling.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Enable projection pruning.
    #[serde(default = "default_true")]
    pub projection_pruning: bool,

    /// Enable predicate simplification.
    #[serde(default = "default_true")]
    pub predicate_simplification: bool,

    /// Enable projection merging.
    #[serde(default = "default_true")]
    pub projection_merge: bool,

    /// Upper bound on rule passes; `None` means tree depth + 1.
    #[serde(default)]
    pub max_iterations: Option<usize>,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            projection_pruning: true,
            predicate_simplification: true,
            projection_merge: true,
            max_iterations: None,
        }
    }
}

impl OptimizerSettings {
    /// Validates the optimizer section.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_iterations == Some(0) {
            return Err(ConfigError::invalid(
                "optimizer.max_iterations",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Check every returned row against the resolved schema.
    #[serde(default = "default_true")]
    pub validate_results: bool,

    /// Log every statement sent to the adapter at info level.
    #[serde(default)]
    pub log_statements: bool,

    /// Stop reading rows after this many; `None` reads everything.
    #[serde(default)]
    pub max_rows: Option<usize>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            validate_results: true,
            log_statements: false,
            max_rows: None,
        }
    }
}

/// Top-level quarry configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuarryConfig {
    /// Compiler section.
    #[serde(default)]
    pub compiler: CompilerConfig,

    /// Optimizer section.
    #[serde(default)]
    pub optimizer: OptimizerSettings,

    /// Session section.
    #[serde(default)]
    pub session: SessionSettings,
}

impl QuarryConfig {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Loads configuration from a file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml()?;
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        std::fs::write(path, content).map_err(io_err)
    }

    /// Converts configuration to TOML string.
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Validates every section.
    pub fn validate(&self) -> ConfigResult<()> {
        self.compiler.validate()?;
        self.optimizer.validate()
    }

    /// Creates a builder for configuration.
    #[must_use]
    pub fn builder() -> QuarryConfigBuilder {
        QuarryConfigBuilder::new()
    }
}

/// Builder for quarry configuration.
#[derive(Debug, Default)]
pub struct QuarryConfigBuilder {
    config: QuarryConfig,
}

impl QuarryConfigBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the target dialect.
    #[must_use]
    pub fn dialect(mut self, dialect: impl Into<String>) -> Self {
        self.config.compiler.dialect = dialect.into();
        self
    }

    /// Enables literal parameterization.
    #[must_use]
    pub fn parameterize_literals(mut self, enabled: bool) -> Self {
        self.config.compiler.parameterize_literals = enabled;
        self
    }

    /// Sets the identifier quoting policy.
    #[must_use]
    pub fn identifier_quoting(mut self, quoting: IdentifierQuoting) -> Self {
        self.config.compiler.identifier_quoting = quoting;
        self
    }

    /// Sets the derived-table alias prefix.
    #[must_use]
    pub fn alias_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.compiler.alias_prefix = prefix.into();
        self
    }

    /// Enables or disables the optimizer as a whole.
    #[must_use]
    pub fn optimize(mut self, enabled: bool) -> Self {
        self.config.optimizer.enabled = enabled;
        self
    }

    /// Replaces the optimizer section.
    #[must_use]
    pub fn optimizer(mut self, settings: OptimizerSettings) -> Self {
        self.config.optimizer = settings;
        self
    }

    /// Enables result validation.
    #[must_use]
    pub fn validate_results(mut self, enabled: bool) -> Self {
        self.config.session.validate_results = enabled;
        self
    }

    /// Enables statement logging.
    #[must_use]
    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.config.session.log_statements = enabled;
        self
    }

    /// Caps the number of rows read per action.
    #[must_use]
    pub fn max_rows(mut self, max: usize) -> Self {
        self.config.session.max_rows = Some(max);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> QuarryConfig {
        self.config
    }
}
