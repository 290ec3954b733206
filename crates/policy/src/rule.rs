//! Compiled policy rules

use execgate_config::constants::MAX_TIMEOUT_SECS;
use execgate_config::{ArgSpec, RuleConfig};
use execgate_errors::{ConfigError, Error};
use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use std::fmt;
use std::time::Duration;

/// Allowed shape of a single argument
#[derive(Debug, Clone)]
pub enum ArgPattern {
    /// `*`: any single argument
    Any,
    /// `**`: any number of remaining arguments (last position only)
    Rest,
    Exact(String),
    Prefix(String),
    /// Anchored to the whole argument
    Regex(Regex),
}

impl ArgPattern {
    fn compile(spec: &ArgSpec) -> Result<Self, String> {
        Ok(match spec {
            ArgSpec::Literal(value) if value == "*" => Self::Any,
            ArgSpec::Literal(value) if value == "**" => Self::Rest,
            ArgSpec::Literal(value) | ArgSpec::Exact { exact: value } => Self::Exact(value.clone()),
            ArgSpec::Prefix { prefix } => Self::Prefix(prefix.clone()),
            ArgSpec::Regex { regex } => Self::Regex(
                Regex::new(&format!("^(?:{regex})$"))
                    .map_err(|e| format!("invalid regex {regex:?}: {e}"))?,
            ),
        })
    }

    /// Whether `arg` satisfies this shape (`Rest` accepts anything)
    #[must_use]
    pub fn matches(&self, arg: &str) -> bool {
        match self {
            Self::Any | Self::Rest => true,
            Self::Exact(expected) => arg == expected,
            Self::Prefix(prefix) => arg.starts_with(prefix.as_str()),
            Self::Regex(re) => re.is_match(arg),
        }
    }
}

impl fmt::Display for ArgPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Rest => write!(f, "**"),
            Self::Exact(value) => write!(f, "{value:?}"),
            Self::Prefix(prefix) => write!(f, "prefix {prefix:?}"),
            Self::Regex(re) => write!(f, "regex {}", re.as_str()),
        }
    }
}

/// Program path matcher: exact absolute path or glob
#[derive(Debug, Clone)]
pub enum ProgramMatcher {
    Exact(String),
    Glob { pattern: String, matcher: GlobMatcher },
}

impl ProgramMatcher {
    fn compile(pattern: &str) -> Result<Self, String> {
        if pattern.is_empty() {
            return Err("program pattern is empty".to_string());
        }
        if !pattern.starts_with('/') {
            return Err("program path must be absolute".to_string());
        }
        if pattern.split('/').any(|segment| segment == ".." || segment == ".") {
            return Err("program path must not contain '.' or '..' segments".to_string());
        }

        if pattern.contains(['*', '?', '[', '{']) {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| format!("invalid glob: {e}"))?;
            Ok(Self::Glob {
                pattern: pattern.to_string(),
                matcher: glob.compile_matcher(),
            })
        } else {
            Ok(Self::Exact(pattern.to_string()))
        }
    }

    #[must_use]
    pub fn matches(&self, program: &str) -> bool {
        match self {
            Self::Exact(path) => path == program,
            Self::Glob { matcher, .. } => matcher.is_match(program),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact(path) => path,
            Self::Glob { pattern, .. } => pattern,
        }
    }
}

/// Where an argument vector first diverged from a rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgMismatch {
    pub position: usize,
    pub detail: String,
}

/// One allow rule, compiled
#[derive(Debug, Clone)]
pub struct PolicyRule {
    /// Position in the policy file (0-based); first match wins
    pub index: usize,
    pub program: ProgramMatcher,
    pub args: Vec<ArgPattern>,
    pub timeout_ceiling: Option<Duration>,
    pub description: Option<String>,
}

impl PolicyRule {
    /// Compile the raw rule at `index`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRule` for a bad program pattern, regex,
    /// misplaced `**`, or a timeout ceiling of zero or above one day.
    pub fn compile(index: usize, raw: &RuleConfig) -> Result<Self, Error> {
        let fail = |message: String| -> Error {
            ConfigError::InvalidRule {
                index,
                program: raw.program.clone(),
                message,
            }
            .into()
        };

        let program = ProgramMatcher::compile(&raw.program).map_err(fail)?;

        let args = raw
            .args
            .iter()
            .map(ArgPattern::compile)
            .collect::<Result<Vec<_>, _>>()
            .map_err(fail)?;

        if let Some(pos) = args.iter().position(|p| matches!(p, ArgPattern::Rest)) {
            if pos + 1 != args.len() {
                return Err(fail(format!(
                    "'**' must be the last argument pattern (found at {pos})"
                )));
            }
        }

        let timeout_ceiling = match raw.timeout_ceiling_secs {
            Some(0) => return Err(fail("timeout_ceiling_secs must be positive".to_string())),
            Some(secs) if secs > MAX_TIMEOUT_SECS => {
                return Err(fail(format!(
                    "timeout_ceiling_secs must not exceed {MAX_TIMEOUT_SECS}"
                )))
            }
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        Ok(Self {
            index,
            program,
            args,
            timeout_ceiling,
            description: raw.description.clone(),
        })
    }

    /// Check an argument vector against this rule's shapes
    ///
    /// # Errors
    ///
    /// Returns the first position that does not fit.
    pub fn check_args(&self, args: &[String]) -> Result<(), ArgMismatch> {
        for (position, pattern) in self.args.iter().enumerate() {
            if matches!(pattern, ArgPattern::Rest) {
                return Ok(());
            }
            match args.get(position) {
                None => {
                    return Err(ArgMismatch {
                        position,
                        detail: format!("missing argument, expected {pattern}"),
                    })
                }
                Some(arg) if !pattern.matches(arg) => {
                    return Err(ArgMismatch {
                        position,
                        detail: format!("expected {pattern}"),
                    })
                }
                Some(_) => {}
            }
        }

        if args.len() > self.args.len() {
            return Err(ArgMismatch {
                position: self.args.len(),
                detail: format!("rule allows at most {} argument(s)", self.args.len()),
            });
        }
        Ok(())
    }
}
