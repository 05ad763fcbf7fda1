use std::fmt;

use thiserror::Error;

use crate::search::ParseError;

/// Everything that can abort a run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("source `{source_name}` references account `{account}`, which matched {matches} configured accounts (expected exactly one)")]
    AccountNotFound {
        source_name: String,
        account: String,
        matches: usize,
    },

    #[error("source `{source_name}` has unknown type `{kind}`")]
    UnknownSourceType { source_name: String, kind: String },

    #[error("target `{target_name}` has unknown type `{kind}`")]
    UnknownTargetType { target_name: String, kind: String },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("source `{source_name}` failed")]
    Source {
        source_name: String,
        #[source]
        cause: anyhow::Error,
    },

    #[error("target `{target_name}` failed")]
    Target {
        target_name: String,
        #[source]
        cause: anyhow::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn source_failed(source_name: &str, cause: impl Into<anyhow::Error>) -> Self {
        Error::Source {
            source_name: source_name.to_string(),
            cause: cause.into(),
        }
    }

    pub fn target_failed(target_name: &str, cause: impl Into<anyhow::Error>) -> Self {
        Error::Target {
            target_name: target_name.to_string(),
            cause: cause.into(),
        }
    }
}

/// A configuration that could not be loaded, with every problem found.
#[derive(Debug, Error)]
pub struct ConfigError {
    pub origin: String,
    pub problems: Vec<String>,
}

impl ConfigError {
    pub fn new(origin: impl Into<String>, problems: Vec<String>) -> Self {
        Self {
            origin: origin.into(),
            problems,
        }
    }

    pub fn single(origin: impl Into<String>, problem: impl Into<String>) -> Self {
        Self::new(origin, vec![problem.into()])
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.problems.as_slice() {
            [one] => write!(f, "invalid configuration {}: {}", self.origin, one),
            many => {
                write!(
                    f,
                    "invalid configuration {} ({} problems):",
                    self.origin,
                    many.len()
                )?;
                for p in many {
                    write!(f, "\n  - {p}")?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_lists_every_problem() {
        let err = ConfigError::new(
            "~/.mailstat",
            vec!["accounts[0]: missing `host`".into(), "sources[1]: missing `name`".into()],
        );
        assert_eq!(
            err.to_string(),
            "invalid configuration ~/.mailstat (2 problems):\n  - accounts[0]: missing `host`\n  - sources[1]: missing `name`"
        );
    }

    #[test]
    fn source_failure_keeps_cause_chain() {
        let err = Error::source_failed("unread", anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "source `unread` failed");
        let cause = std::error::Error::source(&err).map(|c| c.to_string());
        assert_eq!(cause.as_deref(), Some("connection refused"));
    }
}
