//! Container configuration.
//!
//! Options can be built in code, read from the environment, or (with the
//! `config` feature) deserialized with serde from whatever format the
//! application already uses.

use std::env;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};
use crate::internal::DEFAULT_MAX_DEPTH;

/// Environment variable holding the duplicate registration policy.
pub const ENV_DUPLICATE_POLICY: &str = "FERROUS_IOC_DUPLICATE_POLICY";
/// Environment variable holding the maximum resolution depth.
pub const ENV_MAX_DEPTH: &str = "FERROUS_IOC_MAX_DEPTH";

/// What happens when a key is registered a second time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum DuplicatePolicy {
    /// Overwrite the previous provider and log a warning.
    #[default]
    Warn,
    /// Overwrite silently.
    Replace,
    /// Keep the previous provider and fail with `AlreadyRegistered`.
    Reject,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DuplicatePolicy::Warn => "warn",
            DuplicatePolicy::Replace => "replace",
            DuplicatePolicy::Reject => "reject",
        })
    }
}

impl FromStr for DuplicatePolicy {
    type Err = DiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(DuplicatePolicy::Warn),
            "replace" | "override" => Ok(DuplicatePolicy::Replace),
            "reject" | "error" => Ok(DuplicatePolicy::Reject),
            other => Err(DiError::construction::<DuplicatePolicy>(format!(
                "unknown duplicate policy '{}'",
                other
            ))),
        }
    }
}

/// Container-wide settings.
///
/// # Examples
///
/// ```
/// use ferrous_ioc::{Container, ContainerOptions, DiError, DuplicatePolicy};
///
/// let container = Container::with_options(ContainerOptions {
///     duplicate_policy: DuplicatePolicy::Reject,
///     ..ContainerOptions::default()
/// });
///
/// container.add_singleton(1u8).unwrap();
/// assert!(matches!(container.add_singleton(2u8), Err(DiError::AlreadyRegistered { .. })));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerOptions {
    /// Handling of duplicate registrations.
    pub duplicate_policy: DuplicatePolicy,
    /// Longest resolution chain allowed before failing with `DepthExceeded`.
    pub max_depth: usize,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Warn,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl ContainerOptions {
    /// Reads options from `FERROUS_IOC_DUPLICATE_POLICY` and
    /// `FERROUS_IOC_MAX_DEPTH`, falling back to defaults for unset variables.
    pub fn from_env() -> DiResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DiResult<Self> {
        let mut options = Self::default();

        if let Some(value) = lookup(ENV_DUPLICATE_POLICY) {
            options.duplicate_policy = value.parse()?;
        }

        if let Some(value) = lookup(ENV_MAX_DEPTH) {
            options.max_depth = value.trim().parse::<usize>().map_err(|e| {
                DiError::construction::<ContainerOptions>(format!("{}: {}", ENV_MAX_DEPTH, e))
            })?;
            if options.max_depth == 0 {
                return Err(DiError::construction::<ContainerOptions>(format!(
                    "{} must be at least 1",
                    ENV_MAX_DEPTH
                )));
            }
        }

        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let options = ContainerOptions::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(options, ContainerOptions::default());
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
        assert_eq!(options.duplicate_policy, DuplicatePolicy::Warn);
    }

    #[test]
    fn test_values_are_parsed() {
        let options = ContainerOptions::from_lookup(lookup_from(&[
            (ENV_DUPLICATE_POLICY, " Reject "),
            (ENV_MAX_DEPTH, "64"),
        ]))
        .unwrap();

        assert_eq!(options.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(options.max_depth, 64);
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(ContainerOptions::from_lookup(lookup_from(&[(ENV_DUPLICATE_POLICY, "sometimes")])).is_err());
        assert!(ContainerOptions::from_lookup(lookup_from(&[(ENV_MAX_DEPTH, "deep")])).is_err());
        assert!(ContainerOptions::from_lookup(lookup_from(&[(ENV_MAX_DEPTH, "0")])).is_err());
    }

    #[test]
    fn test_policy_display_round_trip() {
        for policy in [DuplicatePolicy::Warn, DuplicatePolicy::Replace, DuplicatePolicy::Reject] {
            assert_eq!(policy.to_string().parse::<DuplicatePolicy>().unwrap(), policy);
        }
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_serde_options() {
        let options: ContainerOptions =
            serde_json::from_str(r#"{ "duplicate_policy": "reject" }"#).unwrap();
        assert_eq!(options.duplicate_policy, DuplicatePolicy::Reject);
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
    }
}
