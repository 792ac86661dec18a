// src/fragment.rs
use crate::error::ConfigError;
use regex::Regex;
use serde::Deserialize;

/// Where a driver fragment sits relative to the base syslog fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// In front of the timestamp
    Before,
    /// Between the `PROC[PID]: ` header and the free text
    #[default]
    After,
}

/// A sub-pattern together with the variable names of its capture groups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pattern: String,
    keys: Vec<String>,
    placement: Placement,
}

impl Fragment {
    pub fn new<I, S>(pattern: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Fragment {
            pattern: pattern.into(),
            keys: keys.into_iter().map(Into::into).collect(),
            placement: Placement::default(),
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Compile the pattern on its own and count its capture groups.
    pub fn group_count(&self) -> Result<usize, ConfigError> {
        let regex = Regex::new(&self.pattern).map_err(|source| ConfigError::FragmentPattern {
            keys: self.keys.clone(),
            source,
        })?;
        // captures_len() includes the implicit whole-match group
        Ok(regex.captures_len() - 1)
    }

    pub fn is_aligned(&self) -> Result<bool, ConfigError> {
        Ok(self.group_count()? == self.keys.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_count() {
        let fragment = Fragment::new(r"(\w+)=(\w+)", ["name", "value"]);
        assert_eq!(fragment.group_count().unwrap(), 2);
        assert!(fragment.is_aligned().unwrap());

        // Non-capturing groups do not count
        let fragment = Fragment::new(r"(?:\[([0-9]+)\])?", ["pid"]);
        assert_eq!(fragment.group_count().unwrap(), 1);
    }

    #[test]
    fn test_misaligned_fragment_is_reported_not_rejected() {
        let fragment = Fragment::new(r"(a)(b)", ["only"]);
        assert!(!fragment.is_aligned().unwrap());
    }

    #[test]
    fn test_invalid_pattern() {
        let fragment = Fragment::new(r"(unclosed", ["x"]);
        assert!(matches!(
            fragment.group_count(),
            Err(ConfigError::FragmentPattern { .. })
        ));
    }

    #[test]
    fn test_default_placement_is_after() {
        let fragment = Fragment::new("x", Vec::<String>::new());
        assert_eq!(fragment.placement(), Placement::After);
        let fragment = fragment.with_placement(Placement::Before);
        assert_eq!(fragment.placement(), Placement::Before);
    }
}
