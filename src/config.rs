//! Match table configuration.

use serde::{Deserialize, Deserializer};
use std::fs;
use std::path::{Path, PathBuf};

use crate::control::MatcherFlags;
use crate::error::{Error, Result};
use crate::line::MatcherTags;

/// Configuration for one [`ControlMatcher`](crate::ControlMatcher).
///
/// Can be written by hand or loaded from a YAML profile:
///
/// ```yaml
/// name: cache.config
/// file_path: /etc/proxy/cache.config
/// flags: [host, regex, url, ip]
/// tags:
///   match_host_regex: null
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Matcher name used as the prefix of every diagnostic
    pub name: String,
    /// Rule file read by [`ControlMatcher::load`](crate::ControlMatcher::load)
    pub file_path: Option<PathBuf>,
    /// Labels selecting the match strategy of a line
    pub tags: MatcherTags,
    /// Enabled match tables
    #[serde(deserialize_with = "deserialize_flags")]
    pub flags: MatcherFlags,
}

impl MatcherConfig {
    /// Create a configuration with every table enabled and default tags.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            file_path: None,
            tags: MatcherTags::default(),
            flags: MatcherFlags::ALL_TABLES,
        }
    }

    /// Set the enabled tables.
    pub fn with_flags(mut self, flags: MatcherFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set the label names.
    pub fn with_tags(mut self, tags: MatcherTags) -> Self {
        self.tags = tags;
        self
    }

    /// Set the rule file path.
    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Parse a YAML profile.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that at least one match table is enabled.
    pub fn validate(&self) -> Result<()> {
        if self.flags.intersection(MatcherFlags::ALL_TABLES).is_empty() {
            return Err(Error::Config(format!("{}: no match table enabled", self.name)));
        }
        Ok(())
    }

    /// Read and parse a YAML profile.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    /// File path as shown in diagnostics.
    pub fn file_name(&self) -> String {
        self.file_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self::new("matcher")
    }
}

fn deserialize_flags<'de, D>(deserializer: D) -> std::result::Result<MatcherFlags, D::Error>
where
    D: Deserializer<'de>,
{
    let names: Vec<String> = Vec::deserialize(deserializer)?;
    MatcherFlags::from_names(names.iter().map(String::as_str)).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MatcherConfig::default();
        assert_eq!(config.name, "matcher");
        assert_eq!(config.flags, MatcherFlags::ALL_TABLES);
        assert_eq!(config.file_name(), "");
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
name: cache.config
file_path: /etc/proxy/cache.config
flags: [host, regex, url, ip]
tags:
  match_host_regex: null
"#;
        let config = MatcherConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.name, "cache.config");
        assert_eq!(config.file_name(), "/etc/proxy/cache.config");
        assert!(config.flags.contains(MatcherFlags::ALLOW_URL_TABLE));
        assert!(!config.flags.contains(MatcherFlags::ALLOW_HOST_REGEX_TABLE));
        assert_eq!(config.tags.match_host_regex, None);
        assert_eq!(config.tags.match_host.as_deref(), Some("dest_host"));
    }

    #[test]
    fn test_from_yaml_rejects_unknown_flag() {
        assert!(MatcherConfig::from_yaml("flags: [host, bogus]").is_err());
    }

    #[test]
    fn test_from_yaml_requires_a_table() {
        assert!(matches!(
            MatcherConfig::from_yaml("flags: [dont_build]"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_validate_builder_flags() {
        assert!(MatcherConfig::new("test").validate().is_ok());
        assert!(MatcherConfig::new("test")
            .with_flags(MatcherFlags::ALLOW_IP_TABLE)
            .validate()
            .is_ok());
        assert!(matches!(
            MatcherConfig::new("test")
                .with_flags(MatcherFlags::DONT_BUILD_TABLE)
                .validate(),
            Err(Error::Config(_))
        ));
        assert!(MatcherConfig::new("test")
            .with_flags(MatcherFlags::empty())
            .validate()
            .is_err());
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.yaml");
        fs::write(&path, "name: parent.config\n").unwrap();

        let config = MatcherConfig::from_yaml_file(&path).unwrap();
        assert_eq!(config.name, "parent.config");
        assert_eq!(config.flags, MatcherFlags::ALL_TABLES);
    }
}
