//! Configuration types for the reputation scoring engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Scoring policy.
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Geolocation resolver settings.
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Path to a JSON rule document to load at startup.
    #[serde(default)]
    pub rules_file: Option<PathBuf>,

    /// IP addresses that always score 0, checked before resolution.
    #[serde(default)]
    pub blacklist: Vec<String>,
}

/// Scoring policy knobs.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// How rule values are compared against resolved attribute values.
    #[serde(default)]
    pub value_comparison: ValueComparison,

    /// What to do when geolocation resolution fails.
    #[serde(default)]
    pub on_resolution_failure: ResolutionFailurePolicy,

    /// Optional bounds applied to every computed score.
    #[serde(default)]
    pub clamp: Option<ClampRange>,
}

/// Comparison policy for exact-value rules.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValueComparison {
    /// Exact, case-sensitive string equality.
    #[default]
    CaseSensitive,
    /// ASCII case-insensitive equality.
    CaseInsensitive,
}

/// Policy when the resolver cannot produce an attribute bag.
///
/// The default surfaces the failure to the caller; a neutral score is an
/// explicit opt-in, never a hidden fallback.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionFailurePolicy {
    /// Fail the scoring call with a distinguishable error.
    #[default]
    Error,
    /// Return this score instead of failing.
    Neutral(i64),
}

/// Inclusive score bounds.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct ClampRange {
    pub min: i64,
    pub max: i64,
}

impl ClampRange {
    /// Clamp a score into this range.
    pub fn apply(&self, score: i64) -> i64 {
        score.clamp(self.min, self.max)
    }
}

/// Geolocation resolver settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverConfig {
    /// Base URL of the ipwho.is-compatible lookup API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Lookup request timeout in milliseconds.
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_ms: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    // The ipwho.is free tier serves plain HTTP only.
    "http://ipwho.is".to_string()
}

fn default_timeout() -> u64 {
    5000
}

impl Config {
    /// Load configuration from a YAML file.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let expanded = expand_env_vars(&content);
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(clamp) = &self.scoring.clamp {
            if clamp.min > clamp.max {
                anyhow::bail!(
                    "clamp min ({}) must be <= clamp max ({})",
                    clamp.min,
                    clamp.max
                );
            }
        }

        if self.resolver.base_url.is_empty() {
            anyhow::bail!("resolver base_url must not be empty");
        }

        if let Some(ref rules_file) = self.rules_file {
            if !rules_file.exists() {
                anyhow::bail!("rules_file does not exist: {}", rules_file.display());
            }
        }

        for entry in &self.blacklist {
            if entry.trim().is_empty() {
                anyhow::bail!("blacklist entries must be non-empty strings");
            }
        }

        Ok(())
    }

    /// Generate example configuration YAML.
    pub fn example() -> String {
        r#"# geoscore configuration

scoring:
  value_comparison: case_sensitive   # case_sensitive or case_insensitive
  on_resolution_failure: error       # error, or `neutral: <score>` to opt in
  # clamp:                           # optional bounds on every computed score
  #   min: 0
  #   max: 100

# Geolocation lookup API (ipwho.is-compatible)
resolver:
  base_url: "http://ipwho.is"        # free tier is plain HTTP
  timeout_ms: 5000

# JSON rule document loaded at startup
# rules_file: "rules.json"

# IPs that always score 0, checked before any lookup
blacklist:
  - "203.0.113.7"
  - "198.51.100.23"
"#
        .to_string()
    }
}

/// Expand environment variables in the format ${VAR_NAME}.
fn expand_env_vars(content: &str) -> String {
    let mut result = content.to_string();
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let var_value = std::env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scoring() {
        let scoring = ScoringConfig::default();
        assert_eq!(scoring.value_comparison, ValueComparison::CaseSensitive);
        assert_eq!(
            scoring.on_resolution_failure,
            ResolutionFailurePolicy::Error
        );
        assert!(scoring.clamp.is_none());
    }

    #[test]
    fn test_default_resolver() {
        let resolver = ResolverConfig::default();
        assert_eq!(resolver.base_url, "http://ipwho.is");
        assert_eq!(resolver.timeout_ms, 5000);
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
scoring:
  value_comparison: case_insensitive
  on_resolution_failure:
    neutral: 0
  clamp:
    min: 0
    max: 100

resolver:
  base_url: "https://geo.internal"
  timeout_ms: 2000

blacklist:
  - "203.0.113.7"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.scoring.value_comparison,
            ValueComparison::CaseInsensitive
        );
        assert_eq!(
            config.scoring.on_resolution_failure,
            ResolutionFailurePolicy::Neutral(0)
        );
        assert_eq!(config.scoring.clamp, Some(ClampRange { min: 0, max: 100 }));
        assert_eq!(config.resolver.base_url, "https://geo.internal");
        assert_eq!(config.blacklist.len(), 1);
    }

    #[test]
    fn test_parse_failure_policy_error() {
        let yaml = "scoring:\n  on_resolution_failure: error\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.scoring.on_resolution_failure,
            ResolutionFailurePolicy::Error
        );
    }

    #[test]
    fn test_validate_clamp() {
        let config = Config {
            scoring: ScoringConfig {
                clamp: Some(ClampRange { min: 100, max: 0 }),
                ..ScoringConfig::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_blacklist_entry() {
        let config = Config {
            blacklist: vec!["  ".to_string()],
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_missing_rules_file() {
        let config = Config {
            rules_file: Some(PathBuf::from("/nonexistent/rules.json")),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_clamp_apply() {
        let clamp = ClampRange { min: 0, max: 100 };
        assert_eq!(clamp.apply(-5), 0);
        assert_eq!(clamp.apply(50), 50);
        assert_eq!(clamp.apply(250), 100);
    }

    #[test]
    fn test_expand_env_vars() {
        std::env::set_var("GEOSCORE_TEST_URL", "http://example.test");
        let input = "base_url: \"${GEOSCORE_TEST_URL}\"";
        let result = expand_env_vars(input);
        assert_eq!(result, "base_url: \"http://example.test\"");
        std::env::remove_var("GEOSCORE_TEST_URL");
    }

    #[test]
    fn test_expand_env_vars_missing() {
        let input = "base_url: \"${GEOSCORE_NONEXISTENT_VAR}\"";
        let result = expand_env_vars(input);
        assert_eq!(result, "base_url: \"\"");
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = serde_yaml::from_str(&Config::example()).unwrap();
        assert!(config.rules_file.is_none());
        assert_eq!(config.blacklist.len(), 2);
        assert!(config.validate().is_ok());
    }
}
