use std::path::PathBuf;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::features::PolicyKind;
use crate::model::ForestSettings;

/// Runtime settings, layered as defaults < `optigrade.toml` < `OPTIGRADE_*`
/// environment variables (`__` separates nested keys).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub model_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub missing_feature_policy: PolicyKind,
    pub training: ForestSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/model.json"),
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            missing_feature_policy: PolicyKind::ZeroFill,
            training: ForestSettings::default(),
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self> {
        let env = Environment::with_prefix("OPTIGRADE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        Self::from_sources("optigrade", env)
    }

    pub fn from_sources(file_name: &str, env: Environment) -> Result<Self> {
        let defaults = Settings::default();
        let settings = Config::builder()
            .set_default("model_path", defaults.model_path.to_string_lossy().to_string())?
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("log_level", defaults.log_level)?
            .set_default("missing_feature_policy", "zero_fill")?
            .set_default("training.n_trees", defaults.training.n_trees as i64)?
            .set_default("training.seed", defaults.training.seed as i64)?
            .add_source(File::with_name(file_name).required(false))
            .add_source(env)
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Environment::with_prefix("OPTIGRADE")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(Some(source))
    }

    #[test]
    fn defaults_without_any_source() {
        let settings = Settings::from_sources("no-such-optigrade-config", env(&[])).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = Settings::from_sources(
            "no-such-optigrade-config",
            env(&[
                ("OPTIGRADE_PORT", "9090"),
                ("OPTIGRADE_MISSING_FEATURE_POLICY", "impute_mean"),
                ("OPTIGRADE_TRAINING__N_TREES", "25"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.port, 9090);
        assert_eq!(settings.missing_feature_policy, PolicyKind::ImputeMean);
        assert_eq!(settings.training.n_trees, 25);
        assert_eq!(settings.training.seed, 42);
    }
}
