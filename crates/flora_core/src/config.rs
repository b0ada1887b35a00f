use crate::error::{FlowerError, Result};
use crate::model::OutputActivation;
use crate::policy::{CLASS_NAMES, Thresholds};
use crate::preprocess::INPUT_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overrides [`ClassifierConfig::model_path`]; the only environment setting.
pub const MODEL_PATH_ENV: &str = "FLORA_MODEL_PATH";

/// Default config file looked up by the app.
pub const CONFIG_FILE: &str = "flora.toml";

/// Configuration for the flower classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub model_path: PathBuf,
    pub input_size: u32,
    pub class_names: Vec<String>,
    pub thresholds: Thresholds,
    pub output: OutputActivation,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/flower_model.onnx"),
            input_size: INPUT_SIZE,
            class_names: CLASS_NAMES.iter().map(|s| s.to_string()).collect(),
            thresholds: Thresholds::default(),
            output: OutputActivation::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(raw).map_err(|e| FlowerError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw).map_err(|e| match e {
            FlowerError::Config(msg) => FlowerError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub fn with_env_overrides(self) -> Self {
        self.with_model_path_override(std::env::var_os(MODEL_PATH_ENV).map(PathBuf::from))
    }

    fn with_model_path_override(mut self, model_path: Option<PathBuf>) -> Self {
        if let Some(path) = model_path.filter(|p| !p.as_os_str().is_empty()) {
            self.model_path = path;
        }
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.class_names.len() < 2 {
            return Err(FlowerError::Config(format!(
                "need at least 2 class names, got {}",
                self.class_names.len()
            )));
        }
        if self.input_size == 0 {
            return Err(FlowerError::Config("input_size must be positive".into()));
        }
        self.thresholds
            .validate()
            .map_err(|e| FlowerError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_match_deployed_model() {
        let cfg = ClassifierConfig::default();
        assert_eq!(cfg.input_size, 224);
        assert_eq!(cfg.class_names, CLASS_NAMES.to_vec());
        assert_relative_eq!(cfg.thresholds.confidence, 0.70);
        assert_relative_eq!(cfg.thresholds.margin, 0.20);
        assert_eq!(cfg.output, OutputActivation::Probabilities);
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_toml_keeps_remaining_defaults() {
        let cfg = ClassifierConfig::from_toml_str(
            r#"
            model_path = "weights/flowers.onnx"

            [thresholds]
            margin = 0.3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.model_path, PathBuf::from("weights/flowers.onnx"));
        assert_relative_eq!(cfg.thresholds.confidence, 0.70);
        assert_relative_eq!(cfg.thresholds.margin, 0.3);
        assert_eq!(cfg.class_names.len(), 5);
    }

    #[test]
    fn output_activation_parses_lowercase() {
        let cfg = ClassifierConfig::from_toml_str(r#"output = "logits""#).unwrap();
        assert_eq!(cfg.output, OutputActivation::Logits);
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for raw in [
            r#"class_names = ["Lily"]"#,
            "input_size = 0",
            "[thresholds]\nconfidence = 1.5",
            "model_path = [",
        ] {
            let err = ClassifierConfig::from_toml_str(raw).unwrap_err();
            assert!(matches!(err, FlowerError::Config(_)), "{raw}: {err:?}");
        }
    }

    #[test]
    fn load_or_default_reads_file_when_present() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        assert_eq!(ClassifierConfig::load_or_default(&path)?, ClassifierConfig::default());

        std::fs::write(&path, "input_size = 256\n")?;
        assert_eq!(ClassifierConfig::load_or_default(&path)?.input_size, 256);
        Ok(())
    }

    #[test]
    fn load_error_names_the_file_once() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "input_size = 0\n")?;
        let err = ClassifierConfig::load(&path).unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, FlowerError::Config(_)));
        assert!(msg.contains(&path.display().to_string()), "{msg}");
        assert_eq!(msg.matches("Configuration error").count(), 1, "{msg}");
        Ok(())
    }

    #[test]
    fn model_path_override_ignores_empty_values() {
        let cfg = ClassifierConfig::default().with_model_path_override(Some(PathBuf::new()));
        assert_eq!(cfg.model_path, ClassifierConfig::default().model_path);

        let cfg = cfg.with_model_path_override(Some(PathBuf::from("/opt/flora/model.onnx")));
        assert_eq!(cfg.model_path, PathBuf::from("/opt/flora/model.onnx"));
    }
}
