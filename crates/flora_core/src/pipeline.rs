use crate::config::ClassifierConfig;
use crate::error::{FlowerError, Result};
use crate::model::Predictor;
use crate::policy::{self, Prediction, Thresholds};
use crate::preprocess;
use image::DynamicImage;
use std::path::Path;

/// Owned handle over a loaded model. Create once, share by reference.
pub struct FlowerClassifier<P> {
    predictor: P,
    class_names: Vec<String>,
    thresholds: Thresholds,
    input_size: u32,
}

impl<P: Predictor> FlowerClassifier<P> {
    pub fn new(predictor: P, cfg: &ClassifierConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            predictor,
            class_names: cfg.class_names.clone(),
            thresholds: cfg.thresholds,
            input_size: cfg.input_size,
        })
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn classify_image(&self, image: &DynamicImage) -> Result<Prediction> {
        let tensor = preprocess::prepare_sized(image, self.input_size);
        let probabilities = self.predictor.predict(&tensor)?;
        if probabilities.len() != self.class_names.len() {
            let msg = format!(
                "model returned {} scores for {} classes",
                probabilities.len(),
                self.class_names.len()
            );
            tracing::error!("{msg}");
            return Err(FlowerError::InvalidInput(msg));
        }
        policy::decide(&probabilities, self.class_names.as_slice(), &self.thresholds)
    }

    pub fn classify_bytes(&self, bytes: &[u8]) -> Result<Prediction> {
        let image = preprocess::decode(bytes).inspect_err(|e| {
            tracing::warn!("Rejected upload: {e}");
        })?;
        self.classify_image(&image)
    }

    pub fn classify_path(&self, path: impl AsRef<Path>) -> Result<Prediction> {
        let path = path.as_ref();
        let image = preprocess::open(path).inspect_err(|e| {
            tracing::warn!("Cannot open {}: {e}", path.display());
        })?;
        self.classify_image(&image)
    }
}
