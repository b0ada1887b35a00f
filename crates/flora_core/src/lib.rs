//! Flower photo classification with rejection of unfamiliar images.
//!
//! [`preprocess`] turns any decodable image into the model's input tensor,
//! a [`Predictor`] scores it, and [`policy::decide`] converts the scores into a
//! [`Verdict`]: a flower class, or "not a flower" when the model is unsure.

pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod policy;
pub mod preprocess;

pub use config::ClassifierConfig;
pub use error::{FlowerError, Result};
pub use model::{FnPredictor, OutputActivation, Predictor, load_predictor};
pub use pipeline::FlowerClassifier;
pub use policy::{
    CLASS_NAMES, CONFIDENCE_THRESHOLD, ClassProbability, Distribution, MARGIN_THRESHOLD,
    Prediction, Thresholds, Verdict, decide, decide_default,
};
pub use preprocess::{Tensor, prepare};

#[cfg(feature = "ort")]
pub use model::OnnxPredictor;
