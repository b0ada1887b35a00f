//! Model boundary: anything that maps an input tensor to class scores.

use crate::config::ClassifierConfig;
use crate::error::{FlowerError, Result};
use crate::preprocess::Tensor;
use serde::{Deserialize, Serialize};

/// Pretrained classification model.
pub trait Predictor {
    /// One score per class, in class-list order.
    fn predict(&self, tensor: &Tensor) -> Result<Vec<f32>>;
}

impl<P: Predictor + ?Sized> Predictor for Box<P> {
    fn predict(&self, tensor: &Tensor) -> Result<Vec<f32>> {
        (**self).predict(tensor)
    }
}

impl<P: Predictor + ?Sized> Predictor for &P {
    fn predict(&self, tensor: &Tensor) -> Result<Vec<f32>> {
        (**self).predict(tensor)
    }
}

/// Adapts a closure into a [`Predictor`].
pub struct FnPredictor<F>(pub F);

impl<F> Predictor for FnPredictor<F>
where
    F: Fn(&Tensor) -> Result<Vec<f32>>,
{
    fn predict(&self, tensor: &Tensor) -> Result<Vec<f32>> {
        (self.0)(tensor)
    }
}

/// What the model's output layer emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputActivation {
    /// Output already passed through softmax.
    #[default]
    Probabilities,
    /// Raw logits; softmax is applied after inference.
    Logits,
}

impl OutputActivation {
    pub fn apply(self, scores: Vec<f32>) -> Vec<f32> {
        match self {
            OutputActivation::Probabilities => scores,
            OutputActivation::Logits => softmax(&scores),
        }
    }
}

pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    if sum == 0.0 {
        return vec![0.0; logits.len()];
    }
    exps.into_iter().map(|x| x / sum).collect()
}

/// Build the configured inference backend.
pub fn load_predictor(cfg: &ClassifierConfig) -> Result<Box<dyn Predictor + Send + Sync>> {
    if !cfg.model_path.is_file() {
        return Err(FlowerError::ModelLoad(format!(
            "model file not found: {}",
            cfg.model_path.display()
        )));
    }
    load_backend(cfg)
}

#[cfg(feature = "ort")]
fn load_backend(cfg: &ClassifierConfig) -> Result<Box<dyn Predictor + Send + Sync>> {
    Ok(Box::new(onnx::OnnxPredictor::new(cfg)?))
}

#[cfg(not(feature = "ort"))]
fn load_backend(cfg: &ClassifierConfig) -> Result<Box<dyn Predictor + Send + Sync>> {
    Err(FlowerError::ModelLoad(format!(
        "{} found but this build has no ONNX Runtime support (enable the `ort` feature)",
        cfg.model_path.display()
    )))
}

#[cfg(feature = "ort")]
pub use onnx::OnnxPredictor;

#[cfg(feature = "ort")]
mod onnx {
    use super::{OutputActivation, Predictor};
    use crate::config::ClassifierConfig;
    use crate::error::{FlowerError, Result};
    use crate::preprocess::Tensor;
    use ndarray::CowArray;
    use once_cell::sync::OnceCell;
    use ort::{
        GraphOptimizationLevel, SessionBuilder, environment::Environment, session::Session,
        tensor::OrtOwnedTensor, value::Value,
    };
    use std::sync::{Arc, Mutex};

    static ORT_ENV: OnceCell<Arc<Environment>> = OnceCell::new();

    fn environment() -> Result<Arc<Environment>> {
        ORT_ENV
            .get_or_try_init(|| {
                Environment::builder()
                    .with_name("flora")
                    .build()
                    .map(|env| env.into_arc())
            })
            .cloned()
            .map_err(|e| FlowerError::ModelLoad(format!("ONNX Runtime init failed: {e}")))
    }

    /// Flower classifier backed by ONNX Runtime.
    pub struct OnnxPredictor {
        session: Mutex<Session>,
        output: OutputActivation,
    }

    impl OnnxPredictor {
        pub fn new(cfg: &ClassifierConfig) -> Result<Self> {
            let env = environment()?;
            let session = SessionBuilder::new(&env)
                .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level1))
                .and_then(|b| b.with_model_from_file(&cfg.model_path))
                .map_err(|e| {
                    FlowerError::ModelLoad(format!("{}: {e}", cfg.model_path.display()))
                })?;
            tracing::info!("Loaded model from {}", cfg.model_path.display());
            Ok(Self {
                session: Mutex::new(session),
                output: cfg.output,
            })
        }
    }

    impl Predictor for OnnxPredictor {
        fn predict(&self, tensor: &Tensor) -> Result<Vec<f32>> {
            let session = self
                .session
                .lock()
                .map_err(|_| FlowerError::Inference("model session poisoned".into()))?;
            let input_array = tensor.view().into_dyn();
            let cow = CowArray::from(input_array);
            let input = Value::from_array(session.allocator(), &cow)
                .map_err(|e| FlowerError::Inference(format!("cannot build input tensor: {e}")))?;
            let outputs: Vec<Value> = session
                .run(vec![input])
                .map_err(|e| FlowerError::Inference(e.to_string()))?;
            let Some(first) = outputs.first() else {
                return Err(FlowerError::Inference("model returned no output".into()));
            };
            let scores: OrtOwnedTensor<f32, _> = first
                .try_extract()
                .map_err(|e| FlowerError::Inference(e.to_string()))?;
            let scores: Vec<f32> = scores.view().iter().cloned().collect();
            if scores.is_empty() {
                return Err(FlowerError::Inference("empty model output".into()));
            }
            Ok(self.output.apply(scores))
        }
    }
}
