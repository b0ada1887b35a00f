use thiserror::Error;

#[derive(Error, Debug)]
pub enum FlowerError {
    /// Model file missing or corrupt, or no inference backend compiled in.
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Internal contract violation; the request must be aborted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowerError {
    pub fn error_code(&self) -> &'static str {
        match self {
            FlowerError::ModelLoad(_) => "MODEL_LOAD_ERROR",
            FlowerError::ImageDecode(_) => "IMAGE_DECODE_ERROR",
            FlowerError::InvalidInput(_) => "INVALID_INPUT",
            FlowerError::Inference(_) => "INFERENCE_ERROR",
            FlowerError::Config(_) => "CONFIG_ERROR",
            FlowerError::Io(_) => "IO_ERROR",
        }
    }

    /// Whether the user can fix this by choosing another image.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, FlowerError::ImageDecode(_) | FlowerError::Io(_))
    }

    /// Message shown to the end user.
    pub fn user_message(&self) -> String {
        match self {
            FlowerError::ModelLoad(msg) => {
                format!("Model gagal dimuat, prediksi tidak dapat dilakukan ({msg})")
            }
            FlowerError::ImageDecode(e) => format!("File bukan gambar yang valid: {e}"),
            FlowerError::Io(e) => format!("File tidak dapat dibaca: {e}"),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FlowerError>;
