//! Decoding and model configuration

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{DecodeError, Result};

/// Greedy search configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GreedySearchConfig {
    /// Amount subtracted from the blank logit before argmax (default: 0.0)
    /// Positive values bias decoding away from blank; 0.0 disables it
    pub blank_penalty: f32,
}

impl Default for GreedySearchConfig {
    fn default() -> Self {
        Self { blank_penalty: 0.0 }
    }
}

impl GreedySearchConfig {
    /// Set blank penalty
    pub fn blank_penalty(mut self, penalty: f32) -> Self {
        self.blank_penalty = penalty;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.blank_penalty.is_finite() || self.blank_penalty < 0.0 {
            return Err(DecodeError::config(format!(
                "blank_penalty must be a finite value >= 0.0, got {}",
                self.blank_penalty
            )));
        }
        Ok(())
    }
}

/// Model configuration for the ONNX decoder/joiner pair
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Path to decoder (prediction network) model
    pub decoder_path: PathBuf,
    /// Path to joiner model
    pub joiner_path: PathBuf,
    /// Path to tokens file
    pub tokens_path: PathBuf,
    /// Number of intra-op threads
    pub num_threads: usize,
    /// Execution provider ("cpu" or "cuda")
    pub provider: String,
    /// Number of LSTM layers in the prediction network
    pub pred_rnn_layers: usize,
    /// Hidden size of the prediction network
    pub pred_hidden: usize,
}

impl ModelConfig {
    /// Create config from model directory
    ///
    /// Prefers `<name>.int8.onnx` over `<name>.onnx` when both exist.
    pub fn from_directory<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base = path.as_ref();

        if !base.exists() {
            return Err(DecodeError::config(format!(
                "Model directory does not exist: {}",
                base.display()
            )));
        }

        let decoder_path = find_model_file(base, "decoder")?;
        let joiner_path = find_model_file(base, "joiner")?;
        let tokens_path = base.join("tokens.txt");

        if !tokens_path.exists() {
            return Err(DecodeError::config(format!(
                "tokens file not found: {}",
                tokens_path.display()
            )));
        }

        Ok(Self {
            decoder_path,
            joiner_path,
            tokens_path,
            ..Default::default()
        })
    }

    /// Set number of threads
    pub fn num_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Set execution provider
    pub fn provider<S: Into<String>>(mut self, provider: S) -> Self {
        self.provider = provider.into();
        self
    }

    /// Set prediction network geometry (LSTM layers, hidden size)
    pub fn prediction_network(mut self, layers: usize, hidden: usize) -> Self {
        self.pred_rnn_layers = layers;
        self.pred_hidden = hidden;
        self
    }

    /// Whether CUDA was requested
    pub fn use_cuda(&self) -> bool {
        self.provider.eq_ignore_ascii_case("cuda")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_threads == 0 {
            return Err(DecodeError::config("num_threads must be at least 1"));
        }
        if self.pred_rnn_layers == 0 || self.pred_hidden == 0 {
            return Err(DecodeError::config(format!(
                "Invalid prediction network geometry: {} layers x {} hidden",
                self.pred_rnn_layers, self.pred_hidden
            )));
        }
        match self.provider.to_ascii_lowercase().as_str() {
            "cpu" | "cuda" => Ok(()),
            other => Err(DecodeError::config(format!(
                "Unsupported provider '{}', expected 'cpu' or 'cuda'",
                other
            ))),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            decoder_path: PathBuf::new(),
            joiner_path: PathBuf::new(),
            tokens_path: PathBuf::new(),
            num_threads: 4,
            provider: "cpu".to_string(),
            pred_rnn_layers: 2,
            pred_hidden: 640,
        }
    }
}

fn find_model_file(dir: &Path, name: &str) -> Result<PathBuf> {
    let int8_path = dir.join(format!("{}.int8.onnx", name));
    if int8_path.exists() {
        info!("Using INT8 quantized model: {}.int8.onnx", name);
        return Ok(int8_path);
    }
    let onnx_path = dir.join(format!("{}.onnx", name));
    if onnx_path.exists() {
        info!("Using FP32 model: {}.onnx", name);
        return Ok(onnx_path);
    }
    Err(DecodeError::config(format!(
        "Could not find {}.onnx or {}.int8.onnx in {}",
        name,
        name,
        dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("nemo-greedy-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_blank_penalty_disabled() {
        let config = GreedySearchConfig::default();
        assert_eq!(config.blank_penalty, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_blank_penalty_rejected() {
        assert!(GreedySearchConfig::default().blank_penalty(-1.0).validate().is_err());
        assert!(GreedySearchConfig::default().blank_penalty(f32::NAN).validate().is_err());
        let config = GreedySearchConfig::default().blank_penalty(1.5);
        assert!(config.validate().is_ok());
        assert_relative_eq!(config.blank_penalty, 1.5);
    }

    #[test]
    fn test_from_directory_prefers_int8() {
        let dir = scratch_dir("int8");
        fs::write(dir.join("decoder.onnx"), b"").unwrap();
        fs::write(dir.join("decoder.int8.onnx"), b"").unwrap();
        fs::write(dir.join("joiner.onnx"), b"").unwrap();
        fs::write(dir.join("tokens.txt"), "<blk> 0\n").unwrap();

        let config = ModelConfig::from_directory(&dir).unwrap();
        assert_eq!(config.decoder_path, dir.join("decoder.int8.onnx"));
        assert_eq!(config.joiner_path, dir.join("joiner.onnx"));
        assert_eq!(config.num_threads, 4);
        assert!(config.validate().is_ok());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_from_directory_missing_joiner() {
        let dir = scratch_dir("missing");
        fs::write(dir.join("decoder.onnx"), b"").unwrap();
        fs::write(dir.join("tokens.txt"), "<blk> 0\n").unwrap();

        let err = ModelConfig::from_directory(&dir).unwrap_err();
        assert!(matches!(err, DecodeError::Config(_)));
        assert!(err.to_string().contains("joiner"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_from_directory_nonexistent() {
        assert!(ModelConfig::from_directory("/nonexistent/model/dir").is_err());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = ModelConfig::default()
            .num_threads(2)
            .provider("CUDA")
            .prediction_network(1, 320);
        assert!(config.use_cuda());
        assert!(config.validate().is_ok());

        assert!(ModelConfig::default().provider("tpu").validate().is_err());
        assert!(ModelConfig::default().num_threads(0).validate().is_err());
        assert!(ModelConfig::default().prediction_network(0, 640).validate().is_err());
    }
}
