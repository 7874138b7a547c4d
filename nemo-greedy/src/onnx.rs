//! ONNX Runtime backed NeMo transducer (decoder + joiner)
//!
//! Loads the prediction network and joiner exported by sherpa-onnx for NeMo
//! streaming transducers and exposes them through [`TransducerModel`].
//!
//! ## Environment Setup
//!
//! The `ort` crate is built with `load-dynamic`, so ONNX Runtime 1.22+ must be
//! available at run time:
//!
//! ```bash
//! export ORT_DYLIB_PATH=/path/to/libonnxruntime.so
//! ```
//!
//! Tensor layout, by input/output position:
//!
//! - decoder inputs: `targets [1, 1] i32`, `target_length [1] i32`, then the states
//! - decoder outputs: decoder output `[1, hidden, 1]`, output lengths, then the new states
//! - joiner inputs: encoder frame `[1, dim, 1]`, decoder output `[1, hidden, 1]`
//! - joiner output: logits, `vocab_size` values

use std::path::Path;

use ndarray::{Array1, ArrayD, ArrayView3, ArrayViewD, IxDyn};
use ort::{
    execution_providers as ep,
    session::{builder::GraphOptimizationLevel, Session},
    value::{DynValue, Tensor},
};
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::error::{DecodeError, Result};
use crate::model::{DecoderInput, DecoderOutput, TransducerModel};
use crate::state::DecoderState;
use crate::tokens::SymbolTable;

/// Decoder inputs that precede the state tensors
const DECODER_FIXED_INPUTS: usize = 2;
/// Decoder outputs that precede the state tensors
const DECODER_FIXED_OUTPUTS: usize = 2;

/// NeMo transducer decoder and joiner on ONNX Runtime
pub struct NemoTransducerModel {
    decoder: Session,
    joiner: Session,
    decoder_inputs: Vec<String>,
    joiner_inputs: Vec<String>,
    symbols: SymbolTable,
    config: ModelConfig,
}

impl NemoTransducerModel {
    /// Load model from directory containing decoder.onnx, joiner.onnx, tokens.txt
    ///
    /// # Example
    /// ```no_run
    /// use nemo_greedy::NemoTransducerModel;
    ///
    /// let model = NemoTransducerModel::from_directory(
    ///     "/opt/models/sherpa-onnx-nemo-streaming-fast-conformer-transducer-en-80ms"
    /// )?;
    /// println!("{}", model.model_info());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_directory<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = ModelConfig::from_directory(path)?;
        Self::from_config(config)
    }

    /// Load model from configuration
    pub fn from_config(config: ModelConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading NeMo transducer with direct ONNX Runtime");
        info!("Decoder: {}", config.decoder_path.display());
        info!("Joiner: {}", config.joiner_path.display());

        let symbols = SymbolTable::from_file(&config.tokens_path)?;

        let decoder = create_session(&config.decoder_path, &config, "decoder")?;
        info!("✓ Decoder loaded");

        let joiner = create_session(&config.joiner_path, &config, "joiner")?;
        info!("✓ Joiner loaded");

        let decoder_inputs: Vec<String> = decoder.inputs.iter().map(|i| i.name.clone()).collect();
        let joiner_inputs: Vec<String> = joiner.inputs.iter().map(|i| i.name.clone()).collect();
        info!("Decoder inputs: {:?}", decoder_inputs);
        info!("Joiner inputs: {:?}", joiner_inputs);

        if decoder_inputs.len() <= DECODER_FIXED_INPUTS {
            return Err(DecodeError::model_load(format!(
                "Decoder has {} inputs, expected targets, target_length and state tensors",
                decoder_inputs.len()
            )));
        }
        if decoder.outputs.len() != DECODER_FIXED_OUTPUTS + decoder_inputs.len() - DECODER_FIXED_INPUTS {
            return Err(DecodeError::model_load(format!(
                "Decoder has {} state inputs but {} outputs",
                decoder_inputs.len() - DECODER_FIXED_INPUTS,
                decoder.outputs.len()
            )));
        }
        if joiner_inputs.len() != 2 {
            return Err(DecodeError::model_load(format!(
                "Joiner has {} inputs, expected 2",
                joiner_inputs.len()
            )));
        }

        Ok(Self {
            decoder,
            joiner,
            decoder_inputs,
            joiner_inputs,
            symbols,
            config,
        })
    }

    /// Get model configuration
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Get symbol table
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    fn num_states(&self) -> usize {
        self.decoder_inputs.len() - DECODER_FIXED_INPUTS
    }

    /// Get model information
    pub fn model_info(&self) -> String {
        format!(
            "NemoTransducerModel:\n  Decoder: {}\n  Joiner: {}\n  Tokens: {}\n  Blank ID: {}\n  States: {} x [{}, 1, {}]",
            self.config.decoder_path.display(),
            self.config.joiner_path.display(),
            self.symbols.vocab_size(),
            self.symbols.blank_id(),
            self.num_states(),
            self.config.pred_rnn_layers,
            self.config.pred_hidden
        )
    }
}

impl TransducerModel for NemoTransducerModel {
    fn vocab_size(&self) -> usize {
        self.symbols.vocab_size()
    }

    fn init_state(&self) -> Result<DecoderState> {
        let shape = [self.config.pred_rnn_layers, 1, self.config.pred_hidden];
        let shapes = vec![&shape[..]; self.num_states()];
        Ok(DecoderState::zeros(&shapes))
    }

    fn run_decoder(
        &mut self,
        input: DecoderInput,
        state: DecoderState,
    ) -> Result<(DecoderOutput, DecoderState)> {
        if state.len() != self.num_states() {
            return Err(DecodeError::invalid_input(format!(
                "Decoder expects {} state tensors, got {}",
                self.num_states(),
                state.len()
            )));
        }

        let targets = Tensor::from_array(input.token)
            .map_err(|e| DecodeError::inference(format!("Failed to create targets tensor: {}", e)))?;
        let target_length = Tensor::from_array(input.length).map_err(|e| {
            DecodeError::inference(format!("Failed to create target_length tensor: {}", e))
        })?;

        let mut inputs: Vec<(String, DynValue)> = Vec::with_capacity(self.decoder_inputs.len());
        inputs.push((self.decoder_inputs[0].clone(), targets.into_dyn()));
        inputs.push((self.decoder_inputs[1].clone(), target_length.into_dyn()));

        for (name, tensor) in self.decoder_inputs[DECODER_FIXED_INPUTS..]
            .iter()
            .zip(state.into_tensors())
        {
            let value = Tensor::from_array(tensor).map_err(|e| {
                DecodeError::inference(format!("Failed to create state tensor '{}': {}", name, e))
            })?;
            inputs.push((name.clone(), value.into_dyn()));
        }

        let outputs = self
            .decoder
            .run(inputs)
            .map_err(|e| DecodeError::inference(format!("Decoder inference failed: {}", e)))?;

        let decoder_out = extract_array(&outputs[0], "decoder output")?;

        let mut next_state = Vec::with_capacity(outputs.len() - DECODER_FIXED_OUTPUTS);
        for i in DECODER_FIXED_OUTPUTS..outputs.len() {
            next_state.push(extract_array(&outputs[i], "decoder state")?);
        }

        Ok((decoder_out, DecoderState::new(next_state)))
    }

    fn run_joiner(
        &mut self,
        encoder_out: ArrayView3<'_, f32>,
        decoder_out: ArrayViewD<'_, f32>,
    ) -> Result<Array1<f32>> {
        let encoder_input = Tensor::from_array((
            vec![1, encoder_out.len(), 1],
            encoder_out.iter().copied().collect::<Vec<_>>().into_boxed_slice(),
        ))
        .map_err(|e| DecodeError::inference(format!("Failed to create encoder input for joiner: {}", e)))?;

        let decoder_input = Tensor::from_array((
            vec![1, decoder_out.len(), 1],
            decoder_out.iter().copied().collect::<Vec<_>>().into_boxed_slice(),
        ))
        .map_err(|e| DecodeError::inference(format!("Failed to create decoder input for joiner: {}", e)))?;

        let outputs = self
            .joiner
            .run(ort::inputs![
                self.joiner_inputs[0].as_str() => encoder_input,
                self.joiner_inputs[1].as_str() => decoder_input
            ])
            .map_err(|e| DecodeError::inference(format!("Joiner inference failed: {}", e)))?;

        // (1, 1, 1, vocab_size) for a single frame
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DecodeError::inference(format!("Failed to extract joiner output: {}", e)))?;

        debug!("Joiner output shape: {:?}, data.len()={}", shape, data.len());

        Ok(Array1::from_vec(data.to_vec()))
    }
}

fn create_session(path: &Path, config: &ModelConfig, name: &str) -> Result<Session> {
    let mut builder = Session::builder()
        .map_err(|e| DecodeError::model_load(format!("Failed to create {} session builder: {}", name, e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| DecodeError::model_load(format!("Failed to set {} optimization: {}", name, e)))?
        .with_intra_threads(config.num_threads)
        .map_err(|e| DecodeError::model_load(format!("Failed to set {} intra threads: {}", name, e)))?;

    if config.use_cuda() {
        info!("Enabling CUDA execution provider for {}", name);
        builder = builder
            .with_execution_providers([
                ep::CUDAExecutionProvider::default().build(),
                ep::CPUExecutionProvider::default().build(),
            ])
            .map_err(|e| DecodeError::model_load(format!("Failed to set execution providers: {}", e)))?;
    }

    builder
        .commit_from_file(path)
        .map_err(|e| DecodeError::model_load(format!("Failed to load {}: {}", name, e)))
}

fn extract_array(value: &DynValue, what: &str) -> Result<ArrayD<f32>> {
    let (shape, data) = value
        .try_extract_tensor::<f32>()
        .map_err(|e| DecodeError::inference(format!("Failed to extract {}: {}", what, e)))?;

    let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
    ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())
        .map_err(|e| DecodeError::inference(format!("Failed to reshape {}: {}", what, e)))
}
