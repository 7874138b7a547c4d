//! Greedy search for streaming NeMo transducers
//!
//! Decodes chunks of encoder output into tokens with the decoder and joiner
//! networks of a NeMo-style transducer, carrying decoder state across chunks.
//!
//! ## Features
//!
//! - One joiner call per encoder frame, at most one token per frame
//! - Blank penalty to bias decoding away from blank
//! - Decoder state moved in and out of every call, one state per utterance
//! - Any model behind the [`TransducerModel`] trait; ONNX Runtime implementation included
//!
//! ## Quick Start
//!
//! ```no_run
//! use nemo_greedy::{GreedySearchConfig, GreedySearchDecoder, NemoTransducerModel};
//! use ndarray::{Array1, Array3};
//!
//! let model = NemoTransducerModel::from_directory(
//!     "/opt/models/sherpa-onnx-nemo-streaming-fast-conformer-transducer-en-80ms",
//! )?;
//! let mut decoder = GreedySearchDecoder::new(model, GreedySearchConfig::default())?;
//!
//! // One utterance, 10 encoder frames of 512 features from the encoder
//! let encoder_out = Array3::<f32>::zeros((1, 10, 512));
//! let lengths = Array1::from_vec(vec![10_i64]);
//! let states = decoder.init_states(1)?;
//!
//! let (results, _states) = decoder.decode(encoder_out.view(), lengths.view(), states)?;
//! let text = decoder.model().symbols().decode(&results[0].tokens)?;
//! println!("Transcription: {}", text);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod error;
pub mod greedy;
pub mod model;
pub mod onnx;
pub mod result;
pub mod state;
pub mod tokens;

pub use config::{GreedySearchConfig, ModelConfig};
pub use error::{DecodeError, Result};
pub use greedy::{build_decoder_input, decode_one, GreedySearchDecoder};
pub use model::{DecoderInput, DecoderOutput, TransducerModel};
pub use onnx::NemoTransducerModel;
pub use result::DecodeResult;
pub use state::DecoderState;
pub use tokens::SymbolTable;
