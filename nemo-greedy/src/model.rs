//! Transducer model interface consumed by the decoders

use ndarray::{Array1, Array2, ArrayD, ArrayView3, ArrayViewD};

use crate::error::Result;
use crate::state::DecoderState;

/// Output embedding of the decoder (prediction) network
pub type DecoderOutput = ArrayD<f32>;

/// Inputs for one decoder network step
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderInput {
    /// Previous token, shape `[1, 1]`
    pub token: Array2<i32>,
    /// Token length, shape `[1]`, always 1
    pub length: Array1<i32>,
}

/// Decoder and joiner networks of a NeMo-style transducer.
///
/// Methods take `&mut self` because ONNX Runtime's `Session::run` requires it.
pub trait TransducerModel {
    /// Number of output symbols, blank included. Blank is `vocab_size() - 1`.
    fn vocab_size(&self) -> usize;

    /// Fresh decoder state for a new utterance
    fn init_state(&self) -> Result<DecoderState>;

    /// Run one decoder step.
    ///
    /// Consumes the input tensors and the state; returns the decoder output
    /// and the updated state.
    fn run_decoder(
        &mut self,
        input: DecoderInput,
        state: DecoderState,
    ) -> Result<(DecoderOutput, DecoderState)>;

    /// Run the joiner on one encoder frame (`[1, feature, 1]`) and the
    /// current decoder output. Returns `vocab_size()` logits.
    fn run_joiner(
        &mut self,
        encoder_out: ArrayView3<'_, f32>,
        decoder_out: ArrayViewD<'_, f32>,
    ) -> Result<Array1<f32>>;
}

impl<M: TransducerModel + ?Sized> TransducerModel for &mut M {
    fn vocab_size(&self) -> usize {
        (**self).vocab_size()
    }

    fn init_state(&self) -> Result<DecoderState> {
        (**self).init_state()
    }

    fn run_decoder(
        &mut self,
        input: DecoderInput,
        state: DecoderState,
    ) -> Result<(DecoderOutput, DecoderState)> {
        (**self).run_decoder(input, state)
    }

    fn run_joiner(
        &mut self,
        encoder_out: ArrayView3<'_, f32>,
        decoder_out: ArrayViewD<'_, f32>,
    ) -> Result<Array1<f32>> {
        (**self).run_joiner(encoder_out, decoder_out)
    }
}
