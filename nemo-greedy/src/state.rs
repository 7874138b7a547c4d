//! Decoder network state carried between chunks

use ndarray::{ArrayD, IxDyn};

/// Recurrent state of the prediction network for one utterance.
///
/// An ordered list of tensors whose meaning belongs to the model (for LSTM
/// prediction networks: hidden state then cell state, each
/// `[layers, 1, hidden]`). The decoder consumes a state by value and hands
/// back the updated one, so a state is never shared between utterances.
#[derive(Debug, Default, PartialEq)]
pub struct DecoderState {
    tensors: Vec<ArrayD<f32>>,
}

impl DecoderState {
    pub fn new(tensors: Vec<ArrayD<f32>>) -> Self {
        Self { tensors }
    }

    /// Zero-filled state with one tensor per shape
    pub fn zeros(shapes: &[&[usize]]) -> Self {
        Self {
            tensors: shapes
                .iter()
                .map(|shape| ArrayD::zeros(IxDyn(shape)))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    pub fn tensors(&self) -> &[ArrayD<f32>] {
        &self.tensors
    }

    pub fn into_tensors(self) -> Vec<ArrayD<f32>> {
        self.tensors
    }
}

impl From<Vec<ArrayD<f32>>> for DecoderState {
    fn from(tensors: Vec<ArrayD<f32>>) -> Self {
        Self::new(tensors)
    }
}
