//! Greedy search for NeMo-style streaming transducers
//!
//! Each encoder frame goes through the joiner exactly once, so at most one
//! non-blank token is emitted per frame. The decoder network only runs when a
//! non-blank token is emitted; on blank the decoder output and state carry
//! over to the next frame unchanged.

use ndarray::{Array1, Array2, ArrayView1, ArrayView3};
use tracing::{debug, trace};

use crate::config::GreedySearchConfig;
use crate::error::{DecodeError, Result};
use crate::model::{DecoderInput, TransducerModel};
use crate::result::DecodeResult;
use crate::state::DecoderState;

/// Build the `[1, 1]` token tensor and `[1]` length tensor for one decoder step
pub fn build_decoder_input(token: i32) -> DecoderInput {
    DecoderInput {
        token: Array2::from_elem((1, 1), token),
        length: Array1::from_elem(1, 1),
    }
}

/// Index of the largest logit. Ties go to the lowest index.
fn argmax(logits: &Array1<f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &value) in logits.iter().enumerate() {
        if i == 0 || best_value < value {
            best = i;
            best_value = value;
        }
    }
    best
}

/// Greedy-decode one utterance chunk.
///
/// `encoder_out` holds at least `num_rows * num_cols` row-major features.
/// The incoming `state` is primed with the blank token before the first frame;
/// the returned state is the input for the next chunk of the same utterance.
pub fn decode_one<M: TransducerModel + ?Sized>(
    encoder_out: &[f32],
    num_rows: usize,
    num_cols: usize,
    model: &mut M,
    blank_penalty: f32,
    state: DecoderState,
) -> Result<(DecodeResult, DecoderState)> {
    let vocab_size = model.vocab_size();
    if vocab_size == 0 {
        return Err(DecodeError::inference("Model reports an empty vocabulary"));
    }
    let blank_id = vocab_size - 1;

    let needed = num_rows
        .checked_mul(num_cols)
        .ok_or_else(|| DecodeError::invalid_input("Encoder output size overflows"))?;
    if encoder_out.len() < needed {
        return Err(DecodeError::invalid_input(format!(
            "Encoder output has {} values, need {} ({} frames x {} features)",
            encoder_out.len(),
            needed,
            num_rows,
            num_cols
        )));
    }

    let (mut decoder_out, mut state) =
        model.run_decoder(build_decoder_input(blank_id as i32), state)?;

    let mut result = DecodeResult::new();
    let mut blank_count = 0_usize;

    for t in 0..num_rows {
        let row = &encoder_out[t * num_cols..(t + 1) * num_cols];
        let frame = ArrayView3::from_shape((1, num_cols, 1), row)
            .map_err(|e| DecodeError::inference(format!("Failed to view encoder frame {}: {}", t, e)))?;

        let mut logits = model.run_joiner(frame, decoder_out.view())?;
        if logits.len() != vocab_size {
            return Err(DecodeError::inference(format!(
                "Joiner returned {} logits at frame {}, expected {}",
                logits.len(),
                t,
                vocab_size
            )));
        }

        if blank_penalty > 0.0 {
            logits[blank_id] -= blank_penalty;
        }

        let y = argmax(&logits);
        if y == blank_id {
            blank_count += 1;
            continue;
        }

        trace!("Emitted token {} at frame {}", y, t);
        result.push(y as i32, t);

        let (next_out, next_state) = model.run_decoder(build_decoder_input(y as i32), state)?;
        decoder_out = next_out;
        state = next_state;
    }

    debug!(
        "Decoded {} tokens from {} frames ({} blank)",
        result.len(),
        num_rows,
        blank_count
    );

    Ok((result, state))
}

/// Greedy search decoder over a batch of utterances
pub struct GreedySearchDecoder<M> {
    model: M,
    blank_penalty: f32,
}

impl<M: TransducerModel> GreedySearchDecoder<M> {
    pub fn new(model: M, config: GreedySearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            model,
            blank_penalty: config.blank_penalty,
        })
    }

    pub fn blank_penalty(&self) -> f32 {
        self.blank_penalty
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    /// One fresh decoder state per utterance
    pub fn init_states(&self, batch_size: usize) -> Result<Vec<DecoderState>> {
        (0..batch_size).map(|_| self.model.init_state()).collect()
    }

    /// Decode one chunk for every utterance in the batch.
    ///
    /// `encoder_out` is `[batch, time, feature]` in standard layout,
    /// `encoder_out_length[i]` the valid frame count of utterance `i`, and
    /// `states[i]` its decoder state. Returns results and updated states in
    /// input order.
    pub fn decode(
        &mut self,
        encoder_out: ArrayView3<'_, f32>,
        encoder_out_length: ArrayView1<'_, i64>,
        states: Vec<DecoderState>,
    ) -> Result<(Vec<DecodeResult>, Vec<DecoderState>)> {
        let (batch_size, num_frames, num_features) = encoder_out.dim();

        if encoder_out_length.len() != batch_size {
            return Err(DecodeError::invalid_input(format!(
                "Got {} encoder lengths for batch of {}",
                encoder_out_length.len(),
                batch_size
            )));
        }
        if states.len() != batch_size {
            return Err(DecodeError::invalid_input(format!(
                "Got {} decoder states for batch of {}",
                states.len(),
                batch_size
            )));
        }

        let lengths = encoder_out_length
            .iter()
            .enumerate()
            .map(|(i, &len)| {
                usize::try_from(len)
                    .ok()
                    .filter(|&n| n <= num_frames)
                    .ok_or_else(|| {
                        DecodeError::invalid_input(format!(
                            "Utterance {} has length {}, valid range is 0..={}",
                            i, len, num_frames
                        ))
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let data = encoder_out.as_slice().ok_or_else(|| {
            DecodeError::invalid_input("Encoder output must be in standard (row-major) layout")
        })?;

        debug!(
            "Greedy search over batch of {} ({} frames x {} features)",
            batch_size, num_frames, num_features
        );

        let stride = num_frames * num_features;
        let mut results = Vec::with_capacity(batch_size);
        let mut next_states = Vec::with_capacity(batch_size);

        for (i, (state, num_rows)) in states.into_iter().zip(lengths).enumerate() {
            let utterance = &data[i * stride..(i + 1) * stride];
            let (result, state) = decode_one(
                utterance,
                num_rows,
                num_features,
                &mut self.model,
                self.blank_penalty,
                state,
            )?;
            results.push(result);
            next_states.push(state);
        }

        Ok((results, next_states))
    }
}
