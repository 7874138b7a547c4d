//! Test helpers: deterministic stand-in for the decoder/joiner networks

#![allow(dead_code)]

use nemo_greedy::{
    DecodeError, DecoderInput, DecoderOutput, DecoderState, Result, TransducerModel,
};
use ndarray::{Array1, ArrayD, ArrayView3, ArrayViewD, IxDyn};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Joiner returns the encoder frame itself as logits, so every frame's
/// decision is fixed by the test data and independent of decoder history.
///
/// The decoder state is a single 1-D tensor holding every token the decoder
/// has been fed, which makes state threading observable.
pub struct EchoModel {
    vocab_size: usize,
    /// Tokens passed to `run_decoder`, in call order
    pub decoder_tokens: Vec<i32>,
    pub joiner_calls: usize,
    /// Fail the joiner on this call (0-based)
    pub fail_joiner_at: Option<usize>,
    /// Drop the last logit from every joiner output
    pub truncate_logits: bool,
}

impl EchoModel {
    pub fn new(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            decoder_tokens: Vec::new(),
            joiner_calls: 0,
            fail_joiner_at: None,
            truncate_logits: false,
        }
    }

    pub fn blank_id(&self) -> i32 {
        self.vocab_size as i32 - 1
    }
}

impl TransducerModel for EchoModel {
    fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    fn init_state(&self) -> Result<DecoderState> {
        Ok(history_state(&[]))
    }

    fn run_decoder(
        &mut self,
        input: DecoderInput,
        state: DecoderState,
    ) -> Result<(DecoderOutput, DecoderState)> {
        assert_eq!(input.token.shape(), &[1, 1]);
        assert_eq!(input.length[0], 1);

        let token = input.token[[0, 0]];
        self.decoder_tokens.push(token);

        let mut history: Vec<f32> = state.into_tensors().remove(0).iter().copied().collect();
        history.push(token as f32);
        let history = ArrayD::from_shape_vec(IxDyn(&[history.len()]), history)
            .map_err(|e| DecodeError::inference(e.to_string()))?;

        let out = ArrayD::from_elem(IxDyn(&[1, 1, 1]), token as f32);
        Ok((out, DecoderState::new(vec![history])))
    }

    fn run_joiner(
        &mut self,
        encoder_out: ArrayView3<'_, f32>,
        decoder_out: ArrayViewD<'_, f32>,
    ) -> Result<Array1<f32>> {
        assert_eq!(encoder_out.dim(), (1, self.vocab_size, 1));
        assert_eq!(decoder_out.shape(), &[1, 1, 1]);

        let call = self.joiner_calls;
        self.joiner_calls += 1;
        if self.fail_joiner_at == Some(call) {
            return Err(DecodeError::inference(format!("joiner failed on call {}", call)));
        }

        let mut logits: Vec<f32> = encoder_out.iter().copied().collect();
        if self.truncate_logits {
            logits.pop();
        }
        Ok(Array1::from_vec(logits))
    }
}

/// Decoder state holding the given token history
pub fn history_state(tokens: &[i32]) -> DecoderState {
    let history: Vec<f32> = tokens.iter().map(|&t| t as f32).collect();
    DecoderState::new(vec![ArrayD::from_shape_vec(IxDyn(&[history.len()]), history).unwrap()])
}

/// Pseudo-random logits in [0, 1), `num_frames * vocab_size` values
pub fn random_frames(num_frames: usize, vocab_size: usize, seed: u64) -> Vec<f32> {
    let mut x = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..num_frames * vocab_size)
        .map(|_| {
            x = x
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (x >> 40) as f32 / (1u64 << 24) as f32
        })
        .collect()
}

/// Frames whose argmax is the given token (blank when `None`)
pub fn frames_for(decisions: &[Option<usize>], vocab_size: usize) -> Vec<f32> {
    let blank = vocab_size - 1;
    let mut data = vec![0.0; decisions.len() * vocab_size];
    for (t, decision) in decisions.iter().enumerate() {
        let winner = decision.unwrap_or(blank);
        data[t * vocab_size + winner] = 1.0;
    }
    data
}
