// ============================================================
// Layer 4 — Example Encoder
// ============================================================
// Turns one RawPair into three parallel sequences of exactly
// `max_len` ids: the model input, the loss mask and the labels.
//
//   token_ids  <usr> q.. </s> <unused1> 1 </s> <sys> a.. </s> <pad> <pad>
//   loss_mask    0   0..  0      0      0  0     1   1..  1     0     0
//   labels      <unused0> × q_len           a.. </s> <pad> <pad>  <pad>
//
// The labels are the answer shifted one position left (the
// leading <sys> is dropped), so position i is trained to
// predict token i+1.
//
// When the pair does not fit, the ANSWER is cut from the
// front: its tail, including the closing </s>, always survives.
// The prompt is never cut; a prompt that leaves no room for a
// single answer token is rejected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::vocab::Vocabulary;
use crate::domain::markers::TRAIN_SENTIMENT;
use crate::domain::raw_pair::RawPair;

/// One pair ready for batching. All three sequences share one length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedExample {
    pub token_ids: Vec<u32>,
    pub loss_mask: Vec<u32>,
    pub labels:    Vec<u32>,
}

impl EncodedExample {
    pub fn seq_len(&self) -> usize {
        self.token_ids.len()
    }

    /// Number of positions that count towards the loss
    pub fn answer_len(&self) -> usize {
        self.loss_mask.iter().filter(|&&m| m == 1).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("prompt is {q_len} tokens, leaving no room for an answer within {max_len}")]
    PromptTooLong { q_len: usize, max_len: usize },

    #[error("tokenizer failed: {0}")]
    Tokenizer(String),
}

/// `<usr> question </s> <unused1> sentiment </s>`
pub fn build_prompt(
    vocab:     &Vocabulary,
    question:  &str,
    sentiment: &str,
) -> Result<Vec<u32>, EncodeError> {
    let s = vocab.special();

    let mut prompt = vec![s.usr];
    prompt.extend(vocab.tokenize(question).map_err(EncodeError::Tokenizer)?);
    prompt.push(s.eos);
    prompt.push(s.sent);
    prompt.extend(vocab.tokenize(sentiment).map_err(EncodeError::Tokenizer)?);
    prompt.push(s.eos);
    Ok(prompt)
}

/// Right-pad with `pad` (or cut) to exactly `len` ids.
fn pad_to(ids: &mut Vec<u32>, len: usize, pad: u32) {
    ids.resize(len, pad);
}

pub struct ExampleEncoder {
    vocab:     Arc<Vocabulary>,
    max_len:   usize,
    sentiment: String,
    /// Set once the first example has been logged
    logged:    AtomicBool,
}

impl ExampleEncoder {
    pub fn new(vocab: Arc<Vocabulary>, max_len: usize) -> Self {
        Self {
            vocab,
            max_len,
            sentiment: TRAIN_SENTIMENT.to_string(),
            logged:    AtomicBool::new(false),
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    pub fn encode(&self, pair: &RawPair) -> Result<EncodedExample, EncodeError> {
        let s      = *self.vocab.special();
        let prompt = build_prompt(&self.vocab, &pair.question, &self.sentiment)?;
        let q_len  = prompt.len();

        if q_len >= self.max_len {
            return Err(EncodeError::PromptTooLong { q_len, max_len: self.max_len });
        }

        let mut answer = vec![s.sys];
        answer.extend(self.vocab.tokenize(&pair.answer).map_err(EncodeError::Tokenizer)?);
        answer.push(s.eos);
        let mut a_len = answer.len();

        if q_len + a_len > self.max_len {
            a_len  = self.max_len - q_len;
            answer = answer.split_off(answer.len() - a_len);
            assert_eq!(
                a_len,
                answer.len(),
                "answer truncation kept {} tokens, expected {}",
                answer.len(),
                a_len
            );
        }

        let mut labels = vec![s.mask; q_len];
        labels.extend_from_slice(&answer[1..]);

        let mut loss_mask = vec![0u32; q_len];
        loss_mask.resize(q_len + a_len, 1);
        loss_mask.resize(self.max_len, 0);

        if !self.logged.swap(true, Ordering::Relaxed) {
            tracing::info!("contexts : {}", pair.question);
            tracing::info!("toked ctx: {:?}", self.vocab.pieces(&prompt));
            tracing::info!("response : {}", pair.answer);
            tracing::info!("toked response : {:?}", self.vocab.pieces(&answer));
            tracing::info!("labels {:?}", self.vocab.pieces(&labels));
        }

        let mut token_ids = prompt;
        token_ids.extend_from_slice(&answer);

        pad_to(&mut token_ids, self.max_len, s.pad);
        pad_to(&mut labels, self.max_len, s.pad);

        Ok(EncodedExample { token_ids, loss_mask, labels })
    }
}
