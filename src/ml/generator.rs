// ============================================================
// Layer 5 — Greedy Reply Generator
// ============================================================
// Produces one reply per user utterance:
//
//   context = <usr> utterance </s> <unused1> sentiment </s> <sys>
//   loop:
//     logits = model(context)          [1, len, V]
//     next   = argmax(logits[last])
//     stop if next == </s> or the reply reached max_gen_len
//     context += next
//
// Every step depends on the previous one, so this is strictly
// sequential. When the context outgrows the model's position
// table only its trailing window is fed.

use anyhow::Result;
use burn::{prelude::*, tensor::ElementConversion};

use crate::data::encoder::build_prompt;
use crate::data::vocab::Vocabulary;
use crate::ml::model::LanguageModel;

/// One generated reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text:      String,
    pub token_ids: Vec<u32>,
    /// Forward passes run, including the one that produced </s>
    pub steps:     usize,
}

pub struct Generator<'a, B: Backend, M: LanguageModel<B>> {
    model:       &'a M,
    vocab:       &'a Vocabulary,
    device:      B::Device,
    max_gen_len: usize,
    sentiment:   String,
}

impl<'a, B: Backend, M: LanguageModel<B>> Generator<'a, B, M> {
    pub fn new(
        model:       &'a M,
        vocab:       &'a Vocabulary,
        device:      B::Device,
        max_gen_len: usize,
        sentiment:   impl Into<String>,
    ) -> Self {
        Self { model, vocab, device, max_gen_len, sentiment: sentiment.into() }
    }

    pub fn reply(&self, utterance: &str) -> Result<Reply> {
        let special = *self.vocab.special();

        let mut context = build_prompt(self.vocab, utterance, &self.sentiment)?;
        context.push(special.sys);

        let mut generated = Vec::new();
        let mut steps     = 0usize;

        while generated.len() < self.max_gen_len {
            steps += 1;
            let next = self.next_token(&context);
            if next == special.eos {
                break;
            }
            generated.push(next);
            context.push(next);
        }

        if generated.len() == self.max_gen_len {
            tracing::debug!("Reply cut at max_gen_len={}", self.max_gen_len);
        }

        let text = self.vocab.detokenize(&generated)?;
        tracing::debug!("Generated {} tokens in {} steps: '{}'", generated.len(), steps, text);

        Ok(Reply { text, token_ids: generated, steps })
    }

    /// Argmax over the logits of the last position.
    fn next_token(&self, context: &[u32]) -> u32 {
        let start  = context.len().saturating_sub(self.model.max_positions());
        let window = &context[start..];
        let len    = window.len();

        let input_flat: Vec<i32> = window.iter().map(|&x| x as i32).collect();
        let input = Tensor::<B, 1, Int>::from_ints(input_flat.as_slice(), &self.device)
            .reshape([1, len]);

        let logits = self.model.logits(input);
        let [_, _, vocab_size] = logits.dims();

        let last = logits
            .slice([0..1, len - 1..len, 0..vocab_size])
            .reshape([vocab_size]);

        last.argmax(0).into_scalar().elem::<i64>() as u32
    }
}
