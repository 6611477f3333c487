// ============================================================
// Layer 4 — Chat Batcher
// ============================================================
// Implements Burn's Batcher trait: stacks N EncodedExamples
// into three [N, L] integer tensors, preserving example order.
//
// No padding happens here. The encoder already produced every
// sequence at exactly L ids, so batching is a flatten + reshape:
//   [ex1_t1, ..., ex1_tL, ex2_t1, ..., exN_tL] → [N, L]
//
// A length mismatch means the encoder is broken, not the data,
// so it panics instead of returning an error.
//
// Reference: Burn Book §4 (Batcher)

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::encoder::EncodedExample;

/// A batch of encoded pairs ready for the forward pass.
#[derive(Debug, Clone)]
pub struct ChatBatch<B: Backend> {
    /// Model input, shape [batch_size, seq_len]
    pub token_ids: Tensor<B, 2, Int>,

    /// 1 on answer positions, 0 on prompt and padding: [batch_size, seq_len]
    pub loss_mask: Tensor<B, 2, Int>,

    /// Next-token targets: [batch_size, seq_len]
    pub labels: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct ChatBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ChatBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    fn stack<F>(&self, items: &[EncodedExample], field: F, seq_len: usize) -> Tensor<B, 2, Int>
    where
        F: Fn(&EncodedExample) -> &[u32],
    {
        let flat: Vec<i32> = items
            .iter()
            .flat_map(|ex| field(ex).iter().map(|&x| x as i32))
            .collect();

        Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([items.len(), seq_len])
    }
}

impl<B: Backend> Batcher<EncodedExample, ChatBatch<B>> for ChatBatcher<B> {
    fn batch(&self, items: Vec<EncodedExample>) -> ChatBatch<B> {
        assert!(!items.is_empty(), "cannot batch zero examples");
        let seq_len = items[0].seq_len();

        for (i, ex) in items.iter().enumerate() {
            assert!(
                ex.token_ids.len() == seq_len
                    && ex.loss_mask.len() == seq_len
                    && ex.labels.len() == seq_len,
                "example {i} has lengths ({}, {}, {}), expected {seq_len}",
                ex.token_ids.len(),
                ex.loss_mask.len(),
                ex.labels.len(),
            );
        }

        ChatBatch {
            token_ids: self.stack(&items, |ex| ex.token_ids.as_slice(), seq_len),
            loss_mask: self.stack(&items, |ex| ex.loss_mask.as_slice(), seq_len),
            labels:    self.stack(&items, |ex| ex.labels.as_slice(), seq_len),
        }
    }
}
