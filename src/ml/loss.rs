// ============================================================
// Layer 5 — Masked Loss Step
// ============================================================
// Cross-entropy restricted to the answer span.
//
//   1. logits [N, L, V] from the model
//   2. loss_mask [N, L] expanded explicitly to [N, L, V]
//   3. where the mask is 0, every logit becomes -1e18, so the
//      row is a flat distribution that carries no gradient
//   4. per-position NLL of the label under log-softmax(V)
//   5. sum / sum(loss_mask)  →  mean loss per answer token
//
// A fully masked row still scores ln(V) (flat distribution),
// but it is a constant: it shifts the reported value and never
// the gradient. The denominator only counts answer tokens, so
// long prompts and padding never dilute the average.
//
// Reference: Burn Book §3 (Tensor operations)

use anyhow::{ensure, Result};
use burn::{prelude::*, tensor::activation::log_softmax};

use crate::data::batcher::ChatBatch;
use crate::ml::model::LanguageModel;

/// Logit written over masked-out positions
pub const MASKED_LOGIT: f32 = -1e18;

/// Mean cross-entropy per answer token.
///
/// `loss_mask` and `labels` must both be exactly `[N, L]` where
/// `logits` is `[N, L, V]`; nothing is broadcast implicitly.
pub fn masked_loss<B: Backend>(
    logits:    Tensor<B, 3>,
    loss_mask: Tensor<B, 2, Int>,
    labels:    Tensor<B, 2, Int>,
) -> Result<Tensor<B, 1>> {
    let [n, l, v] = logits.dims();
    ensure!(
        loss_mask.dims() == [n, l],
        "loss mask shape {:?} does not match logits {:?}",
        loss_mask.dims(),
        [n, l, v]
    );
    ensure!(
        labels.dims() == [n, l],
        "labels shape {:?} does not match logits {:?}",
        labels.dims(),
        [n, l, v]
    );

    let mask = loss_mask.float();

    let masked_out = mask
        .clone()
        .reshape([n, l, 1])
        .repeat_dim(2, v)
        .equal_elem(0.0);
    let adjusted = logits.mask_fill(masked_out, MASKED_LOGIT);

    let log_probs    = log_softmax(adjusted, 2);
    let per_position = log_probs.gather(2, labels.reshape([n, l, 1])).neg();

    Ok(per_position.sum() / mask.sum())
}

/// Forward pass + masked loss for one batch.
pub fn forward_loss<B: Backend, M: LanguageModel<B>>(
    model: &M,
    batch: ChatBatch<B>,
) -> Result<Tensor<B, 1>> {
    let logits = model.logits(batch.token_ids);
    masked_loss(logits, batch.loss_mask, batch.labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::tensor::ElementConversion;

    type TestBackend = NdArray;

    fn float3(values: Vec<f32>, shape: [usize; 3]) -> Tensor<TestBackend, 3> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    fn int2(values: Vec<i64>, shape: [usize; 2]) -> Tensor<TestBackend, 2, Int> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_scalar().elem::<f32>()
    }

    fn cross_entropy(row: &[f32], label: usize) -> f32 {
        let max = row.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let log_sum = row.iter().map(|x| (x - max).exp()).sum::<f32>().ln() + max;
        log_sum - row[label]
    }

    #[test]
    fn test_single_unmasked_position_is_plain_cross_entropy() {
        let row    = vec![0.5, 1.0, 2.0, -1.0];
        let logits = float3(row.clone(), [1, 1, 4]);
        let loss   = masked_loss(logits, int2(vec![1], [1, 1]), int2(vec![2], [1, 1])).unwrap();

        assert!((scalar(loss) - cross_entropy(&row, 2)).abs() < 1e-5);
    }

    #[test]
    fn test_divides_by_answer_tokens_not_positions() {
        // Row 0 masked, rows 1-2 in the answer span
        let rows = vec![
            vec![3.0, 0.0, 0.0],
            vec![0.2, 0.4, 0.1],
            vec![1.0, -1.0, 0.5],
        ];
        let labels = [0usize, 1, 2];
        let logits = float3(rows.concat(), [1, 3, 3]);
        let loss   = masked_loss(
            logits,
            int2(vec![0, 1, 1], [1, 3]),
            int2(labels.iter().map(|&x| x as i64).collect(), [1, 3]),
        )
        .unwrap();

        // The masked row is flat: it scores ln(V) regardless of its logits
        let expected = ((3.0f32).ln()
            + cross_entropy(&rows[1], labels[1])
            + cross_entropy(&rows[2], labels[2]))
            / 2.0;
        assert!((scalar(loss) - expected).abs() < 1e-4);
    }

    #[test]
    fn test_masked_logits_do_not_change_the_loss() {
        let mask   = vec![0, 1, 0, 1];
        let labels = vec![0, 2, 1, 1];
        let base   = vec![
            0.1, 0.2, 0.3,
            1.0, 0.0, 2.0,
            0.4, 0.4, 0.4,
            -1.0, 3.0, 0.0,
        ];
        let mut noisy = base.clone();
        // Scramble only the masked rows (positions 0 and 2)
        noisy[0..3].copy_from_slice(&[50.0, -20.0, 7.0]);
        noisy[6..9].copy_from_slice(&[-3.0, 99.0, 0.0]);

        let a = masked_loss(float3(base, [2, 2, 3]), int2(mask.clone(), [2, 2]), int2(labels.clone(), [2, 2])).unwrap();
        let b = masked_loss(float3(noisy, [2, 2, 3]), int2(mask, [2, 2]), int2(labels, [2, 2])).unwrap();

        assert!((scalar(a) - scalar(b)).abs() < 1e-5);
    }

    #[test]
    fn test_masked_positions_get_zero_gradient() {
        type AdBackend = Autodiff<NdArray>;
        let device = Default::default();

        let logits = Tensor::<AdBackend, 3>::from_data(
            TensorData::new(vec![0.3f32, -0.2, 1.5, 0.7, 0.1, -0.4], [1, 2, 3]),
            &device,
        )
        .require_grad();
        let mask   = Tensor::<AdBackend, 2, Int>::from_data(TensorData::new(vec![0i64, 1], [1, 2]), &device);
        let labels = Tensor::<AdBackend, 2, Int>::from_data(TensorData::new(vec![2i64, 0], [1, 2]), &device);

        let loss  = masked_loss(logits.clone(), mask, labels).unwrap();
        let grads = loss.backward();
        let grad: Vec<f32> = logits.grad(&grads).unwrap().into_data().iter::<f32>().collect();

        assert!(grad[0..3].iter().all(|g| g.abs() < 1e-8), "masked grad {:?}", &grad[0..3]);
        assert!(grad[3..6].iter().any(|g| g.abs() > 1e-4));
    }

    #[test]
    fn test_shape_mismatch_is_an_error() {
        let logits = float3(vec![0.0; 12], [1, 4, 3]);
        let err = masked_loss(logits, int2(vec![1, 1, 1], [1, 3]), int2(vec![0; 4], [1, 4]));
        assert!(err.is_err());

        let logits = float3(vec![0.0; 12], [1, 4, 3]);
        let err = masked_loss(logits, int2(vec![1; 4], [1, 4]), int2(vec![0; 4], [4, 1]));
        assert!(err.is_err());
    }
}
