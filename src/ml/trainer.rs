// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Fine-tunes the chat LM with the masked loss.
//
//   for each epoch:
//     for each shuffled batch:
//       loss  = masked_loss(model(token_ids), loss_mask, labels)
//       grads = loss.backward()
//       model = AdamW.step(lr(step), model, clip(grads))
//     log mean loss → metrics.csv
//     save model_last (+ model_{epoch}-{loss} when it is the best)
//
// AdamW decays every parameter (no grouping); gradients are
// clipped by global norm inside the optimizer. The learning rate
// follows WarmupCosine over ceil(N / batch_size) * epochs updates.
//
// A NaN or infinite loss aborts the run.
//
// Reference: Burn Book §5, Loshchilov & Hutter (2019) AdamW

use anyhow::{ensure, Result};
use burn::{
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    grad_clipping::GradientClippingConfig,
    optim::{AdamWConfig, GradientsParams, Optimizer},
    tensor::{backend::AutodiffBackend, ElementConversion},
};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::ChatBatcher, dataset::ChatDataset};
use crate::infra::checkpoint::{self, CheckpointManager, ModelHparams};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::loss::forward_loss;
use crate::ml::model::ChatLmModel;
use crate::ml::schedule::WarmupCosine;

type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;

/// What a finished run leaves behind.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub best_path:    Option<PathBuf>,
    pub last_path:    PathBuf,
    pub epoch_losses: Vec<f64>,
    pub steps:        usize,
}

pub fn run_training(
    cfg:        &TrainConfig,
    dataset:    ChatDataset,
    vocab_size: usize,
    ckpt:       CheckpointManager,
) -> Result<TrainSummary> {
    let device = burn::backend::wgpu::WgpuDevice::default();
    tracing::info!("Using WGPU device: {:?}", device);
    train_loop::<TrainBackend>(cfg, dataset, vocab_size, ckpt, device)
}

pub(crate) fn train_loop<B: AutodiffBackend>(
    cfg:        &TrainConfig,
    dataset:    ChatDataset,
    vocab_size: usize,
    mut ckpt:   CheckpointManager,
    device:     B::Device,
) -> Result<TrainSummary> {
    let n_examples = dataset.len();
    ensure!(n_examples > 0, "No training examples");

    B::seed(cfg.seed);

    // ── Build or restore the model ────────────────────────────────────────────
    let model_cfg = cfg.model_config(vocab_size);
    let mut model: ChatLmModel<B> = match &cfg.pretrained {
        Some(path) => checkpoint::load_model::<B>(path, Some(&model_cfg), &device)?.0,
        None       => model_cfg.init(&device),
    };
    tracing::info!(
        "Model ready: {} layers, d_model={}, vocab={}, max_positions={}",
        model_cfg.num_layers, model_cfg.d_model, model_cfg.vocab_size, model_cfg.max_positions
    );

    // ── AdamW with global-norm clipping ───────────────────────────────────────
    let mut optim = AdamWConfig::new()
        .with_weight_decay(cfg.weight_decay as f32)
        .with_grad_clipping(Some(GradientClippingConfig::Norm(cfg.grad_clip as f32)))
        .init();

    let steps_per_epoch = n_examples.div_ceil(cfg.batch_size);
    let schedule = WarmupCosine::from_ratio(cfg.lr, steps_per_epoch * cfg.epochs, cfg.warmup_ratio);
    tracing::info!(
        "{} examples, {} steps/epoch, {} total steps ({} warmup)",
        n_examples, steps_per_epoch, schedule.total_steps(), schedule.warmup_steps()
    );

    let loader = DataLoaderBuilder::new(ChatBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .build(dataset);

    let metrics = MetricsLogger::new(ckpt.dir())?;
    tracing::info!("Logging metrics to '{}'", metrics.csv_path().display());

    let mut step         = 0usize;
    let mut lr           = schedule.lr_at(0);
    let mut epoch_losses = Vec::with_capacity(cfg.epochs);

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;

        for batch in loader.iter() {
            let loss = forward_loss(&model, batch)?;

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            ensure!(
                loss_val.is_finite(),
                "Loss became {} at epoch {}, step {}",
                loss_val, epoch, step
            );
            loss_sum += loss_val;
            batches  += 1;

            lr = schedule.lr_at(step);
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(lr, model, grads);
            step += 1;

            tracing::debug!("epoch {} step {} loss {:.4} lr {:.2e}", epoch, step, loss_val, lr);
        }

        let mean_loss = loss_sum / batches.max(1) as f64;
        epoch_losses.push(mean_loss);

        tracing::info!(
            "Epoch {:>3}/{} | loss={:.4} | lr={:.2e} | steps={}",
            epoch, cfg.epochs, mean_loss, lr, step
        );
        metrics.log(&EpochMetrics::new(epoch, mean_loss, lr, step))?;

        let hparams = ModelHparams {
            model: model_cfg.clone(),
            train: cfg.clone(),
            epoch,
            loss:  mean_loss,
        };
        ckpt.save_epoch(&model, &hparams)?;
    }

    let best_path = ckpt.best_path();
    match &best_path {
        Some(p) => tracing::info!("Training complete! Best checkpoint: '{}'", p.display()),
        None    => tracing::info!("Training complete!"),
    }

    Ok(TrainSummary { best_path, last_path: ckpt.last_path(), epoch_losses, steps: step })
}
