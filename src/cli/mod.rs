// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with `clap` and hands off to Layer 2.
//
//   1. `train` — fine-tunes the model on a Q/A CSV file
//   2. `chat`  — loads a checkpoint and chats on the console
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, TrainArgs};

use crate::application::chat_use_case::ChatConfig;
use crate::application::train_use_case::TrainConfig;

#[derive(Parser, Debug)]
#[command(
    name = "ruda-chat",
    version = "0.1.0",
    about = "Fine-tune a pretrained language model on Q/A pairs, then chat with it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args) => run_train(args),
            Commands::Chat(args)  => run_chat(args.into()),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let chat_after = args.chat;
    let config: TrainConfig = args.into();
    tracing::info!("Starting training on '{}'", config.data_path);

    let summary = TrainUseCase::new(config.clone()).execute()?;

    let final_loss = summary.epoch_losses.last().copied().unwrap_or(f64::NAN);
    println!("Training complete after {} steps (final loss {:.4}).", summary.steps, final_loss);
    if let Some(best) = &summary.best_path {
        println!("Best checkpoint: {}", best.display());
    }

    if chat_after {
        run_chat(ChatConfig {
            model_path:     summary.last_path.to_string_lossy().into_owned(),
            tokenizer_path: config.tokenizer_path,
            ..ChatConfig::default()
        })?;
    }
    Ok(())
}

fn run_chat(config: ChatConfig) -> Result<()> {
    use crate::application::chat_use_case::{run_session, ChatUseCase};
    use burn::backend::{wgpu::WgpuDevice, Wgpu};

    let chat = ChatUseCase::<Wgpu>::new(config, WgpuDevice::default())?;

    let stdin = std::io::stdin();
    run_session(&chat, stdin.lock(), std::io::stdout(), chat.bot_name())?;
    Ok(())
}
