// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands: `train` and `chat`.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use crate::application::chat_use_case::ChatConfig;
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune the language model on a Q/A CSV file
    Train(TrainArgs),

    /// Chat with a trained checkpoint
    Chat(ChatArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// CSV file with a header row and question/answer columns
    #[arg(long, default_value = "data/ChatbotData.csv")]
    pub data: String,

    /// Column holding the user utterance
    #[arg(long, default_value = "Q")]
    pub question_column: String,

    /// Column holding the reply
    #[arg(long, default_value = "A")]
    pub answer_column: String,

    /// tokenizer.json of the pretrained model (built from the data if missing)
    #[arg(long, default_value = "model/tokenizer.json")]
    pub tokenizer: String,

    /// Directory for checkpoints, metrics and the run config
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Checkpoint to initialise the weights from
    #[arg(long)]
    pub pretrained: Option<String>,

    /// Tokens per example: prompt + answer + padding
    #[arg(long, default_value_t = 32)]
    pub max_len: usize,

    #[arg(long, default_value_t = 96)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 3)]
    pub epochs: usize,

    /// Peak learning rate
    #[arg(long, default_value_t = 5e-5)]
    pub lr: f64,

    /// Fraction of all updates spent warming up
    #[arg(long, default_value_t = 0.1)]
    pub warmup_ratio: f64,

    #[arg(long, default_value_t = 0.01)]
    pub weight_decay: f64,

    /// Global gradient-norm ceiling
    #[arg(long, default_value_t = 1.0)]
    pub grad_clip: f64,

    /// Data loader worker threads
    #[arg(long, default_value_t = 2)]
    pub num_workers: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Vocabulary size when a tokenizer has to be built
    #[arg(long, default_value_t = 30000)]
    pub vocab_size: usize,

    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Start a chat session with the last checkpoint when done
    #[arg(long)]
    pub chat: bool,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            data_path:       a.data,
            question_column: a.question_column,
            answer_column:   a.answer_column,
            tokenizer_path:  a.tokenizer,
            checkpoint_dir:  a.checkpoint_dir,
            pretrained:      a.pretrained,
            max_len:         a.max_len,
            batch_size:      a.batch_size,
            epochs:          a.epochs,
            lr:              a.lr,
            warmup_ratio:    a.warmup_ratio,
            weight_decay:    a.weight_decay,
            grad_clip:       a.grad_clip,
            num_workers:     a.num_workers,
            seed:            a.seed,
            vocab_size:      a.vocab_size,
            d_model:         a.d_model,
            num_heads:       a.num_heads,
            num_layers:      a.num_layers,
            d_ff:            a.d_ff,
            dropout:         a.dropout,
        }
    }
}

#[derive(Args, Debug)]
pub struct ChatArgs {
    /// Checkpoint to load (with or without .mpk)
    #[arg(long, default_value = "checkpoints/model_last")]
    pub model: String,

    /// tokenizer.json the checkpoint was trained with
    #[arg(long, default_value = "model/tokenizer.json")]
    pub tokenizer: String,

    /// Longest reply, in tokens
    #[arg(long, default_value_t = 64)]
    pub max_gen_len: usize,

    /// Sentiment class placed in the prompt
    #[arg(long, default_value = "0")]
    pub sentiment: String,

    #[arg(long, default_value = "Ruda")]
    pub bot_name: String,
}

impl From<ChatArgs> for ChatConfig {
    fn from(a: ChatArgs) -> Self {
        ChatConfig {
            model_path:     a.model,
            tokenizer_path: a.tokenizer,
            max_gen_len:    a.max_gen_len,
            sentiment:      a.sentiment,
            bot_name:       a.bot_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["ruda-chat", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert!(!args.chat);
        assert_eq!(TrainConfig::from(args), TrainConfig::default());
    }

    #[test]
    fn test_chat_args_map_to_config() {
        let cli = Cli::try_parse_from([
            "ruda-chat", "chat",
            "--model", "ck/model_02-1.37.mpk",
            "--tokenizer", "tok.json",
            "--max-gen-len", "10",
            "--sentiment", "2",
        ])
        .unwrap();
        let Commands::Chat(args) = cli.command else { panic!("expected chat") };
        let cfg = ChatConfig::from(args);
        assert_eq!(cfg.model_path, "ck/model_02-1.37.mpk");
        assert_eq!(cfg.max_gen_len, 10);
        assert_eq!(cfg.sentiment, "2");
        assert_eq!(cfg.bot_name, "Ruda");
    }
}
