// ============================================================
// Layer 2 — Chat Use Case
// ============================================================
// Loads a fine-tuned checkpoint plus its tokenizer and answers
// utterances by greedy decoding. The console loop itself only
// sees the Responder trait:
//
//   user > 안녕
//   Ruda > 안녕하세요.
//   user > quit
//
// Each line is cleaned like the training text. `quit` or end of
// input closes the session; blank lines are skipped.

use anyhow::{ensure, Context, Result};
use burn::prelude::*;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, Write};
use std::sync::Arc;

use crate::data::{preprocessor::Preprocessor, vocab::Vocabulary};
use crate::domain::markers::CHAT_SENTIMENT;
use crate::domain::traits::Responder;
use crate::infra::{checkpoint, tokenizer_store::TokenizerStore};
use crate::ml::generator::Generator;
use crate::ml::model::ChatLmModel;

pub const USER_PROMPT: &str = "user > ";
pub const QUIT:        &str = "quit";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    pub model_path:     String,
    pub tokenizer_path: String,
    /// Longest reply, in tokens
    pub max_gen_len:    usize,
    pub sentiment:      String,
    pub bot_name:       String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model_path:     "checkpoints/model_last.mpk".to_string(),
            tokenizer_path: "model/tokenizer.json".to_string(),
            max_gen_len:    64,
            sentiment:      CHAT_SENTIMENT.to_string(),
            bot_name:       "Ruda".to_string(),
        }
    }
}

pub struct ChatUseCase<B: Backend> {
    config: ChatConfig,
    vocab:  Arc<Vocabulary>,
    model:  ChatLmModel<B>,
    device: B::Device,
}

impl<B: Backend> ChatUseCase<B> {
    pub fn new(config: ChatConfig, device: B::Device) -> Result<Self> {
        ensure!(config.max_gen_len > 0, "max_gen_len must be positive");

        let tokenizer = TokenizerStore::new(&config.tokenizer_path).load()?;
        let vocab     = Arc::new(Vocabulary::new(tokenizer)?);

        let hparams = checkpoint::load_hparams(&config.model_path)?;
        ensure!(
            hparams.model.vocab_size == vocab.size(),
            "Checkpoint '{}' was trained with vocab_size={}, but tokenizer '{}' has {}",
            config.model_path,
            hparams.model.vocab_size,
            config.tokenizer_path,
            vocab.size()
        );

        let (model, _) = checkpoint::load_model::<B>(&config.model_path, None, &device)?;
        tracing::info!(
            "Chat model ready (max_gen_len={}, sentiment={})",
            config.max_gen_len,
            config.sentiment
        );

        Ok(Self { config, vocab, model, device })
    }

    pub fn bot_name(&self) -> &str {
        &self.config.bot_name
    }
}

impl<B: Backend> Responder for ChatUseCase<B> {
    fn respond(&self, utterance: &str) -> Result<String> {
        let generator = Generator::<B, _>::new(
            &self.model,
            &self.vocab,
            self.device.clone(),
            self.config.max_gen_len,
            self.config.sentiment.as_str(),
        );
        let reply = generator.reply(utterance)?;
        tracing::debug!("{} reply tokens, {} forward passes", reply.token_ids.len(), reply.steps);
        Ok(reply.text)
    }
}

/// Console loop. Returns the number of utterances answered.
pub fn run_session<R: BufRead, W: Write>(
    responder: &impl Responder,
    mut input: R,
    mut output: W,
    bot_name:  &str,
) -> Result<usize> {
    let cleaner      = Preprocessor::new();
    let mut answered = 0usize;
    let mut line     = String::new();

    loop {
        write!(output, "{USER_PROMPT}")?;
        output.flush()?;

        line.clear();
        let read = input.read_line(&mut line).context("Cannot read from input")?;
        if read == 0 {
            writeln!(output)?;
            break;
        }

        let utterance = cleaner.clean(&line);
        if utterance == QUIT {
            break;
        }
        if utterance.is_empty() {
            continue;
        }

        let reply = responder.respond(&utterance)?;
        writeln!(output, "{bot_name} > {reply}")?;
        answered += 1;
    }

    tracing::debug!("Chat session closed after {} replies", answered);
    Ok(answered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::infra::checkpoint::{CheckpointManager, ModelHparams};
    use crate::infra::tokenizer_store::word_level_json;
    use burn::backend::NdArray;
    use std::io::Cursor;

    struct EchoResponder;

    impl Responder for EchoResponder {
        fn respond(&self, utterance: &str) -> Result<String> {
            Ok(format!("you said {utterance}"))
        }
    }

    fn session(input: &str) -> (usize, String) {
        let mut out = Vec::new();
        let n = run_session(&EchoResponder, Cursor::new(input), &mut out, "Ruda").unwrap();
        (n, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_quit_ends_session() {
        let (n, out) = session("hi\nquit\nnever read\n");
        assert_eq!(n, 1);
        assert_eq!(out, "user > Ruda > you said hi\nuser > ");
    }

    #[test]
    fn test_blank_lines_are_skipped_and_eof_ends() {
        let (n, out) = session("\n   \n  hello  \n");
        assert_eq!(n, 1);
        assert_eq!(out, "user > user > user > Ruda > you said hello\nuser > \n");
    }

    #[test]
    fn test_utterances_are_cleaned_like_training_text() {
        let (n, out) = session("  how\u{00A0}are\t\tyou\u{200B}  \n\u{FEFF}quit\n");
        assert_eq!(n, 1);
        assert_eq!(out, "user > Ruda > you said how are you\nuser > ");
    }

    #[test]
    fn test_responder_errors_propagate() {
        struct Failing;
        impl Responder for Failing {
            fn respond(&self, _: &str) -> Result<String> {
                anyhow::bail!("boom")
            }
        }
        let err = run_session(&Failing, Cursor::new("hi\n"), Vec::new(), "Ruda").unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    /// Writes a tokenizer and an untrained tiny checkpoint to `dir`.
    fn write_fixture(dir: &std::path::Path, model_vocab: Option<usize>) -> ChatConfig {
        let words: Vec<String> = ["0", "1", "hi", "hello"].iter().map(|w| w.to_string()).collect();
        let tok_path = dir.join("tokenizer.json");
        std::fs::write(&tok_path, word_level_json(&words).to_string()).unwrap();

        let vocab_size = Vocabulary::new(TokenizerStore::new(&tok_path).load().unwrap()).unwrap().size();
        let train = TrainConfig { max_len: 16, d_model: 8, num_heads: 2, num_layers: 1, d_ff: 16, ..TrainConfig::default() };
        let model_cfg = train.model_config(model_vocab.unwrap_or(vocab_size));

        let device = Default::default();
        let model: ChatLmModel<NdArray> = model_cfg.init(&device);
        let mut ckpt = CheckpointManager::new(dir).unwrap();
        ckpt.save_epoch(&model, &ModelHparams { model: model_cfg, train, epoch: 1, loss: 1.0 }).unwrap();

        ChatConfig {
            model_path:     ckpt.last_path().to_string_lossy().into_owned(),
            tokenizer_path: tok_path.to_string_lossy().into_owned(),
            max_gen_len:    4,
            ..ChatConfig::default()
        }
    }

    #[test]
    fn test_chat_use_case_replies_within_budget() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = write_fixture(dir.path(), None);

        let chat  = ChatUseCase::<NdArray>::new(cfg, Default::default()).unwrap();
        let reply = chat.respond("hi").unwrap();
        // An untrained model says anything, but never more than 4 words
        assert!(reply.split_whitespace().count() <= 4, "{reply:?}");
        assert_eq!(chat.bot_name(), "Ruda");
    }

    #[test]
    fn test_vocab_size_mismatch_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = write_fixture(dir.path(), Some(99));
        let err = ChatUseCase::<NdArray>::new(cfg, Default::default()).err().unwrap();
        assert!(err.to_string().contains("vocab_size=99"), "{err}");
    }
}
