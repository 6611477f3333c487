use burn::{
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

/// Anything that maps token ids [batch, seq] to next-token
/// logits [batch, seq, vocab]. The loss step and the generator
/// only see this trait.
pub trait LanguageModel<B: Backend> {
    fn logits(&self, token_ids: Tensor<B, 2, Int>) -> Tensor<B, 3>;

    /// Longest sequence the model accepts in one forward pass
    fn max_positions(&self) -> usize;
}

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally; adding them again gives conflicting impls.
#[derive(Config, Debug)]
pub struct ChatLmConfig {
    pub vocab_size:    usize,
    pub max_positions: usize,
    pub d_model:       usize,
    pub num_heads:     usize,
    pub num_layers:    usize,
    pub d_ff:          usize,
    #[config(default = 0.1)]
    pub dropout:       f64,
}

impl ChatLmConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ChatLmModel<B> {
        let token_embedding    = EmbeddingConfig::new(self.vocab_size, self.d_model).init(device);
        let position_embedding = EmbeddingConfig::new(self.max_positions, self.d_model).init(device);
        let layers: Vec<DecoderBlock<B>> = (0..self.num_layers)
            .map(|_| self.build_decoder_block(device))
            .collect();
        let final_norm = LayerNormConfig::new(self.d_model).init(device);
        let lm_head    = LinearConfig::new(self.d_model, self.vocab_size).init(device);
        let dropout    = DropoutConfig::new(self.dropout).init();
        ChatLmModel {
            token_embedding, position_embedding, layers,
            final_norm, lm_head, dropout,
            max_positions: self.max_positions,
        }
    }

    fn build_decoder_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        let self_attn   = MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
            .with_dropout(self.dropout)
            .init(device);
        let ffn_linear1 = LinearConfig::new(self.d_model, self.d_ff).init(device);
        let ffn_linear2 = LinearConfig::new(self.d_ff, self.d_model).init(device);
        let norm1   = LayerNormConfig::new(self.d_model).init(device);
        let norm2   = LayerNormConfig::new(self.d_model).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        DecoderBlock { self_attn, ffn_linear1, ffn_linear2, norm1, norm2, dropout }
    }

    /// Fields whose values differ from `other` and change parameter
    /// shapes. Empty when weights saved under `other` fit this config.
    pub fn shape_mismatches(&self, other: &ChatLmConfig) -> Vec<String> {
        let fields = [
            ("vocab_size",    self.vocab_size,    other.vocab_size),
            ("max_positions", self.max_positions, other.max_positions),
            ("d_model",       self.d_model,       other.d_model),
            ("num_heads",     self.num_heads,     other.num_heads),
            ("num_layers",    self.num_layers,    other.num_layers),
            ("d_ff",          self.d_ff,          other.d_ff),
        ];
        fields
            .iter()
            .filter(|(_, a, b)| a != b)
            .map(|(name, a, b)| format!("{name}: {a} vs {b}"))
            .collect()
    }
}

/// Post-norm transformer block with causal self-attention.
#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    pub self_attn:   MultiHeadAttention<B>,
    pub ffn_linear1: Linear<B>,
    pub ffn_linear2: Linear<B>,
    pub norm1:       LayerNorm<B>,
    pub norm2:       LayerNorm<B>,
    pub dropout:     Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    pub fn forward(&self, x: Tensor<B, 3>, causal: Tensor<B, 3, Bool>) -> Tensor<B, 3> {
        let attn_output = self.self_attn
            .forward(MhaInput::self_attn(x.clone()).mask_attn(causal))
            .context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_output));
        let ffn_out = self.ffn_linear2.forward(
            burn::tensor::activation::gelu(self.ffn_linear1.forward(x.clone()))
        );
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct ChatLmModel<B: Backend> {
    pub token_embedding:    Embedding<B>,
    pub position_embedding: Embedding<B>,
    pub layers:             Vec<DecoderBlock<B>>,
    pub final_norm:         LayerNorm<B>,
    pub lm_head:            Linear<B>,
    pub dropout:            Dropout,
    pub max_positions:      usize,
}

impl<B: Backend> ChatLmModel<B> {
    /// token_ids: [batch, seq_len] → logits: [batch, seq_len, vocab_size]
    pub fn forward(&self, token_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = token_ids.dims();
        let device = token_ids.device();

        let tok_emb = self.token_embedding.forward(token_ids);

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &device)
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        // Position i may only attend to positions <= i
        let causal = generate_autoregressive_mask::<B>(batch_size, seq_len, &device);

        let mut x = self.dropout.forward(tok_emb + pos_emb);
        for layer in &self.layers {
            x = layer.forward(x, causal.clone());
        }
        let x = self.final_norm.forward(x);

        self.lm_head.forward(x)
    }
}

impl<B: Backend> LanguageModel<B> for ChatLmModel<B> {
    fn logits(&self, token_ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        self.forward(token_ids)
    }

    fn max_positions(&self) -> usize {
        self.max_positions
    }
}
