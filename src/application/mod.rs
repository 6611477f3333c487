// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal (training, or a
// chat session). No tensor math and no argument parsing here,
// only workflow coordination.
//
// Reference: Clean Architecture pattern

// The fine-tuning workflow
pub mod train_use_case;

// Checkpoint loading + the interactive console loop
pub mod chat_use_case;
