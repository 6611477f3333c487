// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs, constants and traits describing what a
// chat training pair IS, independent of how it is tokenised
// or fed to a model.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, constants and traits
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// A question / answer pair read from the training corpus
pub mod raw_pair;

// Special marker tokens shared by the encoder and the generator
pub mod markers;

// Core abstractions (traits) that other layers implement
pub mod traits;
