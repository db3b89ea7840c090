//! # wgen-generator
//!
//! Turns a component description into a validated HTML document.
//!
//! # Usage
//!
//! ```bash
//! # Generate one component from the command line
//! cargo run -p wgen-generator --bin wgen-generate -- "a red button with a hover effect"
//!
//! # Larger model, write to a file
//! MODEL_SIZE=6.7b cargo run -p wgen-generator --bin wgen-generate -- "a pricing table" -o table.html
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Description │ ──> │   Prompt    │ ──> │ModelHandler │
//! │             │     │   Builder   │     │ (generate)  │
//! └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                │
//!                     ┌──────────────────────────┘
//!                     ▼
//!              ┌─────────────┐
//!              │   Extract   │ ── (none) ──> ExtractionFailed
//!              └──────┬──────┘
//!                     │
//!     ┌───────────────┴───────────────┐
//!     ▼                               ▼
//! ┌─────────────┐               ┌─────────────┐
//! │  Validate   │    (then)     │  Sanitize   │
//! │ (raw HTML)  │ ────────────> │             │
//! └─────────────┘               └─────────────┘
//! ```

pub mod generator;

pub use generator::{parse_max_tokens, GenerationOrchestrator, GeneratorConfig};
