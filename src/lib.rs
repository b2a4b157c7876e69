//! medchat - a terminal client for a medication-consultation and
//! emotional-support chat service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  ┌─────────────┐
//! │  One-shot   │  │    REPL     │
//! └──────┬──────┘  └──────┬──────┘
//!        └────────┬───────┘
//!          ┌──────┴──────┐
//!          │ ChatSession │
//!          └──┬───────┬──┘
//!     ┌───────┴──┐ ┌──┴──────────┐
//!     │  Store   │ │ HTTP client │
//!     └──────────┘ └─────────────┘
//! ```

pub mod cli;
pub mod config;
pub mod core;

pub use config::Config;
