//! Mender Core - overview repair for Jellyfin music libraries.
//!
//! Mender lists albums and artists from a Jellyfin server, picks the ones
//! whose overview is missing or too short, asks an LLM for a replacement and
//! writes it back.
//!
//! # Architecture
//!
//! ```text
//! List items → Drop tracks → Classify (< 50 chars) → Prompt LLM → Write back → Stats
//! ```
//!
//! Items are processed one at a time, in listing order. The library server and
//! the LLM backend sit behind the [`Library`] and [`LlmProvider`] traits.
//!
//! # Usage
//!
//! ```rust,ignore
//! use mender_core::{Config, Mender, RunOptions, RunOutcome};
//!
//! #[tokio::main]
//! async fn main() -> mender_core::Result<()> {
//!     let config = Config::load_from("config.json".as_ref())?;
//!     let mender = Mender::from_config(&config, RunOptions::from_config(&config))?;
//!
//!     if let RunOutcome::Finished(report) = mender.run(|_| {}).await? {
//!         println!("Updated {}", report.stats.updated);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod library;
pub mod llm;
pub mod run;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, LibraryError, LlmError, MenderError, Result};
pub use library::{JellyfinClient, Library, UpdateOutcome};
pub use llm::{LlmProvider, LlmProviderFactory, Rewriter};
pub use run::{ItemOutcome, ItemProgress, Mender, RunOptions, RunOutcome, RunReport};
pub use types::{ChangeRecord, Item, ItemKind, RunStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
