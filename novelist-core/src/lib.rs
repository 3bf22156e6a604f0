//! Novel-writing engine with an AI creation assistant.
//!
//! This crate provides:
//! - A 9-step guided creation workflow, from configuration to polish
//! - An AI creation assistant backed by the Gemini API
//! - A consistency memory bank that keeps long drafts coherent
//! - Localized (English/Chinese) prompts, defaults, and notices
//!
//! # Quick Start
//!
//! ```ignore
//! use novelist_core::{CreatorSession, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SessionConfig::new().with_api_key("...");
//!
//!     let mut session = CreatorSession::new(config);
//!
//!     let turn = session.send("Let's write a sci-fi heist novel").await?;
//!     println!("{}", turn.reply);
//!     println!("now at {}", turn.step);
//!     Ok(())
//! }
//! ```

pub mod assistant;
pub mod message;
pub mod session;
pub mod settings;
pub mod steps;
pub mod testing;

// Primary public API
pub use assistant::{ClientConfig, ConsistencyMemory, ModelClient};
pub use message::{Message, MessageId, Role};
pub use session::{CreatorSession, SessionConfig, SessionError, Turn};
pub use settings::{Language, NovelSettings, SettingField};
pub use steps::{detect_step, CreatorStep};
pub use testing::TestHarness;
