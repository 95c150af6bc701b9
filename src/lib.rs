//! Sori - voice-driven Korean conversational assistant
//!
//! One supervisory loop over four delegated capabilities:
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌────────────┐   ┌─────────────┐
//! │  Capture  │──▶│ Transcribe │──▶│  Generate  │──▶│ Speak/Play  │
//! │  (cpal)   │   │ (STT API)  │   │ (chat API) │   │ (TTS + cpal)│
//! └──────────┘   └─────────────┘   └────────────┘   └─────────────┘
//!       ▲                                                  │
//!       └───────────────── session loop ◀──────────────────┘
//! ```
//!
//! Turns are strictly sequential; every external failure degrades to a
//! re-prompt, a fallback reply, or a silent turn — never a crash. The
//! session ends only when an exit phrase is spoken.

pub mod config;
pub mod error;
pub mod llm;
pub mod session;
pub mod voice;

pub use config::Settings;
pub use error::{Error, Result};
pub use session::Session;
