//! Article review loop for content-validator.
//!
//! This crate provides:
//! - `ReviewState` and the `Message` transcript a run accumulates
//! - `Router` implementations deciding whether another search round is needed
//! - `Analyzer` (text generation) and `EvidenceFetcher` (web search) adapters
//! - `ReviewLoop`, the driver tying them together, and `ReviewSession` history

mod analyzer;
mod driver;
mod fetcher;
mod prompt;
mod router;
mod session;
mod state;

pub use analyzer::{Analyzer, NO_RESPONSE_PLACEHOLDER};
pub use driver::{ReviewLoop, ReviewOutcome, DEFAULT_MAX_ROUNDS};
pub use fetcher::EvidenceFetcher;
pub use prompt::ReviewPrompt;
pub use router::{Decision, KeywordRouter, ReviewMode, Router, ToolCallRouter};
pub use session::ReviewSession;
pub use state::{is_well_formed, Evidence, Generated, Message, ReviewState};
