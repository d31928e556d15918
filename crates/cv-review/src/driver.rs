use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use cv_core::{Error, Result};

use crate::analyzer::Analyzer;
use crate::fetcher::EvidenceFetcher;
use crate::router::{Decision, Router};
use crate::session::ReviewSession;
use crate::state::{is_well_formed, Message, ReviewState};

/// Analyzer calls allowed per run unless configured otherwise.
pub const DEFAULT_MAX_ROUNDS: usize = 3;

/// Result of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct ReviewOutcome {
    pub article: String,
    /// Text of the last generated message, plus a note when truncated.
    pub final_text: String,
    pub messages: Vec<Message>,
    /// Number of Analyzer calls made.
    pub rounds: usize,
    /// True when the round limit cut off a requested search.
    pub truncated: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ReviewOutcome {
    /// Number of searches performed across all rounds.
    pub fn searches(&self) -> usize {
        self.messages
            .iter()
            .map(|m| match m {
                Message::ToolResult { evidence } => evidence.len(),
                _ => 0,
            })
            .sum()
    }
}

/// Alternates Analyzer and Evidence Fetcher until the Router says stop.
pub struct ReviewLoop {
    analyzer: Analyzer,
    fetcher: EvidenceFetcher,
    router: Box<dyn Router>,
    max_rounds: usize,
}

impl ReviewLoop {
    /// Uses the router matching the analyzer's mode.
    pub fn new(analyzer: Analyzer, fetcher: EvidenceFetcher) -> Self {
        let router = analyzer.mode().router();
        Self {
            analyzer,
            fetcher,
            router,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_router(mut self, router: Box<dyn Router>) -> Self {
        self.router = router;
        self
    }

    /// At least one round always runs.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Review `article` and record the outcome in `session`.
    pub async fn run(&self, session: &mut ReviewSession, article: &str) -> Result<ReviewOutcome> {
        let outcome = self.review(article).await?;
        session.record(outcome.clone());
        Ok(outcome)
    }

    pub async fn review(&self, article: &str) -> Result<ReviewOutcome> {
        if article.trim().is_empty() {
            return Err(Error::invalid_request("article is empty"));
        }

        let started_at = Utc::now();
        let mut state = ReviewState::new(article);
        let mut rounds = 0;

        info!(
            article_len = article.len(),
            router = self.router.name(),
            max_rounds = self.max_rounds,
            "Starting review"
        );

        let truncated = loop {
            let generated = self.analyzer.analyze(&state).await?;
            rounds += 1;
            let decision = self.router.decide(&generated);
            debug!(round = rounds, ?decision, "Router decision");
            state.push_generated(generated.clone());

            if decision == Decision::Stop {
                break false;
            }
            if rounds >= self.max_rounds {
                warn!(rounds, "Round limit reached with a search still pending");
                break true;
            }

            let evidence = if generated.tool_calls.is_empty() {
                vec![self.fetcher.fetch(&generated.text).await]
            } else {
                self.fetcher.fetch_batch(&generated.tool_calls).await
            };
            state.push_evidence(evidence);
        };

        debug_assert!(is_well_formed(state.messages()));

        let last = state
            .latest_generated()
            .map(|g| g.text.clone())
            .unwrap_or_default();
        let final_text = match (truncated, last.trim().is_empty()) {
            (false, _) => last,
            (true, true) => truncation_note(self.max_rounds),
            (true, false) => format!("{}\n\n{}", last, truncation_note(self.max_rounds)),
        };

        let outcome = ReviewOutcome {
            article: state.article().to_string(),
            final_text,
            messages: state.into_messages(),
            rounds,
            truncated,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            rounds = outcome.rounds,
            searches = outcome.searches(),
            truncated = outcome.truncated,
            "Review finished"
        );

        Ok(outcome)
    }
}

fn truncation_note(max_rounds: usize) -> String {
    format!(
        "---\n_Review stopped after {} round(s) while the model still wanted to search; some details may be unverified._",
        max_rounds
    )
}
