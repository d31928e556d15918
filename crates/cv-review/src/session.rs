//! Review history kept for the lifetime of an interactive session.

use crate::driver::ReviewOutcome;

/// Outcomes of every run in this session, oldest first.
///
/// Unbounded; cleared only on request.
#[derive(Debug, Default)]
pub struct ReviewSession {
    entries: Vec<ReviewOutcome>,
}

impl ReviewSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: ReviewOutcome) {
        self.entries.push(outcome);
    }

    pub fn entries(&self) -> &[ReviewOutcome] {
        &self.entries
    }

    pub fn last(&self) -> Option<&ReviewOutcome> {
        self.entries.last()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn outcome(text: &str) -> ReviewOutcome {
        ReviewOutcome {
            article: "article".to_string(),
            final_text: text.to_string(),
            messages: Vec::new(),
            rounds: 1,
            truncated: false,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn test_record_and_clear() {
        let mut session = ReviewSession::new();
        assert!(session.is_empty());

        session.record(outcome("one"));
        session.record(outcome("two"));
        assert_eq!(session.len(), 2);
        assert_eq!(session.last().unwrap().final_text, "two");

        session.clear();
        assert!(session.is_empty());
        assert!(session.last().is_none());
    }
}
