//! Terminal rendering of review outcomes.

use cv_review::{Message, ReviewOutcome, ReviewSession};

const TOOL_RESULT_PREVIEW: usize = 400;

pub fn print_outcome(outcome: &ReviewOutcome) {
    println!("{}", outcome.final_text);
    println!();
    println!(
        "[{} round(s), {} search(es){}]",
        outcome.rounds,
        outcome.searches(),
        if outcome.truncated { ", truncated" } else { "" }
    );
}

/// Every message of a run, with long search results shortened.
pub fn print_transcript(outcome: &ReviewOutcome) {
    for (i, message) in outcome.messages.iter().enumerate() {
        print!("[{}] {}", i, message.label());
        match message {
            Message::Human { .. } => {
                println!(": article ({} chars)", outcome.article.chars().count());
            }
            Message::Generated(generated) => {
                println!(":");
                println!("{}", generated.text);
                for call in &generated.tool_calls {
                    println!("    -> {}({})", call.name, call.arguments);
                }
            }
            Message::ToolResult { evidence } => {
                println!(" ({} entries):", evidence.len());
                for entry in evidence {
                    let marker = if entry.is_error { " (error)" } else { "" };
                    println!("  from {}{}:", entry.source, marker);
                    println!("{}", truncate(&entry.content, TOOL_RESULT_PREVIEW));
                }
            }
        }
        println!();
    }
}

pub fn print_history(session: &ReviewSession) {
    if session.is_empty() {
        println!("No reviews in this session.\n");
        return;
    }

    for (i, outcome) in session.entries().iter().enumerate() {
        let first_line = outcome.article.lines().next().unwrap_or_default();
        println!(
            "{:>3}. {}  {} round(s){}  \"{}\"",
            i + 1,
            outcome.finished_at.format("%H:%M:%S"),
            outcome.rounds,
            if outcome.truncated { " (truncated)" } else { "" },
            truncate(first_line, 60)
        );
    }
    println!();
}

/// Cut `text` to at most `max_chars` characters, marking the cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_text_untouched() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("exact", 5), "exact");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 4), "héll...");
        assert_eq!(truncate("新加坡信用卡", 3), "新加坡...");
    }
}
