//! Interactive session: paste an article, then `/run` to review it.

use std::path::PathBuf;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::history::FileHistory;
use rustyline::{Config, Editor};

use cv_review::{ReviewLoop, ReviewSession};

use crate::display;

/// Session commands
#[derive(Debug, PartialEq, Eq)]
enum SessionCommand {
    Run,
    History,
    Clear,
    Help,
    Quit,
    /// A line of article text, including lines that merely start with `/`
    Line(String),
}

fn parse_command(input: &str) -> SessionCommand {
    // Commands take no arguments, so anything else is article text.
    match input.trim().to_lowercase().as_str() {
        "/run" | "/r" => SessionCommand::Run,
        "/history" | "/h" => SessionCommand::History,
        "/clear" | "/c" => SessionCommand::Clear,
        "/help" | "/?" => SessionCommand::Help,
        "/quit" | "/exit" | "/q" => SessionCommand::Quit,
        _ => SessionCommand::Line(input.trim_end_matches(['\r', '\n']).to_string()),
    }
}

fn print_help() {
    println!(
        r#"
Session Commands:
  /run, /r       Review the pasted article
  /history, /h   List reviews from this session
  /clear, /c     Clear the pasted article and the review history
  /help, /?      Show this help message
  /quit, /exit   Exit

Paste the article text line by line, then type /run.
Ctrl+D exits; Up/Down arrows navigate input history.
"#
    );
}

fn get_history_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("content-validator").join("input_history"))
}

/// Run the interactive session until `/quit` or end of input.
pub async fn run_session(review_loop: &ReviewLoop, show_transcript: bool) -> Result<()> {
    let config = Config::builder()
        .history_ignore_space(true)
        .history_ignore_dups(true)?
        .build();

    let history_path = get_history_path();
    let mut rl: Editor<(), FileHistory> = Editor::with_config(config)?;

    if let Some(path) = &history_path {
        let _ = rl.load_history(path);
    }

    let mut session = ReviewSession::new();
    let mut buffer: Vec<String> = Vec::new();

    println!("Content validator. Paste an article, then type /run. /help for commands.\n");

    loop {
        let prompt = if buffer.is_empty() { "article> " } else { "...> " };

        match rl.readline(prompt) {
            Ok(line) => match parse_command(&line) {
                SessionCommand::Line(text) => {
                    if text.starts_with('/') && !text.contains(char::is_whitespace) {
                        eprintln!("(added to the article; type /help for commands)");
                    }
                    buffer.push(text);
                }
                SessionCommand::Run => {
                    let article = buffer.join("\n");
                    if article.trim().is_empty() {
                        println!("Please paste an article first.\n");
                        continue;
                    }
                    let _ = rl.add_history_entry("/run");

                    println!("Reviewing...\n");
                    match review_loop.run(&mut session, &article).await {
                        Ok(outcome) => {
                            if show_transcript {
                                display::print_transcript(&outcome);
                            }
                            display::print_outcome(&outcome);
                            println!();
                            buffer.clear();
                        }
                        Err(e) => {
                            // Keep the article so it can be retried with /run.
                            eprintln!("\nError: {}\n", e);
                        }
                    }
                }
                SessionCommand::History => display::print_history(&session),
                SessionCommand::Clear => {
                    buffer.clear();
                    session.clear();
                    println!("Article and history cleared.\n");
                }
                SessionCommand::Help => print_help(),
                SessionCommand::Quit => {
                    println!("Goodbye!");
                    break;
                }
            },
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        }
    }

    if let Some(path) = &history_path {
        let _ = rl.save_history(path);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("/run"), SessionCommand::Run);
        assert_eq!(parse_command("  /RUN  "), SessionCommand::Run);
        assert_eq!(parse_command("/h"), SessionCommand::History);
        assert_eq!(parse_command("/clear"), SessionCommand::Clear);
        assert_eq!(parse_command("/?"), SessionCommand::Help);
        assert_eq!(parse_command("/exit"), SessionCommand::Quit);
    }

    #[test]
    fn test_slash_lines_stay_in_article() {
        assert_eq!(
            parse_command("/month fee waived for the first year"),
            SessionCommand::Line("/month fee waived for the first year".to_string())
        );
        assert_eq!(parse_command("/publish"), SessionCommand::Line("/publish".to_string()));
        assert_eq!(
            parse_command("/run this card"),
            SessionCommand::Line("/run this card".to_string())
        );
    }

    #[test]
    fn test_article_lines_keep_indentation() {
        assert_eq!(
            parse_command("  - 6% cashback on dining"),
            SessionCommand::Line("  - 6% cashback on dining".to_string())
        );
        assert_eq!(parse_command(""), SessionCommand::Line(String::new()));
    }
}
