use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::Config;

const CONFIG_TEMPLATE: &str = r#"# content-validator configuration
#
# API keys are read from environment variables by default:
#   ANTHROPIC_API_KEY (or CLAUDE_API_KEY), TAVILY_API_KEY
# Any setting can also be overridden with CV_<SECTION>__<KEY>,
# e.g. CV_REVIEW__MAX_ROUNDS=5

# ── Language model ───────────────────────────────────────────────
[llm]
# api_key = "sk-ant-..."            # or set ANTHROPIC_API_KEY env var
model = "claude-3-5-sonnet-20240620"
max_tokens = 8192

[llm.headers]
anthropic-beta = "max-tokens-3-5-sonnet-2024-07-15"

# ── Web search ───────────────────────────────────────────────────
[search]
# api_key = "tvly-..."              # or set TAVILY_API_KEY env var
max_results = 5
search_depth = "advanced"
include_answer = true
include_raw_content = true
include_images = true

# ── Review ───────────────────────────────────────────────────────
# mode = "tool_calls": the model requests searches explicitly
# mode = "heuristic":  any reply mentioning "search" triggers one
[review]
mode = "tool_calls"
max_rounds = 3
publication = "Singsaver"
region = "Singapore"
competitors = ["MoneySmart"]
"#;

pub fn run() -> Result<()> {
    let config_dir = Config::config_dir()?;
    let config_path = config_dir.join("config.toml");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config directory: {}", config_dir.display()))?;

    if config_path.exists() {
        println!("Existing config file found:");
        println!("  {}", config_path.display());
        print!("\nOverwrite? (The existing file will be backed up) [y/N] ");

        use std::io::Write;
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Setup cancelled.");
            return Ok(());
        }

        let backup = backup_file(&config_path)?;
        println!("  Backed up to {}", backup.display());
    }

    write_template(&config_path)?;
    println!("Created {}", config_path.display());

    println!("\nNext steps:");
    println!("  1. Set your API keys:  export ANTHROPIC_API_KEY=\"sk-ant-...\" TAVILY_API_KEY=\"tvly-...\"");
    println!("  2. Review a file:      cv review --file draft.md");
    println!("  3. Or paste articles:  cv chat");

    Ok(())
}

fn write_template(path: &Path) -> Result<()> {
    std::fs::write(path, CONFIG_TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// Back up a file to <name>.bak, appending a timestamp if .bak already exists.
fn backup_file(path: &Path) -> Result<PathBuf> {
    let mut backup = path.with_extension("toml.bak");

    if backup.exists() {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        backup = path.with_extension(format!("toml.bak.{}", timestamp));
    }

    std::fs::rename(path, &backup)
        .with_context(|| format!("Failed to back up {} to {}", path.display(), backup.display()))?;

    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_template_loads_as_config() {
        Jail::expect_with(|jail| {
            for key in ["ANTHROPIC_API_KEY", "CLAUDE_API_KEY", "TAVILY_API_KEY"] {
                jail.set_env(key, "");
            }
            let path = jail.directory().join("config.toml");
            write_template(&path).map_err(|e| e.to_string())?;

            let config = Config::load(&path).map_err(|e| e.to_string())?;
            let defaults = Config::default();
            assert_eq!(config.llm.model, defaults.llm.model);
            assert_eq!(config.llm.headers, defaults.llm.headers);
            assert_eq!(config.review.mode, defaults.review.mode);
            assert_eq!(config.review.competitors, defaults.review.competitors);
            assert!(config.llm.api_key.is_none());
            Ok(())
        });
    }

    #[test]
    fn test_backup_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "old").unwrap();

        let backup = backup_file(&path).unwrap();
        assert_eq!(backup, dir.path().join("config.toml.bak"));
        assert!(!path.exists());
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), "old");

        std::fs::write(&path, "newer").unwrap();
        let second = backup_file(&path).unwrap();
        assert_ne!(second, backup);
        assert!(second.to_string_lossy().contains("toml.bak."));
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "newer");
    }
}
