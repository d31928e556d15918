use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use cv_review::{ReviewMode, ReviewPrompt, DEFAULT_MAX_ROUNDS};
use cv_tools::{SearchConfig, SearchDepth};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub search: SearchSection,
    pub review: ReviewSection,
}

/// Text-generation service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    /// Extra headers sent with every request
    pub headers: BTreeMap<String, String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(
            "anthropic-beta".to_string(),
            "max-tokens-3-5-sonnet-2024-07-15".to_string(),
        );
        Self {
            api_key: None,
            base_url: None,
            model: "claude-3-5-sonnet-20240620".to_string(),
            max_tokens: 8192,
            headers,
        }
    }
}

/// Web-search service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSection {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub max_results: u32,
    pub search_depth: SearchDepth,
    pub include_answer: bool,
    pub include_raw_content: bool,
    pub include_images: bool,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            max_results: 5,
            search_depth: SearchDepth::Advanced,
            include_answer: true,
            include_raw_content: true,
            include_images: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewSection {
    pub mode: ReviewMode,
    pub max_rounds: usize,
    /// Publication the reviewer works for
    pub publication: String,
    pub region: String,
    /// Names that must not appear in the article
    pub competitors: Vec<String>,
}

impl Default for ReviewSection {
    fn default() -> Self {
        let prompt = ReviewPrompt::default();
        Self {
            mode: ReviewMode::default(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            publication: prompt.publication,
            region: prompt.region,
            competitors: prompt.competitors,
        }
    }
}

impl ReviewSection {
    pub fn prompt(&self) -> ReviewPrompt {
        ReviewPrompt {
            publication: self.publication.clone(),
            region: self.region.clone(),
            competitors: self.competitors.clone(),
        }
    }
}

const KEY_VARS: [(&str, &str); 3] = [
    ("CLAUDE_API_KEY", "llm.api_key"),
    ("ANTHROPIC_API_KEY", "llm.api_key"),
    ("TAVILY_API_KEY", "search.api_key"),
];

/// API keys for both remote services, checked once at startup.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub llm_api_key: String,
    pub search_api_key: String,
}

/// Expand environment variables in a path string
/// Supports: $VAR, ${VAR}, ~
pub fn expand_path(path: &str) -> PathBuf {
    let mut result = path.to_string();

    if result.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            result = format!("{}{}", home.display(), &result[1..]);
        }
    } else if result == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }

    let re = regex::Regex::new(r"\$\{?([A-Za-z_][A-Za-z0-9_]*)\}?").expect("valid regex");
    let expanded = re.replace_all(&result, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
    });

    PathBuf::from(expanded.to_string())
}

impl Config {
    /// Layered load: defaults, TOML file, `CV_` variables, then key variables.
    ///
    /// A missing file is not an error; keys may come entirely from the
    /// environment.
    pub fn load(path: &Path) -> Result<Self> {
        Self::figment(path)
            .extract()
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    fn figment(path: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("CV_").split("__"));

        // Later entries win; blank values are treated as unset.
        for (var, key) in KEY_VARS {
            if let Some(value) = std::env::var(var).ok().filter(|v| !v.trim().is_empty()) {
                figment = figment.merge(Serialized::default(key, value));
            }
        }
        figment
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("content-validator"))
    }

    /// Both keys must be present and non-blank.
    pub fn credentials(&self) -> Result<Credentials> {
        fn present(key: &Option<String>) -> Option<String> {
            key.as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
        }

        let llm = present(&self.llm.api_key);
        let search = present(&self.search.api_key);

        match (llm, search) {
            (Some(llm_api_key), Some(search_api_key)) => Ok(Credentials {
                llm_api_key,
                search_api_key,
            }),
            (llm, search) => {
                let mut missing = Vec::new();
                if llm.is_none() {
                    missing.push("ANTHROPIC_API_KEY (llm.api_key)");
                }
                if search.is_none() {
                    missing.push("TAVILY_API_KEY (search.api_key)");
                }
                anyhow::bail!(
                    "API keys for the language model and web search must both be set. Missing: {}",
                    missing.join(", ")
                )
            }
        }
    }

    pub fn search_config(&self, api_key: &str) -> SearchConfig {
        let mut config = SearchConfig::new(api_key).with_max_results(self.search.max_results);
        if let Some(base_url) = &self.search.base_url {
            config = config.with_base_url(base_url.as_str());
        }
        config.search_depth = self.search.search_depth;
        config.include_answer = self.search.include_answer;
        config.include_raw_content = self.search.include_raw_content;
        config.include_images = self.search.include_images;
        config
    }

    /// Copy with keys replaced by a short masked form, for display.
    ///
    /// Keys too short to hide behind a prefix are masked entirely.
    pub fn masked(&self) -> Config {
        const VISIBLE: usize = 6;
        const MIN_LEN: usize = 16;

        fn mask(key: &Option<String>) -> Option<String> {
            key.as_ref().map(|k| {
                if k.chars().count() < MIN_LEN {
                    "****".to_string()
                } else {
                    let prefix: String = k.chars().take(VISIBLE).collect();
                    format!("{}…", prefix)
                }
            })
        }

        let mut config = self.clone();
        config.llm.api_key = mask(&self.llm.api_key);
        config.search.api_key = mask(&self.search.api_key);
        config
    }
}
