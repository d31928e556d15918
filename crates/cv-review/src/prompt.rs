//! Editor instructions sent with every review.

use crate::router::ReviewMode;

const SYSTEM_PROMPT: &str = r#"You are an expert and diligent content editor with years of experience at leading news outlets.
You inspect every article that you review carefully and diligently, one paragraph at a time, and then as a whole.
You take your time to think through an article step by step before suggesting a correction.
You have infinite patience and considerable attention to detail. No mistake gets past you."#;

const TOOL_INSTRUCTION: &str =
    "Use the web_search tool to find the latest information to complete your task.";

const KEYWORD_INSTRUCTION: &str = r#"You cannot browse directly. When you need the latest information about a product, reply with the word "search" followed by exactly what should be looked up, and nothing else. The search results will be sent back to you.
Once you have everything you need, give your final review and do not use the word "search" in it."#;

const OUTPUT_NOTE: &str = r#"Your output should always be in markdown. Never use $ in your output, only "\$"."#;

/// Who the article is reviewed for.
#[derive(Debug, Clone)]
pub struct ReviewPrompt {
    pub publication: String,
    pub region: String,
    pub competitors: Vec<String>,
}

impl Default for ReviewPrompt {
    fn default() -> Self {
        Self {
            publication: "Singsaver".to_string(),
            region: "Singapore".to_string(),
            competitors: vec!["MoneySmart".to_string()],
        }
    }
}

impl ReviewPrompt {
    pub fn system(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    /// The opening user turn, with the article embedded verbatim.
    pub fn review_request(&self, article: &str, mode: ReviewMode) -> String {
        let instruction = match mode {
            ReviewMode::ToolCalls => TOOL_INSTRUCTION,
            ReviewMode::Heuristic => KEYWORD_INSTRUCTION,
        };
        let competitors = if self.competitors.is_empty() {
            "competitors".to_string()
        } else {
            format!("competitors, such as {}", self.competitors.join(", "))
        };

        format!(
            r#"{instruction}
You are currently working at {publication}, a financial product aggregator in {region}.
Articles you write may have product placements such as credit cards, bank accounts, loan products, etc.
A new writer in your team submitted an article to review, and you heard from colleagues that the new writer tends to get the product details wrong.
Sometimes the new writer writes the wrong interest details, or the wrong miles, or even an old card name. You caught them previously mentioning a product that was discontinued last year.
Review their new article below (marked by the <article></article> XML tags) diligently, taking care to go through your review process three times at least:
1. Extract all the products mentioned in the article.
2. List out to yourself all the details about those products one by one.
3. Browse the internet to validate every detail about those products mentioned in the article.
4. If the product is relevant and up to date, move on. If there is a mistake, however, highlight it and return a short description of the correct product details.
5. Review the article again, this time validating there are no mentions of {publication}'s {competitors}.

<article>
{article}
</article>

{OUTPUT_NOTE}"#,
            publication = self.publication,
            region = self.region,
        )
    }

    /// User turn carrying keyword-mode search results back to the model.
    pub fn evidence_turn(&self, results: &str) -> String {
        format!(
            "Search results for your request:\n<results>\n{}\n</results>\n\nContinue the review using these results.",
            results
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_embedded_verbatim() {
        let article = "The  UOB One Account pays up to 6% p.a.\n\nApply now!";
        let prompt = ReviewPrompt::default().review_request(article, ReviewMode::ToolCalls);
        assert!(prompt.contains(&format!("<article>\n{}\n</article>", article)));
        assert!(prompt.contains("Singsaver"));
        assert!(prompt.contains("such as MoneySmart"));
        assert!(prompt.starts_with(TOOL_INSTRUCTION));
    }

    #[test]
    fn test_keyword_mode_instruction() {
        let prompt = ReviewPrompt::default().review_request("text", ReviewMode::Heuristic);
        assert!(prompt.starts_with("You cannot browse directly."));
        assert!(!prompt.contains("web_search tool"));
    }

    #[test]
    fn test_custom_publication() {
        let prompt = ReviewPrompt {
            publication: "CardCompare".to_string(),
            region: "Malaysia".to_string(),
            competitors: vec![],
        };
        let text = prompt.review_request("text", ReviewMode::ToolCalls);
        assert!(text.contains("working at CardCompare, a financial product aggregator in Malaysia"));
        assert!(text.contains("no mentions of CardCompare's competitors."));
    }
}
