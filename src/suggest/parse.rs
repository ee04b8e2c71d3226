use super::SuggestionResult;
use once_cell::sync::Lazy;
use regex::Regex;

/// Title used when the completion text carries no recognizable markers
pub const SENTINEL_TITLE: &str = "AI-Suggested Session";

static COMBINED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Title:(.*?)(?:\n|$)(.*?)Description:(.*)").expect("combined pattern compiles")
});
static TITLE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Title:(.*?)(?:\n|$)").expect("title pattern compiles"));
static DESCRIPTION_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)Description:(.*)").expect("description pattern compiles"));

type Strategy = fn(&str) -> Option<SuggestionResult>;

/// Tried in order; the first strategy that matches wins.
const STRATEGIES: &[Strategy] = &[combined, independent];

/// Split free-form completion text into a title and description
pub fn parse_completion(content: &str) -> SuggestionResult {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(content))
        .unwrap_or_else(|| SuggestionResult {
            title: SENTINEL_TITLE.to_string(),
            description: content.trim().to_string(),
        })
}

fn combined(content: &str) -> Option<SuggestionResult> {
    let caps = COMBINED.captures(content)?;
    Some(SuggestionResult {
        title: caps[1].trim().to_string(),
        description: caps[3].trim().to_string(),
    })
}

fn independent(content: &str) -> Option<SuggestionResult> {
    let title = TITLE_LINE.captures(content)?;
    let description = DESCRIPTION_BLOCK.captures(content)?;
    Some(SuggestionResult {
        title: title[1].trim().to_string(),
        description: description[1].trim().to_string(),
    })
}
