use super::{SuggestionRequest, SuggestionResult};
use crate::store::Track;
use chrono::Datelike;

/// Canned suggestion for the request's track, stamped with the current year.
/// Never fails and never touches the network.
pub fn fallback(request: &SuggestionRequest) -> SuggestionResult {
    fallback_for(request.track(), request.presenter(), chrono::Local::now().year())
}

/// Track template lookup. Unknown or missing tracks get the general template.
pub fn fallback_for(track: Option<&str>, presenter: Option<&str>, year: i32) -> SuggestionResult {
    let presenter = presenter.filter(|p| !p.is_empty()).unwrap_or("you");
    let track = track.and_then(|t| t.parse::<Track>().ok());

    let (title, description) = match track {
        Some(Track::Design) => (
            format!("UX Design Patterns for {}", year),
            format!(
                "Join {} for an interactive session exploring the latest UX design patterns and trends. \
                 We'll analyze real-world examples, discuss best practices, and provide actionable insights \
                 you can apply to your own projects immediately. This session is perfect for designers \
                 looking to stay current with evolving user expectations and industry standards.",
                presenter
            ),
        ),
        Some(Track::Development) => (
            "Modern Frontend Architecture: Patterns and Pitfalls".to_string(),
            format!(
                "In this technical deep-dive, {} will explore scalable frontend architecture patterns \
                 that work in real-world applications. We'll examine component composition, state \
                 management strategies, and performance optimization techniques. You'll leave with \
                 practical approaches to common architectural challenges and ways to avoid typical \
                 implementation pitfalls.",
                presenter
            ),
        ),
        Some(Track::Product) => (
            "From Insight to Feature: Product Discovery That Works".to_string(),
            format!(
                "How do you transform user research into features that actually solve problems? In this \
                 session, {} will walk through a structured approach to product discovery that bridges \
                 user needs with business goals. We'll cover practical frameworks for prioritization, \
                 validation techniques, and effective ways to communicate findings to stakeholders.",
                presenter
            ),
        ),
        Some(Track::Leadership) => (
            "Building High-Performing Engineering Teams".to_string(),
            format!(
                "What makes the difference between good and truly exceptional engineering teams? Join {} \
                 to explore proven strategies for fostering technical excellence, promoting psychological \
                 safety, and creating an environment where innovation thrives. This session combines \
                 research-backed principles with real-world examples suitable for engineering leaders at \
                 all levels.",
                presenter
            ),
        ),
        None => (
            "The Future of Tech: Trends and Opportunities".to_string(),
            format!(
                "A forward-looking exploration of emerging technologies and their potential impact on our \
                 industry. {} will analyze current trends, discuss upcoming challenges, and highlight areas \
                 of opportunity. This session is designed for anyone interested in staying ahead of \
                 technological shifts and preparing for the next wave of innovation.",
                presenter
            ),
        ),
    };

    SuggestionResult { title, description }
}
