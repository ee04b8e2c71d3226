use super::fallback::fallback;
use super::parse::parse_completion;
use super::prompt::{build_prompt, SYSTEM_MESSAGE};
use super::upstream::{AzureConfig, CompletionClient, SuggestError};
use super::{SuggestionRequest, SuggestionResult};
use log::{error, info, warn};
use std::time::Duration;

/// Server side of the suggestion feature. Every path ends in a complete
/// title and description; upstream trouble degrades to the fallback table.
pub struct SuggestionService {
    client: CompletionClient,
}

impl SuggestionService {
    pub fn new(config: AzureConfig, timeout: Duration) -> Result<Self, SuggestError> {
        Ok(Self {
            client: CompletionClient::new(config, timeout)?,
        })
    }

    pub async fn suggest(&self, request: &SuggestionRequest) -> SuggestionResult {
        if !self.client.config().has_credential() {
            warn!("Missing Azure API key, using fallback suggestion");
            return fallback(request);
        }

        let prompt = build_prompt(request);

        match self.client.complete(SYSTEM_MESSAGE, &prompt).await {
            Ok(Some(content)) => {
                let parsed = parse_completion(&content);
                if parsed.is_complete() {
                    info!("Parsed suggestion: {:?}", parsed.title);
                    parsed
                } else {
                    warn!("Completion text left title or description empty, using fallback");
                    fallback(request)
                }
            }
            Ok(None) => {
                warn!("No choices returned from completion service, using fallback");
                fallback(request)
            }
            Err(e) => {
                error!("Completion service error: {}", e);
                fallback(request)
            }
        }
    }
}
