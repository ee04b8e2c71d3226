use super::SuggestionRequest;

pub const SYSTEM_MESSAGE: &str = "You are a helpful assistant that suggests creative and engaging session titles and descriptions for unconference events.";

const PREAMBLE: &str = "Please suggest a session title and description for an unconference. Format your response like this:\n\nTitle: [Your suggested title]\nDescription: [Your suggested description]\n\n";

const CLOSING: &str = "\nPlease enhance and improve these ideas while maintaining the core subject. Make the title catchy and the description engaging.";

/// Build the user prompt. Clauses for track, presenter, title and description
/// are appended in that order, each only when the field is present.
pub fn build_prompt(request: &SuggestionRequest) -> String {
    let mut prompt = String::from(PREAMBLE);

    if let Some(track) = request.track() {
        prompt.push_str(&format!("The session is for the \"{}\" track. ", track));
    }
    if let Some(presenter) = request.presenter() {
        prompt.push_str(&format!("The presenter is {}. ", presenter));
    }
    if let Some(title) = request.title() {
        prompt.push_str(&format!("Here's their initial title idea: \"{}\". ", title));
    }
    if let Some(description) = request.description() {
        prompt.push_str(&format!("And their initial description: \"{}\". ", description));
    }

    prompt.push_str(CLOSING);
    prompt
}
