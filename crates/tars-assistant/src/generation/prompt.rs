//! System prompt built from the current document

use crate::types::NormalizedDocument;

/// Builds the system instructions sent with every generation request
pub struct PromptBuilder;

impl PromptBuilder {
    /// Embed the document's kind, origin, title and body into the assistant
    /// persona. Optional lines are omitted, not left blank with a label.
    pub fn system_prompt(document: &NormalizedDocument) -> String {
        let mut header = vec![format!("Current source: {}", document.source_kind)];
        if let Some(url) = document.origin_url.as_deref().filter(|u| !u.trim().is_empty()) {
            header.push(format!("URL: {}", url));
        }
        if !document.title.trim().is_empty() {
            header.push(format!("Title: {}", document.title));
        }

        format!(
            r#"You are a friendly assistant named TARS who always answers in a simple and objective way.
{header}

Base your answers on the information below:

{body}

Additional instructions:
- If asked which site or document you are analyzing, give its title and URL or file name.
- If the information is not enough to answer, say that you do not have enough data on the subject.
- Keep your answers concise and to the point.
- When quoting information from the document, point to the source.
- You help students with their studies, so use technical examples and analogies when appropriate."#,
            header = header.join("\n"),
            body = document.body
        )
    }

    /// Assistant reply used when generation fails
    pub fn apology(detail: &str) -> String {
        format!(
            "Sorry, an error occurred while processing your question. Details: {}",
            detail
        )
    }
}
