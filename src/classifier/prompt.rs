//! Classification prompt construction.

use std::fmt::Write as _;

use crate::extractors::truncate_chars;
use crate::providers::CompletionRequest;

use super::ClassificationInput;

/// System prompt for the classification model.
const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You classify business content for a CRM. Decide which records the content describes \
and extract structured fields for each. One piece of content may describe several records.

Record types:
- \"task\": something someone has to do (follow up, fix, deliver, pay by a date).
- \"contact\": a person or organization worth keeping in the address book.
- \"vendor\": a business that sells goods or services to us (supplier, contractor). \
Prefer \"vendor\" over \"contact\" when the content is an invoice, estimate or quote from that business.
- \"expense\": money that was spent or is owed (invoice, receipt, bill).

Field schemas (all fields optional except \"type\" and \"confidence\"):
- task: {\"type\":\"task\",\"confidence\":0.0-1.0,\"title\":string,\"description\":string,\
\"boardName\":string,\"priority\":\"low|medium|high|urgent\",\"status\":string,\
\"labels\":[string],\"summary\":string,\"dueDate\":\"YYYY-MM-DD\"}
- contact / vendor: {\"type\":\"contact|vendor\",\"confidence\":0.0-1.0,\"name\":string,\
\"email\":string,\"phone\":string,\"company\":string,\"title\":string,\"address\":string,\
\"notes\":string,\"summary\":string}
- expense: {\"type\":\"expense\",\"confidence\":0.0-1.0,\"amount\":number,\"currency\":string,\
\"category\":string,\"description\":string,\"date\":\"YYYY-MM-DD\",\"vendorName\":string,\
\"subtotal\":number,\"tax\":number,\"total\":number,\
\"lineItems\":[{\"description\":string,\"quantity\":number,\"rate\":number,\"total\":number}]}

Guidelines:
- Pick boardName only from the available boards listed below; omit it if none fits.
- Use dates exactly as written in the content; do not invent dates.
- Do not guess emails or phone numbers that are not in the content.
- Output ONLY a JSON array of records, no other text.";

/// Build the completion request for `input`, truncating content to `max_chars`.
pub fn build_prompt(input: &ClassificationInput, max_chars: usize) -> CompletionRequest {
    let mut prompt = String::new();

    if input.boards.is_empty() {
        prompt.push_str("Available boards: none\n");
    } else {
        prompt.push_str("Available boards:\n");
        for board in &input.boards {
            match board.description.as_deref().filter(|d| !d.trim().is_empty()) {
                Some(description) => {
                    let _ = writeln!(prompt, "- {}: {}", board.name, description.trim());
                }
                None => {
                    let _ = writeln!(prompt, "- {}", board.name);
                }
            }
        }
    }

    if let Some(name) = input.file_name.as_deref() {
        let _ = writeln!(prompt, "File name: {name}");
    }
    if let Some(mime) = input.file_type.as_deref() {
        let _ = writeln!(prompt, "File type: {mime}");
    }

    let _ = write!(
        prompt,
        "\nContent:\n\"\"\"\n{}\n\"\"\"",
        truncate_chars(&input.content, max_chars)
    );

    CompletionRequest {
        system: Some(CLASSIFIER_SYSTEM_PROMPT.to_owned()),
        prompt,
        max_tokens: None,
        temperature: None,
    }
}
