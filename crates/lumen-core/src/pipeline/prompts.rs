//! Instruction templates sent to the text model.
//!
//! Templates use `{{KEY}}` placeholders.

/// Placeholder replaced with the validated user query.
const QUERY_PLACEHOLDER: &str = "{{USER_QUERY}}";

/// Asks the text model to turn a short query into an image-generation prompt.
const EXPANSION_TEMPLATE: &str = r#"You are an assistant that transforms a user query into a detailed image-generation prompt.

Your goal:
- Expand the user's idea into a visual description.
- Clarify the required image and use a white background unless another one is requested.
- Keep it concise but richly descriptive.

OUTPUT FORMAT:
Return ONLY:

{
"image_prompt": "<prompt>"
}

USER QUERY:
"{{USER_QUERY}}"
"#;

/// Renders the expansion instruction for `query`.
pub fn expansion_instruction(query: &str) -> String {
    EXPANSION_TEMPLATE.replace(QUERY_PLACEHOLDER, query)
}
