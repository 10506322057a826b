//! System instructions for the enrichment job types.
//!
//! Each instruction pins the exact JSON shape the model must return, since
//! the result processor parses the reply as JSON. The wording is otherwise
//! deliberately minimal.

use crate::data_model::{ChatMessagePayload, JobType};

const TOPICS_INSTRUCTION: &str = "You extract the main topics or themes from a conversation. \
Respond with a JSON object of the form {\"topics\": [\"...\"]}, where each entry is a short \
lowercase phrase naming one theme. Respond with JSON only.";

const ENTITIES_INSTRUCTION: &str = "You extract the people mentioned in a conversation, their \
role, and what the conversation says about them. Respond with a JSON object of the form \
{\"entities\": [{\"person\": \"...\", \"role\": \"...\", \"relationships\": [\"...\"]}]}. \
Respond with JSON only.";

const SENTIMENT_INSTRUCTION: &str = "You judge the overall sentiment of a conversation. Respond \
with a JSON object of the form {\"sentiment\": \"Positive|Neutral|Negative\", \"polarity\": \
<-1.0..1.0>, \"subjectivity\": <0.0..1.0>}. Respond with JSON only.";

const KEY_POINTS_INSTRUCTION: &str = "You summarize a conversation, using the provided topic, \
entity and sentiment context. Respond with a JSON object of the form {\"key_points\": \
[\"...\"]}, one entry per key point. Respond with JSON only.";

pub fn system_instruction(job_type: JobType) -> &'static str {
    match job_type {
        JobType::Topics => TOPICS_INSTRUCTION,
        JobType::Entities => ENTITIES_INSTRUCTION,
        JobType::Sentiment => SENTIMENT_INSTRUCTION,
        JobType::KeyPoints => KEY_POINTS_INSTRUCTION,
    }
}

/// The two-message array of a chat-completion request body.
pub fn build_messages(job_type: JobType, document_text: &str) -> Vec<ChatMessagePayload> {
    vec![
        ChatMessagePayload {
            role: "system".to_string(),
            content: system_instruction(job_type).to_string(),
        },
        ChatMessagePayload {
            role: "user".to_string(),
            content: document_text.to_string(),
        },
    ]
}
