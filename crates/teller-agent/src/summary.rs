//! Narrative call summaries via the platform's chat-completion endpoint.

use serde::Deserialize;
use teller_types::SpeakerRole;

use crate::config::AgentConfig;
use crate::error::AgentError;

/// Instructions for the summarizer. The summary must read as prose a
/// support supervisor can skim, in English regardless of the languages
/// spoken on the call.
const SUMMARY_SYSTEM_PROMPT: &str = "You are a professional call summarizer for a bank's \
customer-support line. Write a narrative summary of the call in English, regardless of what \
language(s) were spoken. Cover: why the customer called, any language switches, key details the \
customer provided (card digits, dates, account numbers), actions taken by the agent, the final \
outcome, and any follow-ups mentioned. Write in past tense, third person, as one or two cohesive \
paragraphs. Do not use bullet points or lists.";

/// One transcript line submitted for summarization.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct SummaryMessage {
    pub role: SpeakerRole,
    pub text: String,
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Client for post-call transcript summarization.
#[derive(Debug, Clone)]
pub struct SummaryClient {
    http: reqwest::Client,
    config: AgentConfig,
}

impl SummaryClient {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Produces a narrative English summary of the given transcript.
    pub async fn summarize(&self, messages: &[SummaryMessage]) -> Result<String, AgentError> {
        let transcript = messages
            .iter()
            .map(|m| format!("{}: {}", m.role.label(), m.text))
            .collect::<Vec<_>>()
            .join("\n");

        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let body = serde_json::json!({
            "model": self.config.summary_model,
            "messages": [
                { "role": "system", "content": SUMMARY_SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": format!("Generate a call summary for this support conversation:\n\n{transcript}")
                }
            ],
            "temperature": 0.3
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            tracing::error!(status = status.as_u16(), %body, "summary request failed");
            return Err(AgentError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletion = response.json().await?;
        Ok(completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_else(|| "Unable to generate summary.".to_string()))
    }
}
