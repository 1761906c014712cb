//! Generator backed by an OpenAI-compatible chat-completions endpoint.
//!
//! Each word or guess is one request with a single user message. The prompt
//! carries the subject (builders only), the sentence so far and the server's
//! last refusal, so the model can correct itself after an invalid word.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::generator::{GuessPrompt, TextGenerator, WordPrompt};

pub const DEFAULT_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

pub fn render_word_prompt(prompt: &WordPrompt) -> String {
    let mut text = format!(
        "You are playing a word game. The secret subject is \"{}\".\n\
         Current sentence: \"{}\"\n\
         Generate a single word that would help describe the subject without making it too obvious.\n\
         The word should be a valid English word and contain only letters. Respond with just the word, nothing else.\n\
         Make sure the word is common and simple.",
        prompt.subject, prompt.sentence
    );
    push_error(&mut text, prompt.previous_error.as_deref());
    text
}

pub fn render_guess_prompt(prompt: &GuessPrompt) -> String {
    let mut text = format!(
        "You are playing a word guessing game. Players are building a sentence to describe a secret subject.\n\
         Current sentence: \"{}\"\n\
         Based on this sentence, what do you think is the secret subject?\n\
         Your guess can be a single word or multiple words. Respond with just your guess, nothing else.\n\
         The subject could be anything - a common word, a phrase, a name, etc.",
        prompt.sentence
    );
    push_error(&mut text, prompt.previous_error.as_deref());
    text
}

fn push_error(text: &mut String, error: Option<&str>) {
    if let Some(error) = error {
        text.push_str("\nPrevious attempt failed: ");
        text.push_str(error);
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub struct ChatGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ChatGenerator {
    pub fn new(url: String, model: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self::with_client(reqwest::Client::new(), url, model, api_key, timeout)
    }

    pub fn with_client(
        client: reqwest::Client,
        url: String,
        model: String,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            url,
            model,
            api_key,
            timeout,
        }
    }

    async fn complete(&self, prompt: String, max_tokens: u32, temperature: f32) -> anyhow::Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            max_tokens,
            temperature,
        };
        log::debug!("POST {} ({}, max_tokens {})", self.url, self.model, max_tokens);

        let mut request = self.client.post(&self.url).timeout(self.timeout).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .with_context(|| format!("requesting {}", self.url))?
            .error_for_status()
            .context("chat completion refused")?;
        let reply: ChatResponse = response.json().await.context("decoding chat completion")?;

        let content = reply
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_lowercase())
            .unwrap_or_default();
        anyhow::ensure!(!content.is_empty(), "chat completion was empty");
        Ok(content)
    }
}

#[async_trait]
impl TextGenerator for ChatGenerator {
    async fn word(&self, prompt: &WordPrompt) -> anyhow::Result<String> {
        self.complete(render_word_prompt(prompt), 10, 0.7).await
    }

    async fn guess(&self, prompt: &GuessPrompt) -> anyhow::Result<String> {
        self.complete(render_guess_prompt(prompt), 30, 0.3).await
    }
}
