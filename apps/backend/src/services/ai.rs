//! AI provider client for question generation and answer evaluation.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use conspecto_core::types::{
    Difficulty, Evaluation, GeneratedQuestion, QuestionType, SessionMode,
};

/// Errors from the AI provider boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider returned status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("provider call timed out")]
    TimedOut,
}

/// Evaluation verdict for one answered question.
#[derive(Debug, Clone)]
pub struct AnswerEvaluation {
    pub evaluation: Evaluation,
    pub ai_message: Option<String>,
}

/// External AI capability consumed by the session service.
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Generate a question set for a note. All-or-nothing: a partial
    /// set is never returned.
    async fn generate_questions(
        &self,
        note_content: &str,
        mode: SessionMode,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<GeneratedQuestion>, ProviderError>;

    /// Judge one submitted answer.
    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<AnswerEvaluation, ProviderError>;
}

/// OpenAI-compatible chat completions client.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    questions_per_session: usize,
}

impl OpenAiProvider {
    pub fn new(base_url: String, api_key: String, model: String, questions_per_session: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            api_key,
            model,
            questions_per_session,
        }
    }

    /// Build a provider from `OPENAI_API_KEY`, `OPENAI_BASE_URL`,
    /// `OPENAI_MODEL`, and `AI_QUESTIONS_PER_SESSION`.
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY must be set"))?;
        let base_url = std::env::var("OPENAI_BASE_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let questions_per_session = std::env::var("AI_QUESTIONS_PER_SESSION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);
        Ok(Self::new(base_url, api_key, model, questions_per_session))
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::MalformedResponse("no choices in response".to_string()))
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn generate_questions(
        &self,
        note_content: &str,
        mode: SessionMode,
        difficulty: Option<Difficulty>,
    ) -> Result<Vec<GeneratedQuestion>, ProviderError> {
        let style = match mode {
            SessionMode::MonoTest => "a single coherent test covering the whole note",
            SessionMode::SeparateQuestions => "independent questions, each answerable on its own",
        };
        let difficulty = difficulty.map(|d| d.as_str()).unwrap_or("medium");
        let system = "You generate quiz questions from study notes. \
                      Reply with a JSON array only, each element \
                      {\"question_type\": \"open_ended\"|\"multiple_choice\"|\"true_false\", \"question\": \"...\"}.";
        let user = format!(
            "Generate {count} {difficulty} questions as {style} from this note:\n\n{note_content}",
            count = self.questions_per_session,
        );

        let content = self.chat(system, &user).await?;
        let parsed: Vec<RawQuestion> = serde_json::from_str(content.trim())
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        Ok(parsed
            .into_iter()
            .map(|raw| GeneratedQuestion::new(raw.question_type, raw.question))
            .collect())
    }

    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<AnswerEvaluation, ProviderError> {
        let system = "You grade quiz answers. Reply with JSON only: \
                      {\"evaluation\": \"correct\"|\"incorrect\", \"feedback\": \"...\"}.";
        let user = format!("Question: {question}\n\nAnswer: {answer}");

        let content = self.chat(system, &user).await?;
        let parsed: RawVerdict = serde_json::from_str(content.trim())
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

        Ok(AnswerEvaluation {
            evaluation: parsed.evaluation,
            ai_message: parsed.feedback,
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[derive(Deserialize)]
struct RawQuestion {
    question_type: QuestionType,
    question: String,
}

#[derive(Deserialize)]
struct RawVerdict {
    evaluation: Evaluation,
    feedback: Option<String>,
}
