//! Question answering over an indexed video.
//!
//! Retrieves the frames nearest to the question within one video and asks
//! the language model to answer from those captions only. When nothing is
//! retrieved the model is not called.

use crate::embeddings::EmbeddingProvider;
use crate::store::VectorStore;
use crate::types::QueryResult;
use handlebars::Handlebars;
use serde::{Deserialize, Serialize};
use visionrag_core::{AppError, AppResult};
use visionrag_llm::{LlmClient, LlmRequest};

const ANSWER_TEMPLATE: &str = "You are a security analyst reviewing surveillance footage.
Answer the question using only the frame descriptions below.

FRAME DESCRIPTIONS:
{{context}}

RULES:
1. Read every description and follow the order of events across frames.
2. If a description states the answer, give it clearly and briefly, citing the time.
3. If the answer follows from the sequence of frames, explain the reasoning.
4. If the descriptions do not contain the answer, say what is known and what is not.
5. Never add people, objects or events that the descriptions do not mention.

Question: {{question}}

Answer:";

/// Answer plus the evidence it was drawn from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    /// Empty when no evidence was found
    pub answer: String,
    pub evidence: Vec<QueryResult>,
}

impl Answer {
    /// No entries matched; the model was not consulted.
    pub fn is_empty(&self) -> bool {
        self.evidence.is_empty()
    }
}

/// Model settings for answer generation.
#[derive(Debug, Clone)]
pub struct AnswerModel {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl AnswerModel {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: Some(0.2),
            max_tokens: None,
        }
    }
}

/// One context block per result, ranked from 1.
pub fn build_context(evidence: &[QueryResult]) -> String {
    evidence
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[Frame {}] time={}\ncaption: {}", i + 1, r.timestamp_str, r.caption))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render the answer prompt for a question and context.
pub fn render_prompt(question: &str, context: &str) -> AppResult<String> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
        .register_template_string("answer", ANSWER_TEMPLATE)
        .map_err(|e| AppError::Other(format!("Failed to register answer template: {}", e)))?;

    handlebars
        .render(
            "answer",
            &serde_json::json!({ "context": context, "question": question }),
        )
        .map_err(|e| AppError::Other(format!("Failed to render answer template: {}", e)))
}

/// Answer `question` about `video_id` from its `top_k` nearest entries.
///
/// `top_k` is used as given; callers clamp it to the configured range.
#[tracing::instrument(skip(embedder, store, llm, model, question), fields(model = %model.model))]
pub async fn answer(
    embedder: &dyn EmbeddingProvider,
    store: &dyn VectorStore,
    llm: &dyn LlmClient,
    model: &AnswerModel,
    video_id: &str,
    question: &str,
    top_k: usize,
) -> AppResult<Answer> {
    let query_vector = embedder.embed(question).await?;
    let evidence = store.query(&query_vector, top_k, video_id)?;

    if evidence.is_empty() {
        tracing::info!("No indexed entries for video {}; skipping answer generation", video_id);
        return Ok(Answer {
            answer: String::new(),
            evidence,
        });
    }

    tracing::info!(
        "Retrieved {} entries (best similarity {:.3})",
        evidence.len(),
        evidence[0].similarity_score
    );

    let prompt = render_prompt(question, &build_context(&evidence))?;
    let mut request = LlmRequest::new(prompt, &model.model);
    if let Some(t) = model.temperature {
        request = request.with_temperature(t);
    }
    if let Some(m) = model.max_tokens {
        request = request.with_max_tokens(m);
    }

    let response = llm.complete(&request).await?;
    Ok(Answer {
        answer: response.content,
        evidence,
    })
}
