//! Evaluation adapter: turns (resume, JD, history) into a question and
//! (question, answer) into a graded evaluation.
//!
//! `InterviewService` holds an `Arc<dyn Evaluator>`; production wiring uses
//! `LlmEvaluator`, tests script their own.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interview::prompts::{
    render_evaluation_prompt, render_question_prompt, EVALUATION_SYSTEM, QUESTION_SYSTEM,
};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::session::Rating;

#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("evaluation timed out")]
    Timeout,

    #[error("malformed evaluation output: {0}")]
    Malformed(String),

    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl From<LlmError> for EvaluationError {
    fn from(e: LlmError) -> Self {
        if e.is_malformed_output() {
            EvaluationError::Malformed(e.to_string())
        } else {
            EvaluationError::Upstream(e.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedQuestion {
    pub question: String,
    #[serde(default)]
    pub expected_keywords: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerEvaluation {
    pub score: f64,
    pub rating: Rating,
    pub feedback: String,
    #[serde(default)]
    pub confidence_hint: f64,
}

#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Produces one question not among `asked_questions` (best effort).
    async fn generate_question(
        &self,
        stage: u8,
        resume_text: &str,
        job_description: &str,
        asked_questions: &[String],
    ) -> Result<GeneratedQuestion, EvaluationError>;

    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        job_description: &str,
    ) -> Result<AnswerEvaluation, EvaluationError>;
}

/// Evaluator backed by Claude through the shared `LlmClient`.
pub struct LlmEvaluator(pub LlmClient);

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn generate_question(
        &self,
        stage: u8,
        resume_text: &str,
        job_description: &str,
        asked_questions: &[String],
    ) -> Result<GeneratedQuestion, EvaluationError> {
        let prompt = render_question_prompt(stage, resume_text, job_description, asked_questions);
        let generated: GeneratedQuestion = self.0.call_json(&prompt, QUESTION_SYSTEM).await?;
        check_question(generated)
    }

    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        job_description: &str,
    ) -> Result<AnswerEvaluation, EvaluationError> {
        let prompt = render_evaluation_prompt(question, answer, job_description);
        let evaluation: AnswerEvaluation = self.0.call_json(&prompt, EVALUATION_SYSTEM).await?;
        check_evaluation(evaluation)
    }
}

/// Rejects a blank question and tidies keyword noise.
pub fn check_question(mut generated: GeneratedQuestion) -> Result<GeneratedQuestion, EvaluationError> {
    generated.question = generated.question.trim().to_string();
    if generated.question.is_empty() {
        return Err(EvaluationError::Malformed("empty question".to_string()));
    }
    generated.expected_keywords = generated
        .expected_keywords
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    Ok(generated)
}

/// Score and confidence must both lie in [0, 100].
pub fn check_evaluation(evaluation: AnswerEvaluation) -> Result<AnswerEvaluation, EvaluationError> {
    let in_range = |v: f64| v.is_finite() && (0.0..=100.0).contains(&v);
    if !in_range(evaluation.score) {
        return Err(EvaluationError::Malformed(format!(
            "score {} outside 0-100",
            evaluation.score
        )));
    }
    if !in_range(evaluation.confidence_hint) {
        return Err(EvaluationError::Malformed(format!(
            "confidenceHint {} outside 0-100",
            evaluation.confidence_hint
        )));
    }
    Ok(evaluation)
}

/// Runs an adapter call under `limit`; an elapsed timer is an `EvaluationError::Timeout`.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, EvaluationError>
where
    F: Future<Output = Result<T, EvaluationError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| EvaluationError::Timeout)?
}
