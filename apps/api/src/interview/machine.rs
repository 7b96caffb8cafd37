//! Interview state machine.
//!
//! `apply` takes a session snapshot and an event and returns the next snapshot
//! plus the effects the caller must carry out (persist, log, notify). It never
//! performs I/O; adapter calls happen before the event is built.
//!
//! ```text
//! pending ──question──▶ stage1_in_progress ──mean ≥ threshold──▶ stage2_in_progress
//!                              │                                      │
//!                    stage-1 budget spent                   stage-2 budget spent
//!                              ▼                                      ▼
//!                           failed                                completed
//! any non-terminal ──past expires_at──▶ expired
//! ```

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::interview::evaluator::{AnswerEvaluation, GeneratedQuestion};
use crate::models::session::{
    mean, InterviewSession, PendingQuestion, QuestionRecord, SessionStatus, Speaker,
    TranscriptEntry,
};

/// How `overall_score` is aggregated across stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreAggregation {
    /// Mean of every recorded score, both stages combined.
    #[default]
    Cumulative,
    /// Mean of the scores recorded in the current stage only.
    PerStage,
}

impl FromStr for ScoreAggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cumulative" => Ok(ScoreAggregation::Cumulative),
            "per_stage" => Ok(ScoreAggregation::PerStage),
            other => Err(format!("expected 'cumulative' or 'per_stage', got '{other}'")),
        }
    }
}

impl fmt::Display for ScoreAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreAggregation::Cumulative => f.write_str("cumulative"),
            ScoreAggregation::PerStage => f.write_str("per_stage"),
        }
    }
}

/// Rules governing a session's progress.
#[derive(Debug, Clone)]
pub struct InterviewPolicy {
    pub pass_threshold: f64,
    pub stage1_questions: usize,
    pub stage2_questions: usize,
    pub score_aggregation: ScoreAggregation,
    pub invite_validity: chrono::Duration,
    pub evaluation_timeout: Duration,
}

impl Default for InterviewPolicy {
    fn default() -> Self {
        Self {
            pass_threshold: 60.0,
            stage1_questions: 3,
            stage2_questions: 3,
            score_aggregation: ScoreAggregation::Cumulative,
            invite_validity: chrono::Duration::hours(48),
            evaluation_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Event {
    RequestQuestion(GeneratedQuestion),
    SubmitAnswer {
        question: String,
        answer: String,
        evaluation: AnswerEvaluation,
    },
    AppendTranscript {
        speaker: Speaker,
        text: String,
    },
    Expire,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    QuestionServed { stage: u8 },
    RecordAppended { stage: u8, score: f64 },
    TranscriptAppended,
    StatusChanged { from: SessionStatus, to: SessionStatus },
    StagePromoted { from: u8, to: u8 },
    /// The interview reached `completed` or `failed`.
    OutcomeReached(SessionStatus),
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub session: InterviewSession,
    pub effects: Vec<Effect>,
}

impl Transition {
    /// True when the snapshot changed and must be persisted.
    pub fn is_mutation(&self) -> bool {
        !self.effects.is_empty()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TransitionError {
    #[error("session is {0} and accepts no further progress")]
    Terminal(SessionStatus),

    #[error("session expired at {0}")]
    Expired(DateTime<Utc>),

    #[error("no question has been served yet")]
    NotStarted,

    #[error("no question is awaiting an answer")]
    NoPendingQuestion,

    #[error("answer does not belong to the question that was served")]
    QuestionMismatch,

    #[error("session is not yet due to expire")]
    NotYetExpired,
}

/// Single entry point for every state-machine transition.
pub fn apply(
    session: &InterviewSession,
    event: Event,
    policy: &InterviewPolicy,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    match event {
        Event::Expire => expire(session, now),
        Event::RequestQuestion(generated) => {
            ensure_open(session, now)?;
            Ok(request_question(session, generated, now))
        }
        Event::SubmitAnswer {
            question,
            answer,
            evaluation,
        } => {
            ensure_open(session, now)?;
            submit_answer(session, question, answer, evaluation, policy, now)
        }
        Event::AppendTranscript { speaker, text } => {
            ensure_open(session, now)?;
            let mut next = session.clone();
            next.transcript.push(TranscriptEntry {
                speaker,
                text,
                timestamp: now,
            });
            next.updated_at = now;
            Ok(Transition {
                session: next,
                effects: vec![Effect::TranscriptAppended],
            })
        }
    }
}

/// Terminal or lapsed sessions accept no further interaction.
fn ensure_open(session: &InterviewSession, now: DateTime<Utc>) -> Result<(), TransitionError> {
    if session.status.is_terminal() {
        return Err(TransitionError::Terminal(session.status));
    }
    if session.is_expired_at(now) {
        return Err(TransitionError::Expired(session.expires_at));
    }
    Ok(())
}

fn request_question(
    session: &InterviewSession,
    generated: GeneratedQuestion,
    now: DateTime<Utc>,
) -> Transition {
    let mut next = session.clone();
    let mut effects = Vec::new();

    if next.status == SessionStatus::Pending {
        next.status = SessionStatus::Stage1InProgress;
        effects.push(Effect::StatusChanged {
            from: SessionStatus::Pending,
            to: SessionStatus::Stage1InProgress,
        });
    }

    next.pending_question = Some(PendingQuestion {
        stage: next.current_stage,
        question: generated.question,
        expected_answer_keywords: generated.expected_keywords,
        asked_at: now,
    });
    next.updated_at = now;
    effects.push(Effect::QuestionServed {
        stage: next.current_stage,
    });

    Transition {
        session: next,
        effects,
    }
}

/// An answer is only accepted for the question currently awaiting one.
pub fn check_answerable(session: &InterviewSession, question: &str) -> Result<(), TransitionError> {
    if session.status == SessionStatus::Pending {
        return Err(TransitionError::NotStarted);
    }
    match &session.pending_question {
        None => Err(TransitionError::NoPendingQuestion),
        Some(pending) if !same_question(&pending.question, question) => {
            Err(TransitionError::QuestionMismatch)
        }
        Some(_) => Ok(()),
    }
}

fn submit_answer(
    session: &InterviewSession,
    question: String,
    answer: String,
    evaluation: AnswerEvaluation,
    policy: &InterviewPolicy,
    now: DateTime<Utc>,
) -> Result<Transition, TransitionError> {
    check_answerable(session, &question)?;

    let mut next = session.clone();
    let mut effects = Vec::new();
    let stage = next.current_stage;

    let served = next
        .pending_question
        .take()
        .ok_or(TransitionError::NoPendingQuestion)?;

    next.questions.push(QuestionRecord {
        stage,
        question: served.question,
        expected_answer_keywords: served.expected_answer_keywords,
        actual_answer: answer,
        score: evaluation.score,
        rating: evaluation.rating,
        feedback: evaluation.feedback,
        confidence_hint: evaluation.confidence_hint,
        answered_at: now,
    });
    next.overall_score = aggregate(&next, policy.score_aggregation);
    effects.push(Effect::RecordAppended {
        stage,
        score: evaluation.score,
    });

    if stage == 1 {
        if next.overall_score >= next.pass_threshold {
            next.current_stage = 2;
            set_status(&mut next, SessionStatus::Stage2InProgress, &mut effects);
            effects.push(Effect::StagePromoted { from: 1, to: 2 });
            // Per-stage aggregation restarts for the new stage.
            next.overall_score = aggregate(&next, policy.score_aggregation);
        } else if next.answered_in_stage(1) >= policy.stage1_questions {
            set_status(&mut next, SessionStatus::Failed, &mut effects);
            effects.push(Effect::OutcomeReached(SessionStatus::Failed));
        }
    } else if next.answered_in_stage(2) >= policy.stage2_questions {
        set_status(&mut next, SessionStatus::Completed, &mut effects);
        effects.push(Effect::OutcomeReached(SessionStatus::Completed));
    }

    next.updated_at = now;
    Ok(Transition {
        session: next,
        effects,
    })
}

fn expire(session: &InterviewSession, now: DateTime<Utc>) -> Result<Transition, TransitionError> {
    match session.status {
        SessionStatus::Expired => Ok(Transition {
            session: session.clone(),
            effects: vec![],
        }),
        status if status.is_conducted() => Err(TransitionError::Terminal(status)),
        _ if !session.is_expired_at(now) => Err(TransitionError::NotYetExpired),
        _ => {
            let mut next = session.clone();
            let mut effects = Vec::new();
            next.pending_question = None;
            set_status(&mut next, SessionStatus::Expired, &mut effects);
            next.updated_at = now;
            Ok(Transition {
                session: next,
                effects,
            })
        }
    }
}

/// Recomputes the aggregate from the recorded questions.
pub fn aggregate(session: &InterviewSession, aggregation: ScoreAggregation) -> f64 {
    match aggregation {
        ScoreAggregation::Cumulative => mean(session.questions.iter().map(|q| q.score)),
        ScoreAggregation::PerStage => mean(
            session
                .questions
                .iter()
                .filter(|q| q.stage == session.current_stage)
                .map(|q| q.score),
        ),
    }
}

fn set_status(session: &mut InterviewSession, to: SessionStatus, effects: &mut Vec<Effect>) {
    let from = session.status;
    if from != to {
        session.status = to;
        effects.push(Effect::StatusChanged { from, to });
    }
}

fn same_question(served: &str, submitted: &str) -> bool {
    served.trim().eq_ignore_ascii_case(submitted.trim())
}
