//! Interview orchestration: token issuance and validation, adapter calls under a
//! timeout, state-machine transitions and persistence, serialized per token.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::candidates::CandidateDirectory;
use crate::interview::evaluator::{bounded, Evaluator};
use crate::interview::locks::SessionLocks;
use crate::interview::machine::{
    apply, check_answerable, Effect, Event, InterviewPolicy, TransitionError,
};
use crate::interview::notify::{self, render_invite_message, render_outcome_message, Notifier};
use crate::interview::store::{SessionStore, StoreError};
use crate::interview::token::{check_access, generate_token, interview_url, InviteTicket};
use crate::models::candidate::CandidateProfile;
use crate::models::session::{
    InterviewSession, Rating, SessionAnalysis, SessionStatus, SessionSummary, Speaker,
};

const TOKEN_INSERT_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatedSession {
    pub candidate: CandidateProfile,
    pub status: SessionStatus,
    pub current_stage: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServedQuestion {
    pub question: String,
    pub stage: u8,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationView {
    pub score: f64,
    pub rating: Rating,
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub evaluation: EvaluationView,
    pub overall_score: f64,
    pub status: SessionStatus,
    pub current_stage: u8,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpireOutcome {
    pub status: SessionStatus,
    /// True when this call persisted the `expired` status.
    pub expired_now: bool,
}

pub enum SessionFilter {
    Candidate(Uuid),
    Recruiter(String),
}

pub struct InterviewService {
    store: Arc<dyn SessionStore>,
    candidates: Arc<dyn CandidateDirectory>,
    evaluator: Arc<dyn Evaluator>,
    notifier: Arc<dyn Notifier>,
    locks: SessionLocks,
    policy: InterviewPolicy,
    interview_base_url: String,
}

impl InterviewService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        candidates: Arc<dyn CandidateDirectory>,
        evaluator: Arc<dyn Evaluator>,
        notifier: Arc<dyn Notifier>,
        policy: InterviewPolicy,
        interview_base_url: String,
    ) -> Self {
        Self {
            store,
            candidates,
            evaluator,
            notifier,
            locks: SessionLocks::new(),
            policy,
            interview_base_url,
        }
    }

    /// Creates a fresh pending session and sends the invite in the background.
    /// Every call issues a new token; invites are not deduplicated.
    pub async fn issue_invite(
        &self,
        candidate_id: Uuid,
        recruiter_id: &str,
    ) -> Result<InviteTicket, AppError> {
        let recruiter_id = recruiter_id.trim();
        if recruiter_id.is_empty() {
            return Err(AppError::Validation("recruiterId cannot be empty".to_string()));
        }
        let candidate = self.candidate(candidate_id).await?;

        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.policy.invite_validity)
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "invite validity {} overflows the expiry timestamp",
                    self.policy.invite_validity
                ))
            })?;

        let mut attempt = 0;
        let session = loop {
            attempt += 1;
            let session = InterviewSession::new_pending(
                generate_token(),
                candidate_id,
                recruiter_id.to_string(),
                expires_at,
                self.policy.pass_threshold,
                now,
            );
            match self.store.insert(&session).await {
                Ok(()) => break session,
                Err(StoreError::DuplicateToken { .. }) if attempt < TOKEN_INSERT_ATTEMPTS => {
                    warn!("Token collision on invite for candidate {candidate_id}, regenerating");
                }
                Err(e) => return Err(e.into()),
            }
        };

        let url = interview_url(&self.interview_base_url, &session.token);
        info!(
            "Issued interview token {} for candidate {candidate_id} by recruiter {recruiter_id}, expires {}",
            short(&session.token),
            expires_at
        );

        notify::dispatch(
            self.notifier.clone(),
            candidate.email.clone(),
            render_invite_message(&candidate, &url, expires_at),
        );

        Ok(InviteTicket {
            token: session.token,
            expires_at,
            interview_url: url,
        })
    }

    /// Pure read: never changes the session, even when it detects expiry.
    pub async fn validate(&self, token: &str) -> Result<ValidatedSession, AppError> {
        let session = self.load(token).await?;
        check_access(&session, Utc::now())?;
        let candidate = self.candidate(session.candidate_id).await?;
        Ok(ValidatedSession {
            candidate,
            status: session.status,
            current_stage: session.current_stage,
        })
    }

    pub async fn next_question(
        &self,
        token: &str,
        stage: Option<u8>,
    ) -> Result<ServedQuestion, AppError> {
        let _guard = self.locks.acquire(token).await;
        let session = self.load_open(token).await?;
        check_stage(&session, stage)?;
        let candidate = self.candidate(session.candidate_id).await?;

        let asked = session.asked_questions();
        let generated = bounded(
            self.policy.evaluation_timeout,
            self.evaluator.generate_question(
                session.current_stage,
                &candidate.resume_text,
                &candidate.job_description,
                &asked,
            ),
        )
        .await?;

        let session = self
            .commit(&session, Event::RequestQuestion(generated), &candidate)
            .await?;
        let pending = session.pending_question.as_ref().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("question transition left no pending question"))
        })?;

        Ok(ServedQuestion {
            question: pending.question.clone(),
            stage: pending.stage,
            status: session.status,
        })
    }

    pub async fn submit_answer(
        &self,
        token: &str,
        stage: Option<u8>,
        question: &str,
        answer: &str,
    ) -> Result<AnswerOutcome, AppError> {
        if question.trim().is_empty() {
            return Err(AppError::Validation("question cannot be empty".to_string()));
        }

        let _guard = self.locks.acquire(token).await;
        let session = self.load_open(token).await?;
        check_stage(&session, stage)?;
        check_answerable(&session, question).map_err(transition_error)?;
        let candidate = self.candidate(session.candidate_id).await?;

        let evaluation = bounded(
            self.policy.evaluation_timeout,
            self.evaluator
                .evaluate_answer(question, answer, &candidate.job_description),
        )
        .await?;

        let view = EvaluationView {
            score: evaluation.score,
            rating: evaluation.rating,
            feedback: evaluation.feedback.clone(),
        };
        let event = Event::SubmitAnswer {
            question: question.trim().to_string(),
            answer: answer.to_string(),
            evaluation,
        };
        let session = self.commit(&session, event, &candidate).await?;

        Ok(AnswerOutcome {
            evaluation: view,
            overall_score: session.overall_score,
            status: session.status,
            current_stage: session.current_stage,
        })
    }

    pub async fn append_transcript(
        &self,
        token: &str,
        speaker: Speaker,
        text: &str,
    ) -> Result<usize, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("text cannot be empty".to_string()));
        }
        let _guard = self.locks.acquire(token).await;
        let session = self.load_open(token).await?;
        let now = Utc::now();
        let transition = apply(
            &session,
            Event::AppendTranscript {
                speaker,
                text: text.to_string(),
            },
            &self.policy,
            now,
        )
        .map_err(transition_error)?;
        let session = self.store.update(&transition.session).await?;
        Ok(session.transcript.len())
    }

    /// Persists `expired` for a lapsed, unfinished session.
    pub async fn expire(&self, token: &str) -> Result<ExpireOutcome, AppError> {
        let _guard = self.locks.acquire(token).await;
        let session = self.load(token).await?;
        match apply(&session, Event::Expire, &self.policy, Utc::now()) {
            Ok(transition) if transition.is_mutation() => {
                let saved = self.store.update(&transition.session).await?;
                log_effects(&saved.token, &transition.effects);
                Ok(ExpireOutcome {
                    status: saved.status,
                    expired_now: true,
                })
            }
            Ok(_) | Err(TransitionError::NotYetExpired) | Err(TransitionError::Terminal(_)) => {
                Ok(ExpireOutcome {
                    status: session.status,
                    expired_now: false,
                })
            }
            Err(e) => Err(transition_error(e)),
        }
    }

    pub async fn get_session(&self, token: &str) -> Result<InterviewSession, AppError> {
        self.load(token).await
    }

    pub async fn list_sessions(
        &self,
        filter: SessionFilter,
    ) -> Result<Vec<SessionSummary>, AppError> {
        Ok(match filter {
            SessionFilter::Candidate(id) => self.store.list_by_candidate(id).await?,
            SessionFilter::Recruiter(id) => self.store.list_by_recruiter(&id).await?,
        })
    }

    /// Stores the post-interview analysis; only once the interview has ended.
    pub async fn record_analysis(
        &self,
        token: &str,
        analysis: SessionAnalysis,
    ) -> Result<InterviewSession, AppError> {
        let dimensions = [
            ("confidence", analysis.confidence),
            ("communicationRating", analysis.communication_rating),
            ("resumeMatch", analysis.resume_match),
            ("culturalFit", analysis.cultural_fit),
            ("technicalDepth", analysis.technical_depth),
        ];
        if let Some((name, _)) = dimensions
            .iter()
            .find(|(_, v)| !v.is_finite() || !(0.0..=100.0).contains(v))
        {
            return Err(AppError::Validation(format!("{name} must be within 0-100")));
        }

        let _guard = self.locks.acquire(token).await;
        let mut session = self.load(token).await?;
        if !session.status.is_terminal() {
            return Err(AppError::Validation(
                "analysis can only be recorded once the interview has ended".to_string(),
            ));
        }
        session.analysis = Some(analysis);
        session.updated_at = Utc::now();
        Ok(self.store.update(&session).await?)
    }

    pub async fn mark_report(
        &self,
        token: &str,
        published: bool,
    ) -> Result<InterviewSession, AppError> {
        let _guard = self.locks.acquire(token).await;
        let mut session = self.load(token).await?;
        let now = Utc::now();
        session.result_published = published;
        session.report_sent_at = Some(now);
        session.updated_at = now;
        let saved = self.store.update(&session).await?;
        info!(
            "Report for session {} marked sent (published: {published})",
            short(token)
        );
        Ok(saved)
    }

    async fn load(&self, token: &str) -> Result<InterviewSession, AppError> {
        self.store
            .find_by_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("Interview session not found".to_string()))
    }

    /// Loads a session that may still progress. A lapsed but unfinished session
    /// is moved to `expired` here before the error is returned.
    async fn load_open(&self, token: &str) -> Result<InterviewSession, AppError> {
        let session = self.load(token).await?;
        let now = Utc::now();
        if !session.status.is_terminal() && session.is_expired_at(now) {
            return Err(self.persist_expiry(&session, now).await);
        }
        check_access(&session, now)?;
        Ok(session)
    }

    /// Moves a lapsed session to `expired`; returns the error to hand the caller.
    async fn persist_expiry(&self, session: &InterviewSession, now: DateTime<Utc>) -> AppError {
        let transition = match apply(session, Event::Expire, &self.policy, now) {
            Ok(transition) => transition,
            Err(e) => return transition_error(e),
        };
        match self.store.update(&transition.session).await {
            Ok(saved) => {
                log_effects(&saved.token, &transition.effects);
                AppError::Expired
            }
            Err(e) => e.into(),
        }
    }

    async fn candidate(&self, candidate_id: Uuid) -> Result<CandidateProfile, AppError> {
        self.candidates
            .find(candidate_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Candidate {candidate_id} not found")))
    }

    /// Applies `event`, persists the result and carries out its effects.
    async fn commit(
        &self,
        session: &InterviewSession,
        event: Event,
        candidate: &CandidateProfile,
    ) -> Result<InterviewSession, AppError> {
        let now = Utc::now();
        let transition = match apply(session, event, &self.policy, now) {
            Ok(transition) => transition,
            // The deadline passed while the adapter call was in flight.
            Err(TransitionError::Expired(_)) => {
                return Err(self.persist_expiry(session, now).await);
            }
            Err(e) => return Err(transition_error(e)),
        };
        let saved = self.store.update(&transition.session).await?;
        log_effects(&saved.token, &transition.effects);

        if transition
            .effects
            .iter()
            .any(|e| matches!(e, Effect::OutcomeReached(_)))
        {
            notify::dispatch(
                self.notifier.clone(),
                saved.recruiter_id.clone(),
                render_outcome_message(candidate, &saved),
            );
        }
        Ok(saved)
    }
}

fn check_stage(session: &InterviewSession, stage: Option<u8>) -> Result<(), AppError> {
    match stage {
        Some(stage) if stage != session.current_stage => Err(AppError::Validation(format!(
            "stage {stage} requested but the session is at stage {}",
            session.current_stage
        ))),
        _ => Ok(()),
    }
}

fn transition_error(e: TransitionError) -> AppError {
    match e {
        TransitionError::Terminal(SessionStatus::Expired) | TransitionError::Expired(_) => {
            AppError::Expired
        }
        TransitionError::Terminal(_) => AppError::AlreadyConducted,
        TransitionError::NotStarted
        | TransitionError::NoPendingQuestion
        | TransitionError::QuestionMismatch
        | TransitionError::NotYetExpired => {
            AppError::Validation(e.to_string())
        }
    }
}

fn log_effects(token: &str, effects: &[Effect]) {
    let token = short(token);
    for effect in effects {
        match effect {
            Effect::StatusChanged { from, to } => {
                info!("Session {token}: status {from} -> {to}")
            }
            Effect::StagePromoted { from, to } => {
                info!("Session {token}: promoted from stage {from} to stage {to}")
            }
            Effect::OutcomeReached(status) => info!("Session {token}: interview {status}"),
            Effect::QuestionServed { stage } => {
                debug!("Session {token}: served stage {stage} question")
            }
            Effect::RecordAppended { stage, score } => {
                debug!("Session {token}: recorded stage {stage} answer scored {score}")
            }
            Effect::TranscriptAppended => debug!("Session {token}: transcript appended"),
        }
    }
}

/// Leading characters of a token, enough to correlate log lines.
fn short(token: &str) -> &str {
    match token.char_indices().nth(8) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}
