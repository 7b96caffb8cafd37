//! In-memory collaborators for exercising the interview flow without Postgres or Claude.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::interview::candidates::CandidateDirectory;
use crate::interview::evaluator::{AnswerEvaluation, EvaluationError, Evaluator, GeneratedQuestion};
use crate::interview::machine::InterviewPolicy;
use crate::interview::notify::{Notifier, NotifyError};
use crate::interview::service::InterviewService;
use crate::interview::store::{SessionStore, StoreError};
use crate::models::candidate::CandidateProfile;
use crate::models::session::{InterviewSession, Rating, SessionSummary};

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, InterviewSession>>,
}

impl MemorySessionStore {
    pub fn put(&self, session: InterviewSession) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.token.clone(), session);
    }

    pub fn get(&self, token: &str) -> Option<InterviewSession> {
        self.sessions.lock().unwrap().get(token).cloned()
    }

    fn list(&self, keep: impl Fn(&InterviewSession) -> bool) -> Vec<SessionSummary> {
        let mut found: Vec<InterviewSession> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| keep(s))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        found.iter().map(InterviewSession::summary).collect()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: &InterviewSession) -> Result<(), StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(&session.token) {
            return Err(StoreError::DuplicateToken {
                token: session.token.clone(),
            });
        }
        sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<InterviewSession>, StoreError> {
        Ok(self.get(token))
    }

    async fn update(&self, session: &InterviewSession) -> Result<InterviewSession, StoreError> {
        let mut sessions = self.sessions.lock().unwrap();
        let stored = sessions
            .get_mut(&session.token)
            .ok_or_else(|| StoreError::Missing {
                token: session.token.clone(),
            })?;
        if stored.version != session.version {
            return Err(StoreError::VersionConflict {
                token: session.token.clone(),
            });
        }
        let mut next = session.clone();
        next.version += 1;
        *stored = next.clone();
        Ok(next)
    }

    async fn list_by_candidate(
        &self,
        candidate_id: Uuid,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        Ok(self.list(|s| s.candidate_id == candidate_id))
    }

    async fn list_by_recruiter(
        &self,
        recruiter_id: &str,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        Ok(self.list(|s| s.recruiter_id == recruiter_id))
    }
}

/// Fails every write, for checking that nothing reports success without persisting.
pub struct FailingWrites(pub Arc<MemorySessionStore>);

#[async_trait]
impl SessionStore for FailingWrites {
    async fn insert(&self, _session: &InterviewSession) -> Result<(), StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<InterviewSession>, StoreError> {
        self.0.find_by_token(token).await
    }

    async fn update(&self, _session: &InterviewSession) -> Result<InterviewSession, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn list_by_candidate(
        &self,
        candidate_id: Uuid,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        self.0.list_by_candidate(candidate_id).await
    }

    async fn list_by_recruiter(
        &self,
        recruiter_id: &str,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        self.0.list_by_recruiter(recruiter_id).await
    }
}

#[derive(Default)]
pub struct MemoryCandidates {
    profiles: Mutex<HashMap<Uuid, CandidateProfile>>,
}

impl MemoryCandidates {
    pub fn add(&self, profile: CandidateProfile) {
        self.profiles.lock().unwrap().insert(profile.id, profile);
    }
}

#[async_trait]
impl CandidateDirectory for MemoryCandidates {
    async fn find(&self, candidate_id: Uuid) -> Result<Option<CandidateProfile>, StoreError> {
        Ok(self.profiles.lock().unwrap().get(&candidate_id).cloned())
    }
}

pub fn candidate() -> CandidateProfile {
    CandidateProfile {
        id: Uuid::new_v4(),
        candidate_name: "Grace Hopper".to_string(),
        email: "grace@example.com".to_string(),
        job_title: "Senior Rust Engineer".to_string(),
        resume_text: "10 years building compilers and distributed systems in Rust.".to_string(),
        job_description: "Own our interview platform backend written in Rust and Postgres."
            .to_string(),
    }
}

/// Serves "Stage S question N" and grades answers from a queue of scripted outcomes
/// (50 once the queue runs dry).
#[derive(Default)]
pub struct ScriptedEvaluator {
    outcomes: Mutex<VecDeque<Result<f64, EvaluationError>>>,
    question_failures: Mutex<VecDeque<EvaluationError>>,
    pub seen_asked: Mutex<Vec<Vec<String>>>,
    pub delay: Option<Duration>,
}

impl ScriptedEvaluator {
    pub fn with_scores(scores: &[f64]) -> Self {
        let evaluator = Self::default();
        evaluator.push_scores(scores);
        evaluator
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push_scores(&self, scores: &[f64]) {
        self.outcomes
            .lock()
            .unwrap()
            .extend(scores.iter().map(|s| Ok(*s)));
    }

    pub fn push_failure(&self, error: EvaluationError) {
        self.outcomes.lock().unwrap().push_back(Err(error));
    }

    pub fn fail_next_question(&self, error: EvaluationError) {
        self.question_failures.lock().unwrap().push_back(error);
    }

    /// Scripted grading outcomes not yet consumed.
    pub fn outcomes_left(&self) -> usize {
        self.outcomes.lock().unwrap().len()
    }
}

#[async_trait]
impl Evaluator for ScriptedEvaluator {
    async fn generate_question(
        &self,
        stage: u8,
        _resume_text: &str,
        _job_description: &str,
        asked_questions: &[String],
    ) -> Result<GeneratedQuestion, EvaluationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.question_failures.lock().unwrap().pop_front() {
            return Err(error);
        }
        self.seen_asked
            .lock()
            .unwrap()
            .push(asked_questions.to_vec());
        Ok(GeneratedQuestion {
            question: format!("Stage {stage} question {}", asked_questions.len() + 1),
            expected_keywords: vec!["ownership".to_string()],
        })
    }

    async fn evaluate_answer(
        &self,
        _question: &str,
        _answer: &str,
        _job_description: &str,
    ) -> Result<AnswerEvaluation, EvaluationError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let score = self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(50.0))?;
        Ok(AnswerEvaluation {
            score,
            rating: if score >= 60.0 { Rating::Good } else { Rating::Fair },
            feedback: format!("Scored {score}"),
            confidence_hint: 70.0,
        })
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: &str, message: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.to_string(), message.to_string()));
        Ok(())
    }
}

/// Wired service plus handles on its collaborators.
pub struct Harness {
    pub service: Arc<InterviewService>,
    pub store: Arc<MemorySessionStore>,
    pub candidates: Arc<MemoryCandidates>,
    pub evaluator: Arc<ScriptedEvaluator>,
    pub notifier: Arc<RecordingNotifier>,
    pub candidate: CandidateProfile,
}

impl Harness {
    pub fn new(evaluator: ScriptedEvaluator) -> Self {
        Self::with_policy(evaluator, InterviewPolicy::default())
    }

    pub fn with_policy(evaluator: ScriptedEvaluator, policy: InterviewPolicy) -> Self {
        let store = Arc::new(MemorySessionStore::default());
        let candidates = Arc::new(MemoryCandidates::default());
        let evaluator = Arc::new(evaluator);
        let notifier = Arc::new(RecordingNotifier::default());
        let candidate = candidate();
        candidates.add(candidate.clone());
        let service = Arc::new(InterviewService::new(
            store.clone(),
            candidates.clone(),
            evaluator.clone(),
            notifier.clone(),
            policy,
            "http://localhost:3000/interview".to_string(),
        ));
        Self {
            service,
            store,
            candidates,
            evaluator,
            notifier,
            candidate,
        }
    }
}
