use std::{sync::Arc, time::Duration as StdDuration};

use moka::future::Cache;
use serde_json::Value;
use sqlx::{Pool, Sqlite};
use tracing::{debug, info};

use crate::{
    common::{
        clock::Clock,
        error::{ServerError, SessionRejection},
        validation::{ensure_quiz_id, validate_input},
    },
    config::app_config::QuizConfig,
    features::{
        leaderboard::{models::LeaderboardEntry, repository::get_leaderboard},
        quiz::{
            models::{PublicQuestion, Question},
            repository::{get_questions_for_quiz, get_quiz_by_id},
        },
        session::{
            models::{
                AnswerResponse, CurrentQuestionResponse, NewAttempt, QuizSession, SessionStatus,
                StartQuizRequest, StartQuizResponse, SubmitAnswerRequest, TimingVerdict,
            },
            repository::{
                get_session_by_token, get_view, has_existing_session, tx_advance_session,
                tx_complete_session, tx_create_attempt, tx_create_session, tx_mark_answered,
                tx_record_view, tx_session_totals,
            },
            timing::validate_timing,
        },
        student::repository::find_or_create_student,
        whitelist::repository::is_whitelisted,
    },
};

const QUESTION_CACHE_CAPACITY: u64 = 1_000;

/// Drives a quiz attempt from start to completion.
///
/// Every operation reads the clock once and evaluates all timing rules
/// against that instant. Rejections never leave partial writes behind: the
/// writes belonging to one accepted answer share a transaction.
#[derive(Clone)]
pub struct QuizEngine {
    pool: Pool<Sqlite>,
    clock: Arc<dyn Clock>,
    rules: QuizConfig,
    question_cache: Cache<i64, Arc<Vec<Question>>>,
}

impl QuizEngine {
    pub fn new(pool: Pool<Sqlite>, clock: Arc<dyn Clock>, rules: QuizConfig) -> Self {
        let question_cache = Cache::builder()
            .max_capacity(QUESTION_CACHE_CAPACITY)
            .time_to_live(StdDuration::from_secs(rules.catalog_cache_ttl_secs))
            .build();

        Self {
            pool,
            clock,
            rules,
            question_cache,
        }
    }

    pub async fn start_quiz_session(
        &self,
        quiz_id: i64,
        request: &StartQuizRequest,
    ) -> Result<StartQuizResponse, ServerError> {
        let quiz_id = ensure_quiz_id(quiz_id)?;
        validate_input(request)?;

        let name = request.student_name.trim();
        let section = request.section.trim();

        if !is_whitelisted(&self.pool, name, section).await? {
            return Err(ServerError::Forbidden(
                "Student is not on the whitelist".into(),
            ));
        }

        let quiz = get_quiz_by_id(&self.pool, quiz_id)
            .await?
            .filter(|quiz| quiz.is_active)
            .ok_or_else(|| ServerError::NotFound(format!("Quiz {} not found", quiz_id)))?;

        let questions = self.questions_for(quiz.id).await?;
        if questions.is_empty() {
            return Err(ServerError::NotFound(format!(
                "Quiz {} has no questions",
                quiz.id
            )));
        }

        let now = self.clock.now();
        let student = find_or_create_student(&self.pool, name, Some(section), now).await?;

        if has_existing_session(&self.pool, student.id, quiz.id).await? {
            return Err(already_attempted());
        }

        let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();

        let mut tx = self.pool.begin().await?;
        let session = tx_create_session(
            &mut tx,
            student.id,
            quiz.id,
            &question_ids,
            now,
            self.rules.session_ttl(),
        )
        .await
        .map_err(conflict_on_duplicate)?;

        let first_id = session.current_question_id().ok_or_else(|| {
            ServerError::Internal(format!("Session {} has an empty question order", session.id))
        })?;
        let first = find_question(&questions, first_id)?;

        tx_record_view(&mut tx, session.id, first_id, now).await?;
        tx.commit().await?;

        info!(
            "Started session {} for student {} on quiz {}",
            session.id, student.id, quiz.id
        );

        Ok(StartQuizResponse {
            session_token: session.session_token,
            question: PublicQuestion::from(first),
            total_questions: question_ids.len(),
            current_index: 0,
        })
    }

    pub async fn submit_answer(
        &self,
        quiz_id: i64,
        request: &SubmitAnswerRequest,
    ) -> Result<AnswerResponse, ServerError> {
        let token = require_token(request.session_token.as_deref())?;
        let question_id = request
            .question_id
            .ok_or_else(|| ServerError::Validation("questionId is required".into()))?;
        let answer = request
            .answer
            .as_ref()
            .and_then(coerce_answer)
            .ok_or_else(|| ServerError::Validation("answer is required".into()))?;
        let quiz_id = ensure_quiz_id(quiz_id)?;

        let now = self.clock.now();
        let session = self.active_session(token, quiz_id, now).await?;

        let view = get_view(&self.pool, session.id, question_id).await?;

        // A replayed question reports as answered rather than out of order.
        if view.as_ref().is_some_and(|v| v.answered_at.is_some()) {
            return Err(SessionRejection::AlreadyAnswered.into());
        }

        if session.current_question_id() != Some(question_id) {
            return Err(SessionRejection::QuestionMismatch.into());
        }

        let view = view.ok_or(SessionRejection::NotViewed)?;

        match validate_timing(view.viewed_at, now, &self.rules) {
            TimingVerdict::Valid => {}
            TimingVerdict::TooQuick => return Err(SessionRejection::TooQuick.into()),
            TimingVerdict::TooSlow => return Err(SessionRejection::TooSlow.into()),
        }

        let duration_ms = (now - view.viewed_at).num_milliseconds();

        let questions = self.questions_for(session.quiz_id).await?;
        let question = find_question(&questions, question_id)?;
        let correct = question.is_correct(&answer);
        let score = if correct {
            self.rules.points_per_correct
        } else {
            0
        };

        let next = if session.is_last_question() {
            None
        } else {
            let next_index = session.current_index + 1;
            let next_id = session.question_order[next_index];
            Some((next_index, find_question(&questions, next_id)?))
        };

        let attempt = NewAttempt {
            student_id: session.student_id,
            quiz_id: session.quiz_id,
            question_id,
            student_answer: &answer,
            score,
            duration_ms,
        };

        let mut tx = self.pool.begin().await?;
        tx_create_attempt(&mut tx, &attempt, now).await?;

        if !tx_mark_answered(&mut tx, session.id, question_id, now).await? {
            return Err(SessionRejection::AlreadyAnswered.into());
        }

        let Some((next_index, next_question)) = next else {
            if !tx_complete_session(&mut tx, session.id, now).await? {
                return Err(SessionRejection::Completed.into());
            }

            let results = tx_session_totals(&mut tx, session.student_id, session.quiz_id).await?;
            tx.commit().await?;

            info!(
                "Session {} completed with score {}/{} after {}s",
                session.id,
                results.total_score,
                session.total_questions(),
                (now - session.started_at).num_seconds()
            );

            return Ok(AnswerResponse {
                correct,
                score,
                completed: true,
                next_question: None,
                current_index: None,
                total_questions: None,
                results: Some(results),
            });
        };

        if !tx_advance_session(&mut tx, session.id, session.current_index, next_index).await? {
            return Err(SessionRejection::QuestionMismatch.into());
        }
        tx_record_view(&mut tx, session.id, next_question.id, now).await?;
        tx.commit().await?;

        debug!(
            "Session {} accepted answer {} of {} (correct: {})",
            session.id,
            next_index,
            session.total_questions(),
            correct
        );

        Ok(AnswerResponse {
            correct,
            score,
            completed: false,
            next_question: Some(PublicQuestion::from(next_question)),
            current_index: Some(next_index),
            total_questions: Some(session.total_questions()),
            results: None,
        })
    }

    /// Pure read: no view is recorded.
    pub async fn get_current_question(
        &self,
        quiz_id: i64,
        session_token: Option<&str>,
    ) -> Result<CurrentQuestionResponse, ServerError> {
        let token = require_token(session_token)?;
        let quiz_id = ensure_quiz_id(quiz_id)?;

        let now = self.clock.now();
        let session = self.active_session(token, quiz_id, now).await?;

        let question_id = session.current_question_id().ok_or_else(|| {
            ServerError::Internal(format!("Session {} points past its last question", session.id))
        })?;
        let questions = self.questions_for(session.quiz_id).await?;
        let question = find_question(&questions, question_id)?;

        Ok(CurrentQuestionResponse {
            question: PublicQuestion::from(question),
            current_index: session.current_index,
            total_questions: session.total_questions(),
        })
    }

    pub async fn get_leaderboard(&self, quiz_id: i64) -> Result<Vec<LeaderboardEntry>, ServerError> {
        let quiz_id = ensure_quiz_id(quiz_id)?;

        if get_quiz_by_id(&self.pool, quiz_id).await?.is_none() {
            return Err(ServerError::NotFound(format!("Quiz {} not found", quiz_id)));
        }

        let entries = get_leaderboard(&self.pool, quiz_id, self.rules.leaderboard_size).await?;
        Ok(entries)
    }

    /// Looks a token up and refuses it unless the session is active and belongs to `quiz_id`.
    async fn active_session(
        &self,
        token: &str,
        quiz_id: i64,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<QuizSession, ServerError> {
        let session = get_session_by_token(&self.pool, token)
            .await?
            .ok_or(SessionRejection::InvalidSession)?;

        if let Some(rejection) = SessionStatus::of(&session, now).rejection() {
            return Err(rejection.into());
        }

        if session.quiz_id != quiz_id {
            return Err(SessionRejection::QuizMismatch.into());
        }

        Ok(session)
    }

    async fn questions_for(&self, quiz_id: i64) -> Result<Arc<Vec<Question>>, ServerError> {
        if let Some(questions) = self.question_cache.get(&quiz_id).await {
            return Ok(questions);
        }

        let questions = Arc::new(get_questions_for_quiz(&self.pool, quiz_id).await?);
        if !questions.is_empty() {
            self.question_cache.insert(quiz_id, questions.clone()).await;
        }

        Ok(questions)
    }
}

fn find_question(questions: &[Question], question_id: i64) -> Result<&Question, ServerError> {
    questions
        .iter()
        .find(|q| q.id == question_id)
        .ok_or_else(|| ServerError::NotFound(format!("Question {} not found", question_id)))
}

fn require_token(token: Option<&str>) -> Result<&str, ServerError> {
    token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServerError::Validation("sessionToken is required".into()))
}

/// Answers are graded as text; numbers and booleans use their JSON spelling.
fn coerce_answer(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn already_attempted() -> ServerError {
    ServerError::Conflict("Student has already attempted this quiz".into())
}

fn conflict_on_duplicate(err: ServerError) -> ServerError {
    match err {
        ServerError::Sqlx(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
            already_attempted()
        }
        other => other,
    }
}
