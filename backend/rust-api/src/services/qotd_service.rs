use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use std::{path::Path, sync::Arc};

use super::streak::{compute_streaks, daily_results, StreakPolicy};
use crate::{
    cache::Cache,
    config::SiteSettings,
    error::HubError,
    metrics::{record_cache_hit, record_cache_miss, QOTD_ATTEMPTS_TOTAL},
    models::qotd::{
        AttemptOutcome, AttemptRecord, CachedAttempt, Question, QotdStats, TodayQuestionResponse,
    },
    store::DocumentStore,
    utils::time::{civil_date, date_key, Clock},
};

/// Per-day attempt cache entries outlive the day they belong to.
const ATTEMPT_CACHE_TTL_SECONDS: u64 = 48 * 60 * 60;

/// The fixed pool the daily question rotates through.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl QuestionBank {
    pub fn new(questions: Vec<Question>) -> Result<Self> {
        if questions.is_empty() {
            anyhow::bail!("Question bank is empty");
        }
        for (index, question) in questions.iter().enumerate() {
            if question.answers.len() < 2 {
                anyhow::bail!("Question {} needs at least two answers", index);
            }
            if question.correct_answer().is_none() {
                anyhow::bail!(
                    "Question {} marks answer {} correct but has {} answers",
                    index,
                    question.correct,
                    question.answers.len()
                );
            }
        }
        Ok(Self { questions })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read question bank {}", path.display()))?;
        let questions: Vec<Question> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse question bank {}", path.display()))?;
        let bank = Self::new(questions)?;
        tracing::info!("Loaded {} questions from {}", bank.len(), path.display());
        Ok(bank)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&Question> {
        self.questions.get(index as usize)
    }
}

/// Index of the question shown on `today`; advances by one each civil day.
pub fn question_index(today: NaiveDate, season_start: NaiveDate, bank_size: usize) -> u32 {
    if bank_size == 0 {
        return 0;
    }
    let days = (today - season_start).num_days();
    days.rem_euclid(bank_size as i64) as u32
}

fn feedback(correct: bool, question: &Question) -> String {
    if correct {
        "Correct!".to_string()
    } else {
        format!(
            "Incorrect! The correct answer was: {}",
            question.correct_answer().unwrap_or_default()
        )
    }
}

pub struct QotdService {
    store: Arc<dyn DocumentStore>,
    cache: Arc<dyn Cache>,
    bank: Arc<QuestionBank>,
    clock: Arc<dyn Clock>,
    site: SiteSettings,
}

impl QotdService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        cache: Arc<dyn Cache>,
        bank: Arc<QuestionBank>,
        clock: Arc<dyn Clock>,
        site: SiteSettings,
    ) -> Self {
        Self {
            store,
            cache,
            bank,
            clock,
            site,
        }
    }

    pub fn today(&self) -> NaiveDate {
        civil_date(self.clock.now(), self.site.time_zone)
    }

    fn todays_question(&self) -> Result<(NaiveDate, u32, &Question)> {
        let today = self.today();
        let index = question_index(today, self.site.season_start, self.bank.len());
        let question = self
            .bank
            .get(index)
            .ok_or_else(|| anyhow::anyhow!("Question index {} out of range", index))?;
        Ok((today, index, question))
    }

    fn cache_key(user_id: &str, date: &str) -> String {
        format!("qotd:attempt:{}:{}", user_id, date)
    }

    /// Cache first, then the store; a store hit refills the cache.
    pub async fn find_attempt(&self, user_id: &str, date: &str) -> Result<Option<CachedAttempt>> {
        let key = Self::cache_key(user_id, date);

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match serde_json::from_str::<CachedAttempt>(&raw) {
                Ok(cached) => {
                    record_cache_hit();
                    return Ok(Some(cached));
                }
                Err(e) => tracing::warn!("Discarding unreadable cache entry {}: {}", key, e),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!("Attempt cache read failed for {}: {:#}", key, e),
        }
        record_cache_miss();

        let Some(record) = self.store.get_attempt(user_id, date).await? else {
            return Ok(None);
        };
        let cached = CachedAttempt::from(&record);
        self.remember(&key, &cached).await;
        Ok(Some(cached))
    }

    async fn remember(&self, key: &str, attempt: &CachedAttempt) {
        let Ok(payload) = serde_json::to_string(attempt) else {
            return;
        };
        if let Err(e) = self
            .cache
            .set_ex(key, &payload, ATTEMPT_CACHE_TTL_SECONDS)
            .await
        {
            tracing::warn!("Failed to cache attempt {}: {:#}", key, e);
        }
    }

    pub async fn today_for(&self, user_id: Option<&str>) -> Result<TodayQuestionResponse> {
        let (today, index, question) = self.todays_question()?;
        let date = date_key(today);

        let attempt = match user_id {
            Some(uid) => self
                .find_attempt(uid, &date)
                .await?
                .map(|cached| self.outcome(&date, question, cached)),
            None => None,
        };

        Ok(TodayQuestionResponse {
            date,
            question_index: index,
            question: question.question.clone(),
            answers: question.answers.clone(),
            locked: user_id.is_none(),
            attempt,
        })
    }

    fn outcome(&self, date: &str, question: &Question, attempt: CachedAttempt) -> AttemptOutcome {
        AttemptOutcome {
            date: date.to_string(),
            answer_index: attempt.answer_index,
            correct: attempt.correct,
            correct_index: question.correct,
            explanation: question.explanation.clone(),
            feedback: feedback(attempt.correct, question),
        }
    }

    /// Records the one answer a user gets for today's question.
    pub async fn submit(&self, user_id: &str, answer_index: u32) -> Result<AttemptOutcome> {
        let (today, index, question) = self.todays_question()?;
        let date = date_key(today);

        if answer_index as usize >= question.answers.len() {
            return Err(HubError::Validation(format!(
                "answer_index must be below {}",
                question.answers.len()
            ))
            .into());
        }

        if self.find_attempt(user_id, &date).await?.is_some() {
            return Err(
                HubError::Conflict("Today's question has already been answered".to_string())
                    .into(),
            );
        }

        let correct = answer_index == question.correct;
        let record = AttemptRecord {
            id: AttemptRecord::document_id(user_id, &date),
            uid: user_id.to_string(),
            date: date.clone(),
            question_index: index,
            answer_index,
            correct,
            created_at: Utc::now(),
        };
        // The store is authoritative; a concurrent duplicate surfaces as Conflict here
        self.store.insert_attempt(&record).await?;

        let cached = CachedAttempt::from(&record);
        self.remember(&Self::cache_key(user_id, &date), &cached)
            .await;

        QOTD_ATTEMPTS_TOTAL
            .with_label_values(&[if correct { "true" } else { "false" }])
            .inc();
        tracing::info!(
            "User {} answered question {} on {} (correct={})",
            user_id,
            index,
            date,
            correct
        );

        Ok(self.outcome(&date, question, cached))
    }

    pub async fn stats(&self, user_id: &str) -> Result<QotdStats> {
        let attempts = self.store.attempts_for_user(user_id).await?;
        Ok(summarize(&attempts, self.today(), self.site.streak_policy))
    }
}

/// Totals and streaks for one user's attempt history.
pub fn summarize(attempts: &[AttemptRecord], today: NaiveDate, policy: StreakPolicy) -> QotdStats {
    let attempted = attempts.len() as u32;
    let correct = attempts.iter().filter(|attempt| attempt.correct).count() as u32;
    let streaks = compute_streaks(&daily_results(attempts), today, policy);

    QotdStats {
        attempted,
        correct,
        percent_correct: percent_of(correct, attempted),
        current_streak: streaks.current,
        longest_streak: streaks.longest,
    }
}

pub fn percent_of(correct: u32, attempted: u32) -> f64 {
    if attempted == 0 {
        0.0
    } else {
        100.0 * f64::from(correct) / f64::from(attempted)
    }
}
