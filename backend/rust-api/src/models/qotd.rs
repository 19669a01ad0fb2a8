use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::bson_datetime_as_chrono;

/// One entry of the static question bank (data/questions.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub answers: Vec<String>,
    pub correct: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    pub fn correct_answer(&self) -> Option<&str> {
        self.answers
            .get(self.correct as usize)
            .map(|answer| answer.as_str())
    }
}

/// Attempt stored in MongoDB "qotd_attempts"; `_id` is `{uid}_{date}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub uid: String,
    pub date: String,
    #[serde(rename = "questionIndex")]
    pub question_index: u32,
    #[serde(rename = "answerIndex")]
    pub answer_index: u32,
    pub correct: bool,
    #[serde(rename = "createdAt", with = "bson_datetime_as_chrono")]
    pub created_at: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn document_id(uid: &str, date: &str) -> String {
        format!("{}_{}", uid, date)
    }
}

/// Per-day attempt result kept in the cache in front of the store
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedAttempt {
    pub answer_index: u32,
    pub correct: bool,
}

impl From<&AttemptRecord> for CachedAttempt {
    fn from(record: &AttemptRecord) -> Self {
        CachedAttempt {
            answer_index: record.answer_index,
            correct: record.correct,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    pub answer_index: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttemptOutcome {
    pub date: String,
    pub answer_index: u32,
    pub correct: bool,
    pub correct_index: u32,
    pub explanation: Option<String>,
    pub feedback: String,
}

#[derive(Debug, Serialize)]
pub struct TodayQuestionResponse {
    pub date: String,
    pub question_index: u32,
    pub question: String,
    pub answers: Vec<String>,
    /// True for anonymous visitors; the client blurs the question and offers sign-in
    pub locked: bool,
    pub attempt: Option<AttemptOutcome>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QotdStats {
    pub attempted: u32,
    pub correct: u32,
    pub percent_correct: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
}
