//! Daily-question streaks.
//!
//! Every screen that shows a streak (stats box, account panel, leaderboard)
//! goes through [`compute_streaks`], so they cannot disagree.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::{models::qotd::AttemptRecord, utils::time::parse_date_key};

/// What "current streak" shows when the latest correct answer is not today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakPolicy {
    /// The run only counts while today's question was answered correctly.
    #[default]
    RequireToday,
    /// A run ending yesterday is still alive until today is over.
    AllowYesterday,
}

impl FromStr for StreakPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "require_today" => Ok(StreakPolicy::RequireToday),
            "allow_yesterday" => Ok(StreakPolicy::AllowYesterday),
            other => Err(format!(
                "Unknown streak policy '{}' (expected require_today or allow_yesterday)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyResult {
    pub date: NaiveDate,
    pub correct: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreakSummary {
    pub current: u32,
    pub longest: u32,
}

/// Converts stored attempts, dropping records whose date does not parse.
pub fn daily_results(attempts: &[AttemptRecord]) -> Vec<DailyResult> {
    attempts
        .iter()
        .filter_map(|attempt| match parse_date_key(&attempt.date) {
            Some(date) => Some(DailyResult {
                date,
                correct: attempt.correct,
            }),
            None => {
                tracing::warn!(
                    "Skipping attempt {} with malformed date '{}'",
                    attempt.id,
                    attempt.date
                );
                None
            }
        })
        .collect()
}

pub fn compute_streaks(
    results: &[DailyResult],
    today: NaiveDate,
    policy: StreakPolicy,
) -> StreakSummary {
    let mut sorted = results.to_vec();
    sorted.sort_by_key(|result| result.date);
    // One record per day; a stray duplicate never extends the run
    sorted.dedup_by_key(|result| result.date);

    let mut running = 0u32;
    let mut longest = 0u32;
    let mut previous_correct: Option<NaiveDate> = None;

    for result in &sorted {
        if !result.correct {
            running = 0;
            continue;
        }
        running = match previous_correct {
            Some(previous) if (result.date - previous).num_days() == 1 => running + 1,
            _ => 1,
        };
        previous_correct = Some(result.date);
        longest = longest.max(running);
    }

    let current = match sorted.last() {
        Some(last) if last.correct => {
            let age = (today - last.date).num_days();
            let alive = match policy {
                StreakPolicy::RequireToday => age == 0,
                StreakPolicy::AllowYesterday => age == 0 || age == 1,
            };
            if alive {
                running
            } else {
                0
            }
        }
        _ => 0,
    };

    StreakSummary { current, longest }
}
