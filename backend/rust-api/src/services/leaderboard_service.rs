use anyhow::Result;
use chrono::NaiveDate;
use std::{cmp::Ordering, collections::BTreeMap, sync::Arc};

use super::qotd_service::summarize;
use super::streak::StreakPolicy;
use crate::{
    models::{
        leaderboard::{LeaderboardEntry, LeaderboardMetric, LeaderboardResponse},
        qotd::AttemptRecord,
    },
    store::DocumentStore,
};

pub struct LeaderboardService {
    store: Arc<dyn DocumentStore>,
    size: usize,
    policy: StreakPolicy,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn DocumentStore>, size: usize, policy: StreakPolicy) -> Self {
        Self {
            store,
            size,
            policy,
        }
    }

    pub async fn leaderboard(
        &self,
        metric: LeaderboardMetric,
        today: NaiveDate,
    ) -> Result<LeaderboardResponse> {
        let attempts = self.store.all_attempts().await?;
        let mut entries = aggregate(&attempts, today, self.policy);

        let user_ids: Vec<String> = entries.iter().map(|entry| entry.user_id.clone()).collect();
        let names = self.store.usernames(&user_ids).await?;
        for entry in &mut entries {
            if let Some(name) = names.get(&entry.user_id) {
                entry.username = name.clone();
            }
        }

        let entries = rank(entries, metric, self.size);
        tracing::debug!(
            "Leaderboard by {:?}: {} ranked of {} attempts",
            metric,
            entries.len(),
            attempts.len()
        );

        Ok(LeaderboardResponse {
            metric,
            header: metric.header(),
            entries,
        })
    }
}

/// One row per user. Username defaults to the user id until names are joined in.
pub fn aggregate(
    attempts: &[AttemptRecord],
    today: NaiveDate,
    policy: StreakPolicy,
) -> Vec<LeaderboardEntry> {
    let mut by_user: BTreeMap<&str, Vec<AttemptRecord>> = BTreeMap::new();
    for attempt in attempts {
        by_user
            .entry(attempt.uid.as_str())
            .or_default()
            .push(attempt.clone());
    }

    by_user
        .into_iter()
        .map(|(uid, records)| {
            let stats = summarize(&records, today, policy);
            LeaderboardEntry {
                rank: 0,
                user_id: uid.to_string(),
                username: uid.to_string(),
                correct: stats.correct,
                attempted: stats.attempted,
                best_streak: stats.longest_streak,
                percent_correct: stats.percent_correct,
                display_value: String::new(),
            }
        })
        .collect()
}

/// Sorts by the chosen metric (descending, ties by username), keeps the top `size`.
pub fn rank(
    mut entries: Vec<LeaderboardEntry>,
    metric: LeaderboardMetric,
    size: usize,
) -> Vec<LeaderboardEntry> {
    entries.sort_by(|a, b| {
        let by_metric = match metric {
            LeaderboardMetric::Total => b.correct.cmp(&a.correct),
            LeaderboardMetric::Streak => b.best_streak.cmp(&a.best_streak),
            LeaderboardMetric::Percent => b
                .percent_correct
                .partial_cmp(&a.percent_correct)
                .unwrap_or(Ordering::Equal),
        };
        by_metric.then_with(|| a.username.cmp(&b.username))
    });
    entries.truncate(size);

    for (position, entry) in entries.iter_mut().enumerate() {
        entry.rank = position + 1;
        entry.display_value = match metric {
            LeaderboardMetric::Total => entry.correct.to_string(),
            LeaderboardMetric::Streak => entry.best_streak.to_string(),
            LeaderboardMetric::Percent => format!("{:.1}%", entry.percent_correct),
        };
    }
    entries
}
