use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardMetric {
    /// Total correct answers
    #[default]
    Total,
    /// Best streak of consecutive correct days
    Streak,
    /// Share of attempts answered correctly
    Percent,
}

impl LeaderboardMetric {
    pub fn header(&self) -> &'static str {
        match self {
            LeaderboardMetric::Total => "Total Correct",
            LeaderboardMetric::Streak => "Best Streak",
            LeaderboardMetric::Percent => "% Correct",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default)]
    pub metric: LeaderboardMetric,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub username: String,
    pub correct: u32,
    pub attempted: u32,
    pub best_streak: u32,
    pub percent_correct: f64,
    /// Metric value formatted the way the table shows it
    pub display_value: String,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub metric: LeaderboardMetric,
    pub header: &'static str,
    pub entries: Vec<LeaderboardEntry>,
}
