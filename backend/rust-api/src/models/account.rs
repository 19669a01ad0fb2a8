use serde::Serialize;

use super::{progress::ProgressOverview, qotd::QotdStats};

/// Everything the account panel shows in one payload
#[derive(Debug, Serialize)]
pub struct AccountSummary {
    pub username: Option<String>,
    pub progress: ProgressOverview,
    pub qotd: QotdStats,
}
