use serde::Serialize;

use super::progress::UnitInfo;

#[derive(Debug, Serialize)]
pub struct UnitNavigation {
    pub units: Vec<UnitInfo>,
}

#[derive(Debug, Serialize)]
pub struct ExamCountdown {
    pub exam_date: String,
    pub days_remaining: i64,
    pub message: String,
}
