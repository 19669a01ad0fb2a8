use serde::{Deserialize, Serialize};

pub const MCQ_MAX: u32 = 60;
pub const LONG_FRQ_MAX: u32 = 10;
pub const SHORT_FRQ_MAX: u32 = 4;

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreRequest {
    pub mcq: u32,
    pub long_frq: [u32; 3],
    pub short_frq: [u32; 4],
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ScorePrediction {
    pub mcq_percent: f64,
    pub frq_raw: u32,
    pub frq_percent: f64,
    pub weighted_percent: f64,
    pub predicted_score: u8,
}
