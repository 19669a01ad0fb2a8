use crate::{
    error::HubError,
    models::calculator::{ScorePrediction, ScoreRequest, LONG_FRQ_MAX, MCQ_MAX, SHORT_FRQ_MAX},
};

/// Raw FRQ points reachable from the inputs: 3 long out of 10, 4 short out of 4.
pub const FRQ_MAX_RAW: u32 = 3 * LONG_FRQ_MAX + 4 * SHORT_FRQ_MAX;

/// FRQ divisor of the published scoring worksheet. It is larger than
/// `FRQ_MAX_RAW`, so a perfect free-response section counts as 46/52.
pub const FRQ_DENOMINATOR: u32 = 52;

// Weighted-percent cutoffs, highest first
const SCORE_CUTOFFS: [(f64, u8); 4] = [(0.72, 5), (0.60, 4), (0.48, 3), (0.35, 2)];

/// Predicts the AP score from section raw scores, MCQ and FRQ weighted equally.
pub fn predict_score(req: &ScoreRequest) -> Result<ScorePrediction, HubError> {
    if req.mcq > MCQ_MAX {
        return Err(HubError::Validation(format!(
            "mcq must be within 0..={}",
            MCQ_MAX
        )));
    }
    if req.long_frq.iter().any(|points| *points > LONG_FRQ_MAX) {
        return Err(HubError::Validation(format!(
            "long_frq scores must be within 0..={}",
            LONG_FRQ_MAX
        )));
    }
    if req.short_frq.iter().any(|points| *points > SHORT_FRQ_MAX) {
        return Err(HubError::Validation(format!(
            "short_frq scores must be within 0..={}",
            SHORT_FRQ_MAX
        )));
    }

    let mcq_fraction = f64::from(req.mcq) / f64::from(MCQ_MAX);
    let frq_raw: u32 = req.long_frq.iter().sum::<u32>() + req.short_frq.iter().sum::<u32>();
    let frq_fraction = f64::from(frq_raw) / f64::from(FRQ_DENOMINATOR);
    let weighted = 0.5 * mcq_fraction + 0.5 * frq_fraction;

    let predicted_score = SCORE_CUTOFFS
        .iter()
        .find(|(cutoff, _)| weighted >= *cutoff)
        .map(|(_, score)| *score)
        .unwrap_or(1);

    Ok(ScorePrediction {
        mcq_percent: mcq_fraction * 100.0,
        frq_raw,
        frq_percent: frq_fraction * 100.0,
        weighted_percent: weighted * 100.0,
        predicted_score,
    })
}
