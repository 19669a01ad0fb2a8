use anyhow::Result;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;

use crate::{
    error::HubError,
    models::progress::{
        find_unit, ProgressOverview, ProgressRecord, UnitProgress, UnitProgressView, UNIT_CATALOG,
    },
    store::DocumentStore,
};

lazy_static! {
    static ref SUBUNIT_ID_RE: Regex = Regex::new(r"^[A-Za-z0-9_-]{1,64}$").unwrap();
}

/// Share of a unit that is done, counting the final quiz as one extra step.
///
/// Rounds half up and never exceeds 100 even if more subunits were recorded
/// than the catalog knows about.
pub fn percent_complete(completed_subunits: usize, final_quiz_completed: bool, total_subunits: u32) -> u8 {
    let total = u64::from(total_subunits);
    let completed = (completed_subunits as u64).min(total);
    let numerator = completed + u64::from(final_quiz_completed);
    let denominator = total + 1;
    let percent = (200 * numerator + denominator) / (2 * denominator);
    percent.min(100) as u8
}

pub struct ProgressService {
    store: Arc<dyn DocumentStore>,
    pass_percent: f64,
}

impl ProgressService {
    pub fn new(store: Arc<dyn DocumentStore>, pass_percent: f64) -> Self {
        Self {
            store,
            pass_percent,
        }
    }

    pub async fn overview(&self, user_id: &str) -> Result<ProgressOverview> {
        let record = self.store.get_progress(user_id).await?.unwrap_or_default();
        Ok(build_overview(&record))
    }

    pub async fn mark_subunit(
        &self,
        user_id: &str,
        unit_id: &str,
        subunit_id: &str,
    ) -> Result<UnitProgressView> {
        let unit = find_unit(unit_id)
            .ok_or_else(|| HubError::NotFound(format!("Unknown unit '{}'", unit_id)))?;
        if !SUBUNIT_ID_RE.is_match(subunit_id) {
            return Err(HubError::Validation(format!("Invalid subunit id '{}'", subunit_id)).into());
        }

        self.store
            .mark_subunit_complete(user_id, unit.id, subunit_id)
            .await?;
        tracing::debug!("User {} completed {}/{}", user_id, unit_id, subunit_id);

        self.unit_view(user_id, unit_id).await
    }

    /// Records a final quiz score. Completion is sticky and the best score only rises.
    pub async fn record_final_quiz(
        &self,
        user_id: &str,
        unit_id: &str,
        percent: f64,
    ) -> Result<UnitProgressView> {
        let unit = find_unit(unit_id)
            .ok_or_else(|| HubError::NotFound(format!("Unknown unit '{}'", unit_id)))?;
        if !(0.0..=100.0).contains(&percent) {
            return Err(HubError::Validation("percent must be within 0..=100".to_string()).into());
        }

        let existing = self
            .store
            .get_progress(user_id)
            .await?
            .and_then(|record| record.units.get(unit.id).cloned())
            .unwrap_or_default();

        let completed = existing.final_quiz_completed || percent >= self.pass_percent;
        let highest = existing
            .final_quiz_highest_score
            .map_or(percent, |best| best.max(percent));

        self.store
            .set_final_quiz_result(user_id, unit.id, completed, highest)
            .await?;
        tracing::info!(
            "User {} scored {:.1}% on {} final quiz (completed={})",
            user_id,
            percent,
            unit_id,
            completed
        );

        self.unit_view(user_id, unit_id).await
    }

    async fn unit_view(&self, user_id: &str, unit_id: &str) -> Result<UnitProgressView> {
        let record = self.store.get_progress(user_id).await?.unwrap_or_default();
        build_overview(&record)
            .units
            .into_iter()
            .find(|view| view.unit_id == unit_id)
            .ok_or_else(|| HubError::NotFound(format!("Unknown unit '{}'", unit_id)).into())
    }
}

pub fn build_overview(record: &ProgressRecord) -> ProgressOverview {
    let empty = UnitProgress::default();
    let units: Vec<UnitProgressView> = UNIT_CATALOG
        .iter()
        .map(|unit| {
            let progress = record.units.get(unit.id).unwrap_or(&empty);
            let completed = progress.completed_subunits();
            UnitProgressView {
                unit_id: unit.id.to_string(),
                title: unit.title.to_string(),
                completed_subunits: completed,
                total_subunits: unit.total_subunits,
                final_quiz_completed: progress.final_quiz_completed,
                final_quiz_highest_score: progress.final_quiz_highest_score,
                percent: percent_complete(
                    completed,
                    progress.final_quiz_completed,
                    unit.total_subunits,
                ),
            }
        })
        .collect();

    let best_final_quiz_score = units
        .iter()
        .filter_map(|view| view.final_quiz_highest_score)
        .fold(None, |best: Option<f64>, score| {
            Some(best.map_or(score, |b| b.max(score)))
        });

    ProgressOverview {
        units,
        best_final_quiz_score,
    }
}
