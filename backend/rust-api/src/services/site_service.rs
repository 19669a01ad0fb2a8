use chrono::NaiveDate;

use crate::models::{
    progress::UNIT_CATALOG,
    site::{ExamCountdown, UnitNavigation},
};

pub fn unit_navigation() -> UnitNavigation {
    UnitNavigation {
        units: UNIT_CATALOG.to_vec(),
    }
}

/// Whole days left until the exam, counted in civil dates; zero once it has passed.
pub fn exam_countdown(today: NaiveDate, exam_date: NaiveDate) -> ExamCountdown {
    let days_remaining = (exam_date - today).num_days().max(0);
    let message = match days_remaining {
        0 => "The AP Chemistry exam is today!".to_string(),
        1 => "1 day until the AP Chemistry exam!".to_string(),
        n => format!("{} days until the AP Chemistry exam!", n),
    };

    ExamCountdown {
        exam_date: exam_date.format("%Y-%m-%d").to_string(),
        days_remaining,
        message,
    }
}
