use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// A course unit as it appears in navigation and progress bars.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UnitInfo {
    pub id: &'static str,
    pub title: &'static str,
    pub page: &'static str,
    pub total_subunits: u32,
}

/// Canonical subunit counts; the denominator for every progress bar.
pub const UNIT_CATALOG: [UnitInfo; 9] = [
    UnitInfo {
        id: "unit-1",
        title: "Unit 1: Atomic Structure and Properties",
        page: "/ap-chem/unit-1-atomic-structure/",
        total_subunits: 8,
    },
    UnitInfo {
        id: "unit-2",
        title: "Unit 2: Compound Structure and Properties",
        page: "/ap-chem/unit-2-compound-structure-and-properties/",
        total_subunits: 7,
    },
    UnitInfo {
        id: "unit-3",
        title: "Unit 3: Properties of Substances and Mixtures",
        page: "/ap-chem/unit-3-properties-of-substances-and-mixtures/",
        total_subunits: 13,
    },
    UnitInfo {
        id: "unit-4",
        title: "Unit 4: Chemical Reactions",
        page: "/ap-chem/unit-4-chemical-reactions/",
        total_subunits: 9,
    },
    UnitInfo {
        id: "unit-5",
        title: "Unit 5: Kinetics",
        page: "/ap-chem/unit-5-kinetics/",
        total_subunits: 11,
    },
    UnitInfo {
        id: "unit-6",
        title: "Unit 6: Thermochemistry",
        page: "/ap-chem/unit-6-thermochemistry/",
        total_subunits: 9,
    },
    UnitInfo {
        id: "unit-7",
        title: "Unit 7: Equilibrium",
        page: "/ap-chem/unit-7-equilibrium/",
        total_subunits: 12,
    },
    UnitInfo {
        id: "unit-8",
        title: "Unit 8: Acids and Bases",
        page: "/ap-chem/unit-8-acids-and-bases/",
        total_subunits: 11,
    },
    UnitInfo {
        id: "unit-9",
        title: "Unit 9: Thermodynamics and Electrochemistry",
        page: "/ap-chem/unit-9-thermodynamics-and-electrochemistry/",
        total_subunits: 11,
    },
];

pub fn find_unit(unit_id: &str) -> Option<&'static UnitInfo> {
    UNIT_CATALOG.iter().find(|unit| unit.id == unit_id)
}

/// Progress document stored in MongoDB "progress" collection, one per user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(rename = "_id")]
    pub user_id: String,
    #[serde(default)]
    pub units: BTreeMap<String, UnitProgress>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UnitProgress {
    #[serde(default)]
    pub subunits: BTreeMap<String, bool>,
    #[serde(rename = "finalQuizCompleted", default)]
    pub final_quiz_completed: bool,
    #[serde(
        rename = "finalQuizHighestScore",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub final_quiz_highest_score: Option<f64>,
}

impl UnitProgress {
    pub fn completed_subunits(&self) -> usize {
        self.subunits.values().filter(|done| **done).count()
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct FinalQuizRequest {
    #[validate(range(min = 0.0, max = 100.0, message = "percent must be within 0..=100"))]
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitProgressView {
    pub unit_id: String,
    pub title: String,
    pub completed_subunits: usize,
    pub total_subunits: u32,
    pub final_quiz_completed: bool,
    pub final_quiz_highest_score: Option<f64>,
    pub percent: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgressOverview {
    pub units: Vec<UnitProgressView>,
    pub best_final_quiz_score: Option<f64>,
}
