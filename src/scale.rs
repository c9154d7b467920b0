use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Errors raised when a grade scale configuration is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ScaleError {
    #[error("Grade scale has no grades")]
    Empty,
    #[error("Grade scale lists {0} more than once")]
    DuplicateGrade(String),
    #[error("Grade {grade} has an invalid point value {point}")]
    InvalidPoint { grade: String, point: f64 },
    #[error("Failing grade {0} is not part of the scale")]
    MissingFailingGrade(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradePoint {
    pub grade: String,
    pub point: f64,
}

/// Immutable grade-symbol to grade-point table, ordered best first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeScale {
    grades: Vec<GradePoint>,
    failing: String,
}

impl Default for GradeScale {
    fn default() -> Self {
        let grades = [
            ("A+", 4.00),
            ("A", 3.75),
            ("A-", 3.50),
            ("B+", 3.25),
            ("B", 3.00),
            ("B-", 2.75),
            ("C+", 2.50),
            ("C", 2.25),
            ("D", 2.00),
            ("F", 0.00),
        ]
        .into_iter()
        .map(|(grade, point)| GradePoint {
            grade: grade.to_string(),
            point,
        })
        .collect();

        GradeScale {
            grades,
            failing: "F".to_string(),
        }
    }
}

impl GradeScale {
    pub fn new(grades: Vec<GradePoint>, failing: impl Into<String>) -> Result<Self, ScaleError> {
        let scale = GradeScale {
            grades,
            failing: failing.into(),
        };
        scale.validate()?;
        Ok(scale)
    }

    /// Loads a scale from a JSON file shaped like
    /// `{"grades": [{"grade": "A+", "point": 4.0}, ...], "failing": "F"}`.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read grade scale {}", path.display()))?;
        let scale: GradeScale = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse grade scale {}", path.display()))?;
        scale.validate()?;
        Ok(scale)
    }

    fn validate(&self) -> Result<(), ScaleError> {
        if self.grades.is_empty() {
            return Err(ScaleError::Empty);
        }

        let mut seen = HashSet::new();
        for entry in &self.grades {
            if !seen.insert(entry.grade.as_str()) {
                return Err(ScaleError::DuplicateGrade(entry.grade.clone()));
            }
            if !entry.point.is_finite() || entry.point < 0.0 {
                return Err(ScaleError::InvalidPoint {
                    grade: entry.grade.clone(),
                    point: entry.point,
                });
            }
        }

        if !seen.contains(self.failing.as_str()) {
            return Err(ScaleError::MissingFailingGrade(self.failing.clone()));
        }

        Ok(())
    }

    pub fn point(&self, grade: &str) -> Option<f64> {
        self.grades
            .iter()
            .find(|entry| entry.grade == grade)
            .map(|entry| entry.point)
    }

    pub fn is_valid(&self, grade: &str) -> bool {
        self.point(grade).is_some()
    }

    pub fn is_failing(&self, grade: &str) -> bool {
        grade == self.failing
    }

    pub fn failing_grade(&self) -> &str {
        &self.failing
    }

    /// Highest point on the scale, the ceiling for any GPA.
    pub fn max_point(&self) -> f64 {
        self.grades
            .iter()
            .map(|entry| entry.point)
            .fold(0.0, f64::max)
    }

    pub fn grades(&self) -> impl Iterator<Item = &str> {
        self.grades.iter().map(|entry| entry.grade.as_str())
    }
}
