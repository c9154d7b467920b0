use std::collections::BTreeMap;

use log::info;
use serde::Serialize;

use crate::aggregate::weighted_average;
use crate::models::ResultSummary;
use crate::round2;
use crate::scale::GradeScale;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SimulationError {
    #[error("{0} has already been simulated. Remove the existing simulation first.")]
    DuplicateSimulation(String),
    #[error("{0} is not a graded course in this result")]
    UnknownCourse(String),
    #[error("{0} is not a grade on the scale")]
    UnknownGrade(String),
    #[error("{0} has no simulation to remove")]
    NotSimulated(String),
}

/// Hypothetical grades keyed by course code, at most one per course.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlay {
    entries: BTreeMap<String, String>,
}

impl Overlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        course_code: impl Into<String>,
        grade: impl Into<String>,
    ) -> Result<(), SimulationError> {
        let course_code = course_code.into();
        if self.entries.contains_key(&course_code) {
            return Err(SimulationError::DuplicateSimulation(course_code));
        }
        self.entries.insert(course_code, grade.into());
        Ok(())
    }

    pub fn remove(&mut self, course_code: &str) -> Option<String> {
        self.entries.remove(course_code)
    }

    pub fn get(&self, course_code: &str) -> Option<&str> {
        self.entries.get(course_code).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(code, grade)| (code.as_str(), grade.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Substitution {
    pub course_code: String,
    pub from_grade: String,
    pub from_point: f64,
    pub to_grade: String,
    pub to_point: f64,
    pub point_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    pub cgpa: f64,
    pub delta: f64,
    pub substitutions: Vec<Substitution>,
}

/// CGPA with overlay grades standing in for the latest grades.
///
/// Each course counts once, through the credits and term label of its
/// latest-grade record; failing final grades are left out, as are courses
/// whose term label did not parse.
pub fn recompute_cgpa(summary: &ResultSummary, overlay: &Overlay, scale: &GradeScale) -> f64 {
    let mut total_points = 0.0;
    let mut total_credits = 0.0;

    for outcome in summary.courses.values() {
        if !outcome.counts_toward_totals() {
            continue;
        }

        let final_grade = overlay
            .get(&outcome.course_code)
            .unwrap_or(outcome.grade.as_str());
        if scale.is_failing(final_grade) {
            continue;
        }
        let Some(point) = scale.point(final_grade) else {
            continue;
        };

        total_points += outcome.credits * point;
        total_credits += outcome.credits;
    }

    weighted_average(total_points, total_credits)
}

/// Simulated result for a non-empty overlay; an empty overlay has no result.
pub fn simulate(summary: &ResultSummary, overlay: &Overlay, scale: &GradeScale) -> Option<Simulation> {
    if overlay.is_empty() {
        return None;
    }

    let cgpa = recompute_cgpa(summary, overlay, scale);
    let substitutions = overlay
        .iter()
        .map(|(code, to_grade)| {
            let from_grade = summary.latest_grade(code).unwrap_or_default();
            let from_point = scale.point(from_grade).unwrap_or(0.0);
            let to_point = scale.point(to_grade).unwrap_or(0.0);
            Substitution {
                course_code: code.to_string(),
                from_grade: from_grade.to_string(),
                from_point,
                to_grade: to_grade.to_string(),
                to_point,
                point_change: round2(to_point - from_point),
            }
        })
        .collect();

    Some(Simulation {
        cgpa,
        delta: round2(cgpa - summary.overall_cgpa),
        substitutions,
    })
}

/// Signed two-decimal rendering with an explicit `+` when not negative.
pub fn format_delta(delta: f64) -> String {
    if delta >= 0.0 {
        format!("+{:.2}", delta.abs())
    } else {
        format!("{:.2}", delta)
    }
}

/// An interactive what-if session owning its overlay.
pub struct WhatIfSession<'a> {
    summary: &'a ResultSummary,
    scale: &'a GradeScale,
    overlay: Overlay,
}

impl<'a> WhatIfSession<'a> {
    pub fn new(summary: &'a ResultSummary, scale: &'a GradeScale) -> Self {
        Self {
            summary,
            scale,
            overlay: Overlay::new(),
        }
    }

    pub fn add(&mut self, course_code: &str, grade: &str) -> Result<Option<Simulation>, SimulationError> {
        if self.summary.latest_grade(course_code).is_none() {
            return Err(SimulationError::UnknownCourse(course_code.to_string()));
        }
        if !self.scale.is_valid(grade) {
            return Err(SimulationError::UnknownGrade(grade.to_string()));
        }

        self.overlay.insert(course_code, grade)?;
        info!("simulating {} as {}", course_code, grade);
        Ok(self.result())
    }

    pub fn remove(&mut self, course_code: &str) -> Result<Option<Simulation>, SimulationError> {
        if self.overlay.remove(course_code).is_none() {
            return Err(SimulationError::NotSimulated(course_code.to_string()));
        }
        info!("removed simulation for {}", course_code);
        Ok(self.result())
    }

    pub fn clear(&mut self) {
        self.overlay.clear();
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn result(&self) -> Option<Simulation> {
        simulate(self.summary, &self.overlay, self.scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::summarize;
    use crate::models::CourseAttemptRecord;

    fn record(code: &str, credits: f64, is_lab: bool, grade: &str) -> CourseAttemptRecord {
        CourseAttemptRecord {
            course_code: code.to_string(),
            credits,
            level_term: "Level 2 - Term I".to_string(),
            is_lab,
            grade: grade.to_string(),
        }
    }

    fn sample_summary(scale: &GradeScale) -> ResultSummary {
        let records = vec![
            record("CSE 201", 3.0, false, "C"),
            record("CSE 202", 1.5, true, "A"),
            record("CSE 203", 3.0, false, "B+"),
            record("MATH 241", 3.0, false, "F"),
        ];
        summarize(&records, scale)
    }

    #[test]
    fn empty_overlay_reproduces_baseline() {
        let scale = GradeScale::default();
        let summary = sample_summary(&scale);
        let overlay = Overlay::new();

        assert_eq!(recompute_cgpa(&summary, &overlay, &scale), summary.overall_cgpa);
        assert!(simulate(&summary, &overlay, &scale).is_none());
    }

    #[test]
    fn raising_a_grade_shifts_cgpa_by_weighted_points() {
        let scale = GradeScale::default();
        let summary = sample_summary(&scale);
        let mut session = WhatIfSession::new(&summary, &scale);

        let simulation = session.add("CSE 201", "A+").unwrap().unwrap();
        let points = 3.0 * 2.25 + 1.5 * 3.75 + 3.0 * 3.25;
        let expected = round2((points + 3.0 * (4.0 - 2.25)) / summary.total_credits);
        assert_eq!(simulation.cgpa, expected);
        assert_eq!(simulation.delta, round2(expected - summary.overall_cgpa));
        assert!(simulation.delta > 0.0);

        let substitution = &simulation.substitutions[0];
        assert_eq!(substitution.from_grade, "C");
        assert_eq!(substitution.to_grade, "A+");
        assert_eq!(substitution.point_change, 1.75);
    }

    #[test]
    fn clearing_a_failed_course_adds_its_credits() {
        let scale = GradeScale::default();
        let summary = sample_summary(&scale);
        let mut session = WhatIfSession::new(&summary, &scale);

        let simulation = session.add("MATH 241", "B").unwrap().unwrap();
        let points = 3.0 * 2.25 + 1.5 * 3.75 + 3.0 * 3.25 + 3.0 * 3.0;
        assert_eq!(simulation.cgpa, round2(points / 10.5));
    }

    #[test]
    fn failing_substitution_drops_course_from_totals() {
        let scale = GradeScale::default();
        let summary = sample_summary(&scale);
        let mut session = WhatIfSession::new(&summary, &scale);

        let simulation = session.add("CSE 203", "F").unwrap().unwrap();
        let points = 3.0 * 2.25 + 1.5 * 3.75;
        assert_eq!(simulation.cgpa, round2(points / 4.5));
        assert!(simulation.delta < 0.0);
    }

    #[test]
    fn duplicate_simulation_is_rejected_without_mutation() {
        let scale = GradeScale::default();
        let summary = sample_summary(&scale);
        let mut session = WhatIfSession::new(&summary, &scale);

        session.add("CSE 201", "A").unwrap();
        let err = session.add("CSE 201", "B").unwrap_err();
        assert_eq!(err, SimulationError::DuplicateSimulation("CSE 201".to_string()));
        assert_eq!(session.overlay().get("CSE 201"), Some("A"));
        assert_eq!(session.overlay().len(), 1);
    }

    #[test]
    fn rejects_unknown_course_and_grade() {
        let scale = GradeScale::default();
        let summary = sample_summary(&scale);
        let mut session = WhatIfSession::new(&summary, &scale);

        assert_eq!(
            session.add("EEE 101", "A"),
            Err(SimulationError::UnknownCourse("EEE 101".to_string()))
        );
        assert_eq!(
            session.add("CSE 201", "E"),
            Err(SimulationError::UnknownGrade("E".to_string()))
        );
        assert!(session.overlay().is_empty());
    }

    #[test]
    fn removing_last_entry_clears_result() {
        let scale = GradeScale::default();
        let summary = sample_summary(&scale);
        let mut session = WhatIfSession::new(&summary, &scale);

        session.add("CSE 201", "A+").unwrap();
        session.add("CSE 203", "A").unwrap();

        let remaining = session.remove("CSE 201").unwrap().unwrap();
        assert_eq!(remaining.substitutions.len(), 1);
        assert_eq!(remaining.substitutions[0].course_code, "CSE 203");

        // CSE 201 falls back to its recorded C
        let mut only_cse_203 = Overlay::new();
        only_cse_203.insert("CSE 203", "A").unwrap();
        assert_eq!(remaining.cgpa, recompute_cgpa(&summary, &only_cse_203, &scale));
        let points = 3.0 * 2.25 + 1.5 * 3.75 + 3.0 * 3.75;
        assert_eq!(remaining.cgpa, round2(points / 7.5));

        assert_eq!(session.remove("CSE 203").unwrap(), None);
        assert_eq!(
            session.remove("CSE 203"),
            Err(SimulationError::NotSimulated("CSE 203".to_string()))
        );
    }

    #[test]
    fn delta_is_signed() {
        assert_eq!(format_delta(0.12), "+0.12");
        assert_eq!(format_delta(0.0), "+0.00");
        assert_eq!(format_delta(-0.0), "+0.00");
        assert_eq!(format_delta(-0.25), "-0.25");
    }
}
