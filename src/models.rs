use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref LEVEL_TERM_REGEX: Regex =
        Regex::new(r"Level\s+(\d+)\s*-\s*Term\s+([A-Za-z]+)").unwrap();
}

/// One row of the published result table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseAttemptRecord {
    pub course_code: String,
    pub credits: f64,
    pub level_term: String,
    pub is_lab: bool,
    pub grade: String,
}

impl CourseAttemptRecord {
    pub fn parsed_level_term(&self) -> Option<LevelTerm> {
        LevelTerm::parse(&self.level_term)
    }
}

/// A `(level, term)` pair such as level 3, term "II".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelTerm {
    pub level: u32,
    pub term: String,
}

impl LevelTerm {
    /// Parses labels of the form `Level <int> - Term <roman-or-word>`.
    pub fn parse(label: &str) -> Option<LevelTerm> {
        let captures = LEVEL_TERM_REGEX.captures(label)?;
        let level = captures.get(1)?.as_str().parse::<u32>().ok()?;
        let term = captures.get(2)?.as_str().to_string();
        Some(LevelTerm { level, term })
    }

    /// Ordinal of the term when it is written as a roman numeral.
    pub fn term_ordinal(&self) -> Option<u32> {
        roman_value(&self.term)
    }
}

impl fmt::Display for LevelTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level {} - Term {}", self.level, self.term)
    }
}

impl Ord for LevelTerm {
    fn cmp(&self, other: &Self) -> Ordering {
        self.level
            .cmp(&other.level)
            .then_with(|| {
                let lhs = self.term_ordinal().unwrap_or(u32::MAX);
                let rhs = other.term_ordinal().unwrap_or(u32::MAX);
                lhs.cmp(&rhs)
            })
            .then_with(|| self.term.cmp(&other.term))
    }
}

impl PartialOrd for LevelTerm {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn roman_value(text: &str) -> Option<u32> {
    if text.is_empty() {
        return None;
    }

    let mut total = 0u32;
    let mut previous = 0u32;
    for ch in text.chars().rev() {
        let value = match ch {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            _ => return None,
        };
        if value < previous {
            total = total.checked_sub(value)?;
        } else {
            total += value;
            previous = value;
        }
    }

    Some(total)
}

/// The retained outcome of a course, read from its latest-grade record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseOutcome {
    pub course_code: String,
    pub credits: f64,
    pub level_term_label: String,
    pub level_term: Option<LevelTerm>,
    pub is_lab: bool,
    pub grade: String,
    pub point: Option<f64>,
}

impl CourseOutcome {
    /// Courses count toward CGPA totals only when their term label parsed.
    pub fn counts_toward_totals(&self) -> bool {
        self.level_term.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermCourse {
    pub course_code: String,
    pub credits: f64,
    pub is_lab: bool,
    pub grade: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermResult {
    pub level_term: LevelTerm,
    pub cgpa: f64,
    pub credits: f64,
    pub courses: Vec<TermCourse>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedCourse {
    pub code: String,
    pub credits: f64,
    pub level_term: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeCount {
    pub grade: String,
    pub count: usize,
}

/// Per-grade course counts in scale order, zero counts included. Grades
/// missing from the scale follow the scale entries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeBucket {
    pub counts: Vec<GradeCount>,
    pub total: usize,
}

impl GradeBucket {
    pub fn count(&self, grade: &str) -> usize {
        self.counts
            .iter()
            .find(|entry| entry.grade == grade)
            .map(|entry| entry.count)
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeDistribution {
    pub theory: GradeBucket,
    pub lab: GradeBucket,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub latest_grades: BTreeMap<String, String>,
    pub courses: BTreeMap<String, CourseOutcome>,
    pub overall_cgpa: f64,
    pub total_credits: f64,
    pub terms: Vec<TermResult>,
    pub failed_courses: Vec<FailedCourse>,
    pub cleared_count: usize,
    pub stats: GradeDistribution,
}

impl ResultSummary {
    pub fn latest_grade(&self, course_code: &str) -> Option<&str> {
        self.latest_grades.get(course_code).map(String::as_str)
    }

    pub fn course_count(&self) -> usize {
        self.latest_grades.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_roman_and_word_terms() {
        let parsed = LevelTerm::parse("Level 3 - Term II").unwrap();
        assert_eq!(parsed.level, 3);
        assert_eq!(parsed.term, "II");
        assert_eq!(parsed.term_ordinal(), Some(2));

        let word = LevelTerm::parse("Level 1 - Term One").unwrap();
        assert_eq!(word.term, "One");
        assert_eq!(word.term_ordinal(), None);
    }

    #[test]
    fn rejects_labels_outside_pattern() {
        assert!(LevelTerm::parse("Summer 2024").is_none());
        assert!(LevelTerm::parse("Level X - Term I").is_none());
        assert!(LevelTerm::parse("").is_none());
    }

    #[test]
    fn orders_terms_by_level_then_numeral() {
        let mut terms = vec![
            LevelTerm::parse("Level 2 - Term I").unwrap(),
            LevelTerm::parse("Level 1 - Term IV").unwrap(),
            LevelTerm::parse("Level 1 - Term II").unwrap(),
            LevelTerm::parse("Level 1 - Term I").unwrap(),
        ];
        terms.sort();
        let labels: Vec<String> = terms.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            labels,
            vec![
                "Level 1 - Term I",
                "Level 1 - Term II",
                "Level 1 - Term IV",
                "Level 2 - Term I",
            ]
        );
    }
}
