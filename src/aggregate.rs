use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::models::{
    CourseAttemptRecord, CourseOutcome, FailedCourse, GradeBucket, GradeCount, GradeDistribution,
    LevelTerm, ResultSummary, TermCourse, TermResult,
};
use crate::round2;
use crate::scale::GradeScale;

/// Picks the record that decides each course's latest grade.
///
/// A passing attempt always replaces whatever was retained before it, so the
/// last passing attempt in input order wins; a failing attempt is only kept
/// when nothing was retained yet. A blank or unknown grade is not a failure,
/// so it is retained the same way as a passing one.
pub fn latest_records<'a>(
    records: &'a [CourseAttemptRecord],
    scale: &GradeScale,
) -> HashMap<&'a str, &'a CourseAttemptRecord> {
    let mut latest: HashMap<&str, &CourseAttemptRecord> = HashMap::new();

    for record in records {
        let replace = match latest.get(record.course_code.as_str()) {
            None => true,
            Some(_) => !scale.is_failing(&record.grade),
        };
        if replace {
            latest.insert(record.course_code.as_str(), record);
        }
    }

    latest
}

pub fn summarize(records: &[CourseAttemptRecord], scale: &GradeScale) -> ResultSummary {
    let latest = latest_records(records, scale);

    let mut courses: BTreeMap<String, CourseOutcome> = BTreeMap::new();
    for (code, record) in latest.iter() {
        let level_term = record.parsed_level_term();
        if level_term.is_none() {
            debug!(
                "{} has unparseable term label {:?}, leaving it out of totals",
                code, record.level_term
            );
        }
        courses.insert(
            code.to_string(),
            CourseOutcome {
                course_code: code.to_string(),
                credits: record.credits,
                level_term_label: record.level_term.clone(),
                level_term,
                is_lab: record.is_lab,
                grade: record.grade.clone(),
                point: scale.point(&record.grade),
            },
        );
    }

    let latest_grades: BTreeMap<String, String> = courses
        .iter()
        .map(|(code, outcome)| (code.clone(), outcome.grade.clone()))
        .collect();

    let mut failed_courses = Vec::new();
    let mut cleared_count = 0usize;
    let mut term_totals: BTreeMap<LevelTerm, (f64, f64)> = BTreeMap::new();
    let mut total_points = 0.0;
    let mut total_credits = 0.0;

    for outcome in courses.values() {
        if scale.is_failing(&outcome.grade) {
            failed_courses.push(FailedCourse {
                code: outcome.course_code.clone(),
                credits: outcome.credits,
                level_term: outcome.level_term_label.clone(),
            });
            continue;
        }

        cleared_count += 1;

        let Some(point) = outcome.point else {
            debug!(
                "{} has no grade point for {:?}, leaving it out of totals",
                outcome.course_code, outcome.grade
            );
            continue;
        };
        let Some(level_term) = outcome.level_term.as_ref() else {
            continue;
        };
        let points = outcome.credits * point;
        let entry = term_totals.entry(level_term.clone()).or_insert((0.0, 0.0));
        entry.0 += points;
        entry.1 += outcome.credits;
        total_points += points;
        total_credits += outcome.credits;
    }

    let mut term_rows: BTreeMap<LevelTerm, Vec<TermCourse>> = BTreeMap::new();
    for record in records {
        if let Some(level_term) = record.parsed_level_term() {
            term_rows.entry(level_term).or_default().push(TermCourse {
                course_code: record.course_code.clone(),
                credits: record.credits,
                is_lab: record.is_lab,
                grade: record.grade.clone(),
            });
        }
    }

    let terms = term_totals
        .into_iter()
        .filter(|(_, (_, credits))| *credits > 0.0)
        .map(|(level_term, (points, credits))| TermResult {
            courses: term_rows.remove(&level_term).unwrap_or_default(),
            cgpa: weighted_average(points, credits),
            credits,
            level_term,
        })
        .collect();

    let stats = grade_distribution(courses.values(), scale);

    ResultSummary {
        latest_grades,
        overall_cgpa: weighted_average(total_points, total_credits),
        total_credits,
        courses,
        terms,
        failed_courses,
        cleared_count,
        stats,
    }
}

/// Credit-weighted mean at two decimals; an empty denominator yields 0.
pub fn weighted_average(points: f64, credits: f64) -> f64 {
    if credits > 0.0 {
        round2(points / credits)
    } else {
        0.0
    }
}

fn grade_distribution<'a, I>(outcomes: I, scale: &GradeScale) -> GradeDistribution
where
    I: IntoIterator<Item = &'a CourseOutcome>,
{
    let mut theory = empty_bucket(scale);
    let mut lab = empty_bucket(scale);

    for outcome in outcomes {
        let bucket = if outcome.is_lab { &mut lab } else { &mut theory };
        match bucket
            .counts
            .iter_mut()
            .find(|entry| entry.grade == outcome.grade)
        {
            Some(entry) => entry.count += 1,
            None => bucket.counts.push(GradeCount {
                grade: outcome.grade.clone(),
                count: 1,
            }),
        }
        bucket.total += 1;
    }

    GradeDistribution { theory, lab }
}

fn empty_bucket(scale: &GradeScale) -> GradeBucket {
    GradeBucket {
        counts: scale
            .grades()
            .map(|grade| GradeCount {
                grade: grade.to_string(),
                count: 0,
            })
            .collect(),
        total: 0,
    }
}
