use std::fmt::Write;

use chrono::NaiveDate;

use crate::models::{GradeBucket, ResultSummary};
use crate::simulate::{format_delta, Simulation};
use crate::target::TargetOutcome;

pub fn build_report(source: &str, generated_on: NaiveDate, summary: &ResultSummary) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Result Summary");
    let _ = writeln!(output, "Generated from {} on {}", source, generated_on);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Term-wise Result");

    if summary.terms.is_empty() {
        let _ = writeln!(output, "No completed terms.");
    }
    for term in summary.terms.iter() {
        let _ = writeln!(output);
        let _ = writeln!(
            output,
            "### {} (CGPA {:.2}, {} credits)",
            term.level_term, term.cgpa, term.credits
        );
        for course in term.courses.iter() {
            let _ = writeln!(
                output,
                "- {} [{}] {} credits: {}",
                course.course_code,
                if course.is_lab { "Sessional" } else { "Theory" },
                course.credits,
                course.grade
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Overall");
    let _ = writeln!(output, "- Cleared subjects: {}", summary.cleared_count);
    let _ = writeln!(output, "- Short subjects: {}", summary.failed_courses.len());
    let _ = writeln!(output, "- Total credits: {}", summary.total_credits);
    let _ = writeln!(output, "- Overall CGPA: {:.2}", summary.overall_cgpa);

    if !summary.failed_courses.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Subjects to Clear");
        for course in summary.failed_courses.iter() {
            let _ = writeln!(
                output,
                "- {}: {} ({} credits)",
                course.code, course.level_term, course.credits
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Grade Distribution");
    write_bucket(&mut output, "Theory", &summary.stats.theory);
    write_bucket(&mut output, "Lab", &summary.stats.lab);

    output
}

fn write_bucket(output: &mut String, label: &str, bucket: &GradeBucket) {
    let _ = writeln!(output, "- {} courses: {}", label, bucket.total);
    for entry in bucket.counts.iter().filter(|entry| entry.count > 0) {
        let grade = if entry.grade.is_empty() { "(no grade)" } else { entry.grade.as_str() };
        let _ = writeln!(output, "  - {}: {}", grade, entry.count);
    }
}

pub fn describe_target(outcome: &TargetOutcome, next_credits: f64) -> String {
    match outcome {
        TargetOutcome::Required { required } => format!(
            "Required GPA: {:.2} for next semester ({} credits)",
            required, next_credits
        ),
        TargetOutcome::Unreachable { required, max } => format!(
            "Target not possible: required GPA ({:.2}) exceeds maximum possible GPA ({:.2})",
            required, max
        ),
        TargetOutcome::AlreadyAchieved { .. } => "Target already achieved!".to_string(),
    }
}

pub fn describe_simulation(simulation: Option<&Simulation>) -> String {
    let Some(simulation) = simulation else {
        return "No grades simulated.".to_string();
    };

    let mut output = String::new();
    for substitution in simulation.substitutions.iter() {
        let _ = writeln!(
            output,
            "- {}: {} ({:.2}) -> {} ({:.2}) {}",
            substitution.course_code,
            substitution.from_grade,
            substitution.from_point,
            substitution.to_grade,
            substitution.to_point,
            format_delta(substitution.point_change)
        );
    }
    let _ = writeln!(output, "Simulated CGPA: {:.2}", simulation.cgpa);
    let _ = write!(output, "Change: {}", format_delta(simulation.delta));
    output
}
