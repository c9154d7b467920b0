use std::io::BufRead;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn, LevelFilter};

use cgpa_result_viewer::aggregate;
use cgpa_result_viewer::import;
use cgpa_result_viewer::models::ResultSummary;
use cgpa_result_viewer::report;
use cgpa_result_viewer::scale::GradeScale;
use cgpa_result_viewer::simulate::WhatIfSession;
use cgpa_result_viewer::target;

#[derive(Parser)]
#[command(name = "cgpa-result-viewer")]
#[command(about = "CGPA, term results and what-if scenarios from a published result table", long_about = None)]
struct Cli {
    /// Result table exported as CSV or JSON
    #[arg(long, global = true, env = "CGPA_RECORDS")]
    records: Option<PathBuf>,

    /// Grade scale JSON file (defaults to the A+ .. F table)
    #[arg(long, global = true, env = "CGPA_SCALE")]
    scale: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print term-wise results, overall CGPA and grade distribution
    Summary {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Write a markdown report
    Report {
        #[arg(long, default_value = "result-report.md")]
        out: PathBuf,
    },
    /// Required GPA next semester to reach a target CGPA
    Target {
        #[arg(long = "target", allow_negative_numbers = true)]
        target_cgpa: f64,
        #[arg(long, allow_negative_numbers = true)]
        next_credits: f64,
    },
    /// Simulate CGPA with hypothetical grades
    WhatIf {
        /// Substitution in the form CODE=GRADE, repeatable
        #[arg(long = "set", value_parser = parse_substitution)]
        substitutions: Vec<(String, String)>,
        /// Keep reading add/remove/clear/show/quit commands from stdin
        #[arg(long)]
        interactive: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_substitution(raw: &str) -> Result<(String, String), String> {
    let (code, grade) = raw
        .rsplit_once('=')
        .ok_or_else(|| format!("expected CODE=GRADE, got {raw}"))?;
    let (code, grade) = (code.trim(), grade.trim());
    if code.is_empty() || grade.is_empty() {
        return Err(format!("expected CODE=GRADE, got {raw}"));
    }
    Ok((code.to_string(), grade.to_string()))
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        LevelFilter::Error
    } else {
        match cli.verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            _ => LevelFilter::Debug,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_target(false)
        .format_timestamp(None)
        .init();

    if let Err(err) = run(cli) {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let records_path = cli
        .records
        .context("--records (or CGPA_RECORDS) must point to an exported result table")?;
    let scale = match cli.scale.as_deref() {
        Some(path) => GradeScale::from_json_file(path)?,
        None => GradeScale::default(),
    };

    let imported = import::load_records(&records_path)?;
    if imported.skipped > 0 {
        warn!(
            "skipped {} malformed rows in {}",
            imported.skipped,
            records_path.display()
        );
    }
    if imported.records.is_empty() {
        println!("No course results published yet.");
        return Ok(());
    }

    let summary = aggregate::summarize(&imported.records, &scale);
    info!(
        "{} courses, {} cleared, {} short",
        summary.course_count(),
        summary.cleared_count,
        summary.failed_courses.len()
    );

    match cli.command {
        Commands::Summary { format } => match format {
            OutputFormat::Text => {
                let text = report::build_report(
                    &records_path.display().to_string(),
                    Utc::now().date_naive(),
                    &summary,
                );
                print!("{text}");
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        },
        Commands::Report { out } => {
            let text = report::build_report(
                &records_path.display().to_string(),
                Utc::now().date_naive(),
                &summary,
            );
            std::fs::write(&out, text)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Target {
            target_cgpa,
            next_credits,
        } => {
            match target::required_gpa(
                summary.overall_cgpa,
                summary.total_credits,
                target_cgpa,
                next_credits,
                &scale,
            ) {
                Ok(outcome) => println!("{}", report::describe_target(&outcome, next_credits)),
                Err(err) => println!("{err}"),
            }
        }
        Commands::WhatIf {
            substitutions,
            interactive,
        } => {
            run_what_if(&summary, &scale, &substitutions, interactive, &records_path)?;
        }
    }

    Ok(())
}

fn run_what_if(
    summary: &ResultSummary,
    scale: &GradeScale,
    substitutions: &[(String, String)],
    interactive: bool,
    records_path: &Path,
) -> anyhow::Result<()> {
    let mut session = WhatIfSession::new(summary, scale);
    println!(
        "Current CGPA for {}: {:.2}",
        records_path.display(),
        summary.overall_cgpa
    );

    for (code, grade) in substitutions {
        if let Err(err) = session.add(code, grade) {
            println!("{err}");
        }
    }
    println!("{}", report::describe_simulation(session.result().as_ref()));

    if !interactive {
        return Ok(());
    }

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read command")?;
        let line = line.trim();
        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        match command {
            "" => continue,
            "add" => match rest.rsplit_once(char::is_whitespace) {
                Some((code, grade)) => match session.add(code.trim(), grade.trim()) {
                    Ok(result) => println!("{}", report::describe_simulation(result.as_ref())),
                    Err(err) => println!("{err}"),
                },
                None => println!("usage: add CODE GRADE"),
            },
            "remove" => match session.remove(rest) {
                Ok(result) => println!("{}", report::describe_simulation(result.as_ref())),
                Err(err) => println!("{err}"),
            },
            "clear" => {
                session.clear();
                println!("{}", report::describe_simulation(None));
            }
            "show" => println!("{}", report::describe_simulation(session.result().as_ref())),
            "quit" | "exit" => break,
            other => println!("unknown command {other}; expected add, remove, clear, show or quit"),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_target_inputs_reach_the_solver() {
        let cli = Cli::try_parse_from([
            "cgpa-result-viewer",
            "target",
            "--target",
            "-1",
            "--next-credits",
            "-3",
        ])
        .unwrap();

        let Commands::Target {
            target_cgpa,
            next_credits,
        } = cli.command
        else {
            panic!("expected the target command");
        };
        assert_eq!(target_cgpa, -1.0);
        assert_eq!(next_credits, -3.0);
        assert_eq!(
            target::required_gpa(3.0, 30.0, target_cgpa, 15.0, &GradeScale::default()),
            Err(target::TargetError::TargetOutOfRange { max: 4.0 })
        );
    }

    #[test]
    fn substitutions_split_on_last_equals() {
        assert_eq!(
            parse_substitution("CSE 101=A+"),
            Ok(("CSE 101".to_string(), "A+".to_string()))
        );
        assert!(parse_substitution("CSE 101").is_err());
        assert!(parse_substitution("=A").is_err());
    }
}
