use std::io::Read;
use std::path::Path;

use anyhow::Context;
use log::debug;
use serde::Deserialize;
use serde_json::Value;

use crate::models::CourseAttemptRecord;

/// Records read from an exported result table, plus how many rows were dropped.
#[derive(Debug, Clone, Default)]
pub struct ImportedRecords {
    pub records: Vec<CourseAttemptRecord>,
    pub skipped: usize,
}

impl ImportedRecords {
    fn push(&mut self, row: Option<CourseAttemptRecord>) {
        match row {
            Some(record) => self.records.push(record),
            None => self.skipped += 1,
        }
    }
}

/// Reads records from `path`, as JSON when the extension is `.json` and as CSV otherwise.
pub fn load_records(path: &Path) -> anyhow::Result<ImportedRecords> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let imported = if is_json {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        read_json(&raw).with_context(|| format!("failed to parse {}", path.display()))?
    } else {
        let file = std::fs::File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        read_csv(file)?
    };

    debug!(
        "imported {} records from {} ({} rows skipped)",
        imported.records.len(),
        path.display(),
        imported.skipped
    );
    Ok(imported)
}

/// Reads CSV rows without assuming a header; a header row fails the credits
/// check and is skipped like any other malformed row.
pub fn read_csv<R: Read>(input: R) -> anyhow::Result<ImportedRecords> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input);
    let mut imported = ImportedRecords::default();

    for (index, result) in reader.records().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(err) => {
                debug!("skipping unreadable row {}: {}", index + 1, err);
                imported.skipped += 1;
                continue;
            }
        };
        let fields: Vec<&str> = row.iter().collect();
        let parsed = parse_row(&fields);
        if parsed.is_none() {
            debug!("skipping malformed row {}: {:?}", index + 1, fields);
        }
        imported.push(parsed);
    }

    Ok(imported)
}

#[derive(Deserialize)]
struct JsonRecord {
    course_code: String,
    credits: f64,
    level_term: String,
    #[serde(default)]
    is_lab: bool,
    #[serde(default)]
    grade: String,
}

/// Reads a JSON array whose items are either cell arrays in table order or
/// objects with named fields.
pub fn read_json(raw: &str) -> anyhow::Result<ImportedRecords> {
    let rows: Vec<Value> = serde_json::from_str(raw).context("expected a JSON array of rows")?;
    let mut imported = ImportedRecords::default();

    for (index, row) in rows.into_iter().enumerate() {
        let parsed = match row {
            Value::Array(cells) => {
                let texts: Vec<String> = cells.iter().map(cell_text).collect();
                let fields: Vec<&str> = texts.iter().map(|text| text.trim()).collect();
                parse_row(&fields)
            }
            Value::Object(map) => serde_json::from_value::<JsonRecord>(Value::Object(map))
                .ok()
                .and_then(|record| {
                    let lab = if record.is_lab { "Yes" } else { "No" };
                    let credits = record.credits.to_string();
                    parse_row(&[
                        record.course_code.trim(),
                        credits.as_str(),
                        record.level_term.trim(),
                        lab,
                        record.grade.trim(),
                    ])
                }),
            _ => None,
        };
        if parsed.is_none() {
            debug!("skipping malformed JSON row {}", index + 1);
        }
        imported.push(parsed);
    }

    Ok(imported)
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Bool(true) => "Yes".to_string(),
        Value::Bool(false) => "No".to_string(),
        other => other.to_string(),
    }
}

/// Turns the first five cells of a table row into a record:
/// course code, credits, level-term label, lab flag, grade.
pub fn parse_row(fields: &[&str]) -> Option<CourseAttemptRecord> {
    if fields.len() < 5 {
        return None;
    }

    let course_code = fields[0].trim();
    if course_code.is_empty() {
        return None;
    }

    let credits = fields[1].trim().parse::<f64>().ok()?;
    if !credits.is_finite() || credits <= 0.0 {
        return None;
    }

    Some(CourseAttemptRecord {
        course_code: course_code.to_string(),
        credits,
        level_term: fields[2].trim().to_string(),
        is_lab: fields[3].trim() == "Yes",
        grade: fields[4].trim().to_string(),
    })
}
