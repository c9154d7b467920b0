pub mod aggregate;
pub mod import;
pub mod models;
pub mod report;
pub mod scale;
pub mod simulate;
pub mod target;

/// Round to two decimal places, the precision every CGPA is reported at.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
