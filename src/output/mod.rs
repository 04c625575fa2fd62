pub mod json;
pub mod pretty;

use std::io::Write;

use crate::cli::OutputFormat;
use crate::error::FramewatchError;
use crate::model::TrafficReport;

/// Write a traffic report in the specified format.
pub fn write_report(
    report: &TrafficReport,
    format: OutputFormat,
    writer: &mut impl Write,
) -> Result<(), FramewatchError> {
    match format {
        OutputFormat::Json => json::write_json(report, writer),
        OutputFormat::Pretty => pretty::write_pretty(report, writer),
    }
}
