use std::io::Write;

use crate::error::FramewatchError;
use crate::model::TrafficReport;

/// Write the traffic report as JSON to the given writer.
pub fn write_json(report: &TrafficReport, writer: &mut impl Write) -> Result<(), FramewatchError> {
    serde_json::to_writer_pretty(writer, report)
        .map_err(|e| FramewatchError::Serialization(std::io::Error::other(e.to_string())))
}
