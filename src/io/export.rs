//! CSV export for committed tick reports.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::TickReport;

/// Schema v1 column header for CSV telemetry export. One row per slot
/// exchange per tick.
const HEADER: &str = "tick,hour,slot_id,status,soc,power_kw,energy_kwh,\
                      clipped_kwh,price,base_load_kw,net_load_kw";

/// Exports tick reports to a CSV file at the given path.
///
/// Writes a header row followed by one data row per slot exchange using the
/// schema v1 column layout. Produces deterministic output for identical
/// inputs.
///
/// # Arguments
///
/// * `reports` - Complete committed tick reports
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(reports: &[TickReport], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(reports, buf)
}

/// Writes tick reports as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(reports: &[TickReport], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    // Header
    wtr.write_record(HEADER.split(',').map(str::trim))?;

    // One row per slot exchange; vacant ticks contribute no rows.
    for report in reports {
        for exchange in &report.slots {
            wtr.write_record(&[
                report.tick.to_string(),
                report.hour.to_string(),
                exchange.slot_id.to_string(),
                exchange.status.as_str().to_string(),
                format!("{:.4}", exchange.soc),
                format!("{:.4}", exchange.power_kw),
                format!("{:.4}", exchange.energy_kwh),
                format!("{:.4}", exchange.clipped_kwh),
                format!("{:.4}", exchange.price),
                format!("{:.4}", report.base_load_kw),
                format!("{:.4}", report.net_load_kw),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
