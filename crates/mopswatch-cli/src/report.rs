//! End-of-run summary printed to the console.

use std::io::{self, Write};

use mopswatch_core::RunResult;

/// Write the failed-date list and run totals.
pub fn write_summary<W: Write>(
    w: &mut W,
    result: &RunResult,
    elapsed_secs: f64,
) -> io::Result<()> {
    writeln!(w)?;
    if result.errors.is_empty() {
        writeln!(w, "All {} dates fetched successfully", result.dates_queried)?;
    } else {
        writeln!(
            w,
            "{} of {} dates failed after retries:",
            result.errors.len(),
            result.dates_queried
        )?;
        for entry in &result.errors {
            writeln!(w, "  {:<10} {}", entry.date_label, entry.message)?;
        }
    }
    writeln!(w)?;
    writeln!(
        w,
        "Elapsed {elapsed_secs:.2}s, {} qualifying rows collected, {} unique",
        result.raw_count,
        result.announcements.len()
    )?;
    Ok(())
}
