//! CSV export.
//!
//! Files start with a UTF-8 byte-order mark so spreadsheet tools in zh-TW
//! locales open them with the right encoding.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tracing::info;

use crate::ExportError;
use crate::announcement::{Announcement, COLUMNS};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const SEP: char = ',';

fn needs_quotes(field: &str) -> bool {
    field.contains(SEP) || field.contains('"') || field.contains('\n') || field.contains('\r')
}

/// Write one CSV row.
pub fn write_row<W: Write, S: AsRef<str>>(w: &mut W, row: &[S]) -> io::Result<()> {
    for (i, cell) in row.iter().enumerate() {
        if i > 0 {
            write!(w, "{SEP}")?;
        }
        let cell = cell.as_ref();
        if needs_quotes(cell) {
            write!(w, "\"{}\"", cell.replace('"', "\"\""))?;
        } else {
            w.write_all(cell.as_bytes())?;
        }
    }
    w.write_all(b"\r\n")
}

/// Write the BOM, header, and one row per announcement.
pub fn write_csv<W: Write>(mut w: W, announcements: &[Announcement]) -> io::Result<()> {
    w.write_all(UTF8_BOM)?;
    write_row(&mut w, &COLUMNS)?;
    for ann in announcements {
        write_row(&mut w, &ann.to_record())?;
    }
    w.flush()
}

/// Create or overwrite `path` with the exported announcements.
pub fn export_csv(path: &Path, announcements: &[Announcement]) -> Result<(), ExportError> {
    let file = File::create(path).map_err(|source| ExportError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write_csv(BufWriter::new(file), announcements)?;
    info!(path = %path.display(), rows = announcements.len(), "exported csv");
    Ok(())
}
