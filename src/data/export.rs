use std::io::Write;
use std::path::Path;

use chrono::SecondsFormat;

use crate::error::{Error, Result};

use super::model::TabularDataset;

/// Write `data` as CSV: a `time` column (RFC 3339, microseconds) followed by
/// every data column.
pub fn write_csv<W: Write>(data: &TabularDataset, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["time"];
    header.extend(data.column_names());
    wtr.write_record(&header)?;

    for row in 0..data.len() {
        let mut record = Vec::with_capacity(data.columns.len() + 1);
        record.push(data.time[row].to_rfc3339_opts(SecondsFormat::Micros, true));
        record.extend(data.columns.iter().map(|c| c.values[row].to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// [`write_csv`] into a new file at `path`.
pub fn write_csv_path(data: &TabularDataset, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;
    write_csv(data, file)?;
    log::info!("Exported {} rows to {}", data.len(), path.display());
    Ok(())
}
