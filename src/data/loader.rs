use std::fs::File;
use std::io::{BufReader, Cursor, Read};
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

use super::container::DataContainer;
use super::header::{extract_header, parse_header, Header, COMMENT};
use super::model::{Column, DeclaredType, TabularDataset, Value};

/// Position of the epoch-seconds field converted to the time index.
pub const TIMESTAMP_FIELD: usize = 5;

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Load a stamp file from disk.
///
/// `expected` is the declared type the caller wants; `None` adopts whatever
/// type the file header declares.
pub fn load_path(path: &Path, expected: Option<DeclaredType>) -> Result<DataContainer> {
    let file = File::open(path).map_err(|source| Error::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let container = load_reader(BufReader::new(file), expected)?;
    log::info!(
        "Loaded {} rows of {} from {}",
        container.data().len(),
        container
            .declared_type()
            .map_or("untyped data", |t| t.as_str()),
        path.display()
    );
    Ok(container)
}

/// Load a stamp file from an already open stream.
///
/// The stream is read to the end once. Nothing is returned unless the
/// header, type check and every row parse successfully.
pub fn load_reader<R: Read>(mut reader: R, expected: Option<DeclaredType>) -> Result<DataContainer> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;

    let header_lines = extract_header(&mut Cursor::new(text.as_bytes()), COMMENT)?;
    let header = parse_header(&header_lines, COMMENT)?;
    let declared_type = check_type(expected, header.declared_type)?;

    let data = parse_rows(&text, &header)?;
    Ok(DataContainer::new(header, declared_type, data))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn check_type(
    expected: Option<DeclaredType>,
    found: Option<DeclaredType>,
) -> Result<Option<DeclaredType>> {
    match (expected, found) {
        (None, found) => Ok(found),
        (Some(expected), Some(found)) if expected == found => Ok(Some(found)),
        (Some(expected), found) => {
            log::warn!("Data type mismatch {expected} {found:?}");
            Err(Error::type_mismatch(expected, found))
        }
    }
}

/// Parse the rows after the header. The last non-blank line is discarded
/// since the writer may have been interrupted half way through it.
fn parse_rows(text: &str, header: &Header) -> Result<TabularDataset> {
    let n_fields = header.fields.len();
    if n_fields <= TIMESTAMP_FIELD {
        return Err(Error::Format(format!(
            "header declares {n_fields} fields, timestamp field {TIMESTAMP_FIELD} is missing"
        )));
    }

    let lines: Vec<(usize, &str)> = text
        .lines()
        .enumerate()
        .skip(header.header_len)
        .filter(|(_, line)| !line.trim().is_empty())
        .collect();
    let rows = match lines.split_last() {
        Some((_, rows)) if !rows.is_empty() => rows,
        _ => return Err(Error::Format("no data rows".to_string())),
    };

    let mut columns: Vec<Vec<Value>> = vec![Vec::with_capacity(rows.len()); n_fields];
    let mut time = Vec::with_capacity(rows.len());

    for &(line_no, line) in rows {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() > n_fields {
            return Err(Error::Format(format!(
                "line {}: {} columns but header declares {n_fields}",
                line_no + 1,
                tokens.len()
            )));
        }
        for (i, column) in columns.iter_mut().enumerate() {
            column.push(tokens.get(i).map_or(Value::Null, |t| Value::parse_token(t)));
        }

        let stamp = &columns[TIMESTAMP_FIELD][columns[TIMESTAMP_FIELD].len() - 1];
        time.push(stamp_to_utc(stamp).ok_or_else(|| {
            Error::Format(format!(
                "line {}: '{stamp}' is not an epoch timestamp",
                line_no + 1
            ))
        })?);
    }

    let columns = header
        .fields
        .iter()
        .zip(columns)
        .map(|(name, values)| Column::new(name.clone(), values))
        .collect();

    Ok(TabularDataset { time, columns })
}

/// Epoch seconds to a UTC instant, rounded to the microsecond.
pub fn stamp_to_utc(stamp: &Value) -> Option<DateTime<Utc>> {
    let seconds = stamp.as_f64().filter(|s| s.is_finite())?;
    DateTime::from_timestamp_micros((seconds * 1e6).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: &str = "% fields: Ta Tb Te Tf RTT stamp phat\n";

    fn file(ty: &str, rows: &[&str]) -> String {
        let mut text = format!("% description: test\n% type: {ty}\n% version: 1\n{FIELDS}");
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        text
    }

    #[test]
    fn last_row_is_discarded() {
        let text = file(
            "radclock",
            &[
                "1 2 3 10 5 1330000000.5 1e-9",
                "1 2 3 11 5 1330000001.5 1e-9",
                "1 2 3 12 5 13300",
            ],
        );
        let container = load_reader(text.as_bytes(), Some(DeclaredType::Radclock)).unwrap();
        assert_eq!(container.data().len(), 2);
        let tf = container.data().column("Tf").unwrap();
        assert_eq!(tf.values, vec![Value::Integer(10), Value::Integer(11)]);
    }

    #[test]
    fn timestamps_keep_microseconds() {
        let text = file(
            "radclock",
            &["0 0 0 1 0 1330000000.000001 0", "0 0 0 2 0 1330000000.000002 0", "x"],
        );
        let container = load_reader(text.as_bytes(), None).unwrap();
        let t = container.data().time[1];
        assert_eq!(t.timestamp(), 1_330_000_000);
        assert_eq!(t.timestamp_subsec_micros(), 2);
        // The raw field survives next to the derived index.
        assert!(container.data().column("stamp").is_some());
    }

    #[test]
    fn type_mismatch_is_raised_before_rows_are_parsed() {
        // The rows are garbage: a row error would be a Format error instead.
        let text = file("RAD_merged", &["not a row", "at all"]);
        let err = load_reader(text.as_bytes(), Some(DeclaredType::Radclock)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }), "{err:?}");
    }

    #[test]
    fn missing_type_does_not_satisfy_an_expectation() {
        let text = format!("{FIELDS}0 0 0 1 0 1 0\n0 0 0 1 0 1 0\n");
        let err = load_reader(text.as_bytes(), Some(DeclaredType::UdpDag)).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        let container = load_reader(text.as_bytes(), None).unwrap();
        assert_eq!(container.declared_type(), None);
    }

    #[test]
    fn short_rows_are_padded_and_long_rows_rejected() {
        let text = file("radclock", &["0 0 0 1 0 1", "0 0 0 1 0 1 0"]);
        let container = load_reader(text.as_bytes(), None).unwrap();
        assert_eq!(container.data().column("phat").unwrap().values, vec![Value::Null]);

        let text = file("radclock", &["0 0 0 1 0 1 0 9", "0 0 0 1 0 1 0"]);
        let err = load_reader(text.as_bytes(), None).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn a_single_row_leaves_no_data() {
        let text = file("radclock", &["0 0 0 1 0 1 0"]);
        assert!(matches!(
            load_reader(text.as_bytes(), None),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn missing_path_reports_the_path() {
        let err = load_path(Path::new("/nonexistent/stamps.dat"), None).unwrap_err();
        match err {
            Error::Open { path, .. } => assert_eq!(path, Path::new("/nonexistent/stamps.dat")),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
