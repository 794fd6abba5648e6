use std::io::{BufRead, Seek, SeekFrom};

use crate::error::{Error, Result};

use super::model::DeclaredType;

/// Default comment prefix of stamp file headers.
pub const COMMENT: char = '%';

/// Metadata block at the top of a stamp file.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub description: String,
    pub declared_type: Option<DeclaredType>,
    pub version: Option<i64>,
    pub magic: Option<String>,
    /// Column names of the rows following the header, never empty.
    pub fields: Vec<String>,
    /// Number of leading comment lines.
    pub header_len: usize,
}

/// Collect the leading comment lines of `source`, rewinding it first.
///
/// Reading stops at the first line that does not start with `comment`.
/// Line terminators are stripped.
pub fn extract_header<R: BufRead + Seek>(source: &mut R, comment: char) -> Result<Vec<String>> {
    source.seek(SeekFrom::Start(0))?;

    let mut header = Vec::new();
    for line in source.lines() {
        let line = line?;
        if !line.starts_with(comment) {
            break;
        }
        header.push(line.trim_end_matches('\r').to_string());
    }
    Ok(header)
}

/// Parse `% key: value` lines into a [`Header`].
pub fn parse_header(lines: &[String], comment: char) -> Result<Header> {
    let mut header = Header {
        description: String::new(),
        declared_type: None,
        version: None,
        magic: None,
        fields: Vec::new(),
        header_len: 0,
    };

    for line in lines {
        let Some(body) = line.strip_prefix(comment) else {
            break;
        };
        header.header_len += 1;

        let Some((key, value)) = body.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "description" => header.description = value.to_string(),
            "type" => header.declared_type = Some(value.parse()?),
            "version" => {
                let version = value
                    .parse::<i64>()
                    .map_err(|_| Error::Format(format!("version '{value}' is not an integer")))?;
                header.version = Some(version);
            }
            "fields" => {
                header.fields = value.split_whitespace().map(str::to_string).collect();
            }
            "magic" => header.magic = Some(value.to_string()),
            other => log::trace!("ignoring header key '{other}'"),
        }
    }

    if header.fields.is_empty() {
        return Err(Error::Format(
            "could not find fields descriptor in header".to_string(),
        ));
    }

    log::debug!(
        "header: type={:?} version={:?} {} fields over {} lines",
        header.declared_type,
        header.version,
        header.fields.len(),
        header.header_len
    );
    Ok(header)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const RADCLOCK_HEADER: &str = "\
% description: radclock stamps
% type: radclock
% version: 3
% comment line with no key
% fields: Ta Tb Te Tf RTT stamp phat
% magic: 0xdeadbeef
1 2 3 4 5 1330000000.000001 1e-9
";

    fn lines(text: &str) -> Vec<String> {
        let mut cursor = Cursor::new(text.as_bytes());
        extract_header(&mut cursor, COMMENT).unwrap()
    }

    #[test]
    fn header_len_counts_every_leading_comment_line() {
        let header = parse_header(&lines(RADCLOCK_HEADER), COMMENT).unwrap();
        assert_eq!(header.header_len, 6);
        assert_eq!(header.description, "radclock stamps");
        assert_eq!(header.declared_type, Some(DeclaredType::Radclock));
        assert_eq!(header.version, Some(3));
        assert_eq!(header.magic.as_deref(), Some("0xdeadbeef"));
        assert_eq!(
            header.fields,
            vec!["Ta", "Tb", "Te", "Tf", "RTT", "stamp", "phat"]
        );
    }

    #[test]
    fn extraction_rewinds_and_stops_at_first_data_line() {
        let text = format!("{RADCLOCK_HEADER}% trailing comment is data\n");
        let mut cursor = Cursor::new(text.as_bytes());
        cursor.seek(SeekFrom::End(0)).unwrap();
        let header = extract_header(&mut cursor, COMMENT).unwrap();
        assert_eq!(header.len(), 6);
        assert!(header.iter().all(|l| l.starts_with('%')));
    }

    #[test]
    fn missing_fields_is_a_format_error() {
        let text = "% description: nothing\n% type: radclock\n1 2 3\n";
        let err = parse_header(&lines(text), COMMENT).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn empty_header_is_a_format_error() {
        let err = parse_header(&lines("1 2 3\n"), COMMENT).unwrap_err();
        assert!(matches!(err, Error::Format(_)));
    }

    #[test]
    fn bad_version_and_unknown_type_are_rejected() {
        let text = "% version: three\n% fields: a\n";
        assert!(matches!(
            parse_header(&lines(text), COMMENT),
            Err(Error::Format(_))
        ));
        let text = "% type: NTP_bogus\n% fields: a\n";
        assert!(matches!(
            parse_header(&lines(text), COMMENT),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn custom_comment_prefix() {
        let text = "# fields: a b\n# type: UDP_dag\n1 2\n";
        let mut cursor = Cursor::new(text.as_bytes());
        let header = parse_header(&extract_header(&mut cursor, '#').unwrap(), '#').unwrap();
        assert_eq!(header.header_len, 2);
        assert_eq!(header.declared_type, Some(DeclaredType::UdpDag));
    }
}
