use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::Error;

// ---------------------------------------------------------------------------
// DeclaredType – semantic kind of a measurement stream
// ---------------------------------------------------------------------------

/// The `% type:` tag of a stamp file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclaredType {
    NtpDag,
    NtpRad,
    UdpDag,
    UdpSniff,
    NtpSniffSnd,
    NtpSniffRcv,
    NtpDagMerged,
    RadMerged,
    UdpMerged,
    Radclock,
}

impl DeclaredType {
    pub const ALL: [DeclaredType; 10] = [
        DeclaredType::NtpDag,
        DeclaredType::NtpRad,
        DeclaredType::UdpDag,
        DeclaredType::UdpSniff,
        DeclaredType::NtpSniffSnd,
        DeclaredType::NtpSniffRcv,
        DeclaredType::NtpDagMerged,
        DeclaredType::RadMerged,
        DeclaredType::UdpMerged,
        DeclaredType::Radclock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclaredType::NtpDag => "NTP_dag",
            DeclaredType::NtpRad => "NTP_rad",
            DeclaredType::UdpDag => "UDP_dag",
            DeclaredType::UdpSniff => "UDP_sniff",
            DeclaredType::NtpSniffSnd => "NTP_sniff_snd",
            DeclaredType::NtpSniffRcv => "NTP_sniff_rcv",
            DeclaredType::NtpDagMerged => "NTP_dag_merged",
            DeclaredType::RadMerged => "RAD_merged",
            DeclaredType::UdpMerged => "UDP_merged",
            DeclaredType::Radclock => "radclock",
        }
    }

    /// Type of the stream produced when a stream of this type is merged with
    /// its counterpart. `None` for terminal types.
    pub fn merge_target(&self) -> Option<DeclaredType> {
        match self {
            DeclaredType::NtpDag => Some(DeclaredType::NtpDagMerged),
            DeclaredType::NtpRad => Some(DeclaredType::RadMerged),
            DeclaredType::UdpSniff => Some(DeclaredType::UdpMerged),
            DeclaredType::NtpSniffSnd => Some(DeclaredType::NtpRad),
            DeclaredType::UdpDag
            | DeclaredType::NtpSniffRcv
            | DeclaredType::NtpDagMerged
            | DeclaredType::RadMerged
            | DeclaredType::UdpMerged
            | DeclaredType::Radclock => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.merge_target().is_none()
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeclaredType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DeclaredType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::Format(format!("unknown data type '{s}'")))
    }
}

// ---------------------------------------------------------------------------
// Value – a single cell of a stamp file
// ---------------------------------------------------------------------------

/// A dynamically-typed cell. Stamp files mix counters, 64-bit NTP keys and
/// floating point seconds, so a cell is typed when its token is parsed.
/// `Value` is used as a join key, hence the manual `Eq` / `Ord` / `Hash`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Integer(i64),
    /// Only used for tokens that overflow `i64`.
    Unsigned(u64),
    Float(f64),
    Text(String),
    Null,
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Null => 0,
                Integer(_) => 1,
                Unsigned(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Integer(a), Integer(b)) => a.cmp(b),
            (Unsigned(a), Unsigned(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Integer(i) => i.hash(state),
            Value::Unsigned(u) => u.hash(state),
            Value::Float(f) => f.to_bits().hash(state),
            Value::Text(s) => s.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{i}"),
            Value::Unsigned(u) => write!(f, "{u}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Null => Ok(()),
        }
    }
}

impl Value {
    /// Type a whitespace-delimited token: integer first, then unsigned,
    /// then float, otherwise text.
    pub fn parse_token(s: &str) -> Value {
        if s.is_empty() {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(u) = s.parse::<u64>() {
            return Value::Unsigned(u);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        Value::Text(s.to_string())
    }

    /// Numeric view of the cell, `None` for text and nulls.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            Value::Unsigned(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Canonical form used to match cells across files: integral floats
    /// become the integer variant that holds them, so `10` and `10.0` agree.
    pub fn join_key(&self) -> Value {
        const I64_END: f64 = 9_223_372_036_854_775_808.0; // 2^63
        const U64_END: f64 = 18_446_744_073_709_551_616.0; // 2^64
        match *self {
            Value::Float(f) if f.fract() == 0.0 && (-I64_END..I64_END).contains(&f) => {
                Value::Integer(f as i64)
            }
            Value::Float(f) if f.fract() == 0.0 && (0.0..U64_END).contains(&f) => {
                Value::Unsigned(f as u64)
            }
            Value::Unsigned(u) => i64::try_from(u).map_or(Value::Unsigned(u), Value::Integer),
            _ => self.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column / TabularDataset
// ---------------------------------------------------------------------------

/// One named column of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Column {
            name: name.into(),
            values,
        }
    }

    /// Every cell projected to `f64`, NaN where the cell is not numeric.
    pub fn to_f64(&self) -> Vec<f64> {
        self.values
            .iter()
            .map(|v| v.as_f64().unwrap_or(f64::NAN))
            .collect()
    }

    /// Whether at least one cell is numeric.
    pub fn is_numeric(&self) -> bool {
        self.values.iter().any(|v| v.as_f64().is_some())
    }
}

/// Rows of a stamp file stored column-wise, indexed by the timestamp parsed
/// from field 5.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TabularDataset {
    /// One entry per row.
    pub time: Vec<DateTime<Utc>>,
    /// Columns in field order. Every column has `time.len()` values.
    pub columns: Vec<Column>,
}

impl TabularDataset {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Named numeric series aligned to the time index.
    pub fn series(&self, name: &str) -> crate::Result<Series> {
        let column = self
            .column(name)
            .ok_or_else(|| Error::MissingField(name.to_string()))?;
        Ok(Series::new(name, self.time.clone(), column.to_f64()))
    }

    /// Names of columns that hold at least one numeric cell.
    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_numeric())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Keep rows from `start` onwards.
    pub fn skip_rows(mut self, start: usize) -> Self {
        let start = start.min(self.len());
        self.time.drain(..start);
        for column in &mut self.columns {
            column.values.drain(..start);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Series – a one-dimensional time-indexed projection
// ---------------------------------------------------------------------------

/// A named `f64` series sharing the time index of the dataset it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub index: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

impl Series {
    pub fn new(name: impl Into<String>, index: Vec<DateTime<Utc>>, values: Vec<f64>) -> Self {
        debug_assert_eq!(index.len(), values.len());
        Series {
            name: name.into(),
            index,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Elementwise combination of two aligned series.
    pub fn zip_with(&self, other: &Series, name: &str, f: impl Fn(f64, f64) -> f64) -> Series {
        let values = self
            .values
            .iter()
            .zip(&other.values)
            .map(|(&a, &b)| f(a, b))
            .collect();
        Series::new(name, self.index.clone(), values)
    }

    /// Timestamp of row `i` in seconds since the epoch.
    pub fn epoch_seconds(&self, i: usize) -> f64 {
        let t = self.index[i];
        t.timestamp() as f64 + f64::from(t.timestamp_subsec_micros()) * 1e-6
    }
}
