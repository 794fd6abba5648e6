use crate::error::{Error, Result};

use super::header::Header;
use super::model::{DeclaredType, Series, TabularDataset};

// ---------------------------------------------------------------------------
// DataContainer – one loaded stamp file
// ---------------------------------------------------------------------------

/// A loaded stamp file: header metadata plus its rows.
///
/// Containers are produced by [`super::loader`] and never change afterwards.
#[derive(Debug, Clone)]
pub struct DataContainer {
    description: String,
    declared_type: Option<DeclaredType>,
    version: Option<i64>,
    magic: Option<String>,
    fields: Vec<String>,
    data: TabularDataset,
}

impl DataContainer {
    pub(crate) fn new(
        header: Header,
        declared_type: Option<DeclaredType>,
        data: TabularDataset,
    ) -> Self {
        DataContainer {
            description: header.description,
            declared_type,
            version: header.version,
            magic: header.magic,
            fields: header.fields,
            data,
        }
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn declared_type(&self) -> Option<DeclaredType> {
        self.declared_type
    }

    pub fn version(&self) -> Option<i64> {
        self.version
    }

    pub fn magic(&self) -> Option<&str> {
        self.magic.as_deref()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn data(&self) -> &TabularDataset {
        &self.data
    }

    pub fn into_data(self) -> TabularDataset {
        self.data
    }

    /// Derived radclock series. Fails unless the file declared `radclock`.
    pub fn radclock(&self) -> Result<Radclock<'_>> {
        match self.declared_type {
            Some(DeclaredType::Radclock) => Ok(Radclock::new(&self.data)),
            other => Err(Error::type_mismatch(DeclaredType::Radclock, other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Radclock – derived columns of radclock stamps
// ---------------------------------------------------------------------------

/// Read-only projections over radclock data, raw or merged with capture
/// stamps (`rtt_host` needs the `DAG_RX` / `DAG_TX` capture columns).
#[derive(Debug, Clone, Copy)]
pub struct Radclock<'a> {
    data: &'a TabularDataset,
}

impl<'a> Radclock<'a> {
    /// Names of the derived series, as produced by [`Radclock::derived`].
    pub const DERIVED: [&'static str; 4] = ["raw_rtt", "rtt", "rtt_host", "server_delay"];

    pub fn new(data: &'a TabularDataset) -> Self {
        Radclock { data }
    }

    /// Look a derived series up by name.
    pub fn derived(&self, name: &str) -> Result<Series> {
        match name {
            "raw_rtt" => self.raw_rtt(),
            "rtt" => self.rtt(),
            "rtt_host" => self.rtt_host(),
            "server_delay" => self.server_delay(),
            other => Err(Error::MissingField(other.to_string())),
        }
    }

    /// RTT as stored, in counter units.
    pub fn raw_rtt(&self) -> Result<Series> {
        let mut s = self.data.series("RTT")?;
        s.name = "raw_rtt".to_string();
        Ok(s)
    }

    /// RTT in seconds.
    pub fn rtt(&self) -> Result<Series> {
        let rtt = self.data.series("RTT")?;
        let phat = self.data.series("phat")?;
        Ok(rtt.zip_with(&phat, "rtt", |r, p| r * p))
    }

    /// RTT minus the time the probe spent on the capture side.
    pub fn rtt_host(&self) -> Result<Series> {
        let rtt = self.rtt()?;
        let rx = self.data.series("DAG_RX")?;
        let tx = self.data.series("DAG_TX")?;
        let wire = rx.zip_with(&tx, "wire", |rx, tx| rx - tx);
        Ok(rtt.zip_with(&wire, "rtt_host", |r, w| r - w))
    }

    pub fn server_delay(&self) -> Result<Series> {
        let te = self.data.series("Te")?;
        let tb = self.data.series("Tb")?;
        Ok(te.zip_with(&tb, "server_delay", |te, tb| te - tb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_reader;

    fn zeros() -> DataContainer {
        let text = "\
% type: radclock
% fields: Ta Tb Te Tf RTT stamp phat DAG_TX DAG_RX
0 0 0 1 120 0 0 0 0
0 0 0 2 130 0 0 0 0
0 0 0 3 140 0 0 0 0
0 0 0 4 150 0 0 0 0
";
        load_reader(text.as_bytes(), Some(DeclaredType::Radclock)).unwrap()
    }

    #[test]
    fn zero_columns_give_zero_series_of_input_length() {
        let container = zeros();
        let radclock = container.radclock().unwrap();
        for series in [
            radclock.rtt().unwrap(),
            radclock.rtt_host().unwrap(),
            radclock.server_delay().unwrap(),
        ] {
            assert_eq!(series.len(), container.data().len());
            assert!(series.values.iter().all(|&v| v == 0.0), "{}", series.name);
        }
    }

    #[test]
    fn derived_series_are_named_and_aligned() {
        let container = zeros();
        let radclock = container.radclock().unwrap();
        let raw = radclock.raw_rtt().unwrap();
        assert_eq!(raw.name, "raw_rtt");
        assert_eq!(raw.values, vec![120.0, 130.0, 140.0]);
        assert_eq!(raw.index, container.data().time);
        for name in Radclock::DERIVED {
            assert_eq!(radclock.derived(name).unwrap().name, name);
        }
    }

    #[test]
    fn arithmetic_follows_the_definitions() {
        let text = "\
% type: radclock
% fields: Ta Tb Te Tf RTT stamp phat DAG_TX DAG_RX
0 1.5 2.0 1 100 0 0.001 10.0 10.02
0 0 0 2 0 0 0 0 0
";
        let container = load_reader(text.as_bytes(), None).unwrap();
        let radclock = container.radclock().unwrap();
        let rtt = radclock.rtt().unwrap().values[0];
        assert!((rtt - 0.1).abs() < 1e-12);
        let host = radclock.rtt_host().unwrap().values[0];
        assert!((host - 0.08).abs() < 1e-9);
        assert_eq!(radclock.server_delay().unwrap().values, vec![0.5]);
    }

    #[test]
    fn other_types_do_not_expose_radclock_series() {
        let text = "% type: RAD_merged\n% fields: a b c d e f\n0 0 0 0 0 1\n0 0 0 0 0 2\n";
        let container = load_reader(text.as_bytes(), None).unwrap();
        assert!(matches!(
            container.radclock(),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn missing_capture_columns_are_reported() {
        let text = "% type: radclock\n% fields: Ta Tb Te Tf RTT stamp phat\n0 0 0 1 1 1 1\n0 0 0 1 1 1 1\n";
        let container = load_reader(text.as_bytes(), None).unwrap();
        let err = container.radclock().unwrap().rtt_host().unwrap_err();
        assert!(matches!(err, Error::MissingField(f) if f == "DAG_RX"));
    }
}
