use std::collections::HashMap;

use crate::error::{Error, Result};

use super::container::{DataContainer, Radclock};
use super::model::{Column, DeclaredType, TabularDataset, Value};

/// Field both radclock and capture stamps carry, used as join key.
pub const JOIN_FIELD: &str = "Tf";

/// Suffix given to radclock columns whose name the capture side already uses.
pub const RADCLOCK_SUFFIX: &str = "_radclock";

// ---------------------------------------------------------------------------
// MergePolicy / MergedDataset
// ---------------------------------------------------------------------------

/// Tunables of a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergePolicy {
    /// Joined rows dropped from the start of the result. The first samples
    /// of a radclock run are usually not trustworthy.
    pub skip_leading: usize,
}

impl Default for MergePolicy {
    fn default() -> Self {
        MergePolicy { skip_leading: 2 }
    }
}

/// Result of merging two stamp streams, indexed by capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDataset {
    pub left: DeclaredType,
    pub right: DeclaredType,
    pub data: TabularDataset,
}

impl MergedDataset {
    /// Derived radclock series over the merged rows.
    pub fn radclock(&self) -> Radclock<'_> {
        Radclock::new(&self.data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Merge two containers, picking the strategy from their declared types.
///
/// When both sides name a strategy, the right-hand container decides.
pub fn merge(left: &DataContainer, right: &DataContainer, policy: MergePolicy) -> Result<MergedDataset> {
    let (l, r) = declared_pair(left, right)?;
    match (l, r) {
        (_, DeclaredType::UdpMerged) => Err(Error::MergeNotImplemented(DeclaredType::UdpMerged)),
        (_, DeclaredType::Radclock) => merge_radclock(left, right, policy),
        (DeclaredType::UdpMerged, _) => Err(Error::MergeNotImplemented(DeclaredType::UdpMerged)),
        (DeclaredType::Radclock, _) => merge_radclock(left, right, policy),
        (left, right) => {
            log::warn!("Cannot figure out how to merge {left} with {right}");
            Err(Error::UnsupportedMerge { left, right })
        }
    }
}

fn declared_pair(left: &DataContainer, right: &DataContainer) -> Result<(DeclaredType, DeclaredType)> {
    let l = left
        .declared_type()
        .ok_or_else(|| Error::type_mismatch("a declared type", None))?;
    let r = right
        .declared_type()
        .ok_or_else(|| Error::type_mismatch("a declared type", None))?;
    Ok((l, r))
}

// ---------------------------------------------------------------------------
// radclock + RAD_merged
// ---------------------------------------------------------------------------

/// Inner join of radclock stamps with capture stamps on `Tf`.
///
/// The capture side (`RAD_merged`) drives row order and provides the time
/// index. The radclock `Tb` and `Tf` columns are dropped since the capture
/// side carries its own. Rows without a counterpart are discarded, then
/// `policy.skip_leading` rows are removed from the front.
pub fn merge_radclock(
    left: &DataContainer,
    right: &DataContainer,
    policy: MergePolicy,
) -> Result<MergedDataset> {
    let (radclock, stamps) = match declared_pair(left, right)? {
        (DeclaredType::Radclock, DeclaredType::RadMerged) => (left, right),
        (DeclaredType::RadMerged, DeclaredType::Radclock) => (right, left),
        (l, r) => {
            return Err(Error::TypeMismatch {
                expected: format!("{} and {}", DeclaredType::Radclock, DeclaredType::RadMerged),
                found: format!("{l} and {r}"),
            })
        }
    };
    let radclock_data = radclock.data();
    let stamps_data = stamps.data();

    let radclock_keys = key_column(radclock_data)?;
    let stamps_keys = key_column(stamps_data)?;

    // Integral keys match whether a file wrote them as `10` or `10.0`.
    let mut by_key: HashMap<Value, Vec<usize>> = HashMap::new();
    for (row, key) in radclock_keys.iter().enumerate() {
        by_key.entry(key.join_key()).or_default().push(row);
    }

    // (capture row, radclock row) pairs in capture order.
    let pairs: Vec<(usize, usize)> = stamps_keys
        .iter()
        .enumerate()
        .flat_map(|(s, key)| {
            by_key
                .get(&key.join_key())
                .into_iter()
                .flatten()
                .map(move |&r| (s, r))
        })
        .collect();
    log::debug!(
        "merge_radclock: {} capture rows, {} radclock rows, {} matched",
        stamps_data.len(),
        radclock_data.len(),
        pairs.len()
    );

    let mut columns: Vec<Column> = stamps_data
        .columns
        .iter()
        .map(|c| Column::new(c.name.clone(), pairs.iter().map(|&(s, _)| c.values[s].clone()).collect()))
        .collect();
    for column in &radclock_data.columns {
        if column.name == "Tb" || column.name == JOIN_FIELD {
            continue;
        }
        let name = if stamps_data.column(&column.name).is_some() {
            format!("{}{RADCLOCK_SUFFIX}", column.name)
        } else {
            column.name.clone()
        };
        let values = pairs.iter().map(|&(_, r)| column.values[r].clone()).collect();
        columns.push(Column::new(name, values));
    }

    let time = pairs.iter().map(|&(s, _)| stamps_data.time[s]).collect();
    let data = TabularDataset { time, columns }.skip_rows(policy.skip_leading);
    log::info!(
        "Merged {} radclock rows with {} capture stamps into {} rows",
        radclock_data.len(),
        stamps_data.len(),
        data.len()
    );

    Ok(MergedDataset {
        left: DeclaredType::Radclock,
        right: DeclaredType::RadMerged,
        data,
    })
}

fn key_column(data: &TabularDataset) -> Result<&[Value]> {
    data.column(JOIN_FIELD)
        .map(|c| c.values.as_slice())
        .ok_or_else(|| Error::MissingField(JOIN_FIELD.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_reader;

    /// `keys` become `Tf`, the timestamp is `1_330_000_000 + key`.
    fn radclock(keys: &[u64]) -> DataContainer {
        let mut text = String::from("% type: radclock\n% fields: Ta Tb Te Tf RTT stamp phat\n");
        for k in keys {
            text.push_str(&format!("1 2 3 {k} 100 {} 1e-9\n", 1_330_000_000 + k));
        }
        text.push_str("truncated\n");
        load_reader(text.as_bytes(), Some(DeclaredType::Radclock)).unwrap()
    }

    fn stamps(keys: &[u64]) -> DataContainer {
        let mut text =
            String::from("% type: RAD_merged\n% fields: Ta Tb Te Tf DAG_TX time_s DAG_RX\n");
        for k in keys {
            text.push_str(&format!(
                "1 20 30 {k} 5.0 {}.25 5.5\n",
                1_330_000_000 + k
            ));
        }
        text.push_str("truncated\n");
        load_reader(text.as_bytes(), Some(DeclaredType::RadMerged)).unwrap()
    }

    #[test]
    fn inner_join_drops_unmatched_and_two_leading_rows() {
        // Shared keys 10..=15 (M = 6), plus unmatched keys on both sides.
        let rad = radclock(&[1, 10, 11, 12, 2, 13, 14, 15]);
        let cap = stamps(&[10, 11, 100, 12, 13, 14, 101, 15]);
        let merged = merge_radclock(&rad, &cap, MergePolicy::default()).unwrap();
        assert_eq!(merged.len(), 4);

        let tf = merged.data.column("Tf").unwrap();
        assert_eq!(
            tf.values,
            vec![12, 13, 14, 15].into_iter().map(Value::Integer).collect::<Vec<_>>()
        );
        // Capture time drives the index.
        assert_eq!(merged.data.time[0].timestamp_subsec_micros(), 250_000);
    }

    #[test]
    fn join_is_symmetric_in_argument_order() {
        let rad = radclock(&[10, 11, 12, 13]);
        let cap = stamps(&[10, 11, 12, 13]);
        let a = merge_radclock(&rad, &cap, MergePolicy::default()).unwrap();
        let b = merge_radclock(&cap, &rad, MergePolicy::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn duplicate_columns_are_dropped_or_renamed() {
        let rad = radclock(&[10, 11, 12, 13]);
        let cap = stamps(&[10, 11, 12, 13]);
        let merged = merge_radclock(&rad, &cap, MergePolicy { skip_leading: 0 }).unwrap();
        let names = merged.data.column_names();
        assert_eq!(names.iter().filter(|n| **n == "Tb").count(), 1);
        assert_eq!(names.iter().filter(|n| **n == "Tf").count(), 1);
        assert!(names.contains(&"Te_radclock"));
        assert!(names.contains(&"RTT"));
        assert!(!names.contains(&"Tb_radclock"));
        // Tb comes from the capture side.
        assert_eq!(merged.data.column("Tb").unwrap().values[0], Value::Integer(20));
    }

    #[test]
    fn small_joins_come_back_empty() {
        let rad = radclock(&[10, 11, 50]);
        let cap = stamps(&[10, 11, 60]);
        let merged = merge_radclock(&rad, &cap, MergePolicy::default()).unwrap();
        assert!(merged.is_empty());
        assert!(merged.data.columns.iter().all(|c| c.values.is_empty()));
    }

    #[test]
    fn skip_leading_is_configurable() {
        let rad = radclock(&[10, 11, 12, 13]);
        let cap = stamps(&[10, 11, 12, 13]);
        let merged = merge_radclock(&rad, &cap, MergePolicy { skip_leading: 0 }).unwrap();
        assert_eq!(merged.len(), 4);
    }

    #[test]
    fn merged_rows_expose_host_rtt() {
        let rad = radclock(&[10, 11, 12, 13]);
        let cap = stamps(&[10, 11, 12, 13]);
        let merged = merge(&rad, &cap, MergePolicy { skip_leading: 0 }).unwrap();
        let host = merged.radclock().rtt_host().unwrap();
        assert_eq!(host.len(), 4);
        assert!((host.values[0] - (100.0 * 1e-9 - 0.5)).abs() < 1e-12);
    }

    #[test]
    fn dispatch_rejects_terminal_pairs() {
        let text = "% type: UDP_dag\n% fields: a b c d e f\n0 0 0 0 0 1\n0 0 0 0 0 2\n";
        let a = load_reader(text.as_bytes(), None).unwrap();
        let b = load_reader(text.as_bytes(), None).unwrap();
        assert!(matches!(
            merge(&a, &b, MergePolicy::default()),
            Err(Error::UnsupportedMerge {
                left: DeclaredType::UdpDag,
                right: DeclaredType::UdpDag
            })
        ));
    }

    #[test]
    fn udp_merge_is_a_named_extension_point() {
        let text = "% type: UDP_merged\n% fields: a b c d e f\n0 0 0 0 0 1\n0 0 0 0 0 2\n";
        let a = load_reader(text.as_bytes(), None).unwrap();
        let b = load_reader(text.as_bytes(), None).unwrap();
        assert!(matches!(
            merge(&a, &b, MergePolicy::default()),
            Err(Error::MergeNotImplemented(DeclaredType::UdpMerged))
        ));
    }

    #[test]
    fn udp_merged_on_the_right_takes_precedence() {
        let text = "% type: UDP_merged\n% fields: a b c d e f\n0 0 0 0 0 1\n0 0 0 0 0 2\n";
        let udp = load_reader(text.as_bytes(), None).unwrap();
        let rad = radclock(&[10, 11]);
        assert!(matches!(
            merge(&rad, &udp, MergePolicy::default()),
            Err(Error::MergeNotImplemented(DeclaredType::UdpMerged))
        ));
        // radclock on the right picks the radclock join, which rejects the partner.
        assert!(matches!(
            merge(&udp, &rad, MergePolicy::default()),
            Err(Error::TypeMismatch { .. })
        ));
    }

    #[test]
    fn float_and_integer_keys_join() {
        let rad = radclock(&(10..20).collect::<Vec<_>>());
        let mut text =
            String::from("% type: RAD_merged\n% fields: Ta Tb Te Tf DAG_TX time_s DAG_RX\n");
        for k in 10..20 {
            text.push_str(&format!("1 20 30 {k}.0 5.0 {}.25 5.5\n", 1_330_000_000 + k));
        }
        text.push_str("truncated\n");
        let cap = load_reader(text.as_bytes(), Some(DeclaredType::RadMerged)).unwrap();
        assert_eq!(cap.data().column("Tf").unwrap().values[0], Value::Float(10.0));

        let merged = merge(&rad, &cap, MergePolicy::default()).unwrap();
        assert_eq!(merged.len(), 8);
    }

    #[test]
    fn radclock_with_wrong_partner_is_a_type_mismatch() {
        let rad = radclock(&[10, 11]);
        let other = radclock(&[10, 11]);
        assert!(matches!(
            merge(&rad, &other, MergePolicy::default()),
            Err(Error::TypeMismatch { .. })
        ));
    }
}
