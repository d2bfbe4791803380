//! Ranking of verified summary records.
//!
//! Only records with zero comfort violations are ranked. Order is ascending
//! `average_grid_draw_kw`, then earliest timestamp, then `integrity_hash`.
//! Because the last key is unique after de-duplication, the order is total
//! and the table does not depend on input order.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tracing::info;

use crate::record::{SummaryRecord, VerifiedRecord};

/// One ranked row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedEntry {
    /// 1-based position.
    pub rank: usize,
    pub record: SummaryRecord,
}

/// Aggregated leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTable {
    /// Eligible records in rank order.
    pub entries: Vec<RankedEntry>,
    /// Hashes of records left out for comfort violations, sorted.
    pub excluded: Vec<String>,
    /// Set when nothing was eligible.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
}

impl RankedTable {
    /// Entry at 1-based `rank`.
    pub fn get(&self, rank: usize) -> Option<&RankedEntry> {
        rank.checked_sub(1).and_then(|i| self.entries.get(i))
    }

    /// Number of ranked entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no record was eligible.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds the leaderboard from verified records.
///
/// Records sharing a hash are the same run and count once.
pub fn aggregate(records: impl IntoIterator<Item = VerifiedRecord>) -> RankedTable {
    let mut unique: BTreeMap<String, VerifiedRecord> = BTreeMap::new();
    for record in records {
        unique.entry(record.hash().to_string()).or_insert(record);
    }
    let total = unique.len();

    let (mut eligible, violating): (Vec<VerifiedRecord>, Vec<VerifiedRecord>) = unique
        .into_values()
        .partition(|r| r.record().comfort_violations == 0);
    eligible.sort_by(compare);

    let excluded: Vec<String> = violating.iter().map(|r| r.hash().to_string()).collect();
    let diagnostic = eligible.is_empty().then(|| {
        if total == 0 {
            "no records to rank".to_string()
        } else {
            format!("no eligible records: all {total} had comfort violations")
        }
    });

    let entries: Vec<RankedEntry> = eligible
        .into_iter()
        .enumerate()
        .map(|(i, r)| RankedEntry {
            rank: i + 1,
            record: r.into_record(),
        })
        .collect();

    info!(
        ranked = entries.len(),
        excluded = excluded.len(),
        "leaderboard aggregated"
    );

    RankedTable {
        entries,
        excluded,
        diagnostic,
    }
}

fn compare(a: &VerifiedRecord, b: &VerifiedRecord) -> Ordering {
    a.record()
        .average_grid_draw_kw
        .total_cmp(&b.record().average_grid_draw_kw)
        .then_with(|| a.instant().cmp(&b.instant()))
        .then_with(|| a.hash().cmp(b.hash()))
}

impl fmt::Display for RankedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Leaderboard ---")?;
        if let Some(diagnostic) = &self.diagnostic {
            writeln!(f, "{diagnostic}")?;
        }
        for e in &self.entries {
            writeln!(
                f,
                "{:>3}. {:<16} avg={:.6} kW  seed={:<6} hours={:<4} {}  {}",
                e.rank,
                e.record.strategy_id,
                e.record.average_grid_draw_kw,
                e.record.seed,
                e.record.simulation_duration_hours,
                e.record.timestamp,
                &e.record.integrity_hash[..12.min(e.record.integrity_hash.len())],
            )?;
        }
        write!(f, "Excluded for comfort violations: {}", self.excluded.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp::Timestamp;

    fn verified(strategy: &str, avg: f64, violations: usize, epoch: i64) -> VerifiedRecord {
        SummaryRecord::new(
            1,
            24,
            strategy,
            avg,
            violations,
            &Timestamp::from_epoch_seconds(epoch).unwrap(),
        )
        .unwrap()
        .verify()
        .unwrap()
    }

    fn sample() -> Vec<VerifiedRecord> {
        vec![
            verified("c", 0.90, 0, 100),
            verified("a", 0.80, 0, 300),
            verified("b", 0.80, 0, 200),
            verified("bad", 0.10, 3, 100),
            verified("d", 1.20, 0, 100),
        ]
    }

    fn strategies(table: &RankedTable) -> Vec<&str> {
        table
            .entries
            .iter()
            .map(|e| e.record.strategy_id.as_str())
            .collect()
    }

    #[test]
    fn sorted_by_draw_then_timestamp() {
        let table = aggregate(sample());
        assert_eq!(strategies(&table), vec!["b", "a", "c", "d"]);
        let ranks: Vec<usize> = table.entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, vec![1, 2, 3, 4]);
    }

    #[test]
    fn violating_records_are_never_ranked() {
        let table = aggregate(sample());
        assert!(table.entries.iter().all(|e| e.record.comfort_violations == 0));
        assert_eq!(table.excluded.len(), 1);
        assert!(table.diagnostic.is_none());
    }

    #[test]
    fn order_independent_and_idempotent() {
        let forward = aggregate(sample());
        let mut reversed = sample();
        reversed.reverse();
        assert_eq!(aggregate(reversed), forward);

        let again: Vec<VerifiedRecord> = forward
            .entries
            .iter()
            .map(|e| e.record.clone().verify().unwrap())
            .collect();
        assert_eq!(aggregate(again).entries, forward.entries);
    }

    #[test]
    fn duplicates_collapse() {
        let mut records = sample();
        records.extend(sample());
        assert_eq!(aggregate(records), aggregate(sample()));
    }

    #[test]
    fn full_tie_breaks_on_hash() {
        let x = verified("x", 0.5, 0, 100);
        let y = verified("y", 0.5, 0, 100);
        let table = aggregate(vec![x.clone(), y.clone()]);
        let expected_first = if x.hash() < y.hash() { "x" } else { "y" };
        assert_eq!(table.entries[0].record.strategy_id, expected_first);
    }

    #[test]
    fn empty_input_has_diagnostic() {
        let table = aggregate(Vec::new());
        assert!(table.is_empty());
        assert_eq!(table.diagnostic.as_deref(), Some("no records to rank"));
    }

    #[test]
    fn all_violating_has_diagnostic() {
        let table = aggregate(vec![verified("bad", 0.1, 2, 0)]);
        assert!(table.is_empty());
        assert!(table.diagnostic.unwrap().contains("comfort violations"));
    }

    #[test]
    fn get_is_one_based() {
        let table = aggregate(sample());
        assert_eq!(table.get(1).map(|e| e.rank), Some(1));
        assert!(table.get(0).is_none());
        assert!(table.get(5).is_none());
    }
}
