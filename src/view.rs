//! Filter and sort stages of the view pipeline.
//!
//! A projection is a list of indices into the record store, in display order. Both stages
//! are pure: they read the store and return a new projection, the store itself is never
//! touched.

use std::cmp::Ordering;
use std::time::Instant;

use icu_collator::{Collator, CollatorOptions, Strength};
use rayon::prelude::*;
use tracing::{trace, warn};

use crate::record::Record;

/// Mapping of view row to store index.
pub type Projection = Vec<usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    pub fn flipped(self) -> Self {
        match self {
            Direction::Ascending => Direction::Descending,
            Direction::Descending => Direction::Ascending,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Direction::Ascending => ordering,
            Direction::Descending => ordering.reverse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub column: Option<String>,
    pub direction: Direction,
}

impl SortSpec {
    pub fn by(column: &str, direction: Direction) -> Self {
        Self {
            column: Some(column.to_string()),
            direction,
        }
    }

    /// Clicking the sorted column again flips the direction, another column starts
    /// ascending.
    pub fn toggled(&self, column: &str) -> Self {
        match &self.column {
            Some(current) if current == column => Self::by(column, self.direction.flipped()),
            _ => Self::by(column, Direction::Ascending),
        }
    }

    pub fn is_sorted_by(&self, column: &str) -> bool {
        self.column.as_deref() == Some(column)
    }
}

/// Filter and sort in one go.
pub fn project(records: &[Record], headers: &[String], term: &str, sort: &SortSpec) -> Projection {
    let start_time = Instant::now();
    let rows = sort_rows(records, filter(records, headers, term), sort);
    trace!(
        "Projection of {} / {} rows in {}ms",
        rows.len(),
        records.len(),
        start_time.elapsed().as_millis()
    );
    rows
}

/// Indices of the records where any column contains `term`, ignoring case.
pub fn filter(records: &[Record], headers: &[String], term: &str) -> Projection {
    if term.is_empty() {
        return (0..records.len()).collect();
    }
    let needle = term.to_lowercase();
    records
        .par_iter()
        .enumerate()
        .filter(|(_, record)| matches(record, headers, &needle))
        .map(|(idx, _)| idx)
        .collect()
}

/// `needle` has to be lowercase already.
pub fn matches(record: &Record, headers: &[String], needle: &str) -> bool {
    headers
        .iter()
        .filter_map(|h| record.get(h))
        .any(|value| value.to_lowercase().contains(needle))
}

/// Stable sort of `rows` by the sort column. Records without a value for the column go
/// last in either direction and keep their relative order.
pub fn sort_rows(records: &[Record], mut rows: Projection, sort: &SortSpec) -> Projection {
    let Some(column) = sort.column.as_deref() else {
        return rows;
    };

    rows.sort_by(|&a, &b| {
        match (records[a].get(column), records[b].get(column)) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(a), Some(b)) => sort.direction.apply(compare_values(a, b)),
        }
    });
    rows
}

thread_local! {
    // Secondary strength: accents count, case does not.
    static COLLATOR: Option<Collator> = {
        let mut options = CollatorOptions::new();
        options.strength = Some(Strength::Secondary);
        Collator::try_new(&Default::default(), options)
            .inspect_err(|e| warn!("No collator, sorting text by code point: {:?}", e))
            .ok()
    };
}

/// Numeric if both sides parse as finite numbers, otherwise case-insensitive text. A number
/// always orders before text so the comparison stays a total order on mixed columns.
pub fn compare_values(a: &str, b: &str) -> Ordering {
    match (parse_number(a), parse_number(b)) {
        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => compare_text(a, b),
    }
}

/// Collation order ignoring case, so `Émile` sorts with the `E`s. Texts that collate
/// equal fall back to their code points.
pub fn compare_text(a: &str, b: &str) -> Ordering {
    COLLATOR
        .with(|collator| match collator {
            Some(collator) => collator.compare(a, b),
            None => a.to_lowercase().cmp(&b.to_lowercase()),
        })
        .then_with(|| a.cmp(b))
}

pub fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::record::IdGenerator;

    fn records(column: &str, values: &[&str]) -> Vec<Record> {
        let mut ids = IdGenerator::default();
        values
            .iter()
            .map(|v| {
                Record::new(
                    ids.mint(),
                    HashMap::from([(column.to_string(), v.to_string())]),
                )
            })
            .collect()
    }

    fn column_values<'a>(records: &'a [Record], rows: &Projection, column: &str) -> Vec<&'a str> {
        rows.iter()
            .map(|&idx| records[idx].get(column).unwrap_or("<missing>"))
            .collect()
    }

    #[test]
    fn sorts_amounts_numerically_and_toggles() {
        let data = records("CHAN_AMT", &["500", "50", "1000"]);
        let headers = vec!["CHAN_AMT".to_string()];

        let sort = SortSpec::default().toggled("CHAN_AMT");
        assert_eq!(sort.direction, Direction::Ascending);
        let rows = project(&data, &headers, "", &sort);
        assert_eq!(column_values(&data, &rows, "CHAN_AMT"), vec!["50", "500", "1000"]);

        let sort = sort.toggled("CHAN_AMT");
        assert_eq!(sort.direction, Direction::Descending);
        let rows = project(&data, &headers, "", &sort);
        assert_eq!(column_values(&data, &rows, "CHAN_AMT"), vec!["1000", "500", "50"]);
    }

    #[test]
    fn other_column_resets_to_ascending() {
        let sort = SortSpec::by("A", Direction::Descending).toggled("B");
        assert_eq!(sort, SortSpec::by("B", Direction::Ascending));
    }

    #[test]
    fn filters_case_insensitively_on_any_column() {
        let banks: Vec<String> = (0..20).map(|i| format!("BANK0{}", i % 5)).collect();
        let refs: Vec<&str> = banks.iter().map(String::as_str).collect();
        let data = records("A_BANCD", &refs);
        let headers = vec!["A_BANCD".to_string()];

        let rows = filter(&data, &headers, "bank01");
        assert_eq!(rows.len(), 4);
        for (idx, record) in data.iter().enumerate() {
            let kept = rows.contains(&idx);
            assert_eq!(kept, record.get("A_BANCD") == Some("BANK01"));
        }
    }

    #[test]
    fn empty_filter_keeps_everything_in_order() {
        let data = records("A", &["x", "y", "z"]);
        let headers = vec!["A".to_string()];
        assert_eq!(filter(&data, &headers, ""), vec![0, 1, 2]);
    }

    #[test]
    fn missing_values_sort_last_in_both_directions() {
        let mut data = records("A", &["b", "a"]);
        let mut ids = IdGenerator::default();
        for _ in 0..2 {
            ids.mint();
        }
        data.insert(0, Record::new(ids.mint(), HashMap::new()));
        data.push(Record::new(ids.mint(), HashMap::new()));

        let asc = sort_rows(&data, vec![0, 1, 2, 3], &SortSpec::by("A", Direction::Ascending));
        assert_eq!(asc, vec![2, 1, 0, 3]);

        let desc = sort_rows(&data, vec![0, 1, 2, 3], &SortSpec::by("A", Direction::Descending));
        assert_eq!(desc, vec![1, 2, 0, 3]);
    }

    #[test]
    fn mixed_values_fall_back_to_text_ordering() {
        assert_eq!(compare_values("apple", "Banana"), Ordering::Less);
        assert_eq!(compare_values("10", "9"), Ordering::Greater);
        assert_eq!(compare_values("10", "nine"), Ordering::Less);
        assert_eq!(compare_values("1a", "2"), Ordering::Greater);
        assert_eq!(compare_values(" 7 ", "7.0"), Ordering::Equal);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn accented_text_sorts_with_its_base_letter() {
        assert_eq!(compare_values("Émile", "Zoe"), Ordering::Less);
        assert_eq!(compare_values("äpfel", "zebra"), Ordering::Less);
        assert_eq!(compare_values("émile", "Emma"), Ordering::Less);
        assert_eq!(compare_text("Anna", "anna"), "Anna".cmp("anna"));

        let data = records("DEPOSITOR", &["Zoe", "Émile", "adam", "Åsa", "Bruno"]);
        let rows = sort_rows(
            &data,
            (0..data.len()).collect(),
            &SortSpec::by("DEPOSITOR", Direction::Ascending),
        );
        assert_eq!(
            column_values(&data, &rows, "DEPOSITOR"),
            vec!["adam", "Åsa", "Bruno", "Émile", "Zoe"]
        );
    }

    #[test]
    fn double_sort_reverses_the_first() {
        let data = records("A", &["3", "1", "2", "10", "x", "Y"]);
        let all: Projection = (0..data.len()).collect();
        let first = sort_rows(&data, all.clone(), &SortSpec::by("A", Direction::Ascending));
        let mut second = sort_rows(&data, all, &SortSpec::by("A", Direction::Descending));
        second.reverse();
        assert_eq!(first, second);
    }

    #[test]
    fn no_sort_column_is_identity() {
        let data = records("A", &["3", "1", "2"]);
        assert_eq!(sort_rows(&data, vec![2, 0, 1], &SortSpec::default()), vec![2, 0, 1]);
    }
}
