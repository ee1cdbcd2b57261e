use std::fmt;

use crate::pagination::PageWindow;
use crate::record::Record;
use crate::view::parse_number;

/// Numbers for the statistics panel, derived from one computed view.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub total_records: usize,
    pub matching_records: usize,
    pub selected_records: usize,
    pub page: usize,
    pub total_pages: usize,
    /// 1-based, inclusive. `0..0` when nothing is visible.
    pub first_visible: usize,
    pub last_visible: usize,
    /// Sum of the amount column over the matching records.
    pub amount_total: f64,
}

impl Stats {
    pub fn compute(
        records: &[Record],
        projection: &[usize],
        window: &PageWindow,
        selected_records: usize,
        amount_column: Option<&str>,
    ) -> Self {
        let amount_total = amount_column.map_or(0.0, |column| {
            projection
                .iter()
                .filter_map(|&idx| records[idx].get(column).and_then(parse_number))
                .sum()
        });
        let (first_visible, last_visible) = if window.is_empty() {
            (0, 0)
        } else {
            (window.range.start + 1, window.range.end)
        };
        Self {
            total_records: records.len(),
            matching_records: projection.len(),
            selected_records,
            page: window.page,
            total_pages: window.total_pages,
            first_visible,
            last_visible,
            amount_total,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Records {} | Matching {} | Selected {} | Showing {}-{} | Page {}/{} | Amount {:.2}",
            self.total_records,
            self.matching_records,
            self.selected_records,
            self.first_visible,
            self.last_visible,
            self.page,
            self.total_pages,
            self.amount_total
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::pagination::{PageSize, paginate};
    use crate::record::IdGenerator;

    #[test]
    fn sums_amounts_over_the_projection_only() {
        let mut ids = IdGenerator::default();
        let records: Vec<Record> = ["100", "250.5", "oops", "1000"]
            .iter()
            .map(|v| Record::new(ids.mint(), HashMap::from([("AMT".to_string(), v.to_string())])))
            .collect();
        let projection = vec![0, 1, 2];
        let window = paginate(projection.len(), PageSize::Ten, 1);
        let stats = Stats::compute(&records, &projection, &window, 1, Some("AMT"));
        assert_eq!(stats.total_records, 4);
        assert_eq!(stats.matching_records, 3);
        assert_eq!(stats.amount_total, 350.5);
        assert_eq!((stats.first_visible, stats.last_visible), (1, 3));
        assert_eq!((stats.page, stats.total_pages), (1, 1));
    }

    #[test]
    fn empty_view_shows_zero_range() {
        let window = paginate(0, PageSize::Ten, 1);
        let stats = Stats::compute(&[], &[], &window, 0, None);
        assert_eq!((stats.first_visible, stats.last_visible), (0, 0));
        assert_eq!(stats.to_string(), "Records 0 | Matching 0 | Selected 0 | Showing 0-0 | Page 1/0 | Amount 0.00");
    }
}
