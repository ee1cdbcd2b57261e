use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime};

pub const DATE_FORMAT: &str = "%d-%m-%Y";

/// Accepted spellings of a source date, tried in order.
const DATE_INPUT_FORMATS: [&str; 5] = ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y", "%Y/%m/%d", "%d.%m.%Y"];
const DATETIME_INPUT_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

// Spreadsheet serial dates count days from 1899-12-30. Upper bound is 9999-12-31.
const SERIAL_DATE_MAX: f64 = 2_958_465.0;

/// One field of a source row, in source order.
pub type RawRow = Vec<(String, String)>;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Text { max_chars: Option<usize> },
    /// Numeric string, `"0"` when absent.
    Amount,
    /// Source date if parseable, today otherwise. Stored as `DD-MM-YYYY`.
    Date,
}

#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: String,
    pub aliases: Vec<String>,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn text(name: &str) -> Self {
        Self {
            name: name.to_string(),
            aliases: Vec::new(),
            kind: ColumnKind::Text { max_chars: None },
        }
    }

    pub fn truncated(name: &str, max_chars: usize) -> Self {
        Self {
            kind: ColumnKind::Text {
                max_chars: Some(max_chars),
            },
            ..Self::text(name)
        }
    }

    pub fn amount(name: &str) -> Self {
        Self {
            kind: ColumnKind::Amount,
            ..Self::text(name)
        }
    }

    pub fn date(name: &str) -> Self {
        Self {
            kind: ColumnKind::Date,
            ..Self::text(name)
        }
    }

    pub fn alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    fn default_value(&self, today: NaiveDate) -> String {
        match self.kind {
            ColumnKind::Text { .. } => String::new(),
            ColumnKind::Amount => "0".to_string(),
            ColumnKind::Date => today.format(DATE_FORMAT).to_string(),
        }
    }

    fn normalize_value(&self, value: Option<&str>, today: NaiveDate) -> String {
        let value = value.filter(|v| !v.trim().is_empty());
        match (&self.kind, value) {
            (_, None) => self.default_value(today),
            (ColumnKind::Text { max_chars: Some(max) }, Some(v)) => v.chars().take(*max).collect(),
            (ColumnKind::Text { max_chars: None }, Some(v)) => v.to_string(),
            (ColumnKind::Amount, Some(v)) => v.trim().to_string(),
            (ColumnKind::Date, Some(v)) => parse_date(v)
                .unwrap_or(today)
                .format(DATE_FORMAT)
                .to_string(),
        }
    }
}

/// The fixed, ordered column contract every record is normalized to.
#[derive(Debug, Clone)]
pub struct Schema {
    columns: Vec<ColumnSpec>,
}

impl Default for Schema {
    fn default() -> Self {
        Self::challan()
    }
}

impl Schema {
    pub fn new(columns: Vec<ColumnSpec>) -> Self {
        Self { columns }
    }

    /// Bank challan register.
    pub fn challan() -> Self {
        Self::new(vec![
            ColumnSpec::truncated("CHALLAN_NO", 11),
            ColumnSpec::date("CHALLAN_DATE").alias("DATE"),
            ColumnSpec::text("A_BANCD"),
            ColumnSpec::text("BRANCH_NAME"),
            ColumnSpec::text("DEPOSITOR"),
            ColumnSpec::amount("CHAN_AMT"),
            ColumnSpec::truncated("NOTES", 255),
        ])
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn headers(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn amount_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.kind == ColumnKind::Amount)
            .map(|c| c.name.as_str())
    }

    /// Schema column a header refers to, matched after trimming and uppercasing, directly
    /// or through an alias.
    pub fn resolve(&self, header: &str) -> Option<&str> {
        let key = header_key(header);
        self.columns
            .iter()
            .find(|c| {
                std::iter::once(&c.name)
                    .chain(c.aliases.iter())
                    .any(|name| header_key(name) == key)
            })
            .map(|c| c.name.as_str())
    }

    /// Map a source row onto the schema. Source headers match after trimming and
    /// uppercasing, directly or through an alias. When several headers land on the same
    /// key, one spelled exactly like the key wins, otherwise the first one.
    pub fn normalize(&self, raw: &RawRow, today: NaiveDate) -> HashMap<String, String> {
        let mut by_key: HashMap<String, &str> = HashMap::with_capacity(raw.len());
        for (name, value) in raw {
            let key = header_key(name);
            if *name == key {
                by_key.insert(key, value.as_str());
            } else {
                by_key.entry(key).or_insert(value.as_str());
            }
        }

        self.columns
            .iter()
            .map(|column| {
                let value = std::iter::once(&column.name)
                    .chain(column.aliases.iter())
                    .find_map(|name| by_key.get(&header_key(name)).copied());
                (column.name.clone(), column.normalize_value(value, today))
            })
            .collect()
    }

    /// Bring fields typed in by the user into the same shape ingestion produces.
    pub fn conform(&self, fields: &HashMap<String, String>, today: NaiveDate) -> HashMap<String, String> {
        let raw: RawRow = fields
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.normalize(&raw, today)
    }
}

fn header_key(name: &str) -> String {
    name.trim().to_ascii_uppercase()
}

/// Parse a date as it shows up in source text: a handful of textual layouts or an ISO
/// timestamp. Bare numbers are not dates here, workbook date cells are converted with
/// [`serial_to_date`] while reading the sheet.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Some(date) = DATE_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
    {
        return Some(date);
    }
    DATETIME_INPUT_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|datetime| datetime.date())
}

pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..=SERIAL_DATE_MAX).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    fn raw(fields: &[(&str, &str)]) -> RawRow {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_fields_get_defaults() {
        let schema = Schema::challan();
        let fields = schema.normalize(&raw(&[("CHALLAN_NO", "A1")]), today());
        assert_eq!(fields.len(), schema.headers().len());
        assert_eq!(fields["CHALLAN_NO"], "A1");
        assert_eq!(fields["A_BANCD"], "");
        assert_eq!(fields["CHAN_AMT"], "0");
        assert_eq!(fields["CHALLAN_DATE"], "15-03-2024");
    }

    #[test]
    fn truncates_by_characters_not_bytes() {
        let schema = Schema::challan();
        let long_no = "ÄÖÜ-123456789-xyz";
        let notes = "é".repeat(300);
        let fields = schema.normalize(&raw(&[("CHALLAN_NO", long_no), ("NOTES", &notes)]), today());
        assert_eq!(fields["CHALLAN_NO"], "ÄÖÜ-1234567");
        assert_eq!(fields["CHALLAN_NO"].chars().count(), 11);
        assert_eq!(fields["NOTES"].chars().count(), 255);
    }

    #[test]
    fn headers_match_loosely_and_through_aliases() {
        let schema = Schema::challan();
        let fields = schema.normalize(
            &raw(&[(" chan_amt ", "1500"), ("Date", "2023-12-01"), ("EXTRA", "ignored")]),
            today(),
        );
        assert_eq!(fields["CHAN_AMT"], "1500");
        assert_eq!(fields["CHALLAN_DATE"], "01-12-2023");
        assert!(!fields.contains_key("EXTRA"));
    }

    #[test]
    fn exact_header_beats_loose_spelling() {
        let schema = Schema::challan();
        let fields = schema.normalize(&raw(&[("chan_amt", "5"), ("CHAN_AMT", "10")]), today());
        assert_eq!(fields["CHAN_AMT"], "10");
        let fields = schema.normalize(&raw(&[("CHAN_AMT", "10"), (" Chan_Amt", "5")]), today());
        assert_eq!(fields["CHAN_AMT"], "10");
    }

    #[test]
    fn resolves_headers_to_schema_names() {
        let schema = Schema::challan();
        assert_eq!(schema.resolve(" chan_amt "), Some("CHAN_AMT"));
        assert_eq!(schema.resolve("date"), Some("CHALLAN_DATE"));
        assert_eq!(schema.resolve("CHALLAN_NO"), Some("CHALLAN_NO"));
        assert_eq!(schema.resolve("EXTRA"), None);
    }

    #[test]
    fn unparseable_date_falls_back_to_today() {
        let schema = Schema::challan();
        let fields = schema.normalize(&raw(&[("CHALLAN_DATE", "next tuesday")]), today());
        assert_eq!(fields["CHALLAN_DATE"], "15-03-2024");
    }

    #[test]
    fn parses_source_date_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(parse_date("2024-01-05"), expected);
        assert_eq!(parse_date("05-01-2024"), expected);
        assert_eq!(parse_date("05/01/2024"), expected);
        assert_eq!(parse_date("2024-01-05T08:30:00"), expected);
        assert_eq!(parse_date("05.01.2024"), expected);
        assert_eq!(serial_to_date(45296.0), expected);
        assert_eq!(serial_to_date(0.0), None);
    }

    #[test]
    fn bare_numbers_in_text_are_not_dates() {
        assert_eq!(parse_date("2024"), None);
        assert_eq!(parse_date("45296"), None);
        let schema = Schema::challan();
        let fields = schema.normalize(&raw(&[("CHALLAN_DATE", "2024")]), today());
        assert_eq!(fields["CHALLAN_DATE"], "15-03-2024");
    }

    #[test]
    fn empty_amount_is_treated_as_absent() {
        let schema = Schema::challan();
        let fields = schema.normalize(&raw(&[("CHAN_AMT", "  ")]), today());
        assert_eq!(fields["CHAN_AMT"], "0");
    }
}
