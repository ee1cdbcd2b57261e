use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;

use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveDate;
use polars::prelude::*;
use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::error::IngestError;
use crate::record::{IdGenerator, Record};
use crate::schema::{DATE_FORMAT, RawRow, Schema, serial_to_date};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileType {
    CSV,
    TSV,
    PARQUET,
    ARROW,
    WORKBOOK,
}

#[derive(Debug)]
pub struct FileInfo {
    pub path: PathBuf,
    pub file_size: u64,
    pub file_type: FileType,
}

/// Result of a successful load. `headers` is the schema's column list, never derived from
/// the file.
#[derive(Debug)]
pub struct LoadedTable {
    pub headers: Vec<String>,
    pub records: Vec<Record>,
    pub row_count: usize,
}

// A source column with all values as text, `None` for nulls.
struct SourceColumn {
    name: String,
    data: Vec<Option<String>>,
}

/// Read a file and normalize every row onto `schema`. Either the whole file loads or
/// nothing does.
pub fn load(
    path: &Path,
    schema: &Schema,
    ids: &mut IdGenerator,
    today: NaiveDate,
) -> Result<LoadedTable, IngestError> {
    let start_time = Instant::now();
    let rows = read_rows(path)?;
    let table = normalize_rows(&rows, schema, ids, today);
    info!(
        "Loaded {} rows from {} in {}ms",
        table.row_count,
        path.display(),
        start_time.elapsed().as_millis()
    );
    Ok(table)
}

pub fn normalize_rows(
    rows: &[RawRow],
    schema: &Schema,
    ids: &mut IdGenerator,
    today: NaiveDate,
) -> LoadedTable {
    let records: Vec<Record> = rows
        .iter()
        .map(|raw| Record::new(ids.mint(), schema.normalize(raw, today)))
        .collect();
    LoadedTable {
        headers: schema.headers(),
        row_count: records.len(),
        records,
    }
}

/// Raw rows of the first table in the file, in file order.
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>, IngestError> {
    let file_info = get_file_info(path)?;
    debug!("Reading {:?}", file_info);
    match file_info.file_type {
        FileType::CSV => frame_rows(load_csv(&file_info.path, b',')?),
        FileType::TSV => frame_rows(load_csv(&file_info.path, b'\t')?),
        FileType::PARQUET => frame_rows(load_parquet(&file_info.path)?),
        FileType::ARROW => frame_rows(load_arrow(&file_info.path)?),
        FileType::WORKBOOK => load_workbook(&file_info.path),
    }
}

pub fn detect_file_type(path: &Path) -> Result<FileType, IngestError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileType::CSV),
        Some("TSV") | Some("TAB") => Ok(FileType::TSV),
        Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
        Some("XLSX") | Some("XLSM") | Some("XLSB") | Some("XLS") | Some("ODS") => {
            Ok(FileType::WORKBOOK)
        }
        _ => Err(IngestError::UnknownFileType(path.display().to_string())),
    }
}

fn get_file_info(path: &Path) -> Result<FileInfo, IngestError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => IngestError::FileNotFound(path.display().to_string()),
        ErrorKind::PermissionDenied => IngestError::PermissionDenied(path.display().to_string()),
        _ => IngestError::Io(e),
    })?;
    if !metadata.is_file() {
        return Err(IngestError::NotAFile(path.display().to_string()));
    }

    let file_type = detect_file_type(path)?;

    Ok(FileInfo {
        path: path.to_path_buf(),
        file_size: metadata.len(),
        file_type,
    })
}

fn load_csv(path: &Path, separator: u8) -> Result<LazyFrame, PolarsError> {
    // Schema inference is off so every column comes back as text, exactly as written.
    LazyCsvReader::new(PlPath::Local(path.into()))
        .with_has_header(true)
        .with_separator(separator)
        .with_infer_schema_length(Some(0))
        .finish()
}

fn load_parquet(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
}

fn load_arrow(path: &Path) -> Result<LazyFrame, PolarsError> {
    LazyFrame::scan_ipc(
        PlPath::Local(path.into()),
        polars::io::ipc::IpcScanOptions,
        UnifiedScanArgs::default(),
    )
}

// Columns are converted to text in parallel, one column per task, then zipped back into
// rows.
fn frame_rows(frame: LazyFrame) -> Result<Vec<RawRow>, IngestError> {
    let df = frame.collect()?;
    let columns = df
        .get_column_names()
        .par_iter()
        .map(|name| load_column(&df, name.as_str()))
        .collect::<Result<Vec<SourceColumn>, PolarsError>>()?;

    let rows = (0..df.height())
        .map(|ridx| {
            columns
                .iter()
                .filter_map(|c| c.data[ridx].as_ref().map(|v| (c.name.clone(), v.clone())))
                .collect()
        })
        .collect();
    Ok(rows)
}

fn load_column(df: &DataFrame, col_name: &str) -> Result<SourceColumn, PolarsError> {
    let col = df.column(col_name)?.cast(&DataType::String)?;
    let series = col.str()?;
    let data = series
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect::<Vec<_>>();
    trace!("Column \"{}\", # rows {}", col_name, data.len());

    Ok(SourceColumn {
        name: col_name.to_string(),
        data,
    })
}

// Only the first sheet is read. Its first row names the columns.
fn load_workbook(path: &Path) -> Result<Vec<RawRow>, IngestError> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(IngestError::EmptyWorkbook)??;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| cell_text(cell).unwrap_or_default())
        .collect();

    Ok(rows
        .map(|row| {
            headers
                .iter()
                .zip(row.iter())
                .filter_map(|(header, cell)| cell_text(cell).map(|v| (header.clone(), v)))
                .collect()
        })
        .collect())
}

fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(s) => Some(s.clone()),
        Data::Float(f) => Some(format_number(*f)),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::DateTime(dt) => Some(
            serial_to_date(dt.as_f64())
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_else(|| format_number(dt.as_f64())),
        ),
        Data::DateTimeIso(s) => Some(s.clone()),
        Data::DurationIso(s) => Some(s.clone()),
        Data::Error(e) => Some(format!("{e}")),
    }
}

/// Integral numbers print without a fractional part, `500.0` reads as `500`.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_supported_file_types() {
        assert_eq!(detect_file_type(Path::new("a.csv")).unwrap(), FileType::CSV);
        assert_eq!(detect_file_type(Path::new("a.TSV")).unwrap(), FileType::TSV);
        assert_eq!(detect_file_type(Path::new("a.xls")).unwrap(), FileType::WORKBOOK);
        assert_eq!(detect_file_type(Path::new("a.xlsx")).unwrap(), FileType::WORKBOOK);
        assert_eq!(detect_file_type(Path::new("a.feather")).unwrap(), FileType::ARROW);
        assert!(matches!(
            detect_file_type(Path::new("a.docx")),
            Err(IngestError::UnknownFileType(_))
        ));
        assert!(detect_file_type(Path::new("noextension")).is_err());
    }

    #[test]
    fn missing_file_is_reported_by_name() {
        let err = read_rows(Path::new("does/not/exist.csv")).unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound(_)));
        assert!(err.to_string().contains("exist.csv"));
    }

    #[test]
    fn formats_integral_numbers_without_fraction() {
        assert_eq!(format_number(500.0), "500");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(12.5), "12.5");
    }

    #[test]
    fn normalizing_rows_mints_ids_and_fixes_headers() {
        let schema = Schema::challan();
        let mut ids = IdGenerator::default();
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rows: Vec<RawRow> = vec![
            vec![("CHALLAN_NO".to_string(), "1".to_string())],
            vec![("A_BANCD".to_string(), "BANK01".to_string())],
        ];
        let table = normalize_rows(&rows, &schema, &mut ids, today);
        assert_eq!(table.row_count, 2);
        assert_eq!(table.headers, schema.headers());
        assert_ne!(table.records[0].id(), table.records[1].id());
        assert_eq!(table.records[1].get("CHALLAN_NO"), Some(""));
        assert_eq!(table.records[0].get("CHAN_AMT"), Some("0"));
    }
}
