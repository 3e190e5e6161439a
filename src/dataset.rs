use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, TimeZone, Utc};
use polars::prelude::*;
use tracing::{debug, info};

use crate::domain::IvError;
use crate::record::{ItemType, Record, Status};

pub const COLUMN_NAMES: [&str; 5] = ["id", "name", "type", "status", "lastUpdated"];

/// Source of inventory records.
pub trait Provider {
    /// Ordered records, ascending by id, at most `count` of them.
    fn list(&self, count: usize) -> Vec<Record>;
    fn get_by_id(&self, id: u64) -> Option<Record>;
}

/// Deterministic record generator with ids `1..=size`.
#[derive(Debug, Clone)]
pub struct Generator {
    size: usize,
    base: DateTime<Utc>,
}

impl Generator {
    pub fn new(size: usize) -> Self {
        let base = Utc
            .with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        Self { size, base }
    }

    fn record(&self, id: u64) -> Record {
        let i = id - 1;
        // Spread updates over one year so last-updated sorting is not trivial.
        let minutes = ((id * 7919) % 525_600) as i64;
        Record {
            id,
            name: format!("Item {id}"),
            item_type: if i % 2 == 0 {
                ItemType::Asset
            } else {
                ItemType::Certificate
            },
            status: if i % 3 == 0 {
                Status::Inactive
            } else {
                Status::Active
            },
            last_updated: self.base + Duration::minutes(minutes),
        }
    }
}

impl Provider for Generator {
    fn list(&self, count: usize) -> Vec<Record> {
        let n = std::cmp::min(count, self.size) as u64;
        (1..=n).map(|id| self.record(id)).collect()
    }

    fn get_by_id(&self, id: u64) -> Option<Record> {
        if id < 1 || id > self.size as u64 {
            return None;
        }
        Some(self.record(id))
    }
}

#[derive(Debug)]
enum FileType {
    Csv,
    Parquet,
    Arrow,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

/// The in-memory raw collection together with the name shown in the title.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    records: Arc<Vec<Record>>,
}

impl Dataset {
    pub fn from_records(name: impl Into<String>, mut records: Vec<Record>) -> Result<Self, IvError> {
        records.sort_by_key(|r| r.id);
        let mut seen = HashSet::with_capacity(records.len());
        for r in records.iter() {
            if r.id < 1 {
                return Err(IvError::LoadingFailed(format!("invalid id {}", r.id)));
            }
            if !seen.insert(r.id) {
                return Err(IvError::LoadingFailed(format!("duplicate id {}", r.id)));
            }
        }
        Ok(Self {
            name: name.into(),
            records: Arc::new(records),
        })
    }

    pub fn generate(count: usize) -> Self {
        let records = Generator::new(count).list(count);
        info!("Generated {} records", records.len());
        Self {
            name: format!("generated[{count}]"),
            records: Arc::new(records),
        }
    }

    pub fn records(&self) -> &Arc<Vec<Record>> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn load_data_file(path: PathBuf) -> Result<Self, IvError> {
        let file_info = Dataset::get_file_info(path)?;
        debug!("Loading {:?}", file_info);
        let frame = match file_info.file_type {
            FileType::Csv => Dataset::load_csv(&file_info.path)?,
            FileType::Parquet => Dataset::load_parquet(&file_info.path)?,
            FileType::Arrow => Dataset::load_arrow(&file_info.path)?,
        };

        let start_time = Instant::now();
        let df = frame.collect()?;
        let records = Dataset::records_from_frame(&df)?;
        info!(
            "Loading {} records ({} bytes) took {}ms ...",
            records.len(),
            file_info.file_size,
            start_time.elapsed().as_millis()
        );

        let name = file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();
        Dataset::from_records(name, records)
    }

    fn records_from_frame(df: &DataFrame) -> Result<Vec<Record>, IvError> {
        let columns = COLUMN_NAMES[..4]
            .iter()
            .map(|name| Dataset::load_column(df, name))
            .collect::<Result<Vec<_>, _>>()?;
        let timestamps = Dataset::load_timestamps(df, COLUMN_NAMES[4])?;

        (0..df.height())
            .map(|row| {
                let cell = |c: usize| columns[c][row].as_str();
                Dataset::parse_record(
                    row,
                    cell(0),
                    cell(1),
                    cell(2),
                    cell(3),
                    timestamps[row].clone(),
                )
            })
            .collect()
    }

    fn parse_record(
        row: usize,
        id: &str,
        name: &str,
        item_type: &str,
        status: &str,
        last_updated: Result<DateTime<Utc>, String>,
    ) -> Result<Record, IvError> {
        let fail = |what: String| IvError::LoadingFailed(format!("row {}: {}", row + 1, what));
        Ok(Record {
            id: id
                .trim()
                .parse()
                .map_err(|_| fail(format!("invalid id \"{id}\"")))?,
            name: name.to_string(),
            item_type: item_type.parse().map_err(fail)?,
            status: status.parse().map_err(fail)?,
            last_updated: last_updated.map_err(fail)?,
        })
    }

    fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
        DateTime::parse_from_rfc3339(value.trim())
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|e| format!("invalid timestamp \"{value}\": {e}"))
    }

    fn missing_column(col_name: &str) -> IvError {
        IvError::LoadingFailed(format!("missing column \"{col_name}\""))
    }

    fn load_column(df: &DataFrame, col_name: &str) -> Result<Vec<String>, IvError> {
        let col = df
            .column(col_name)
            .map_err(|_| Dataset::missing_column(col_name))?
            .cast(&DataType::String)?;
        let series = col.str()?;
        Ok(series
            .into_iter()
            .map(|value| value.unwrap_or_default().to_string())
            .collect())
    }

    /// Columnar formats carry typed timestamps, text formats RFC 3339 strings.
    fn load_timestamps(
        df: &DataFrame,
        col_name: &str,
    ) -> Result<Vec<Result<DateTime<Utc>, String>>, IvError> {
        let col = df
            .column(col_name)
            .map_err(|_| Dataset::missing_column(col_name))?;
        let (col, unit) = match col.dtype() {
            DataType::Datetime(unit, _) => (col.clone(), *unit),
            DataType::Date => (
                col.cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?,
                TimeUnit::Milliseconds,
            ),
            _ => {
                return Ok(Dataset::load_column(df, col_name)?
                    .iter()
                    .map(|value| Dataset::parse_timestamp(value))
                    .collect());
            }
        };
        debug!("Reading {} as {:?} timestamps", col_name, unit);

        // Physical values count `unit`s since the epoch in UTC
        let ticks = col.cast(&DataType::Int64)?;
        Ok(ticks
            .i64()?
            .into_iter()
            .map(|value| {
                let value = value.ok_or_else(|| "missing timestamp".to_string())?;
                let ts = match unit {
                    TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
                    TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
                    TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
                };
                ts.ok_or_else(|| format!("timestamp {value} out of range"))
            })
            .collect())
    }

    fn detect_file_type(path: &Path) -> Result<FileType, IvError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::Csv),
            Some("PARQUET") | Some("PQ") => Ok(FileType::Parquet),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::Arrow),
            _ => Err(IvError::UnknownFileType),
        }
    }

    fn get_file_info(path: PathBuf) -> Result<FileInfo, IvError> {
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => IvError::FileNotFound,
            ErrorKind::PermissionDenied => IvError::PermissionDenied,
            _ => IvError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(IvError::LoadingFailed("Not a file!".into()));
        }

        let file_size = metadata.len();
        let file_type = Dataset::detect_file_type(&path)?;

        Ok(FileInfo {
            path,
            file_size,
            file_type,
        })
    }

    fn load_csv(path: &Path) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
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
}

impl Provider for Dataset {
    fn list(&self, count: usize) -> Vec<Record> {
        self.records.iter().take(count).cloned().collect()
    }

    fn get_by_id(&self, id: u64) -> Option<Record> {
        self.records
            .binary_search_by_key(&id, |r| r.id)
            .ok()
            .map(|idx| self.records[idx].clone())
    }
}
