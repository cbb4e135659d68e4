//! CSV exports of measurement data.

pub mod query;

use diesel::{connection::DefaultLoadingMode, prelude::*};
use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::{
    errors::{AppError, AppResult},
    i18n::Language,
    models::measurement::MeasurementRecord,
    security::random_token,
};
pub use query::{BuiltQuery, ExportQuery, RangeEnd};

/// Header of the fixed columns, before the per-channel labels.
pub const FIXED_HEADER: [&str; 5] = ["timestamp", "node_id", "longitude", "latitude", "gps error"];

/// Search links are announced as valid for this long.
pub const SEARCH_LINK_VALIDITY_HOURS: i64 = 24;

/// Notification links are announced as valid for this long.
pub const NOTIFICATION_LINK_VALIDITY_DAYS: i64 = 3;

/// A finished, non-empty export.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub path: PathBuf,
    /// path relative to the site root, e.g. `/dataset/<token>.csv`
    pub link: String,
    pub rows: usize,
}

/// Writes export files into the dataset directory served under
/// `url_prefix`.
#[derive(Debug, Clone)]
pub struct CsvExporter {
    dir: PathBuf,
    url_prefix: String,
}

impl CsvExporter {
    pub fn new(dir: impl Into<PathBuf>, url_prefix: &str) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the dataset directory if needed.
    pub fn prepare(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }

    /// Runs `query` and streams its rows into a new CSV file.
    ///
    /// An empty result removes the file again and returns
    /// `AppError::EmptyResult`. Any failure while writing also removes it.
    pub fn export(
        &self,
        conn: &mut SqliteConnection,
        query: &ExportQuery,
        lang: Language,
    ) -> AppResult<ExportFile> {
        let (path, file) = self.create_unique_file()?;

        let outcome = write_rows(conn, query, lang, file);
        match outcome {
            Ok(0) => {
                discard(&path);
                Err(AppError::EmptyResult)
            }
            Ok(rows) => {
                let link = format!("{}/{}", self.url_prefix, file_name(&path));
                tracing::info!(rows = rows, file = %path.display(), "Export written");
                Ok(ExportFile { path, link, rows })
            }
            Err(e) => {
                tracing::error!(error = %e, file = %path.display(), "Export failed");
                discard(&path);
                Err(e)
            }
        }
    }

    /// Opens a file named after a fresh random token, retrying until the
    /// name is not taken.
    fn create_unique_file(&self) -> AppResult<(PathBuf, File)> {
        loop {
            let path = self.dir.join(format!("{}.csv", random_token::<20>()));
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => return Ok((path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    log::debug!("Export name {} taken, retrying", path.display());
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn write_rows(
    conn: &mut SqliteConnection,
    query: &ExportQuery,
    lang: Language,
    file: File,
) -> AppResult<usize> {
    let mut writer = csv::Writer::from_writer(file);

    let mut header: Vec<&str> = FIXED_HEADER.to_vec();
    header.extend(query.channels().iter().map(|c| c.label(lang)));
    writer.write_record(&header)?;

    let mut rows = 0;
    let records = query
        .build()
        .into_boxed()
        .load_iter::<MeasurementRecord, DefaultLoadingMode>(conn)?;
    for record in records {
        writer.write_record(record?.to_csv_record(query.channels()))?;
        rows += 1;
    }

    writer.flush()?;
    Ok(rows)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        log::warn!("Could not remove export {}: {}", path.display(), e);
    }
}
