// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Imported tabular datasets
//!
//! The most recently imported dataset is kept as `last_uploaded_file.csv`
//! inside the upload directory so that it can be viewed again later.

use std::{
    fmt::Write as _,
    fs, io,
    path::{Path, PathBuf},
};

use calamine::Reader as _;
use thiserror::Error;

/// File name of the persisted dataset inside the upload directory.
pub const LAST_UPLOADED_FILE: &str = "last_uploaded_file.csv";

/// Number of rows shown after an import or reload.
pub const PREVIEW_ROWS: usize = 5;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("no dataset has been stored yet")]
    NotFound,

    #[error("unsupported file format: {filename}")]
    UnsupportedFormat { filename: String },

    #[error("the workbook contains no worksheet")]
    NoWorksheet,

    #[error(transparent)]
    Spreadsheet(#[from] calamine::Error),

    #[error("the file contains no header row")]
    Empty,

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// A table of strings with a header row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Dataset {
    fn from_reader<R: io::Read>(reader: R) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(ToOwned::to_owned).collect();
        if headers.is_empty() {
            return Err(DatasetError::Empty);
        }
        let rows: Vec<Vec<String>> = reader
            .records()
            .map(|record| {
                record.map(|record| record.iter().map(ToOwned::to_owned).collect::<Vec<_>>())
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { headers, rows })
    }

    /// Decode CSV with a mandatory header row.
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, DatasetError> {
        Self::from_reader(bytes)
    }

    /// Decode the first worksheet of an XLSX/XLS/ODS workbook.
    ///
    /// The first row holds the headers. Cells are kept in their textual
    /// form, empty cells become empty strings.
    pub fn from_spreadsheet_bytes(bytes: &[u8]) -> Result<Self, DatasetError> {
        let mut workbook = calamine::open_workbook_auto_from_rs(io::Cursor::new(bytes.to_vec()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(DatasetError::NoWorksheet)??;
        let mut rows = range
            .rows()
            .map(|row| row.iter().map(ToString::to_string).collect::<Vec<_>>());
        let headers = rows.next().ok_or(DatasetError::Empty)?;
        if headers.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(Self {
            headers,
            rows: rows.collect(),
        })
    }

    fn write_csv<W: io::Write>(&self, writer: W) -> Result<(), DatasetError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Render the first `n` rows as a right aligned table with a row index.
    #[must_use]
    pub fn preview(&self, n: usize) -> String {
        let rows = &self.rows[..n.min(self.rows.len())];
        let index_width = rows.len().saturating_sub(1).to_string().len();
        let widths: Vec<usize> = self
            .headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                rows.iter()
                    .filter_map(|row| row.get(col))
                    .map(|cell| cell.chars().count())
                    .fold(header.chars().count(), usize::max)
            })
            .collect();

        let mut out = String::new();
        let _ = write!(out, "{:index_width$}", "");
        for (header, width) in self.headers.iter().zip(&widths) {
            let _ = write!(out, "  {header:>width$}");
        }
        for (index, row) in rows.iter().enumerate() {
            let _ = write!(out, "\n{index:>index_width$}");
            for (col, width) in widths.iter().enumerate() {
                let cell = row.get(col).map_or("", String::as_str);
                let _ = write!(out, "  {cell:>width$}");
            }
        }
        out
    }
}

/// Persists the last imported dataset in a directory.
#[derive(Debug, Clone)]
pub struct DatasetStore {
    dir: PathBuf,
}

impl DatasetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn last_path(&self) -> PathBuf {
        self.dir.join(LAST_UPLOADED_FILE)
    }

    /// Replace the stored dataset.
    ///
    /// The directory is created on demand. The new content is written to a
    /// temporary file first and renamed over the previous dataset.
    pub fn save(&self, dataset: &Dataset) -> Result<(), DatasetError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.last_path();
        let tmp_path = path.with_extension("csv.tmp");
        dataset.write_csv(fs::File::create(&tmp_path)?)?;
        fs::rename(&tmp_path, &path)?;
        log::info!("Stored dataset with {} rows in {}", dataset.rows.len(), path.display());
        Ok(())
    }

    pub fn load_last(&self) -> Result<Dataset, DatasetError> {
        let file = match fs::File::open(self.last_path()) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(DatasetError::NotFound);
            }
            Err(err) => return Err(err.into()),
        };
        Dataset::from_reader(io::BufReader::new(file))
    }

    /// Decode an uploaded file by its name and store it.
    pub fn import(&self, filename: &str, bytes: &[u8]) -> Result<Dataset, DatasetError> {
        let name = filename.to_ascii_lowercase();
        if name.contains("csv") {
            log::debug!("Importing {filename} as CSV");
            let dataset = Dataset::from_csv_bytes(bytes)?;
            self.save(&dataset)?;
            Ok(dataset)
        } else if name.contains("xls") {
            log::debug!("Importing {filename} as spreadsheet");
            let dataset = Dataset::from_spreadsheet_bytes(bytes)?;
            self.save(&dataset)?;
            Ok(dataset)
        } else {
            Err(DatasetError::UnsupportedFormat {
                filename: filename.to_owned(),
            })
        }
    }
}
