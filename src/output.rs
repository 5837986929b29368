use std::fs::File;
use std::io::Write;

use camino::Utf8Path;
use serde::Serialize;

use crate::error::TreemapError;

pub const TREE_HEADER: [&str; 3] = ["commonName", "speciesPhotoId", "imageFilePath"];
pub const SPECIES_HEADER: [&str; 3] = ["commonName", "imageFilePath", "url"];

#[derive(Debug, Clone, Serialize)]
pub struct TreeRow {
    pub common_name: String,
    pub species_photo_id: String,
    pub image_file_path: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeciesRow {
    pub common_name: String,
    pub image_file_path: String,
    pub url: String,
}

/// Writes the header up front and flushes after every row.
pub struct CsvRowWriter<W: Write> {
    writer: csv::Writer<W>,
    label: String,
}

impl CsvRowWriter<File> {
    pub fn create(path: &Utf8Path, header: &[&str]) -> Result<Self, TreemapError> {
        let file = File::create(path).map_err(|err| TreemapError::Output {
            path: path.to_string(),
            message: err.to_string(),
        })?;
        Self::new(file, path.as_str(), header)
    }
}

impl<W: Write> CsvRowWriter<W> {
    pub fn new(inner: W, label: &str, header: &[&str]) -> Result<Self, TreemapError> {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        let mut row_writer = Self {
            writer,
            label: label.to_string(),
        };
        row_writer
            .writer
            .write_record(header)
            .map_err(|err| row_writer.output_error(err))?;
        row_writer.flush()?;
        Ok(row_writer)
    }

    pub fn write_row<T: Serialize>(&mut self, row: &T) -> Result<(), TreemapError> {
        self.writer
            .serialize(row)
            .map_err(|err| self.output_error(err))?;
        self.flush()
    }

    pub fn into_inner(self) -> Result<W, TreemapError> {
        let label = self.label;
        self.writer.into_inner().map_err(|err| TreemapError::Output {
            path: label,
            message: err.to_string(),
        })
    }

    fn flush(&mut self) -> Result<(), TreemapError> {
        self.writer.flush().map_err(|err| TreemapError::Output {
            path: self.label.clone(),
            message: err.to_string(),
        })
    }

    fn output_error(&self, err: csv::Error) -> TreemapError {
        TreemapError::Output {
            path: self.label.clone(),
            message: err.to_string(),
        }
    }
}
