use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};

use camino::Utf8Path;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::domain::{SpeciesId, SpeciesRecord, extract_tree_id, format_name};
use crate::error::TreemapError;
use crate::image::{ImageClient, ImageFetcher};
use crate::output::{CsvRowWriter, SPECIES_HEADER, SpeciesRow, TREE_HEADER, TreeRow};
use crate::treemap::TreemapClient;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeRunSummary {
    pub lines_seen: usize,
    pub rows_written: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpeciesRunSummary {
    pub rows_seen: usize,
    pub rows_written: usize,
    pub fetched_but_not_written: usize,
}

#[derive(Debug, Deserialize)]
struct SpeciesInputRow {
    #[serde(rename = "speciesId", default)]
    species_id: Option<String>,
}

pub struct App<T: TreemapClient, I: ImageClient> {
    settings: Settings,
    treemap: T,
    images: I,
}

impl<T: TreemapClient, I: ImageClient> App<T, I> {
    pub fn new(settings: Settings, treemap: T, images: I) -> Self {
        Self {
            settings,
            treemap,
            images,
        }
    }

    pub fn process_tree_file(
        &self,
        input: &Utf8Path,
        output: &Utf8Path,
    ) -> Result<TreeRunSummary, TreemapError> {
        let file = open_input(input)?;
        let mut writer = CsvRowWriter::create(output, &TREE_HEADER)?;
        self.run_trees(BufReader::new(file), input, &mut writer)
    }

    /// Tree URLs in, one row per tree with a resolvable id. Rows are written
    /// even when no image could be saved.
    pub fn run_trees<R: BufRead, W: Write>(
        &self,
        input: R,
        label: &Utf8Path,
        writer: &mut CsvRowWriter<W>,
    ) -> Result<TreeRunSummary, TreemapError> {
        let fetcher = self.image_fetcher();
        let mut summary = TreeRunSummary::default();

        for raw in input.split(b'\n') {
            let raw = raw.map_err(|err| input_error(label, err))?;
            summary.lines_seen += 1;
            // Undecodable bytes become U+FFFD and fail the id parse below.
            let line = String::from_utf8_lossy(&raw);

            let Some(tree_id) = extract_tree_id(&line) else {
                debug!(line = line.trim(), "no tree id in line, skipping");
                continue;
            };
            let species = match self.treemap.fetch_tree_species(&tree_id) {
                Ok(Some(species)) => species,
                Ok(None) => {
                    warn!(tree_id = %tree_id, "no species data returned");
                    continue;
                }
                Err(err) => {
                    error!(tree_id = %tree_id, error = %err, "request for tree failed");
                    continue;
                }
            };

            let SpeciesRecord {
                common_name,
                species_photo_id,
                ..
            } = species;
            let image_file_path = fetcher.download(&species_photo_id).into_path();
            writer.write_row(&TreeRow {
                common_name,
                species_photo_id,
                image_file_path,
            })?;
            summary.rows_written += 1;
        }

        debug!(
            lines = summary.lines_seen,
            written = summary.rows_written,
            "finished tree file"
        );
        Ok(summary)
    }

    pub fn process_species_file(
        &self,
        input: &Utf8Path,
        output: &Utf8Path,
    ) -> Result<SpeciesRunSummary, TreemapError> {
        info!("Processing input file: {input}");
        let file = open_input(input)?;
        let mut writer = CsvRowWriter::create(output, &SPECIES_HEADER)?;
        let summary = self.run_species(file, input, &mut writer)?;
        info!("Finished processing. Output written to: {output}");
        info!("Lines parsed: {}", summary.rows_seen);
        info!("Trees written to CSV: {}", summary.rows_written);
        info!(
            "Trees fetched but not written: {}",
            summary.fetched_but_not_written
        );
        Ok(summary)
    }

    /// Species CSV in, one row per species that has a saved image.
    pub fn run_species<R: Read, W: Write>(
        &self,
        input: R,
        label: &Utf8Path,
        writer: &mut CsvRowWriter<W>,
    ) -> Result<SpeciesRunSummary, TreemapError> {
        let fetcher = self.image_fetcher();
        let mut summary = SpeciesRunSummary::default();
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(input);

        for record in reader.deserialize::<SpeciesInputRow>() {
            let row = match record {
                Ok(row) => row,
                Err(err) if err.is_io_error() => {
                    return Err(TreemapError::Input {
                        path: label.to_string(),
                        message: err.to_string(),
                    });
                }
                Err(err) => {
                    summary.rows_seen += 1;
                    warn!(error = %err, "unreadable row, skipping");
                    continue;
                }
            };
            summary.rows_seen += 1;

            let raw_id = match row.species_id.as_deref().map(str::trim) {
                Some(raw) if !raw.is_empty() => raw.to_string(),
                _ => {
                    warn!("Missing species_id in row, skipping.");
                    continue;
                }
            };
            let species_id: SpeciesId = match raw_id.parse() {
                Ok(id) => id,
                Err(err) => {
                    warn!(error = %err, "skipping row");
                    continue;
                }
            };

            let species = match self.treemap.fetch_species(&species_id) {
                Ok(Some(species)) => species,
                Ok(None) => {
                    summary.fetched_but_not_written += 1;
                    warn!(species_id = %species_id, "No species data for Species {species_id}");
                    continue;
                }
                Err(err) => {
                    error!(species_id = %species_id, error = %err, "request for species failed");
                    warn!("No data returned for Species {species_id}");
                    continue;
                }
            };

            let formatted_name = format_name(&species.common_name);
            info!("Parsing data for Species {species_id}: {formatted_name}");
            let image_file_path = fetcher.download(&species.species_photo_id).into_path();
            if image_file_path.is_empty() {
                summary.fetched_but_not_written += 1;
                warn!("No image found for Species {species_id}");
                continue;
            }

            writer.write_row(&SpeciesRow {
                common_name: formatted_name,
                image_file_path,
                url: self.settings.species_page_url(species_id),
            })?;
            summary.rows_written += 1;
        }

        Ok(summary)
    }

    fn image_fetcher(&self) -> ImageFetcher<'_, I> {
        ImageFetcher::new(
            &self.images,
            &self.settings.image_url_template,
            &self.settings.image_dir,
        )
    }
}

fn open_input(path: &Utf8Path) -> Result<File, TreemapError> {
    File::open(path).map_err(|err| input_error(path, err))
}

fn input_error(path: &Utf8Path, err: std::io::Error) -> TreemapError {
    TreemapError::Input {
        path: path.to_string(),
        message: err.to_string(),
    }
}
