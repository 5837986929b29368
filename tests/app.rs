use std::collections::HashMap;
use std::io::Cursor;
use std::sync::Mutex;

use camino::{Utf8Path, Utf8PathBuf};

use nyc_treemap::app::{App, SpeciesRunSummary, TreeRunSummary};
use nyc_treemap::config::Settings;
use nyc_treemap::domain::{SpeciesId, SpeciesRecord, TreeId};
use nyc_treemap::error::TreemapError;
use nyc_treemap::image::ImageClient;
use nyc_treemap::output::{CsvRowWriter, SPECIES_HEADER, TREE_HEADER};
use nyc_treemap::treemap::TreemapClient;

/// Ids absent from both tables answer with a 500.
#[derive(Default)]
struct MockTreemap {
    trees: HashMap<u32, Option<SpeciesRecord>>,
    species: HashMap<u32, Option<SpeciesRecord>>,
    calls: Mutex<Vec<u32>>,
}

impl MockTreemap {
    fn lookup(
        &self,
        table: &HashMap<u32, Option<SpeciesRecord>>,
        id: u32,
    ) -> Result<Option<SpeciesRecord>, TreemapError> {
        self.calls.lock().unwrap().push(id);
        match table.get(&id) {
            Some(record) => Ok(record.clone()),
            None => Err(TreemapError::ApiStatus {
                status: 500,
                message: "internal error".to_string(),
            }),
        }
    }

    fn calls(&self) -> Vec<u32> {
        self.calls.lock().unwrap().clone()
    }
}

impl TreemapClient for MockTreemap {
    fn fetch_tree_species(&self, id: &TreeId) -> Result<Option<SpeciesRecord>, TreemapError> {
        self.lookup(&self.trees, id.get())
    }

    fn fetch_species(&self, id: &SpeciesId) -> Result<Option<SpeciesRecord>, TreemapError> {
        self.lookup(&self.species, id.get())
    }
}

#[derive(Default)]
struct MockImages {
    missing: Vec<String>,
    urls: Mutex<Vec<String>>,
}

impl ImageClient for MockImages {
    fn fetch_image(&self, url: &str, destination: &Utf8Path) -> Result<(), TreemapError> {
        self.urls.lock().unwrap().push(url.to_string());
        if self.missing.iter().any(|id| url.ends_with(&format!("/{id}.png"))) {
            return Err(TreemapError::ImageStatus { status: 404 });
        }
        std::fs::write(destination, b"\x89PNG")
            .map_err(|err| TreemapError::Filesystem(err.to_string()))
    }
}

fn species(common_name: &str, photo_id: &str) -> Option<SpeciesRecord> {
    Some(SpeciesRecord {
        common_name: common_name.to_string(),
        species_photo_id: photo_id.to_string(),
        ..SpeciesRecord::default()
    })
}

fn settings_in(root: &Utf8Path) -> Settings {
    Settings {
        image_url_template: "https://cdn.test/species/{photo_id}.png".to_string(),
        image_dir: root.join("images"),
        ..Settings::default()
    }
}

fn temp_root() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

fn run_trees<T: TreemapClient, I: ImageClient>(
    app: &App<T, I>,
    input: &str,
) -> (TreeRunSummary, String) {
    let mut writer = CsvRowWriter::new(Vec::new(), "memory", &TREE_HEADER).unwrap();
    let summary = app
        .run_trees(Cursor::new(input), Utf8Path::new("trees.txt"), &mut writer)
        .unwrap();
    let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    (summary, out)
}

fn run_species<T: TreemapClient, I: ImageClient>(
    app: &App<T, I>,
    input: &str,
) -> (SpeciesRunSummary, String) {
    let mut writer = CsvRowWriter::new(Vec::new(), "memory", &SPECIES_HEADER).unwrap();
    let summary = app
        .run_species(Cursor::new(input), Utf8Path::new("species.csv"), &mut writer)
        .unwrap();
    let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    (summary, out)
}

#[test]
fn trees_skip_lines_without_seven_digit_id() {
    let (_temp, root) = temp_root();
    let treemap = MockTreemap {
        trees: HashMap::from([(4417921, species("pin oak", "111"))]),
        ..MockTreemap::default()
    };
    let images = MockImages::default();
    let app = App::new(settings_in(&root), &treemap, &images);

    let input = "https://tree-map.nycgovparks.org/tree-map/tree/123456\n\
                 https://tree-map.nycgovparks.org/tree-map/tree/4417921\n\
                 https://tree-map.nycgovparks.org/tree-map/tree/not-a-tree\n\
                 https://tree-map.nycgovparks.org/tree-map/tree/12345678\n";
    let (summary, out) = run_trees(&app, input);

    assert_eq!(treemap.calls(), vec![4417921]);
    assert_eq!(
        summary,
        TreeRunSummary {
            lines_seen: 4,
            rows_written: 1
        }
    );
    let image = root.join("images").join("111_tmspecies.png");
    assert_eq!(
        out,
        format!("commonName,speciesPhotoId,imageFilePath\npin oak,111,{image}\n")
    );
    assert!(image.exists());
}

#[test]
fn trees_write_rows_without_images() {
    let (_temp, root) = temp_root();
    let treemap = MockTreemap {
        trees: HashMap::from([
            (1000001, species("ginkgo", "")),
            (1000002, species("pin oak", "gone")),
        ]),
        ..MockTreemap::default()
    };
    let images = MockImages {
        missing: vec!["gone".to_string()],
        ..MockImages::default()
    };
    let app = App::new(settings_in(&root), &treemap, &images);

    let (summary, out) = run_trees(&app, "1000001\n1000002\n");

    assert_eq!(summary.rows_written, 2);
    assert_eq!(
        out,
        "commonName,speciesPhotoId,imageFilePath\nginkgo,,\npin oak,gone,\n"
    );
    // Only the non-empty photo id reaches the CDN.
    assert_eq!(images.urls.lock().unwrap().len(), 1);
}

#[test]
fn trees_drop_failed_metadata_fetches() {
    let (_temp, root) = temp_root();
    let treemap = MockTreemap {
        trees: HashMap::from([(2000002, None)]),
        ..MockTreemap::default()
    };
    let images = MockImages::default();
    let app = App::new(settings_in(&root), &treemap, &images);

    let (summary, out) = run_trees(&app, "2000001\n2000002\n");

    assert_eq!(treemap.calls(), vec![2000001, 2000002]);
    assert_eq!(summary.rows_written, 0);
    assert_eq!(out, "commonName,speciesPhotoId,imageFilePath\n");
}

#[test]
fn species_rows_need_an_image() {
    let (_temp, root) = temp_root();
    let treemap = MockTreemap {
        species: HashMap::from([
            (31, species("white oak", "quercus-alba")),
            (32, species("sugar maple (cultivar)", "missing-photo")),
            (33, species("london planetree", "")),
            (34, None),
        ]),
        ..MockTreemap::default()
    };
    let images = MockImages {
        missing: vec!["missing-photo".to_string()],
        ..MockImages::default()
    };
    let app = App::new(settings_in(&root), &treemap, &images);

    let input = "speciesId,note\n31,a\n,empty\n32,b\n33,c\n34,d\n35,e\nabc,f\n";
    let (summary, out) = run_species(&app, input);

    assert_eq!(treemap.calls(), vec![31, 32, 33, 34, 35]);
    assert_eq!(
        summary,
        SpeciesRunSummary {
            rows_seen: 7,
            rows_written: 1,
            fetched_but_not_written: 3,
        }
    );
    let image = root.join("images").join("quercus-alba_tmspecies.png");
    assert_eq!(
        out,
        format!(
            "commonName,imageFilePath,url\n\
             White Oak,{image},https://tree-map.nycgovparks.org/tree-map/species/31\n"
        )
    );
}

#[test]
fn species_without_id_column_writes_only_header() {
    let (_temp, root) = temp_root();
    let treemap = MockTreemap::default();
    let images = MockImages::default();
    let app = App::new(settings_in(&root), &treemap, &images);

    let (summary, out) = run_species(&app, "id\n31\n32\n");

    assert!(treemap.calls().is_empty());
    assert_eq!(summary.rows_seen, 2);
    assert_eq!(summary.rows_written, 0);
    assert_eq!(out, "commonName,imageFilePath,url\n");
}

#[test]
fn species_rerun_overwrites_outputs() {
    let (_temp, root) = temp_root();
    let input = root.join("species_ids.csv");
    let output = root.join("tree_data.csv");
    std::fs::write(&input, "speciesId\n31\n").unwrap();

    let treemap = MockTreemap {
        species: HashMap::from([(31, species("white oak", "quercus-alba"))]),
        ..MockTreemap::default()
    };
    let images = MockImages::default();
    let app = App::new(settings_in(&root), &treemap, &images);

    let first = app.process_species_file(&input, &output).unwrap();
    let first_csv = std::fs::read_to_string(&output).unwrap();
    let second = app.process_species_file(&input, &output).unwrap();
    let second_csv = std::fs::read_to_string(&output).unwrap();

    assert_eq!(first, second);
    assert_eq!(first_csv, second_csv);
    assert_eq!(first_csv.lines().count(), 2);
    assert_eq!(images.urls.lock().unwrap().len(), 2);
    assert!(root.join("images/quercus-alba_tmspecies.png").exists());
}

#[test]
fn missing_input_file_is_fatal() {
    let (_temp, root) = temp_root();
    let treemap = MockTreemap::default();
    let images = MockImages::default();
    let app = App::new(settings_in(&root), &treemap, &images);

    let err = app
        .process_tree_file(&root.join("nope.txt"), &root.join("out.csv"))
        .unwrap_err();
    assert!(matches!(err, TreemapError::Input { .. }));
}

#[test]
fn trees_continue_past_undecodable_line() {
    let (_temp, root) = temp_root();
    let treemap = MockTreemap {
        trees: HashMap::from([(4417921, species("pin oak", ""))]),
        ..MockTreemap::default()
    };
    let images = MockImages::default();
    let app = App::new(settings_in(&root), &treemap, &images);

    let mut input = b"https://tree-map.nycgovparks.org/tree-map/tree/\xff\xfe\n".to_vec();
    input.extend_from_slice(b"https://tree-map.nycgovparks.org/tree-map/tree/4417921\n");
    let mut writer = CsvRowWriter::new(Vec::new(), "memory", &TREE_HEADER).unwrap();
    let summary = app
        .run_trees(Cursor::new(input), Utf8Path::new("trees.txt"), &mut writer)
        .unwrap();
    let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();

    assert_eq!(treemap.calls(), vec![4417921]);
    assert_eq!(
        summary,
        TreeRunSummary {
            lines_seen: 2,
            rows_written: 1
        }
    );
    assert_eq!(out, "commonName,speciesPhotoId,imageFilePath\npin oak,,\n");
}
