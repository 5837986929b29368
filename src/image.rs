use std::fs::{self, File};
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, error};

use crate::error::TreemapError;

pub trait ImageClient {
    fn fetch_image(&self, url: &str, destination: &Utf8Path) -> Result<(), TreemapError>;
}

impl<I: ImageClient + ?Sized> ImageClient for &I {
    fn fetch_image(&self, url: &str, destination: &Utf8Path) -> Result<(), TreemapError> {
        (**self).fetch_image(url, destination)
    }
}

#[derive(Clone)]
pub struct ImageHttpClient {
    client: Client,
}

impl ImageHttpClient {
    pub fn new() -> Result<Self, TreemapError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("nyc-treemap/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| TreemapError::ImageHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| TreemapError::ImageHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl ImageClient for ImageHttpClient {
    fn fetch_image(&self, url: &str, destination: &Utf8Path) -> Result<(), TreemapError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|err| TreemapError::ImageHttp(err.to_string()))?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(TreemapError::ImageStatus {
                status: response.status().as_u16(),
            });
        }
        let mut file = File::create(destination)
            .map_err(|err| TreemapError::Filesystem(format!("create {destination}: {err}")))?;
        io::copy(&mut response, &mut file)
            .map_err(|err| TreemapError::Filesystem(format!("write {destination}: {err}")))?;
        Ok(())
    }
}

/// Result of one image download attempt.
#[derive(Debug)]
pub enum ImageOutcome {
    Saved(Utf8PathBuf),
    /// No photo id, nothing requested.
    Skipped,
    HttpError { status: u16 },
    IoError(TreemapError),
}

impl ImageOutcome {
    /// Path for the CSV cell; anything but a saved file becomes empty.
    pub fn into_path(self) -> String {
        match self {
            ImageOutcome::Saved(path) => path.into_string(),
            ImageOutcome::Skipped | ImageOutcome::HttpError { .. } | ImageOutcome::IoError(_) => {
                String::new()
            }
        }
    }
}

pub fn image_path(dir: &Utf8Path, photo_id: &str) -> Utf8PathBuf {
    dir.join(format!("{photo_id}_tmspecies.png"))
}

pub fn image_url(template: &str, photo_id: &str) -> String {
    template.replace("{photo_id}", photo_id)
}

pub struct ImageFetcher<'a, I: ImageClient> {
    client: &'a I,
    url_template: &'a str,
    dir: &'a Utf8Path,
}

impl<'a, I: ImageClient> ImageFetcher<'a, I> {
    pub fn new(client: &'a I, url_template: &'a str, dir: &'a Utf8Path) -> Self {
        Self {
            client,
            url_template,
            dir,
        }
    }

    pub fn download(&self, photo_id: &str) -> ImageOutcome {
        if photo_id.is_empty() {
            return ImageOutcome::Skipped;
        }
        if let Err(err) = fs::create_dir_all(self.dir) {
            let err = TreemapError::Filesystem(format!("create {}: {err}", self.dir));
            error!(photo_id, error = %err, "error downloading image");
            return ImageOutcome::IoError(err);
        }

        let url = image_url(self.url_template, photo_id);
        let destination = image_path(self.dir, photo_id);
        match self.client.fetch_image(&url, &destination) {
            Ok(()) => {
                debug!(photo_id, path = %destination, "image downloaded");
                ImageOutcome::Saved(destination)
            }
            Err(TreemapError::ImageStatus { status }) => {
                error!(photo_id, status, "image download failed");
                ImageOutcome::HttpError { status }
            }
            Err(err) => {
                error!(photo_id, error = %err, "error downloading image");
                ImageOutcome::IoError(err)
            }
        }
    }
}
