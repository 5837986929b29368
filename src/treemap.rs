use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::domain::{SpeciesId, SpeciesRecord, TreeId};
use crate::error::TreemapError;

const TREE_QUERY: &str = r#"
query tree($id: Int!) {
  tree(id: $id) {
    id
    species {
      id
      scientificName
      commonName
      color
      speciesPhotoId
      mainSpeciesId
      cultivarName
      __typename
    }
  }
}
"#;

const SPECIES_QUERY: &str = r#"
query treeSpeciesById($id: Int!, $lang: String) {
  treeSpeciesById(id: $id, lang: $lang) {
    id
    scientificName
    commonName
    color
    description
    speciesPhotoId
    cultivarName
    __typename
  }
}
"#;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest {
    pub operation_name: &'static str,
    pub variables: Value,
    pub query: &'static str,
}

impl GraphqlRequest {
    pub fn tree(id: &TreeId) -> Self {
        Self {
            operation_name: "tree",
            variables: json!({ "id": id.get() }),
            query: TREE_QUERY,
        }
    }

    pub fn species(id: &SpeciesId) -> Self {
        Self {
            operation_name: "treeSpeciesById",
            variables: json!({ "id": id.get(), "lang": null }),
            query: SPECIES_QUERY,
        }
    }
}

pub trait TreemapClient {
    /// Species of the tree with the given id, or `None` when the API has none.
    fn fetch_tree_species(&self, id: &TreeId) -> Result<Option<SpeciesRecord>, TreemapError>;
    fn fetch_species(&self, id: &SpeciesId) -> Result<Option<SpeciesRecord>, TreemapError>;
}

impl<T: TreemapClient + ?Sized> TreemapClient for &T {
    fn fetch_tree_species(&self, id: &TreeId) -> Result<Option<SpeciesRecord>, TreemapError> {
        (**self).fetch_tree_species(id)
    }

    fn fetch_species(&self, id: &SpeciesId) -> Result<Option<SpeciesRecord>, TreemapError> {
        (**self).fetch_species(id)
    }
}

#[derive(Clone)]
pub struct TreemapHttpClient {
    client: Client,
    endpoint: String,
}

impl TreemapHttpClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, TreemapError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("nyc-treemap/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| TreemapError::ApiHttp(err.to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|err| TreemapError::ApiHttp(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    fn post(&self, request: &GraphqlRequest) -> Result<Value, TreemapError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .map_err(|err| TreemapError::ApiHttp(err.to_string()))?;
        if response.status() != reqwest::StatusCode::OK {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "tree map request failed".to_string());
            return Err(TreemapError::ApiStatus { status, message });
        }
        let body: Value = response
            .json()
            .map_err(|err| TreemapError::ApiDecode(err.to_string()))?;
        log_graphql_errors(request.operation_name, &body);
        Ok(body)
    }
}

impl TreemapClient for TreemapHttpClient {
    fn fetch_tree_species(&self, id: &TreeId) -> Result<Option<SpeciesRecord>, TreemapError> {
        let body = self.post(&GraphqlRequest::tree(id))?;
        debug!(tree_id = %id, "fetched tree data");
        Ok(tree_species(&body))
    }

    fn fetch_species(&self, id: &SpeciesId) -> Result<Option<SpeciesRecord>, TreemapError> {
        let body = self.post(&GraphqlRequest::species(id))?;
        debug!(species_id = %id, "fetched species data");
        Ok(species_by_id(&body))
    }
}

/// Extracts `data.tree.species` from a `tree` response.
pub fn tree_species(body: &Value) -> Option<SpeciesRecord> {
    body.get("data")
        .and_then(|value| value.get("tree"))
        .and_then(|value| value.get("species"))
        .and_then(species_from_value)
}

/// Extracts `data.treeSpeciesById` from a `treeSpeciesById` response.
pub fn species_by_id(body: &Value) -> Option<SpeciesRecord> {
    body.get("data")
        .and_then(|value| value.get("treeSpeciesById"))
        .and_then(species_from_value)
}

fn species_from_value(value: &Value) -> Option<SpeciesRecord> {
    if !value.is_object() {
        return None;
    }
    Some(SpeciesRecord {
        common_name: string_field(value, "commonName"),
        scientific_name: string_field(value, "scientificName"),
        species_photo_id: string_field(value, "speciesPhotoId"),
        cultivar_name: string_field(value, "cultivarName"),
    })
}

fn string_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => String::new(),
    }
}

fn log_graphql_errors(operation: &str, body: &Value) {
    let Some(errors) = body.get("errors").and_then(|value| value.as_array()) else {
        return;
    };
    for error in errors {
        let message = error
            .get("message")
            .and_then(|value| value.as_str())
            .unwrap_or("unknown error");
        warn!(operation, message, "graphql error in response");
    }
}
