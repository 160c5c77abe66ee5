use std::path::PathBuf;

use serde::Deserialize;

use crate::dataset::DEFAULT_DATASET_PATH;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub dataset_path: PathBuf,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
        }
    }
}
