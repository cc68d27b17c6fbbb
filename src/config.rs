use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{error::Result, reconstruct::ReconstructionConfig, selection::TauSelection};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub reconstruction: ReconstructionConfig,
    pub selection: TauSelection,
}

impl Config {
    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}
