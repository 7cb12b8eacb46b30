//! Loading of contract creation bytecode from compilation artifacts

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use alloy_primitives::{hex::FromHex, Bytes};
use serde_json::Value;
use tracing::debug;

use crate::{
    constants::{ARTIFACT_EXTENSION, FOUNDRY_SOURCE_DIR_EXTENSION},
    errors::DeployError,
};

/// The creation bytecode of every contract a run may deploy, keyed by contract name
#[derive(Clone, Debug, Default)]
pub struct ArtifactStore {
    /// Creation bytecode keyed by contract name
    bytecodes: HashMap<String, Bytes>,
}

impl ArtifactStore {
    /// Build a store from bytecode already in memory
    pub fn from_bytecodes<I, S>(bytecodes: I) -> Self
    where
        I: IntoIterator<Item = (S, Bytes)>,
        S: Into<String>,
    {
        Self {
            bytecodes: bytecodes
                .into_iter()
                .map(|(name, code)| (name.into(), code))
                .collect(),
        }
    }

    /// Load the named contracts from an artifacts directory.
    ///
    /// Both Foundry (`<Name>.sol/<Name>.json`) and Hardhat (`<Name>.json`)
    /// layouts are accepted.
    pub fn load_dir<'a>(
        root: &Path,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<Self, DeployError> {
        let mut bytecodes = HashMap::new();
        for name in names {
            let path = find_artifact(root, name)?;
            debug!("loading {name} bytecode from {}", path.display());
            bytecodes.insert(name.to_string(), parse_artifact(&path)?);
        }

        Ok(Self { bytecodes })
    }

    /// The creation bytecode of the named contract
    pub fn bytecode(&self, name: &str) -> Result<Bytes, DeployError> {
        self.bytecodes
            .get(name)
            .cloned()
            .ok_or_else(|| DeployError::ArtifactParsing(format!("no artifact for {name}")))
    }
}

/// Locate the artifact file for a contract under `root`
fn find_artifact(root: &Path, name: &str) -> Result<PathBuf, DeployError> {
    let artifact_file = format!("{name}.{ARTIFACT_EXTENSION}");
    let candidates = [
        root.join(format!("{name}.{FOUNDRY_SOURCE_DIR_EXTENSION}"))
            .join(&artifact_file),
        root.join(&artifact_file),
    ];

    candidates
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| {
            DeployError::ArtifactParsing(format!(
                "no artifact for {name} under {}",
                root.display()
            ))
        })
}

/// Extract the creation bytecode from an artifact file
fn parse_artifact(path: &Path) -> Result<Bytes, DeployError> {
    let contents =
        fs::read_to_string(path).map_err(|e| DeployError::ArtifactParsing(e.to_string()))?;
    parse_artifact_json(&contents)
        .map_err(|e| DeployError::ArtifactParsing(format!("{}: {}", path.display(), e)))
}

/// Extract the creation bytecode from an artifact's JSON.
///
/// Foundry nests the bytecode under `bytecode.object`, Hardhat stores it
/// directly under `bytecode`.
pub fn parse_artifact_json(contents: &str) -> Result<Bytes, String> {
    let artifact: Value = serde_json::from_str(contents).map_err(|e| e.to_string())?;
    let bytecode = match &artifact["bytecode"] {
        Value::String(code) => code.as_str(),
        Value::Object(object) => object
            .get("object")
            .and_then(Value::as_str)
            .ok_or("missing `bytecode.object`")?,
        _ => return Err("missing `bytecode`".to_string()),
    };

    let bytecode = Bytes::from_hex(bytecode).map_err(|e| e.to_string())?;
    if bytecode.is_empty() {
        return Err("empty bytecode".to_string());
    }

    Ok(bytecode)
}
