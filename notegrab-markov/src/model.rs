use notegrab_common::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// States of the chain. The variant order matters: `Start` sorts first so a
/// range starting at `(current, Start)` covers every successor of `current`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MarkovToken {
    Start,
    String(String),
    /// Just inside `$[name `; only ever a predecessor.
    FunctionStart(String),
    /// A whole `$[name ...]` block; as a predecessor, the point just after `]`.
    Function(String),
    End,
}

/// What a function call did with one parameter key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FunctionParamValue {
    /// Key not given.
    None,
    /// Key given without `=value`.
    ValueIsNull,
    Value(String),
}

/// Serialized model. Kept as flat lists so the JSON stays portable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkovData {
    /// `(previous, next, count)`
    pub token_map: Vec<(MarkovToken, MarkovToken, usize)>,
    /// `(function, key, value, count)`
    pub function_param_map: Vec<(String, String, FunctionParamValue, usize)>,
}

impl MarkovData {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec(self)?)?;
        Ok(())
    }
}
