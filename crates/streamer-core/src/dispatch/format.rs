//! Batch source encodings.
//!
//! All four encodings share the [`TaskRecord`] schema. Document encodings
//! hold the records in a top-level `tasks` array; each element is decoded on
//! its own so one bad element does not sink the batch.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::task::{TaskDescriptor, TaskRecord};

/// Encoding of a batch source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFormat {
    /// One JSON object per line.
    Lines,
    /// JSON document with a `tasks` array.
    Json,
    /// TOML document with a `tasks` array of tables.
    Toml,
    /// YAML document with a `tasks` sequence.
    Yaml,
}

/// One record of a decoded batch source.
#[derive(Debug)]
pub struct DecodedRecord {
    /// 1-based line number for [`BatchFormat::Lines`], 1-based array position otherwise.
    pub position: usize,
    pub result: Result<TaskDescriptor>,
}

#[derive(Deserialize)]
struct TaskDocument<V> {
    #[serde(default = "Vec::new")]
    tasks: Vec<V>,
}

impl BatchFormat {
    /// Infer the encoding from a file extension. Unknown extensions are
    /// treated as line-delimited JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => Self::Json,
            Some("toml") => Self::Toml,
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Lines,
        }
    }

    /// Decode a raw source into an ordered list of records.
    ///
    /// The outer error means the document as a whole is unusable; per-record
    /// failures are reported inside the list. Line-delimited sources are split
    /// on raw bytes, so a line that is not valid UTF-8 only fails its own record.
    pub fn decode(self, source: impl AsRef<[u8]>) -> std::result::Result<Vec<DecodedRecord>, String> {
        let source = source.as_ref();
        match self {
            Self::Lines => Ok(decode_lines(source)),
            Self::Json => {
                let doc: TaskDocument<serde_json::Value> =
                    serde_json::from_str(utf8(source)?).map_err(|e| e.to_string())?;
                Ok(decode_elements(doc.tasks, |v| {
                    serde_json::from_value(v).map_err(|e| e.to_string())
                }))
            }
            Self::Toml => {
                let doc: TaskDocument<toml::Value> =
                    toml::from_str(utf8(source)?).map_err(|e| e.to_string())?;
                Ok(decode_elements(doc.tasks, |v| {
                    v.try_into::<TaskRecord>().map_err(|e| e.to_string())
                }))
            }
            Self::Yaml => {
                let doc: TaskDocument<serde_yaml::Value> =
                    serde_yaml::from_str(utf8(source)?).map_err(|e| e.to_string())?;
                Ok(decode_elements(doc.tasks, |v| {
                    serde_yaml::from_value(v).map_err(|e| e.to_string())
                }))
            }
        }
    }
}

fn utf8(source: &[u8]) -> std::result::Result<&str, String> {
    std::str::from_utf8(source).map_err(|e| format!("not valid UTF-8: {e}"))
}

fn decode_lines(source: &[u8]) -> Vec<DecodedRecord> {
    source
        .split(|&b| b == b'\n')
        .enumerate()
        .filter(|(_, line)| !line.trim_ascii().is_empty())
        .map(|(idx, line)| DecodedRecord {
            position: idx + 1,
            result: serde_json::from_slice::<TaskRecord>(line)
                .map_err(|e| Error::Decode(e.to_string()))
                .and_then(TaskDescriptor::try_from),
        })
        .collect()
}

fn decode_elements<V>(
    values: Vec<V>,
    decode: impl Fn(V) -> std::result::Result<TaskRecord, String>,
) -> Vec<DecodedRecord> {
    values
        .into_iter()
        .enumerate()
        .map(|(idx, value)| DecodedRecord {
            position: idx + 1,
            result: decode(value)
                .map_err(Error::Decode)
                .and_then(TaskDescriptor::try_from),
        })
        .collect()
}

impl FromStr for BatchFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lines" | "jsonl" | "ndjson" => Ok(Self::Lines),
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(format!(
                "unknown tasks format '{other}' (expected lines, json, toml or yaml)"
            )),
        }
    }
}

impl fmt::Display for BatchFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lines => "lines",
            Self::Json => "json",
            Self::Toml => "toml",
            Self::Yaml => "yaml",
        };
        f.write_str(name)
    }
}
