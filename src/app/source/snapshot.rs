use std::fmt;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub(crate) enum Strategy {
    Chaining,
    LinearProbing,
    QuadraticProbing,
    DoubleHashing,
    Other(String),
}

impl Strategy {
    pub(crate) fn label(&self) -> &str {
        match self {
            Self::Chaining => "CHAINING",
            Self::LinearProbing => "LINEAR_PROBING",
            Self::QuadraticProbing => "QUADRATIC_PROBING",
            Self::DoubleHashing => "DOUBLE_HASHING",
            Self::Other(name) => name.as_str(),
        }
    }

    pub(crate) fn is_chaining(&self) -> bool {
        matches!(self, Self::Chaining)
    }
}

impl From<String> for Strategy {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "CHAINING" => Self::Chaining,
            "LINEAR" | "LINEAR_PROBING" => Self::LinearProbing,
            "QUADRATIC" | "QUADRATIC_PROBING" => Self::QuadraticProbing,
            "DOUBLE" | "DOUBLE_HASHING" => Self::DoubleHashing,
            _ => Self::Other(raw),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Bucket {
    Empty,
    Chain(Vec<String>),
    Occupied(String),
    Tombstone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Snapshot {
    pub(crate) strategy: Strategy,
    pub(crate) table_size: usize,
    pub(crate) inserted: u64,
    pub(crate) collisions: u64,
    pub(crate) probes: u64,
    pub(crate) buckets: Vec<Bucket>,
}

impl Snapshot {
    pub(crate) fn summary(&self) -> String {
        format!(
            "Strategy: {}  | size: {}  | inserted: {}  | collisions: {}  | probes: {}",
            self.strategy, self.table_size, self.inserted, self.collisions, self.probes
        )
    }
}

#[derive(Debug, Error)]
pub(crate) enum DecodeError {
    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("table_size must be positive")]
    ZeroTableSize,
    #[error("expected {expected} buckets, found {found}")]
    BucketCount { expected: usize, found: usize },
    #[error("bucket {index}: {reason}")]
    Bucket { index: usize, reason: &'static str },
}

#[derive(Deserialize)]
struct RawSnapshot {
    strategy: Strategy,
    table_size: usize,
    inserted: u64,
    collisions: u64,
    probes: u64,
    buckets: Vec<Value>,
}

pub(crate) fn decode_snapshot(raw: &str) -> Result<Snapshot, DecodeError> {
    let parsed: RawSnapshot = serde_json::from_str(raw)?;
    if parsed.table_size == 0 {
        return Err(DecodeError::ZeroTableSize);
    }
    if parsed.buckets.len() != parsed.table_size {
        return Err(DecodeError::BucketCount {
            expected: parsed.table_size,
            found: parsed.buckets.len(),
        });
    }

    let chaining = parsed.strategy.is_chaining();
    let buckets = parsed
        .buckets
        .iter()
        .enumerate()
        .map(|(index, value)| {
            let bucket = if chaining {
                chain_bucket(value)
            } else {
                open_bucket(value)
            };
            bucket.map_err(|reason| DecodeError::Bucket { index, reason })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Snapshot {
        strategy: parsed.strategy,
        table_size: parsed.table_size,
        inserted: parsed.inserted,
        collisions: parsed.collisions,
        probes: parsed.probes,
        buckets,
    })
}

fn chain_bucket(value: &Value) -> Result<Bucket, &'static str> {
    match value {
        Value::Null => Ok(Bucket::Empty),
        Value::Array(entries) => entries
            .iter()
            .map(|entry| scalar_label(entry).ok_or("chain entries must be scalars"))
            .collect::<Result<Vec<_>, _>>()
            .map(Bucket::Chain),
        _ => Err("chaining buckets must be null or an array"),
    }
}

fn open_bucket(value: &Value) -> Result<Bucket, &'static str> {
    match value {
        Value::Null => Ok(Bucket::Empty),
        Value::Object(fields) => match fields.get("deleted") {
            Some(Value::Bool(true)) => Ok(Bucket::Tombstone),
            _ => Err("object slots must be {\"deleted\": true}"),
        },
        other => scalar_label(other)
            .map(Bucket::Occupied)
            .ok_or("open-addressing slots must be null, a scalar or a tombstone"),
    }
}

fn scalar_label(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
