use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::extract::BusinessHttpRequest;
use crate::source::trace_file;

/// The stored document for one trace: `{"data": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRequests<'a> {
    pub data: Cow<'a, [BusinessHttpRequest]>,
}

/// Keeps the extracted requests of each trace.
///
/// `upsert` replaces whatever was stored for the trace before.
pub trait RequestStore {
    fn upsert(&mut self, trace_id: &str, requests: &[BusinessHttpRequest]) -> Result<()>;
}

/// One JSON file per trace, `<root>/<trace_id>.json`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Opens the store, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| Error::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, trace_id: &str) -> Result<PathBuf> {
        trace_file(&self.root, trace_id)
    }

    pub fn load(&self, trace_id: &str) -> Result<Option<Vec<BusinessHttpRequest>>> {
        let path = self.path_for(trace_id)?;
        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(Error::Io { path, source }),
        };
        let stored: StoredRequests<'static> = serde_json::from_str(&data)?;
        Ok(Some(stored.data.into_owned()))
    }
}

impl RequestStore for DirectoryStore {
    fn upsert(&mut self, trace_id: &str, requests: &[BusinessHttpRequest]) -> Result<()> {
        let path = self.path_for(trace_id)?;
        let stored = StoredRequests {
            data: Cow::Borrowed(requests),
        };
        let data = serde_json::to_string_pretty(&stored)?;
        fs::write(&path, format!("{data}\n")).map_err(|source| Error::Io { path, source })
    }
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    traces: BTreeMap<String, Vec<BusinessHttpRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, trace_id: &str) -> Option<&[BusinessHttpRequest]> {
        self.traces.get(trace_id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

impl RequestStore for MemoryStore {
    fn upsert(&mut self, trace_id: &str, requests: &[BusinessHttpRequest]) -> Result<()> {
        self.traces.insert(trace_id.to_owned(), requests.to_vec());
        Ok(())
    }
}
