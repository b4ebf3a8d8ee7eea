use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::error::{Error, Result};

/// Supplies the raw export document of a trace.
pub trait TraceSource {
    fn fetch(&self, trace_id: &str) -> Result<Value>;
}

/// Export documents stored as `<root>/<trace_id>.json`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, trace_id: &str) -> Result<PathBuf> {
        trace_file(&self.root, trace_id)
    }

    /// Trace ids of every `*.json` file in the directory, sorted.
    pub fn trace_ids(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root).map_err(|source| Error::Io {
            path: self.root.clone(),
            source,
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| Error::Io {
                    path: self.root.clone(),
                    source,
                })?
                .path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                ids.push(stem.to_owned());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

impl TraceSource for DirectorySource {
    fn fetch(&self, trace_id: &str) -> Result<Value> {
        let path = self.path_for(trace_id)?;
        let data = fs::read_to_string(&path).map_err(|source| match source.kind() {
            ErrorKind::NotFound => Error::TraceNotFound(trace_id.to_owned()),
            _ => Error::Io { path, source },
        })?;
        Ok(serde_json::from_str(&data)?)
    }
}

/// `<root>/<trace_id>.json`, for ids that name a single file inside `root`.
pub(crate) fn trace_file(root: &Path, trace_id: &str) -> Result<PathBuf> {
    let invalid = trace_id.is_empty()
        || trace_id == "."
        || trace_id == ".."
        || trace_id.contains(['/', '\\', '\0']);
    if invalid {
        return Err(Error::InvalidTraceId(trace_id.to_owned()));
    }
    Ok(root.join(format!("{trace_id}.json")))
}

impl TraceSource for HashMap<String, Value> {
    fn fetch(&self, trace_id: &str) -> Result<Value> {
        self.get(trace_id)
            .cloned()
            .ok_or_else(|| Error::TraceNotFound(trace_id.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_documents_by_trace_id() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("t2.json"), r#"{"batches": []}"#).unwrap();
        fs::write(dir.path().join("t1.json"), r#"{"batches": []}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = DirectorySource::new(dir.path());
        assert_eq!(source.trace_ids().unwrap(), vec!["t1", "t2"]);
        assert_eq!(source.fetch("t1").unwrap(), serde_json::json!({"batches": []}));
    }

    #[test]
    fn missing_trace() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirectorySource::new(dir.path());
        assert!(matches!(source.fetch("nope"), Err(Error::TraceNotFound(id)) if id == "nope"));
    }

    #[test]
    fn trace_ids_stay_inside_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let traces = dir.path().join("traces");
        fs::create_dir(&traces).unwrap();
        fs::write(dir.path().join("secret.json"), r#"{"batches": []}"#).unwrap();

        let source = DirectorySource::new(&traces);
        for id in ["../secret", "..", "a/b", "a\\b", ""] {
            assert!(
                matches!(source.fetch(id), Err(Error::InvalidTraceId(bad)) if bad == id),
                "{id:?}"
            );
        }
        assert_eq!(
            source.path_for("5b8efff7..c60c").unwrap(),
            traces.join("5b8efff7..c60c.json")
        );
    }

    #[test]
    fn invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bad.json"), "{").unwrap();
        let source = DirectorySource::new(dir.path());
        assert!(matches!(source.fetch("bad"), Err(Error::Json(_))));
    }
}
