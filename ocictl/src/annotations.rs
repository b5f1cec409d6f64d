//! Annotation override documents.
//!
//! A document maps subjects to annotations:
//!
//! ```json
//! {
//!   "$config":   { "key": "value" },
//!   "$manifest": { "key": "value" },
//!   "hi.txt":    { "key": "value" }
//! }
//! ```
//!
//! `$config` and `$manifest` address the manifest config and the manifest
//! itself. Every other subject is a file path, matched literally against the
//! path part of a file argument. The `$` prefix keeps the reserved names out
//! of the way of ordinary relative paths; a file literally named `$config`
//! still matches the config section.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ociclient::Annotations;
use serde::Deserialize;
use tracing::debug;

use crate::error::{CliError, Result};

/// Subject holding the manifest config's annotations
pub const CONFIG_SUBJECT: &str = "$config";
/// Subject holding the manifest's own annotations
pub const MANIFEST_SUBJECT: &str = "$manifest";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct AnnotationDocument {
    subjects: HashMap<String, Annotations>,
}

impl AnnotationDocument {
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading annotations from {:?}", path);
        let decode_error = |source| CliError::Decode {
            path: path.to_path_buf(),
            source,
        };

        let file = File::open(path).map_err(|e| decode_error(serde_json::Error::io(e)))?;
        let document: Self = serde_json::from_reader(BufReader::new(file)).map_err(decode_error)?;

        debug!("Loaded annotations for {} subject(s)", document.subjects.len());
        Ok(document)
    }

    /// No path means no document, which is not an error.
    pub fn load_optional(path: Option<&Path>) -> Result<Option<Self>> {
        path.map(Self::load).transpose()
    }

    pub fn config(&self) -> Option<&Annotations> {
        self.subjects.get(CONFIG_SUBJECT)
    }

    pub fn manifest(&self) -> Option<&Annotations> {
        self.subjects.get(MANIFEST_SUBJECT)
    }

    pub fn for_file(&self, path: &str) -> Option<&Annotations> {
        self.subjects.get(path)
    }
}

impl FromIterator<(String, Annotations)> for AnnotationDocument {
    fn from_iter<I: IntoIterator<Item = (String, Annotations)>>(iter: I) -> Self {
        Self {
            subjects: iter.into_iter().collect(),
        }
    }
}

/// Overlay `overlay` onto `base`, producing a new map. Keys in `overlay`
/// replace keys in `base`.
pub fn merge(base: Option<&Annotations>, overlay: &Annotations) -> Annotations {
    let mut merged = base.cloned().unwrap_or_default();
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}
