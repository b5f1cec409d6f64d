use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::digest::OciDigest;

/// Media type of an OCI image manifest
pub const MEDIA_TYPE_IMAGE_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
/// Media type of an OCI image config
pub const MEDIA_TYPE_IMAGE_CONFIG: &str = "application/vnd.oci.image.config.v1+json";
/// Media type of an OCI tar layer, used when a file has no explicit type
pub const MEDIA_TYPE_IMAGE_LAYER: &str = "application/vnd.oci.image.layer.v1.tar";
/// Media type of the placeholder config pushed when none is supplied
pub const MEDIA_TYPE_UNKNOWN_CONFIG: &str = "application/vnd.unknown.config.v1+json";

/// Annotation carrying the file name a layer was created from
pub const ANNOTATION_TITLE: &str = "org.opencontainers.image.title";

/// String key/value metadata attached to descriptors and manifests.
/// Ordered so serialized manifests are stable.
pub type Annotations = BTreeMap<String, String>;

/// Represents a descriptor for a content blob in an OCI registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    /// Media type of the referenced content
    pub media_type: String,
    /// Digest of the referenced content
    pub digest: OciDigest,
    /// Size of the referenced content in bytes
    pub size: u64,
    /// Optional annotations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
}

impl Descriptor {
    /// Describe an in-memory blob
    pub fn for_content(media_type: impl Into<String>, content: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            digest: OciDigest::from_content(content),
            size: content.len() as u64,
            annotations: None,
        }
    }

    /// The title annotation, if the store attached one
    pub fn title(&self) -> Option<&str> {
        self.annotations
            .as_ref()
            .and_then(|a| a.get(ANNOTATION_TITLE))
            .map(String::as_str)
    }
}

/// Represents an OCI image manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    /// Schema version of the manifest
    pub schema_version: i32,
    /// Media type of the manifest
    pub media_type: String,
    /// Descriptor for the config blob
    pub config: Descriptor,
    /// Descriptors for the layer blobs
    pub layers: Vec<Descriptor>,
    /// Optional manifest annotations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Annotations>,
}

impl ImageManifest {
    /// Build a schema 2 OCI image manifest
    pub fn new(config: Descriptor, layers: Vec<Descriptor>, annotations: Option<Annotations>) -> Self {
        Self {
            schema_version: 2,
            media_type: MEDIA_TYPE_IMAGE_MANIFEST.to_string(),
            config,
            layers,
            annotations,
        }
    }
}
