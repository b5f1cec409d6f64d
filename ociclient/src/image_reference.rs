use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::digest::{DigestError, OciDigest};

/// Registry assumed when a reference carries no hostname
pub const DEFAULT_REGISTRY: &str = "docker.io";
const DEFAULT_REGISTRY_ENDPOINT: &str = "registry-1.docker.io";
const DEFAULT_TAG: &str = "latest";
// Namespace of single-component names on the default registry
const DEFAULT_NAMESPACE: &str = "library";

/// Error type for image reference parsing
#[derive(Debug, Error)]
pub enum ImageReferenceError {
    #[error("Invalid image reference format: {0}")]
    InvalidFormat(String),
    #[error("Invalid digest in image reference: {0}")]
    InvalidDigest(#[from] DigestError),
}

/// The part of a reference naming a single manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reference {
    Tag(String),
    Digest(OciDigest),
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Tag(tag) => write!(f, "{}", tag),
            Reference::Digest(digest) => write!(f, "{}", digest),
        }
    }
}

/// Represents an OCI image reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Optional hostname (registry)
    pub hostname: Option<String>,
    /// Repository name
    pub name: String,
    /// Tag or digest
    pub reference: Reference,
}

impl ImageReference {
    /// Registry host, falling back to the default registry
    pub fn registry(&self) -> &str {
        self.hostname.as_deref().unwrap_or(DEFAULT_REGISTRY)
    }

    /// Base URL of the registry API
    pub fn registry_url(&self, plain_http: bool) -> String {
        let scheme = if plain_http { "http" } else { "https" };
        let host = match self.registry() {
            DEFAULT_REGISTRY => DEFAULT_REGISTRY_ENDPOINT,
            host => host,
        };
        format!("{}://{}", scheme, host)
    }
}

fn is_hostname(component: &str) -> bool {
    component.contains('.') || component.contains(':') || component == "localhost"
}

impl FromStr for ImageReference {
    type Err = ImageReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Parse image reference in the format: [hostname/]name[:tag|@digest]
        let (remainder, digest) = match s.split_once('@') {
            Some((remainder, digest)) => (remainder, Some(OciDigest::from_str(digest)?)),
            None => (s, None),
        };

        let (hostname, path) = match remainder.split_once('/') {
            Some((first, rest)) if is_hostname(first) => (Some(first.to_string()), rest),
            _ => (None, remainder),
        };

        // A colon after the last slash separates the tag
        let tag_split = path
            .rfind(':')
            .filter(|colon| path.rfind('/').is_none_or(|slash| slash < *colon));
        let (name, tag) = match tag_split {
            Some(colon) => (&path[..colon], Some(&path[colon + 1..])),
            None => (path, None),
        };

        if name.is_empty() || name.starts_with('/') || name.ends_with('/') {
            return Err(ImageReferenceError::InvalidFormat(s.to_string()));
        }
        if tag.is_some_and(str::is_empty) {
            return Err(ImageReferenceError::InvalidFormat(s.to_string()));
        }

        let reference = match (digest, tag) {
            (Some(digest), _) => Reference::Digest(digest),
            (None, Some(tag)) => Reference::Tag(tag.to_string()),
            (None, None) => Reference::Tag(DEFAULT_TAG.to_string()),
        };

        let name = match hostname {
            None if !name.contains('/') => format!("{}/{}", DEFAULT_NAMESPACE, name),
            _ => name.to_string(),
        };

        Ok(ImageReference {
            hostname,
            name,
            reference,
        })
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(hostname) = &self.hostname {
            write!(f, "{}/", hostname)?;
        }
        match &self.reference {
            Reference::Tag(tag) => write!(f, "{}:{}", self.name, tag),
            Reference::Digest(digest) => write!(f, "{}@{}", self.name, digest),
        }
    }
}
