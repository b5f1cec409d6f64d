use std::path::PathBuf;
use std::str::FromStr;

use ociclient::{
    ContentStore, CredentialResolver, Descriptor, ImageReference, PushOptions, PushRoutine,
};
use tracing::info;

use crate::annotations::{AnnotationDocument, merge};
use crate::descriptors::build_file_descriptors;
use crate::error::{CliError, Result};
use crate::manifest_config::resolve_manifest_config;

/// Options handed through to the push routine.
pub type PushConfiguration = PushOptions;

/// Everything a single `push` invocation was asked to do.
#[derive(Debug, Clone, Default)]
pub struct PushRequest {
    /// `name[:tag|@digest]`
    pub target: String,
    /// `file[:mediaType]` arguments, in order
    pub file_refs: Vec<String>,
    /// `file[:mediaType]` of the manifest config
    pub manifest_config: Option<String>,
    /// JSON annotation document
    pub manifest_annotations: Option<PathBuf>,
}

/// The resolved input of a push.
#[derive(Debug, Clone)]
pub struct PreparedPush {
    pub target: ImageReference,
    pub descriptors: Vec<Descriptor>,
    pub configuration: PushConfiguration,
}

fn assemble_configuration(
    config: Option<Descriptor>,
    document: Option<&AnnotationDocument>,
) -> PushConfiguration {
    PushConfiguration {
        config,
        config_annotations: document
            .and_then(AnnotationDocument::config)
            .map(|a| merge(None, a)),
        manifest_annotations: document
            .and_then(AnnotationDocument::manifest)
            .map(|a| merge(None, a)),
    }
}

/// Validate the request and resolve all of its files.
pub fn prepare_push(request: &PushRequest, store: &mut dyn ContentStore) -> Result<PreparedPush> {
    if request.file_refs.is_empty() {
        return Err(CliError::Usage("at least one file is required".to_string()));
    }
    let target = ImageReference::from_str(&request.target)
        .map_err(|e| CliError::Usage(format!("invalid target {}: {}", request.target, e)))?;

    let document = AnnotationDocument::load_optional(request.manifest_annotations.as_deref())?;
    let config = resolve_manifest_config(
        store,
        request.manifest_config.as_deref().filter(|t| !t.is_empty()),
        document.as_ref(),
    )?;
    let descriptors = build_file_descriptors(store, &request.file_refs, document.as_ref())?;

    Ok(PreparedPush {
        target,
        descriptors,
        configuration: assemble_configuration(config, document.as_ref()),
    })
}

/// Resolve the request and hand it to the push routine, returning the
/// pushed manifest's descriptor. Push failures come back unchanged.
pub async fn run_push(
    request: &PushRequest,
    store: &mut dyn ContentStore,
    resolver: &dyn CredentialResolver,
    pusher: &dyn PushRoutine,
) -> Result<Descriptor> {
    let prepared = prepare_push(request, store)?;
    info!(
        "Pushing {} file(s) to {}",
        prepared.descriptors.len(),
        prepared.target
    );

    pusher
        .push(
            resolver,
            &prepared.target,
            &*store,
            &prepared.descriptors,
            prepared.configuration,
        )
        .await
        .map_err(CliError::Push)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ociclient::FileStore;
    use ociclient::models::MEDIA_TYPE_IMAGE_CONFIG;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_prepare_requires_files() {
        let mut store = FileStore::new("");
        let request = PushRequest {
            target: "localhost:5000/hello:latest".to_string(),
            ..Default::default()
        };

        let err = prepare_push(&request, &mut store).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn test_prepare_rejects_invalid_target() {
        let mut store = FileStore::new("");
        let request = PushRequest {
            target: "localhost:5000/hello:".to_string(),
            file_refs: vec!["file.txt".to_string()],
            ..Default::default()
        };

        let err = prepare_push(&request, &mut store).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn test_prepare_assembles_configuration() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("file.txt"), "x").unwrap();
        fs::write(dir.path().join("cfg.json"), "{}").unwrap();
        let document = dir.path().join("annotations.json");
        fs::write(
            &document,
            r#"{"$config": {"a": "1"}, "$manifest": {"m": "2"}}"#,
        )
        .unwrap();

        let mut store = FileStore::new(dir.path());
        let request = PushRequest {
            target: "localhost:5000/hello:v1".to_string(),
            file_refs: vec!["file.txt".to_string()],
            manifest_config: Some("cfg.json".to_string()),
            manifest_annotations: Some(document),
        };

        let prepared = prepare_push(&request, &mut store).unwrap();
        let configuration = prepared.configuration;
        let config = configuration.config.unwrap();

        assert_eq!(config.media_type, MEDIA_TYPE_IMAGE_CONFIG);
        assert_eq!(
            config.annotations.as_ref().and_then(|a| a.get("a")).map(String::as_str),
            Some("1")
        );
        assert_eq!(configuration.config_annotations, config.annotations);
        assert_eq!(
            configuration
                .manifest_annotations
                .as_ref()
                .and_then(|a| a.get("m"))
                .map(String::as_str),
            Some("2")
        );
        assert_eq!(prepared.target.to_string(), "localhost:5000/hello:v1");
    }

    #[test]
    fn test_empty_manifest_config_is_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("file.txt"), "x").unwrap();

        let mut store = FileStore::new(dir.path());
        let request = PushRequest {
            target: "localhost:5000/hello".to_string(),
            file_refs: vec!["file.txt".to_string()],
            manifest_config: Some(String::new()),
            manifest_annotations: None,
        };

        let prepared = prepare_push(&request, &mut store).unwrap();
        assert_eq!(prepared.configuration, PushConfiguration::default());
    }
}
