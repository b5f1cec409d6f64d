use ociclient::models::MEDIA_TYPE_IMAGE_CONFIG;
use ociclient::{ContentStore, Descriptor};
use tracing::debug;

use crate::annotations::{AnnotationDocument, CONFIG_SUBJECT, merge};
use crate::error::{CliError, Result};
use crate::file_ref::FileReference;

/// Resolve the `--manifest-config` argument into the config descriptor.
///
/// Without an argument there is no descriptor and the push routine supplies
/// its own placeholder config. Annotations the store attaches are dropped;
/// the config only carries what the document's `$config` subject gives it.
pub fn resolve_manifest_config(
    store: &mut dyn ContentStore,
    token: Option<&str>,
    document: Option<&AnnotationDocument>,
) -> Result<Option<Descriptor>> {
    let Some(token) = token else {
        return Ok(None);
    };

    let reference = FileReference::parse(token);
    let media_type = reference.media_type_or(MEDIA_TYPE_IMAGE_CONFIG);
    let mut descriptor = store
        .add(CONFIG_SUBJECT, media_type, &reference.path)
        .map_err(|source| CliError::Resolve {
            reference: token.to_string(),
            source,
        })?;

    descriptor.annotations = document
        .and_then(AnnotationDocument::config)
        .map(|config| merge(None, config));

    debug!(
        "Resolved manifest config {} to {} ({})",
        reference.path, descriptor.digest, descriptor.media_type
    );
    Ok(Some(descriptor))
}
