use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::auth::CredentialResolver;
use crate::client::{Client, ClientSession};
use crate::image_reference::ImageReference;
use crate::models::{Annotations, Descriptor, ImageManifest, MEDIA_TYPE_UNKNOWN_CONFIG};
use crate::store::ContentStore;

const EMPTY_CONFIG: &[u8] = b"{}";

/// Optional behaviours of a push.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PushOptions {
    /// Config descriptor to reference instead of the synthesized `{}` config.
    /// Its blob is read from the content store.
    pub config: Option<Descriptor>,
    /// Annotations of the config descriptor. When set they replace whatever
    /// the config descriptor carries.
    pub config_annotations: Option<Annotations>,
    /// Annotations of the manifest itself.
    pub manifest_annotations: Option<Annotations>,
}

/// Builds a manifest from descriptors and uploads it with its blobs.
#[async_trait]
pub trait PushRoutine: Send + Sync {
    /// Push `descriptors` as the layers of a manifest tagged `target`,
    /// returning the manifest's descriptor.
    async fn push(
        &self,
        resolver: &dyn CredentialResolver,
        target: &ImageReference,
        store: &dyn ContentStore,
        descriptors: &[Descriptor],
        options: PushOptions,
    ) -> Result<Descriptor>;
}

/// Pushes to a registry over the OCI distribution API.
#[derive(Debug, Clone, Default)]
pub struct RegistryPusher {
    plain_http_hosts: Vec<String>,
    force_plain_http: bool,
}

impl RegistryPusher {
    /// Registries whose host (with or without port) is listed are spoken to
    /// over plain http.
    pub fn new(plain_http_hosts: Vec<String>) -> Self {
        Self {
            plain_http_hosts,
            force_plain_http: false,
        }
    }

    /// Use plain http for every registry.
    pub fn with_plain_http(mut self, plain_http: bool) -> Self {
        self.force_plain_http = plain_http;
        self
    }

    fn uses_plain_http(&self, registry: &str) -> bool {
        if self.force_plain_http {
            return true;
        }
        let host = registry.split(':').next().unwrap_or(registry);
        self.plain_http_hosts
            .iter()
            .any(|candidate| candidate == registry || candidate == host)
    }
}

/// Upload a blob unless the registry already has it.
async fn push_blob(session: &mut ClientSession, descriptor: &Descriptor, content: &[u8]) -> Result<()> {
    if session.blob_exists(&descriptor.digest).await? {
        debug!("Blob {} already exists, skipping upload", descriptor.digest);
        return Ok(());
    }

    let uploaded = session
        .upload_bytes(descriptor.media_type.clone(), content)
        .await
        .with_context(|| format!("Failed to upload blob {}", descriptor.digest))?;

    if uploaded.digest != descriptor.digest {
        return Err(anyhow::anyhow!(
            "Content of {} changed since it was resolved (now {})",
            descriptor.digest,
            uploaded.digest
        ));
    }

    info!("Uploaded {} ({} bytes)", descriptor.digest, descriptor.size);
    Ok(())
}

#[async_trait]
impl PushRoutine for RegistryPusher {
    async fn push(
        &self,
        resolver: &dyn CredentialResolver,
        target: &ImageReference,
        store: &dyn ContentStore,
        descriptors: &[Descriptor],
        options: PushOptions,
    ) -> Result<Descriptor> {
        if descriptors.is_empty() {
            return Err(anyhow::anyhow!("No descriptors to push"));
        }

        let (mut config, config_content) = match options.config {
            Some(config) => {
                let content = store.fetch(&config.digest)?;
                (config, content)
            }
            None => (
                Descriptor::for_content(MEDIA_TYPE_UNKNOWN_CONFIG, EMPTY_CONFIG),
                EMPTY_CONFIG.to_vec(),
            ),
        };
        if options.config_annotations.is_some() {
            config.annotations = options.config_annotations;
        }

        let registry_url = target.registry_url(self.uses_plain_http(target.registry()));
        let client = Client::new(registry_url, resolver.basic_auth(target.registry()));
        let mut session = client.new_session(target.name.clone());

        info!("Pushing {} with {} file(s)", target, descriptors.len());
        push_blob(&mut session, &config, &config_content).await?;
        for descriptor in descriptors {
            let content = store.fetch(&descriptor.digest)?;
            push_blob(&mut session, descriptor, &content).await?;
        }

        let manifest = ImageManifest::new(config, descriptors.to_vec(), options.manifest_annotations);
        let pushed = session.register_manifest(&target.reference, &manifest).await?;
        info!("Pushed {} as {}", target, pushed.digest);

        Ok(pushed)
    }
}
