use anyhow::{Context, Result};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response, StatusCode, header};
use serde::Deserialize;
use tracing::debug;

use crate::digest::OciDigest;
use crate::image_reference::Reference;
use crate::models::{Descriptor, ImageManifest, MEDIA_TYPE_IMAGE_MANIFEST};

/// A client for interacting with an OCI registry.
pub struct Client {
    registry_url: String,
    auth: Option<String>,
    client: ReqwestClient,
}

impl Client {
    /// Create a new client for the given registry URL.
    ///
    /// `auth` is a base64 encoded `user:password` pair.
    pub fn new(registry_url: String, auth: Option<String>) -> Self {
        Self {
            registry_url: registry_url.trim_end_matches('/').to_string(),
            auth,
            client: ReqwestClient::new(),
        }
    }

    /// Create a new session for the given repository.
    pub fn new_session(&self, repository: String) -> ClientSession {
        ClientSession {
            repository,
            registry_url: self.registry_url.clone(),
            client: self.client.clone(),
            auth: self.auth.clone(),
            token: None,
        }
    }
}

/// A session for interacting with a specific repository in an OCI registry.
pub struct ClientSession {
    repository: String,
    registry_url: String,
    client: ReqwestClient,
    auth: Option<String>,
    token: Option<String>,
}

// Token authentication response from the auth service
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: Option<String>,
    access_token: Option<String>,
}

/// Parameters of a `WWW-Authenticate: Bearer ...` challenge.
#[derive(Debug, Default, PartialEq)]
struct BearerChallenge {
    realm: String,
    service: Option<String>,
    scope: Option<String>,
}

impl BearerChallenge {
    fn parse(header: &str) -> Option<Self> {
        let params = header.strip_prefix("Bearer ")?;

        let mut realm = None;
        let mut service = None;
        let mut scope = None;

        // Quoted values may contain commas (e.g. "repository:x:push,pull")
        let mut rest = params.trim();
        while !rest.is_empty() {
            let (key, after_key) = rest.split_once('=')?;
            let key = key.trim().trim_start_matches(',').trim();
            let (value, remaining) = match after_key.strip_prefix('"') {
                Some(quoted) => {
                    let end = quoted.find('"')?;
                    (&quoted[..end], &quoted[end + 1..])
                }
                None => match after_key.find(',') {
                    Some(end) => (&after_key[..end], &after_key[end..]),
                    None => (after_key, ""),
                },
            };

            match key {
                "realm" => realm = Some(value.to_string()),
                "service" => service = Some(value.to_string()),
                "scope" => scope = Some(value.to_string()),
                _ => {}
            }
            rest = remaining.trim_start_matches(',').trim();
        }

        Some(Self {
            realm: realm?,
            service,
            scope,
        })
    }
}

impl ClientSession {
    fn build_request(
        &self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
        content_type: Option<&str>,
    ) -> RequestBuilder {
        let mut request = self.client.request(method, url);

        // If we have a token, add it to the request
        if let Some(token) = &self.token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        // If we have basic auth credentials, add them to the request
        else if let Some(auth) = &self.auth {
            request = request.header(header::AUTHORIZATION, format!("Basic {}", auth));
        }

        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        request
    }

    /// Send a request, answering a bearer challenge once if the registry
    /// asks for one.
    async fn send(
        &mut self,
        method: Method,
        url: &str,
        body: Option<&[u8]>,
        content_type: Option<&str>,
    ) -> Result<Response> {
        let response = self
            .build_request(method.clone(), url, body, content_type)
            .send()
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let challenge = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
            .and_then(BearerChallenge::parse);

        let Some(challenge) = challenge else {
            return Ok(response);
        };

        match self.fetch_token(&challenge).await? {
            Some(token) => {
                self.token = Some(token);
                Ok(self
                    .build_request(method, url, body, content_type)
                    .send()
                    .await?)
            }
            // Couldn't authenticate, hand the original 401 back
            None => Ok(response),
        }
    }

    async fn fetch_token(&self, challenge: &BearerChallenge) -> Result<Option<String>> {
        let mut token_url = reqwest::Url::parse(&challenge.realm)
            .with_context(|| format!("Invalid token realm: {}", challenge.realm))?;

        if let Some(service) = &challenge.service {
            token_url.query_pairs_mut().append_pair("service", service);
        }
        if let Some(scope) = &challenge.scope {
            token_url.query_pairs_mut().append_pair("scope", scope);
        }

        debug!("Requesting registry token from {}", token_url);
        let mut token_request = self.client.get(token_url);
        if let Some(auth) = &self.auth {
            token_request = token_request.header(header::AUTHORIZATION, format!("Basic {}", auth));
        }

        let token_response = token_request.send().await?;
        if !token_response.status().is_success() {
            debug!("Token request failed: {}", token_response.status());
            return Ok(None);
        }

        let token_data: TokenResponse = token_response.json().await?;
        Ok(token_data.token.or(token_data.access_token))
    }

    /// Check if a blob with the given digest exists.
    pub async fn blob_exists(&mut self, digest: &OciDigest) -> Result<bool> {
        let url = format!("{}/v2/{}/blobs/{}", self.registry_url, self.repository, digest);
        let response = self.send(Method::HEAD, &url, None, None).await?;
        Ok(response.status() == StatusCode::OK)
    }

    /// Upload a blob in a single request after opening an upload session.
    pub async fn upload_bytes(&mut self, media_type: String, content: &[u8]) -> Result<Descriptor> {
        let descriptor = Descriptor::for_content(media_type, content);

        let start_url = format!("{}/v2/{}/blobs/uploads/", self.registry_url, self.repository);
        debug!("Starting upload with URL: {}", start_url);
        let start_response = self.send(Method::POST, &start_url, None, None).await?;

        if start_response.status() != StatusCode::ACCEPTED {
            let status = start_response.status();
            let error_body = start_response.text().await?;
            return Err(anyhow::anyhow!("Failed to start upload: {} - {}", status, error_body));
        }

        let location = start_response
            .headers()
            .get(header::LOCATION)
            .ok_or_else(|| anyhow::anyhow!("No location header in response"))?
            .to_str()?;

        let upload_url = if location.starts_with("http") {
            location.to_string()
        } else {
            format!("{}{}", self.registry_url, location)
        };

        let separator = if upload_url.contains('?') { '&' } else { '?' };
        let complete_url = format!("{}{}digest={}", upload_url, separator, descriptor.digest);
        let complete_response = self
            .send(
                Method::PUT,
                &complete_url,
                Some(content),
                Some("application/octet-stream"),
            )
            .await?;

        if complete_response.status() != StatusCode::CREATED {
            let status = complete_response.status();
            let error_body = complete_response.text().await?;
            return Err(anyhow::anyhow!("Failed to complete upload: {} - {}", status, error_body));
        }

        Ok(descriptor)
    }

    /// Register a manifest under a tag or digest, returning its descriptor.
    pub async fn register_manifest(
        &mut self,
        reference: &Reference,
        manifest: &ImageManifest,
    ) -> Result<Descriptor> {
        let body = serde_json::to_vec(manifest)?;
        let descriptor = Descriptor::for_content(MEDIA_TYPE_IMAGE_MANIFEST, &body);

        if let Reference::Digest(expected) = reference {
            if *expected != descriptor.digest {
                return Err(anyhow::anyhow!(
                    "Manifest digest {} does not match reference {}",
                    descriptor.digest,
                    expected
                ));
            }
        }

        let url = format!("{}/v2/{}/manifests/{}", self.registry_url, self.repository, reference);
        let response = self
            .send(Method::PUT, &url, Some(&body), Some(MEDIA_TYPE_IMAGE_MANIFEST))
            .await?;

        if response.status() != StatusCode::CREATED && response.status() != StatusCode::OK {
            let status = response.status();
            let error_body = response.text().await?;
            return Err(anyhow::anyhow!("Failed to register manifest: {} - {}", status, error_body));
        }

        Ok(descriptor)
    }
}
