pub mod auth;
pub mod client;
pub mod digest;
pub mod image_reference;
pub mod models;
pub mod push;
pub mod store;

// Re-export main client types for convenience
pub use auth::{CredentialResolver, DockerConfigResolver};
pub use client::{Client, ClientSession};
pub use digest::OciDigest;
pub use image_reference::{ImageReference, Reference};
pub use models::{Annotations, Descriptor, ImageManifest};
pub use push::{PushOptions, PushRoutine, RegistryPusher};
pub use store::{ContentStore, FileStore, StoreError};
