pub mod annotations;
pub mod descriptors;
pub mod error;
pub mod file_ref;
pub mod manifest_config;
pub mod orchestrator;
pub mod settings;

pub use error::{CliError, Result};
pub use orchestrator::{PushConfiguration, PushRequest, prepare_push, run_push};
