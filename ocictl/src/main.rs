use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ociclient::{FileStore, RegistryPusher};
use tracing::instrument::WithSubscriber;

use ocictl::settings::Settings;
use ocictl::{PushRequest, run_push};

const PUSH_EXAMPLES: &str = r#"Push files to remote registry

Example - Push file "hi.txt" with the "application/vnd.oci.image.layer.v1.tar" media type (default):
  ocictl push localhost:5000/hello:latest hi.txt

Example - Push file "hi.txt" with the custom "application/vnd.me.hi" media type:
  ocictl push localhost:5000/hello:latest hi.txt:application/vnd.me.hi

Example - Push multiple files with different media types:
  ocictl push localhost:5000/hello:latest hi.txt:application/vnd.me.hi bye.txt:application/vnd.me.bye

Example - Push file "hi.txt" with the custom manifest config "config.json" of the custom "application/vnd.me.config" media type:
  ocictl push --manifest-config config.json:application/vnd.me.config localhost:5000/hello:latest hi.txt
"#;

/// Push local files to an OCI registry
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Push files to remote registry
    #[command(long_about = PUSH_EXAMPLES)]
    Push(PushArgs),
}

#[derive(Debug, Args)]
struct PushArgs {
    /// Target reference, name[:tag|@digest]
    target: String,

    /// Files to push, file[:type]
    #[arg(required = true, num_args = 1..)]
    files: Vec<String>,

    /// Manifest config file, file[:type]
    #[arg(long)]
    manifest_config: Option<String>,

    /// Manifest annotation file
    #[arg(long)]
    manifest_annotations: Option<PathBuf>,

    /// Debug mode
    #[arg(short, long)]
    debug: bool,

    /// Auth config path
    #[arg(short = 'c', long = "config")]
    configs: Vec<PathBuf>,

    /// Registry username
    #[arg(short, long, default_value = "")]
    username: String,

    /// Registry password
    #[arg(short, long, default_value = "")]
    password: String,

    /// Use plain http for the target registry
    #[arg(long)]
    plain_http: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Push(args) => {
            let settings = Settings::load()?.with_debug(args.debug);

            // Scoped to this command rather than installed globally
            let subscriber = tracing_subscriber::fmt()
                .with_env_filter(settings.env_filter())
                .with_target(false)
                .finish();

            cmd_push(args, settings).with_subscriber(subscriber).await
        }
    }
}

async fn cmd_push(args: PushArgs, settings: Settings) -> Result<()> {
    let request = PushRequest {
        target: args.target,
        file_refs: args.files,
        manifest_config: args.manifest_config,
        manifest_annotations: args.manifest_annotations,
    };

    let resolver = settings.credential_resolver(&args.username, &args.password, args.configs)?;
    let pusher = RegistryPusher::new(settings.plain_http_hosts.clone()).with_plain_http(args.plain_http);
    let mut store = FileStore::new("");

    let pushed = run_push(&request, &mut store, &resolver, &pusher).await?;

    println!("Pushed {}", request.target);
    println!("Digest: {}", pushed.digest);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse_push(args: &[&str]) -> PushArgs {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        let Commands::Push(push) = cli.command;
        push
    }

    #[test]
    fn test_push_requires_target_and_a_file() {
        let err = Cli::try_parse_from(["ocictl", "push", "localhost:5000/hello:v1"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = Cli::try_parse_from(["ocictl", "push"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn test_push_repeated_configs_and_files_keep_order() {
        let args = parse_push(&[
            "ocictl",
            "push",
            "-c",
            "a.json",
            "-c",
            "b.json",
            "localhost:5000/hello:v1",
            "a.txt",
            "b.txt:t",
        ]);

        assert_eq!(args.target, "localhost:5000/hello:v1");
        assert_eq!(args.configs, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
        assert_eq!(args.files, vec!["a.txt".to_string(), "b.txt:t".to_string()]);
        assert_eq!(args.username, "");
        assert_eq!(args.password, "");
        assert!(!args.debug);
        assert!(!args.plain_http);
        assert_eq!(args.manifest_config, None);
    }

    #[test]
    fn test_push_short_and_long_flags() {
        let args = parse_push(&[
            "ocictl",
            "push",
            "-d",
            "-u",
            "user",
            "-p",
            "pass",
            "--config",
            "auth.json",
            "--manifest-config",
            "config.json:application/vnd.me.config",
            "--manifest-annotations",
            "annotations.json",
            "--plain-http",
            "localhost:5000/hello:v1",
            "hi.txt",
        ]);

        assert!(args.debug);
        assert!(args.plain_http);
        assert_eq!(args.username, "user");
        assert_eq!(args.password, "pass");
        assert_eq!(args.configs, vec![PathBuf::from("auth.json")]);
        assert_eq!(
            args.manifest_config.as_deref(),
            Some("config.json:application/vnd.me.config")
        );
        assert_eq!(
            args.manifest_annotations,
            Some(PathBuf::from("annotations.json"))
        );
        assert_eq!(args.files, vec!["hi.txt".to_string()]);

        let long = parse_push(&[
            "ocictl",
            "push",
            "--debug",
            "--username",
            "user",
            "--password",
            "pass",
            "localhost:5000/hello:v1",
            "hi.txt",
        ]);
        assert!(long.debug);
        assert_eq!(long.username, "user");
        assert_eq!(long.password, "pass");
    }
}
