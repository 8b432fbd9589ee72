mod config;

use std::io;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use smithget_lib::get;
use smithget_lib::transport::HttpTransport;
use smithget_lib::Entity;

#[derive(Parser, Debug)]
#[command(name = "smith")]
#[command(version)]
#[command(about = "Fetch feature flags from Flagsmith", long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retrieve flags or the environment document and print them as JSON
    ///
    /// Examples:
    ///   smith get <ENVIRONMENT_API_KEY>
    ///   FLAGSMITH_ENVIRONMENT=x smith get
    ///   smith get -o ./my-file.json
    ///   smith get -a https://flagsmith.example.com/api/v1/
    ///   smith get -i flagsmith_identity -t key1=value1 -t key2=value2
    ///   smith get ser.xxx -e environment --no-pretty
    #[command(verbatim_doc_comment)]
    Get(GetArgs),
}

#[derive(clap::Args, Debug)]
struct GetArgs {
    /// The environment key to use, defaults to FLAGSMITH_ENVIRONMENT
    #[arg(env = "FLAGSMITH_ENVIRONMENT")]
    environment: Option<String>,

    /// Also write the JSON output to this file
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// The API URL to fetch the feature flags from
    #[arg(short = 'a', long = "api")]
    api: Option<String>,

    /// The identity for which to fetch feature flags
    #[arg(short = 'i', long = "identity")]
    identity: Option<String>,

    /// Do not prettify the output JSON (also accepted as -np)
    #[arg(long = "no-pretty")]
    no_pretty: bool,

    /// The entity to fetch: flags, or the environment document used for local evaluation
    #[arg(short = 'e', long = "entity", default_value = "flags")]
    entity: Entity,

    /// Trait key=value pair, can be repeated. Requires --identity
    #[arg(short = 't', long = "trait")]
    traits: Vec<String>,

    /// Path to config file
    #[arg(short = 'c', long = "config", default_value = "flagsmith.toml")]
    config: String,
}

/// Rewrite the single-dash `-np` spelling to `--no-pretty`; clap only knows
/// one-letter short flags. Nothing after `--` is touched.
fn legacy_args<I: IntoIterator<Item = String>>(args: I) -> Vec<String> {
    let mut passthrough = false;
    args.into_iter()
        .map(|arg| {
            if passthrough {
                return arg;
            }
            match arg.as_str() {
                "--" => {
                    passthrough = true;
                    arg
                }
                "-np" => "--no-pretty".to_string(),
                _ => arg,
            }
        })
        .collect()
}

fn run_get(args: &GetArgs) {
    let config = config::load_get_config(&args.config);
    let host = std::env::var("FLAGSMITH_HOST").ok();
    let opts = config::resolve_options(args, host.as_deref(), &config);

    let transport = match HttpTransport::new(config.timeout_secs.map(Duration::from_secs)) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("[Error] {}", e);
            process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut status = io::stderr();
    if let Err(e) = get::run(&opts, &transport, &mut out, &mut status) {
        eprintln!("[Error] {}", e);
        process::exit(1);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse_from(legacy_args(std::env::args()));
    match &args.cmd {
        Command::Get(get_args) => run_get(get_args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> GetArgs {
        let argv = legacy_args(argv.iter().map(|s| s.to_string()));
        match Args::try_parse_from(argv).unwrap().cmd {
            Command::Get(args) => args,
        }
    }

    #[test]
    fn test_multiple_traits() {
        let args = parse(&[
            "smith", "get", "test_env", "-i", "test_id", "-t", "key1=value1", "-t", "key2=value2",
        ]);
        assert_eq!(args.environment.as_deref(), Some("test_env"));
        assert_eq!(args.identity.as_deref(), Some("test_id"));
        assert_eq!(args.traits, vec!["key1=value1", "key2=value2"]);
        assert_eq!(args.entity, Entity::Flags);
        assert!(!args.no_pretty);
    }

    #[test]
    fn test_long_options() {
        let args = parse(&[
            "smith",
            "get",
            "ser.key",
            "--entity",
            "environment",
            "--output",
            "test.json",
            "--api",
            "https://flagsmith.example.com/api/v1/",
            "--no-pretty",
        ]);
        assert_eq!(args.entity, Entity::Environment);
        assert_eq!(args.output, Some(PathBuf::from("test.json")));
        assert_eq!(
            args.api.as_deref(),
            Some("https://flagsmith.example.com/api/v1/")
        );
        assert!(args.no_pretty);
        assert_eq!(args.config, "flagsmith.toml");
    }

    #[test]
    fn test_entity_is_case_insensitive() {
        let args = parse(&["smith", "get", "ser.key", "-e", "Environment"]);
        assert_eq!(args.entity, Entity::Environment);
    }

    #[test]
    fn test_unknown_entity_rejected() {
        let res = Args::try_parse_from(["smith", "get", "k", "-e", "segments"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_legacy_no_pretty() {
        let args = parse(&["smith", "get", "env-key", "-np"]);
        assert!(args.no_pretty);
    }

    #[test]
    fn test_legacy_args_stop_at_separator() {
        let argv = legacy_args(
            ["smith", "get", "-np", "--", "-np"]
                .iter()
                .map(|s| s.to_string()),
        );
        assert_eq!(argv, vec!["smith", "get", "--no-pretty", "--", "-np"]);
    }

    #[test]
    fn test_empty_identity_is_kept() {
        let args = parse(&["smith", "get", "test-env", "-i", ""]);
        assert_eq!(args.identity.as_deref(), Some(""));
    }
}
