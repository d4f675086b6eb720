//! zenv: compile an environment from layered declaration files, then print it
//! or run a command with it.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::process::{Command, ExitCode};

use clap::{ArgAction, Parser, ValueEnum};
use log::debug;

use zenv::compile::{self, CompileOptions};
use zenv::config::Config;
use zenv::parse::quote;
use zenv::source::DirectoryProvider;
use zenv::{Error, logging};

type CliResult<T> = Result<T, Box<dyn StdError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// `NAME="value"` lines
    Dotenv,
    /// `export NAME=value` lines for `eval`
    Shell,
    /// A JSON object
    Json,
}

#[derive(Parser)]
#[command(name = "zenv", version)]
#[command(about = "Compile layered .env declaration files with shell-style expansion")]
struct Args {
    /// Environment to compile [default: the configured default environment]
    #[arg(short, long)]
    env: Option<String>,

    /// Directory holding the declaration files
    #[arg(short, long)]
    dir: Option<String>,

    /// Search subdirectories when the directory has no match
    #[arg(short, long)]
    recursive: bool,

    /// How to print the compiled environment
    #[arg(long, value_enum, default_value_t = OutputFormat::Dotenv)]
    format: OutputFormat,

    /// Log more; repeat for more detail
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Expand one expression against the compiled environment
    #[arg(long, value_name = "TEXT")]
    expand: Option<String>,

    /// List the environments found in the directory
    #[arg(long, conflicts_with = "expand")]
    list: bool,

    /// Print the merged configuration
    #[arg(long, conflicts_with_all = ["expand", "list"])]
    dump_config: bool,

    /// Command to run with the compiled environment
    #[arg(last = true, value_name = "COMMAND")]
    command: Vec<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = Config::load();
    logging::init(
        &config.logging,
        logging::level(&config.logging, args.verbose),
    );

    match run(args, config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("zenv: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args, mut config: Config) -> CliResult<ExitCode> {
    if let Some(dir) = args.dir {
        config.loader.dir = dir;
    }
    if args.recursive {
        config.loader.recursive = true;
    }

    if args.dump_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    let provider = DirectoryProvider::from_config(&config);
    let options = CompileOptions::from(&config);

    if args.list {
        for file in provider.environments(&options.load.dir, options.load.recursive)? {
            println!(
                "{}\t{}\t{}",
                file.environment,
                file.format,
                file.path.display()
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    let name = args
        .env
        .unwrap_or_else(|| provider.default_environment().to_string());
    let environment = compile::compile_env(&name, &provider, &options)?;
    debug!("compiled {} variables for \"{name}\"", environment.len());

    if let Some(text) = args.expand {
        let lookup = |variable: &str| -> zenv::Result<Option<String>> {
            Ok(environment.get(variable).cloned())
        };
        println!("{}", compile::expand(&text, &lookup)?.unwrap_or_default());
        return Ok(ExitCode::SUCCESS);
    }

    if !args.command.is_empty() {
        return run_command(&args.command, &environment);
    }

    print!("{}", format_environment(&environment, args.format)?);
    Ok(ExitCode::SUCCESS)
}

/// Run `command` with `environment` added to the inherited environment.
///
/// The arguments are joined with spaces and handed to `sh -c`, so the
/// compiled variables are visible to shell expansion in the command line.
/// The child's exit status becomes ours.
fn run_command(command: &[String], environment: &BTreeMap<String, String>) -> CliResult<ExitCode> {
    if command.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    let line = command.join(" ");
    debug!("running {line:?}");

    let status = Command::new("sh")
        .arg("-c")
        .arg(&line)
        .envs(environment)
        .status()
        .map_err(|source| Error::Io {
            path: "sh".into(),
            source,
        })?;
    Ok(match status.code() {
        Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        None => ExitCode::FAILURE,
    })
}

fn format_environment(
    environment: &BTreeMap<String, String>,
    format: OutputFormat,
) -> CliResult<String> {
    let mut out = String::new();
    match format {
        OutputFormat::Dotenv => {
            for (name, value) in environment {
                out.push_str(&format!("{name}={}\n", quote(value)));
            }
        }
        OutputFormat::Shell => {
            for (name, value) in environment {
                out.push_str(&format!("export {name}={}\n", shlex::try_quote(value)?));
            }
        }
        OutputFormat::Json => {
            out = serde_json::to_string_pretty(environment)?;
            out.push('\n');
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("GREETING".to_string(), "hello world".to_string()),
            ("PRICE".to_string(), "$5".to_string()),
        ])
    }

    #[test]
    fn dotenv_output_quotes_values() {
        let out = format_environment(&environment(), OutputFormat::Dotenv).unwrap();
        assert_eq!(out, "GREETING=\"hello world\"\nPRICE=\"\\$5\"\n");
    }

    #[test]
    fn shell_output_is_evaluable() {
        let out = format_environment(&environment(), OutputFormat::Shell).unwrap();
        assert_eq!(out, "export GREETING='hello world'\nexport PRICE='$5'\n");
    }

    #[test]
    fn json_output_is_an_object() {
        let out = format_environment(&environment(), OutputFormat::Json).unwrap();
        let parsed: BTreeMap<String, String> = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, environment());
    }

    #[test]
    fn parses_trailing_command() {
        let args = Args::try_parse_from(["zenv", "-e", "dev", "-vv", "--", "env", "-0"]).unwrap();
        assert_eq!(args.env.as_deref(), Some("dev"));
        assert_eq!(args.verbose, 2);
        assert_eq!(args.command, ["env", "-0"]);
    }

    #[test]
    fn exit_status_is_propagated() {
        let code = run_command(&["exit 3".to_string()], &BTreeMap::new()).unwrap();
        assert_eq!(code, ExitCode::from(3));
        let code = run_command(&["exit".to_string(), "4".to_string()], &BTreeMap::new()).unwrap();
        assert_eq!(code, ExitCode::from(4));
    }

    #[test]
    fn command_line_sees_compiled_variables() {
        let command: Vec<String> = ["test", "\"$GREETING\"", "=", "'hello world'"]
            .into_iter()
            .map(String::from)
            .collect();
        let code = run_command(&command, &environment()).unwrap();
        assert_eq!(code, ExitCode::SUCCESS);
    }
}
