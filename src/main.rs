//! Template Mixins CLI
//!
//! Usage:
//!   template-mixins [OPTIONS] [TEMPLATE]
//!
//! Options:
//!   -c, --config <FILE>    Engine configuration (TOML format)
//!   -d, --dir <DIR>        Template directory, may be repeated
//!   --var <KEY=VALUE>      String binding, may be repeated
//!   --data <FILE>          TOML file whose top-level table becomes bindings
//!   --debug                Debug logging
//!   -h, --help             Print help

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use template_mixins::{Bindings, EngineConfig, Environment, Template, Value};

#[derive(Parser, Debug)]
#[command(name = "template-mixins")]
#[command(about = "Render templates with mixins and slot-based components")]
struct Cli {
    /// Template file, or a name looked up in the template directories
    /// (reads from stdin if not provided)
    template: Option<String>,

    /// Engine configuration file (TOML format)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template directory, searched after those in the config file
    #[arg(short, long = "dir")]
    dirs: Vec<PathBuf>,

    /// String binding as key=value
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// TOML file whose top-level table becomes bindings
    #[arg(long)]
    data: Option<PathBuf>,

    /// Debug logging
    #[arg(long)]
    debug: bool,
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

/// Log level is `debug` with `--debug`, otherwise taken from `RUST_LOG`
/// (default `warn`)
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("template_mixins=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);
    tracing::debug!("template-mixins starting with args: {:?}", cli);

    match run(&cli) {
        Ok(output) => {
            print!("{}", output);
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<String, String> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .map_err(|e| format!("Error loading config '{}': {}", path.display(), e))?,
        None => EngineConfig::default(),
    };
    config.template_dirs.extend(cli.dirs.iter().cloned());

    let bindings = load_bindings(cli)?;

    let (name, source) = match &cli.template {
        Some(arg) if Path::new(arg).is_file() => {
            let path = Path::new(arg);
            let source = fs::read_to_string(path)
                .map_err(|e| format!("Error reading file '{}': {}", path.display(), e))?;
            // Siblings of the file are reachable by name
            if let Some(parent) = path.parent() {
                config.template_dirs.push(parent.to_path_buf());
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| arg.clone());
            (Some(name), source)
        }
        Some(arg) => {
            let env = Environment::with_config(config);
            return env
                .render(arg, bindings)
                .map_err(|e| format!("Error: {}", e));
        }
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| format!("Error reading from stdin: {}", e))?;
            (None, buffer)
        }
    };

    let env = Environment::with_config(config);
    let filename = name.as_deref().unwrap_or("<stdin>");
    Template::compile(name.as_deref(), &source)
        .and_then(|template| template.render(&env, bindings))
        .map_err(|e| e.format(&source, filename))
}

fn load_bindings(cli: &Cli) -> Result<Bindings, String> {
    let mut bindings = Bindings::new();

    if let Some(path) = &cli.data {
        let content = fs::read_to_string(path)
            .map_err(|e| format!("Error reading data file '{}': {}", path.display(), e))?;
        let table: toml::Table = toml::from_str(&content)
            .map_err(|e| format!("Error parsing data file '{}': {}", path.display(), e))?;
        for (key, value) in table {
            bindings.insert(key, Value::from_toml(value));
        }
    }

    for (key, value) in &cli.vars {
        bindings.insert(key.clone(), Value::from(value.as_str()));
    }

    Ok(bindings)
}
