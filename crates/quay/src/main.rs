mod builtins;

use std::error::Error as StdError;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::{debug, info, LevelFilter};
use quay_core::Context;

/// Environment variable consulted when no `--registry` is given.
const REGISTRY_PATH_ENV: &str = "QUAY_REGISTRY_PATH";

/// Quay: discover and load plugins
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory or plugin-list file to search for plugins. Repeatable;
    /// defaults to the paths in QUAY_REGISTRY_PATH
    #[arg(long = "registry", value_name = "PATH", global = true)]
    registries: Vec<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List discovered plugins without loading them
    List {
        /// Only consider plugins with these names
        #[arg(long, value_name = "NAME", num_args = 1..)]
        only: Vec<String>,
    },
    /// Discover plugins, then load all of them or the named ones
    Load {
        /// Plugins to load together with their dependencies
        names: Vec<String>,
        /// Print the extension points and plugins afterwards
        #[arg(long)]
        dump: bool,
        /// Output format for --dump
        #[arg(long, value_enum, default_value_t = DumpFormat::Text)]
        format: DumpFormat,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum DumpFormat {
    Text,
    Json,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG directives are parsed last and win over -v.
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level).parse_default_env();
    if let Err(e) = builder.try_init() {
        eprintln!("Failed to initialize logging: {}", e);
    }
}

fn registry_paths(from_args: &[PathBuf]) -> Vec<PathBuf> {
    if !from_args.is_empty() {
        return from_args.to_vec();
    }
    std::env::var_os(REGISTRY_PATH_ENV)
        .map(|paths: OsString| {
            std::env::split_paths(&paths)
                .filter(|path| !path.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Build a context holding every plugin found under `paths`, plus the
/// built-in ones the filter lets through.
fn discover(paths: &[PathBuf], filter: Option<&[&str]>) -> quay_core::Result<Context> {
    let mut ctx = Context::with_static_plugins(builtins::static_plugins());
    let added = ctx.find_plugins(paths, filter)?;
    info!("Discovered {} plugins", added);

    if filter.is_none_or(|names| names.contains(&builtins::HOST.name)) {
        builtins::add_to(&mut ctx)?;
    }
    Ok(ctx)
}

fn run(args: CliArgs) -> Result<(), Box<dyn StdError>> {
    let paths = registry_paths(&args.registries);
    debug!("Registry paths: {:?}", paths);

    match args.command {
        Commands::List { only } => {
            let only: Vec<&str> = only.iter().map(String::as_str).collect();
            let filter = (!only.is_empty()).then_some(only.as_slice());
            let ctx = discover(&paths, filter)?;
            for plugin in ctx.plugins() {
                println!("{}  {}", plugin.name(), plugin.library_name());
            }
        }
        Commands::Load { names, dump, format } => {
            let mut ctx = discover(&paths, None)?;
            if names.is_empty() {
                ctx.load_plugins()?;
            } else {
                ctx.load_named(names.as_slice())?;
            }

            let loaded = ctx.plugins().filter(|p| p.is_loaded()).count();
            info!("Loaded {} of {} plugins", loaded, ctx.plugin_count());
            println!("Loaded {} plugins", loaded);

            if dump {
                let snapshot = ctx.snapshot();
                match format {
                    DumpFormat::Text => print!("{}", snapshot),
                    DumpFormat::Json => println!("{}", snapshot.to_json()?),
                }
            }
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
