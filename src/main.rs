//! webfilter 命令行入口

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use webfilter::actions::{self, DomainAction};
use webfilter::env::{generate_env_docs, EnvConfig};
use webfilter::error::helpers::config_error;
use webfilter::logging;
use webfilter::messaging::{MessageSink, NullSink, WriterSink};
use webfilter::{
    Config, ConfigStore, FilterResult, FilterSession, HtmlDocument, Location, RedbStorage,
};

#[derive(Parser)]
#[command(name = "webfilter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Filter profanity out of HTML documents")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input HTML file, reads stdin when omitted or "-"
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stored configuration database
    #[arg(short, long, value_name = "PATH")]
    storage: Option<PathBuf>,

    /// Page URL used for domain policy
    #[arg(short, long, default_value = "http://localhost/", value_name = "URL")]
    url: String,

    /// Top-level page URL when the document is a frame
    #[arg(long, value_name = "URL")]
    top_url: Option<String>,

    /// Output file, writes stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Input character encoding
    #[arg(short, long, default_value = "utf-8")]
    encoding: String,

    /// Print the filtered word summary as JSON to stderr
    #[arg(long)]
    summary: bool,

    /// Print outbound messages as JSON lines to stderr
    #[arg(long)]
    messages: bool,

    /// Log level (overrides WEBFILTER_LOG_LEVEL)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a word to the stored configuration
    AddWord {
        word: String,
        #[arg(short, long, value_name = "PATH")]
        storage: Option<PathBuf>,
    },
    /// Remove a word from the stored configuration
    RemoveWord {
        word: String,
        #[arg(short, long, value_name = "PATH")]
        storage: Option<PathBuf>,
    },
    /// Toggle filtering (or advanced mode) for a hostname
    ToggleDomain {
        hostname: String,
        #[arg(long)]
        advanced: bool,
        #[arg(short, long, value_name = "PATH")]
        storage: Option<PathBuf>,
    },
    /// Print the supported environment variables
    EnvDocs,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_tracing(cli.log_level.as_deref()) {
        eprintln!("Warning: {}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> FilterResult<()> {
    let env = EnvConfig::from_env()?;

    match &cli.command {
        Some(Commands::AddWord { word, storage }) => {
            let mut store = open_store(storage.as_ref().or(env.storage_path.as_ref()))?;
            report(actions::add_selection(&mut store, word)?, "added", word);
            Ok(())
        }
        Some(Commands::RemoveWord { word, storage }) => {
            let mut store = open_store(storage.as_ref().or(env.storage_path.as_ref()))?;
            report(actions::remove_selection(&mut store, word)?, "removed", word);
            Ok(())
        }
        Some(Commands::ToggleDomain {
            hostname,
            advanced,
            storage,
        }) => {
            let mut store = open_store(storage.as_ref().or(env.storage_path.as_ref()))?;
            let action = if *advanced {
                DomainAction::Advanced
            } else {
                DomainAction::Disable
            };
            report(
                actions::toggle_domain(&mut store, hostname, action)?,
                "toggled",
                hostname,
            );
            Ok(())
        }
        Some(Commands::EnvDocs) => {
            print!("{}", generate_env_docs());
            Ok(())
        }
        None => run_filter(&cli, &env),
    }
}

fn report(changed: bool, verb: &str, subject: &str) {
    if changed {
        println!("{} {}", verb, subject);
    } else {
        println!("unchanged {}", subject);
    }
}

fn open_store(path: Option<&PathBuf>) -> FilterResult<ConfigStore<RedbStorage>> {
    let path = path.ok_or_else(|| config_error("--storage or WEBFILTER_STORAGE_PATH is required"))?;
    Ok(ConfigStore::new(RedbStorage::open(path)?))
}

/// 配置来源：配置文件优先，其次存储，最后默认值
fn load_config(cli: &Cli, env: &EnvConfig) -> FilterResult<Config> {
    let mut cfg = if let Some(path) = cli.config.as_ref().or(env.config_path.as_ref()) {
        Config::load_file(path)?
    } else if let Some(path) = cli.storage.as_ref().or(env.storage_path.as_ref()) {
        open_store(Some(path))?.load()?
    } else {
        Config::default()
    };
    cfg.apply_env()?;
    Ok(cfg)
}

fn read_input(input: Option<&Path>) -> FilterResult<Vec<u8>> {
    match input {
        Some(path) if path != Path::new("-") => Ok(fs::read(path)?),
        _ => {
            let mut data = Vec::new();
            io::stdin().read_to_end(&mut data)?;
            Ok(data)
        }
    }
}

fn run_filter(cli: &Cli, env: &EnvConfig) -> FilterResult<()> {
    let cfg = load_config(cli, env)?;
    let data = read_input(cli.input.as_deref())?;
    let doc = HtmlDocument::parse(&data, &cli.encoding)?;
    let location = Location::resolve(&cli.url, cli.top_url.as_deref())?;

    let sink: Box<dyn MessageSink> = if cli.messages {
        Box::new(WriterSink::new(io::stderr()))
    } else {
        Box::new(NullSink)
    };
    let mut session = FilterSession::new(cfg, location, sink);
    session.start(&doc)?;
    tracing::info!("过滤完成，共替换 {} 处", session.filter().counter());

    let html = doc.to_html()?;
    match &cli.output {
        Some(path) => fs::write(path, html)?,
        None => io::stdout().write_all(html.as_bytes())?,
    }

    if cli.summary {
        let summary = serde_json::to_string_pretty(session.filter().summary())?;
        eprintln!("{}", summary);
    }
    Ok(())
}
