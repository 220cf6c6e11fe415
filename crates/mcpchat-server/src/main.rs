use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mcpchat_core::{logging, ConfigFile, ConfigLevel, FileConfigProvider};
use mcpchat_server::run_server;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "MCPCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// HTTP listen address (overrides config file)
    #[arg(long)]
    bind: Option<String>,

    /// SQLite database path (overrides config file)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Directory of .txt/.md/.pdf documentation (overrides config file)
    #[arg(long)]
    docs_dir: Option<PathBuf>,

    /// Model provider: anthropic or mock
    #[arg(long)]
    provider: Option<String>,

    /// Model identifier
    #[arg(long)]
    model: Option<String>,

    /// Log level or filter directives
    #[arg(long)]
    log_level: Option<String>,

    /// Write the config file (file values plus CLI flags) and exit
    #[arg(long)]
    init_config: bool,
}

impl Args {
    /// CLI flags win over file and environment
    fn apply(&self, config: &mut ConfigFile) {
        if let Some(bind) = &self.bind {
            config.server.bind = bind.clone();
        }
        if let Some(path) = &self.database {
            config.database.path = Some(path.clone());
        }
        if let Some(dir) = &self.docs_dir {
            config.docs.dir = dir.clone();
        }
        if let Some(name) = &self.provider {
            config.provider.name = name.clone();
        }
        if let Some(model) = &self.model {
            config.provider.model = model.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let provider = match &args.config {
        Some(path) => FileConfigProvider::new(path, ConfigLevel::User),
        None => FileConfigProvider::discover(std::env::current_dir().context("No working directory")?),
    };
    let mut config = provider
        .get_config()
        .with_context(|| format!("Failed to load {}", provider.path().display()))?;

    // Environment values stay out of the written file
    if args.init_config {
        args.apply(&mut config);
        let backup = provider
            .init(&config)
            .with_context(|| format!("Failed to write {}", provider.path().display()))?;
        println!("Wrote {}", provider.path().display());
        if let Some(backup) = backup {
            println!("Previous config saved to {}", backup.display());
        }
        return Ok(());
    }

    config.apply_env_overrides();
    args.apply(&mut config);
    config.validate()?;

    logging::init(&config.logging.level, config.logging.file.as_deref())?;

    run_server(config).await
}
