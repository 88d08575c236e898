// src/main.rs — scrimmage entry point

use std::path::Path;
use std::sync::{Arc, Mutex};

use clap::Parser;

use scrimmage::cli::{self, Cli, Commands};
use scrimmage::infra::config::Config;
use scrimmage::infra::errors::ScrimmageError;
use scrimmage::infra::logger;
use scrimmage::infra::paths;
use scrimmage::provider::openai_compat::OpenAICompatProvider;
use scrimmage::provider::DialogueModel;
use scrimmage::store::Store;

#[tokio::main]
async fn main() {
    // RUST_LOG overrides the default level
    logger::init_logging("warn");

    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(Path::new(path))?,
        None => Config::load()?,
    };

    paths::ensure_dirs().await?;
    // Store unavailability is fatal: every command needs it
    let store = open_store()?;

    match cli.command {
        Commands::Status { verbose } => cli::status::show_status(&store, &config, verbose),
        Commands::Profiles { seed } => cli::profiles::run_profiles(&store, seed),
        Commands::Run {
            profile,
            script,
            transcript,
        } => {
            let model = build_model(&config)?;
            cli::run::run_session(
                model,
                store,
                &config,
                profile.as_deref(),
                script.as_deref().map(Path::new),
                transcript,
            )
            .await
        }
        Commands::Sweep {
            total,
            profile,
            script,
            rank,
        } => {
            let model = build_model(&config)?;
            cli::sweep::run_sweep(
                model,
                store,
                &config,
                total,
                &profile,
                script.as_deref().map(Path::new),
                rank,
            )
            .await
        }
        Commands::Rank { sweep_id } => {
            let model = build_model(&config)?;
            cli::rank::run_rank(model, store, &config, &sweep_id).await
        }
    }
}

fn open_store() -> anyhow::Result<Arc<Mutex<Store>>> {
    let db_path = paths::db_path();
    Ok(Arc::new(Mutex::new(Store::open(&db_path)?)))
}

/// Resolve the chat endpoint from config plus environment.
fn build_model(config: &Config) -> anyhow::Result<Arc<dyn DialogueModel>> {
    let api_key = std::env::var(&config.provider.api_key_env).map_err(|_| {
        ScrimmageError::NoProvider {
            env_var: config.provider.api_key_env.clone(),
        }
    })?;
    Ok(Arc::new(OpenAICompatProvider::new(
        "openai-compat",
        api_key,
        config.provider.base_url.clone(),
    )))
}
