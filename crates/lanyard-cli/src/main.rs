mod cli;
mod render;
mod settings;

use std::process::ExitCode;

use chrono::Utc;
use lanyard_common::LanyardError;
use lanyard_config::LanyardConfig;
use lanyard_presence::PresenceLink;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use crate::cli::{Args, Command};
use crate::settings::DEFAULT_LOG_DIRECTIVE;

fn init_logging(directive: Option<&str>) {
    let filter = match directive {
        Some(directive) => {
            let mut filter = EnvFilter::from_default_env();
            for part in directive.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                match part.parse::<Directive>() {
                    Ok(d) => filter = filter.add_directive(d),
                    Err(e) => eprintln!("lanyard: ignoring log directive {part:?}: {e}"),
                }
            }
            filter
        }
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_DIRECTIVE)),
    };

    // Logs go to stderr so `watch --json` output stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    // Logging depends on the config's level, so the subscriber comes second.
    let loaded = settings::load(args.config.as_deref());
    let config_level = loaded.as_ref().ok().map(|c| c.logging.level.as_str());
    init_logging(settings::log_directive(args.log_level.as_deref(), config_level).as_deref());

    tracing::debug!("lanyard v{} starting", env!("CARGO_PKG_VERSION"));

    let config = match loaded {
        Ok(config) => config,
        Err(e) if args.config.is_none() => {
            tracing::warn!("Config load failed, using defaults: {e}");
            LanyardConfig::default()
        }
        Err(e) => {
            eprintln!("lanyard: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("lanyard: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args, mut config: LanyardConfig) -> Result<(), LanyardError> {
    settings::apply_overrides(&mut config, args.user_id.as_deref())?;

    match args.command {
        Command::Config => {
            println!("{}", lanyard_config::config_to_json(&config));
            Ok(())
        }
        Command::Fetch { json } => fetch(&config, json).await,
        Command::Watch { json } => watch(&config, json).await,
    }
}

async fn fetch(config: &LanyardConfig, json: bool) -> Result<(), LanyardError> {
    let user_id = settings::require_user_id(config)?;
    let client = settings::rest_client(config)?;
    let doc = client.fetch_presence(user_id).await?;

    if json {
        println!("{}", render::document_json(&doc));
    } else {
        println!("{}", render::document_line(&doc, Utc::now()));
    }
    Ok(())
}

async fn watch(config: &LanyardConfig, json: bool) -> Result<(), LanyardError> {
    let link_config = settings::link_config(config)?;
    tracing::info!(
        user_id = %link_config.user_id,
        endpoint = %link_config.endpoint,
        "Watching presence"
    );

    let link = PresenceLink::connect(link_config);
    let mut documents = link.subscribe();
    let mut states = link.watch_state();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = documents.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(doc) = documents.borrow_and_update().clone() else {
                    continue;
                };
                if json {
                    println!("{}", render::document_json(&doc));
                } else {
                    println!("{}", render::document_line(&doc, Utc::now()));
                }
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                if json {
                    println!("{}", render::state_json(&state));
                } else {
                    println!("{}", render::state_line(&state));
                }
            }
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    tracing::warn!("Failed to listen for Ctrl-C: {e}");
                }
                break;
            }
        }
    }

    let gauge = link.timer_gauge();
    link.shutdown().await;
    tracing::info!(live_timers = gauge.live(), "Shutdown complete");
    Ok(())
}
