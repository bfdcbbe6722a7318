//! ragchat CLI entry point.
//!
//! - `ragchat init` - write a starter ragchat.toml
//! - `ragchat ingest <file> -p <profile>` - chunk, embed and store a document
//! - `ragchat ask <question> -p <profile>` - answer from a profile
//! - `ragchat prompt <text>` - talk to the model directly
//! - `ragchat profiles list|drop` - manage profiles
//! - `ragchat config [--validate]` - show or check the configuration

use owo_colors::OwoColorize;
use ragchat::cli::init::{self, InitConfig, InitResult};
use ragchat::cli::output::Output;
use ragchat::cli::{Cli, Commands, ProfileCommands};
use ragchat::{AppError, ProfileStore, RagChatConfig, RagPipeline, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    let colored = !cli.no_color;

    if let Err(e) = run(cli).await {
        if colored {
            eprintln!("{} {}", "Error:".red().bold(), e);
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout only carries answers.
fn init_tracing(log_level: &str, verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { log_level };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
    });

    // A second init (tests, embedding) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

async fn run(cli: Cli) -> Result<()> {
    dotenvy::dotenv().ok();

    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    if let Commands::Init {
        path,
        force,
        provider,
    } = cli.command
    {
        init_tracing("info", cli.verbose);
        return match init::run(
            InitConfig {
                path,
                force,
                provider,
            },
            &output,
        ) {
            InitResult::Success => Ok(()),
            InitResult::AlreadyExists => Err(AppError::Validation(
                "ragchat.toml already exists (use --force to overwrite)".into(),
            )),
            InitResult::Error(e) => Err(AppError::Internal(e)),
        };
    }

    let config = RagChatConfig::load_or_default(&cli.config)?;
    init_tracing(&config.logging.log_level, cli.verbose);

    match cli.command {
        Commands::Init { .. } => Ok(()),
        Commands::Ingest { file, profile } => {
            let profile = required(profile, "Profile name:", &output)?;
            let file = match file {
                Some(file) => file,
                None => PathBuf::from(required(None, "Document path:", &output)?),
            };

            let pipeline = RagPipeline::from_config(&config).await?;
            let report = pipeline.ingest(&profile, &file).await?;

            output.success(&format!(
                "Ingested {} into profile '{}'",
                file.display(),
                report.profile
            ));
            output.kv("chunks", &report.chunks.to_string());
            output.kv("duration", &format!("{} ms", report.duration_ms));
            output.header("Record ids");
            for id in &report.ids {
                output.list_item(id);
            }
            Ok(())
        }
        Commands::Ask {
            question,
            profile,
            top_k,
            show_prompt,
        } => {
            let profile = required(profile, "Profile name:", &output)?;
            let question = required(question, "Question:", &output)?;

            let pipeline = RagPipeline::from_config(&config).await?;
            let k = top_k.unwrap_or_else(|| pipeline.top_k());
            let answer = pipeline.ask(&profile, &question, k).await?;

            if answer.sources.is_empty() {
                output.warning(&format!(
                    "Profile '{}' has no matching content; answering without context",
                    profile
                ));
            }
            if show_prompt {
                output.header("Prompt");
                println!("{}", answer.prompt);
                output.header("Answer");
            }
            println!("{}", answer.answer);
            Ok(())
        }
        Commands::Prompt { text } => {
            let client = config.llm.to_provider()?.create_client()?;
            let timeout = config.llm.timeout();
            let reply = tokio::time::timeout(timeout, client.generate(&text))
                .await
                .map_err(|_| {
                    AppError::LLM(format!("Model did not answer within {}s", timeout.as_secs()))
                })??;
            println!("{}", reply);
            Ok(())
        }
        Commands::Profiles(command) => {
            let store = config.store.backend.create_store().await?;
            let profiles = ProfileStore::new(
                Arc::from(store),
                config.embedding.dimensions,
                config.store.distance,
                config.store.write_policy,
            )?;

            match command {
                ProfileCommands::List => {
                    let infos = profiles.list_profiles().await?;
                    if infos.is_empty() {
                        output.info("No profiles yet");
                        return Ok(());
                    }
                    output.table_header(&["Profile", "Records", "Dimensions", "Metric"]);
                    for info in infos {
                        let records = info.document_count.to_string();
                        let dimensions = info.dimensions.to_string();
                        output.table_row(&[
                            info.name.as_str(),
                            records.as_str(),
                            dimensions.as_str(),
                            info.distance_metric.name(),
                        ]);
                    }
                }
                ProfileCommands::Drop { name } => {
                    if profiles.drop_profile(&name).await? {
                        output.success(&format!("Dropped profile '{}'", name));
                    } else {
                        output.warning(&format!("Profile '{}' does not exist", name));
                    }
                }
            }
            Ok(())
        }
        Commands::Config { validate } => {
            let missing = config.missing_env_vars();
            if validate {
                output.success(&format!("{} is valid", cli.config.display()));
            } else {
                print!("{}", config.to_toml()?);
            }
            for name in missing {
                output.warning(&format!("Environment variable {} is not set", name));
            }
            Ok(())
        }
    }
}

/// Use the given value, or ask for it on stdin.
fn required(value: Option<String>, prompt: &str, output: &Output) -> Result<String> {
    let value = match value {
        Some(value) => value.trim().to_string(),
        None => output.prompt(prompt)?,
    };
    if value.is_empty() {
        return Err(AppError::Validation(format!(
            "{} cannot be empty",
            prompt.trim_end_matches(':')
        )));
    }
    Ok(value)
}
