use anyhow::Context;
use atlas_rs::CliOverrides;
use atlas_rs::config::{AtlasConfig, LayeredConfigOptions};
use atlas_rs::core::{AskClient, HttpAskClient, recognizer_from_config, speaker_from_config};
use atlas_rs::protocol::Language;
use clap::Parser;
use log::{debug, info};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "atlas", version, about = "Terminal client for the Atlas assistant")]
struct Cli {
    /// Extra atlas.json5 layer applied after the discovered ones (repeatable)
    #[arg(long = "config")]
    config: Vec<PathBuf>,
    /// Base URL of the answering service
    #[arg(long)]
    base_url: Option<String>,
    /// Conversation language (en or ar)
    #[arg(long)]
    lang: Option<Language>,
    /// Enable the retrieval-only debug submission (Ctrl+D)
    #[arg(long)]
    debug_tools: bool,
    /// Submit automatically when speech recognition ends
    #[arg(long)]
    auto_send: bool,
    /// External speech-to-text command; {lang} expands to the locale
    #[arg(long)]
    speech_command: Option<String>,
    /// External text-to-speech command fed on stdin; {lang} expands to the locale
    #[arg(long)]
    speak_command: Option<String>,
    /// Print the service health as JSON and exit
    #[arg(long)]
    check: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            base_url: self.base_url.clone(),
            language: self.lang,
            debug_tools: self.debug_tools,
            auto_send: self.auto_send,
            speech_command: self.speech_command.clone(),
            speak_command: self.speak_command.clone(),
        }
    }
}

/// Entry point for the Atlas terminal client.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    atlas_rs::init_logging();

    let cli = Cli::parse();
    info!(
        "starting atlas (config_layers={}, base_url_set={}, check={})",
        cli.config.len(),
        cli.base_url.is_some(),
        cli.check
    );

    let cwd = std::env::current_dir().context("failed to resolve current working directory")?;
    let options = cli
        .config
        .iter()
        .fold(LayeredConfigOptions::new(&cwd), |options, path| {
            options.with_runtime_path(path)
        });
    let layered =
        AtlasConfig::load_layered_with_options(options).context("failed to load layered config")?;
    debug!("layered config loaded (layers={})", layered.layers.len());

    let mut config = layered.config;
    cli.overrides().apply(&mut config);
    config.validate().context("invalid command-line override")?;

    let client = HttpAskClient::new(&config.client).context("failed to build http client")?;
    if cli.check {
        let health = client
            .health()
            .await
            .context("service health check failed")?;
        println!("{}", serde_json::to_string_pretty(&health)?);
        return Ok(());
    }

    let client: Arc<dyn AskClient> = Arc::new(client);
    let recognizer = recognizer_from_config(&config.input);
    let speaker = speaker_from_config(&config.input);
    atlas_rs::tui::run(config, client, recognizer, speaker)
        .await
        .context("terminal ui failed")
}
