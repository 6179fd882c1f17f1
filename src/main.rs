use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use waav_speak::{
    ElevenLabsClient, ElevenLabsConfig, PlaybackEngine, PlaybackOutcome, PluginSettings,
    SynthesisSession, core::playback::CpalOutput,
};

/// WaaV Speak - speak text through ElevenLabs streaming TTS
#[derive(Parser, Debug)]
#[command(name = "waav-speak")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the settings file (JSON)
    #[arg(short = 'c', long = "settings", value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Speak the given text
    Speak {
        /// Text to speak
        #[arg(required = true)]
        text: Vec<String>,

        /// Voice id for this request only
        #[arg(long = "voice-id")]
        voice_id: Option<String>,
    },

    /// Show or update the stored settings
    Settings {
        /// New API key
        #[arg(long = "api-key")]
        api_key: Option<String>,

        /// New voice id (empty resets to the default voice)
        #[arg(long = "voice-id")]
        voice_id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists (must be done before settings are read)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let settings_path = match cli.settings {
        Some(path) => path,
        None => PluginSettings::default_path()?,
    };

    match cli.command {
        Commands::Settings { api_key, voice_id } => {
            let mut settings = PluginSettings::load_or_default(&settings_path);
            if api_key.is_some() || voice_id.is_some() {
                settings.apply_update(api_key, voice_id);
                settings.save(&settings_path)?;
                println!("Settings saved to {}", settings_path.display());
            }
            println!("API key:  {}", settings.masked_api_key());
            println!("Voice id: {}", settings.voice_id);
            Ok(())
        }
        Commands::Speak { text, voice_id } => {
            let mut settings = PluginSettings::load_or_default(&settings_path).with_env_overrides();
            if let Some(voice_id) = voice_id {
                settings = settings.with_voice_id(voice_id);
            }
            if !settings.has_api_key() {
                anyhow::bail!(
                    "API key not configured. Run `waav-speak settings --api-key <KEY>` or set ELEVENLABS_API_KEY."
                );
            }

            let client = ElevenLabsClient::new(ElevenLabsConfig::default())
                .map_err(|e| anyhow!("Failed to create ElevenLabs client: {e}"))?;
            let engine = Arc::new(PlaybackEngine::new(Arc::new(CpalOutput::new())));
            let session = Arc::new(SynthesisSession::new(Arc::new(client), engine, settings));

            let stopper = session.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupted, stopping playback");
                    stopper.stop();
                }
            });

            match session.speak_text(&text.join(" ")).await {
                Ok(PlaybackOutcome::Completed) => Ok(()),
                Ok(PlaybackOutcome::Cancelled) => {
                    warn!("Playback cancelled");
                    Ok(())
                }
                Err(e) => Err(anyhow!("Error: {}", e.user_message())),
            }
        }
    }
}
