//! CLI entry point for Kaiwa.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::config::{KaiwaConfig, LearnerLevel, PracticeMode, SpeechSettings, Voice};
use crate::error::Result;

/// Kaiwa conversation practice CLI
#[derive(Parser, Debug)]
#[command(name = "kaiwa", version, about = "Practice Japanese conversation with a realtime AI tutor")]
pub struct Cli {
    /// Path to a kaiwa.toml configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a typed conversation over the realtime WebSocket
    Talk(TalkArgs),
    /// Print the summary of a finished chat
    Summary(SummaryArgs),
}

/// Arguments for `kaiwa talk`.
#[derive(Parser, Debug)]
pub struct TalkArgs {
    /// Practice mode (casual, polite, business, travel)
    #[arg(short, long)]
    pub mode: Option<PracticeMode>,

    /// Learner level (beginner, intermediate, advanced)
    #[arg(short, long)]
    pub level: Option<LearnerLevel>,

    /// Tutor voice
    #[arg(short, long)]
    pub voice: Option<Voice>,

    /// End the session after this many minutes
    #[arg(long)]
    pub minutes: Option<u64>,
}

impl TalkArgs {
    /// Overlay command-line choices on loaded settings.
    pub fn apply(&self, config: KaiwaConfig) -> KaiwaConfig {
        let speech = SpeechSettings {
            mode: self.mode.unwrap_or(config.speech.mode),
            level: self.level.unwrap_or(config.speech.level),
            voice: self.voice.unwrap_or(config.speech.voice),
        };
        config.with_speech(speech)
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.minutes.map(|minutes| Duration::from_secs(minutes.saturating_mul(60)))
    }
}

/// Arguments for `kaiwa summary`.
#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Chat identifier returned when the conversation started
    pub chat_id: i64,
}

impl Cli {
    pub fn load_config(&self) -> Result<KaiwaConfig> {
        KaiwaConfig::load(self.config.as_deref())
    }
}
