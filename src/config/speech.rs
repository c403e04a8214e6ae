//! Learner-facing speech settings and the tutor instructions derived from them.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Voice used by the hosted model.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Voice {
    #[default]
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
}

/// Conversation scenario picked on the mode-select screen.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PracticeMode {
    #[default]
    Casual,
    Polite,
    Business,
    Travel,
}

impl PracticeMode {
    fn scenario(self) -> &'static str {
        match self {
            Self::Casual => {
                "Chat like a friendly peer. Use plain form (だ/である調) and everyday topics."
            }
            Self::Polite => {
                "Speak as a courteous acquaintance. Use です/ます form consistently."
            }
            Self::Business => {
                "Role-play a workplace conversation. Use keigo (尊敬語 and 謙譲語) where natural."
            }
            Self::Travel => {
                "Role-play situations a traveller meets in Japan: hotels, stations, restaurants, shops."
            }
        }
    }
}

/// Self-reported learner level.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LearnerLevel {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl LearnerLevel {
    fn pacing(self) -> &'static str {
        match self {
            Self::Beginner => {
                "Keep sentences short, speak slowly, and prefer vocabulary around JLPT N5-N4."
            }
            Self::Intermediate => "Use natural sentences around JLPT N3 and occasionally introduce new words.",
            Self::Advanced => "Speak at native pace with idiomatic expressions around JLPT N2-N1.",
        }
    }
}

/// Settings shared by every part of a practice session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeechSettings {
    #[serde(default)]
    pub mode: PracticeMode,
    #[serde(default)]
    pub level: LearnerLevel,
    #[serde(default)]
    pub voice: Voice,
}

impl SpeechSettings {
    /// Tutor instructions sent with `session.update`.
    pub fn instructions(&self) -> String {
        format!(
            "You are Kaiwa Kun, a patient Japanese conversation tutor. \
             Reply only in Japanese unless the learner explicitly asks for English. \
             {} {} Keep each reply to a few sentences and end with a question \
             so the learner keeps talking.",
            self.mode.scenario(),
            self.level.pacing(),
        )
    }
}
