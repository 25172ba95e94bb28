//! User facing caption options and the tables that translate them into
//! backend parameters. Every option keeps unrecognized input in an `Other`
//! variant so each table has an explicit fallback arm.

use serde::Serialize;
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumString};

fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase()
}

#[derive(Debug, Clone, PartialEq, Eq, Default, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Tone {
    #[default]
    Casual,
    Professional,
    Creative,
    Funny,
    #[strum(default)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Length {
    Short,
    #[default]
    Medium,
    Long,
    #[strum(default)]
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    Instagram,
    Linkedin,
    Twitter,
    X,
    Facebook,
    #[default]
    General,
    #[strum(default)]
    Other(String),
}

/// Captioning backend, either requested explicitly or derived from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumString, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Backend {
    #[strum(to_string = "local", serialize = "blip")]
    Local,
    #[strum(to_string = "remote", serialize = "gemini")]
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr, Serialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ModelUsed {
    Local,
    Remote,
    RemoteThenLocalFallback,
}

macro_rules! impl_option {
    ($name:ident, $($variant:ident => $text:literal),+ $(,)?) => {
        impl $name {
            /// Parse user input, case-insensitive. Never fails: unknown values
            /// are kept as `Other`.
            pub fn parse(s: &str) -> Self {
                let s = normalize(s);
                Self::from_str(&s).unwrap_or(Self::Other(s))
            }

            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $text,)+
                    Self::Other(v) => v.as_str(),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

impl_option!(Tone, Casual => "casual", Professional => "professional", Creative => "creative", Funny => "funny");
impl_option!(Length, Short => "short", Medium => "medium", Long => "long");
impl_option!(Platform, Instagram => "instagram", Linkedin => "linkedin", Twitter => "twitter", X => "x", Facebook => "facebook", General => "general");

impl Tone {
    pub fn style_guidance(&self) -> &'static str {
        match self {
            Self::Casual => "Use a friendly, relaxed, and conversational style.",
            Self::Professional => "Use a polished, business-appropriate, and authoritative style.",
            Self::Creative => {
                "Use imaginative, artistic, and expressive language with vivid descriptions."
            }
            Self::Funny => "Use humor, wit, and playful language to entertain.",
            Self::Other(_) => Self::Casual.style_guidance(),
        }
    }
}

impl Length {
    /// (min, max) token bounds for the local model
    pub fn token_bounds(&self) -> (usize, usize) {
        match self {
            Self::Short => (10, 20),
            Self::Medium => (20, 40),
            Self::Long => (30, 55),
            Self::Other(_) => Self::Medium.token_bounds(),
        }
    }

    /// conditioning text for the local model
    pub fn local_prompt_text(&self) -> &'static str {
        match self {
            Self::Long => "A detailed and descriptive photo of",
            Self::Short | Self::Medium | Self::Other(_) => "a photo of",
        }
    }

    pub fn word_guidance(&self) -> &'static str {
        match self {
            Self::Short => "Keep it brief and punchy (1-2 sentences, around 10-20 words).",
            Self::Medium => "Make it engaging and informative (2-3 sentences, around 20-40 words).",
            Self::Long => {
                "Create a detailed and descriptive caption (3-5 sentences, around 40-70 words)."
            }
            Self::Other(_) => Self::Medium.word_guidance(),
        }
    }
}

impl Platform {
    /// Platforms captioned with the remote model unless the caller says otherwise.
    pub fn is_social(&self) -> bool {
        match self {
            Self::Instagram | Self::Linkedin | Self::Twitter | Self::X | Self::Facebook => true,
            Self::General | Self::Other(_) => false,
        }
    }

    pub fn format_template(&self, include_hashtags: bool) -> &'static str {
        match (self, include_hashtags) {
            (Self::Instagram, true) => concat!(
                "REPLICATE THIS STRUCTURE EXACTLY: 📸 Instagram\n\"[Caption text with emojis] #Hashtag1 #Hashtag2 #Hashtag3\"\n",
                "Example: 📸 Instagram\n\"Chasing sunsets and dreams 🌅✨ #VibesOnly #GoldenHour #SunsetLovers\""
            ),
            (Self::Instagram, false) => concat!(
                "REPLICATE THIS STRUCTURE EXACTLY: 📸 Instagram\n\"[Caption text with emojis]\"\n",
                "Example: 📸 Instagram\n\"Chasing sunsets and dreams 🌅✨\""
            ),
            (Self::Facebook, true) => concat!(
                "REPLICATE THIS STRUCTURE EXACTLY: 📘 Facebook\n\"[Caption text with emojis] #Hashtag1 #Hashtag2\"\n",
                "Example: 📘 Facebook\n\"Good times + great friends = unforgettable memories 💙😊 #FriendshipGoals #GoodVibes\""
            ),
            (Self::Facebook, false) => concat!(
                "REPLICATE THIS STRUCTURE EXACTLY: 📘 Facebook\n\"[Caption text with emojis]\"\n",
                "Example: 📘 Facebook\n\"Good times + great friends = unforgettable memories 💙😊\""
            ),
            (Self::Twitter | Self::X, true) => concat!(
                "REPLICATE THIS STRUCTURE EXACTLY: 🐦 Twitter (X)\n\"[Caption text with emojis] #Hashtag1 #Hashtag2 #Hashtag3\"\n",
                "Example: 🐦 Twitter (X)\n\"Small steps lead to big changes. Keep moving forward. 💪 #Motivation #DailyInspo #GrowthMindset\""
            ),
            (Self::Twitter | Self::X, false) => concat!(
                "REPLICATE THIS STRUCTURE EXACTLY: 🐦 Twitter (X)\n\"[Caption text with emojis]\"\n",
                "Example: 🐦 Twitter (X)\n\"Small steps lead to big changes. Keep moving forward. 💪\""
            ),
            (Self::Linkedin, true) => concat!(
                "REPLICATE THIS STRUCTURE EXACTLY: 💼 LinkedIn\n\"[Caption text with emojis] #Hashtag1 #Hashtag2 #Hashtag3\"\n",
                "Example: 💼 LinkedIn\n\"Grateful to be learning, growing, and creating impact every day 🚀 #ProfessionalGrowth #Networking #CareerDevelopment\""
            ),
            (Self::Linkedin, false) => concat!(
                "REPLICATE THIS STRUCTURE EXACTLY: 💼 LinkedIn\n\"[Caption text with emojis]\"\n",
                "Example: 💼 LinkedIn\n\"Grateful to be learning, growing, and creating impact every day 🚀\""
            ),
            (Self::General | Self::Other(_), true) => concat!(
                "REPLICATE THIS STRUCTURE EXACTLY: [Caption text with 3-5 relevant hashtags at the end]. ",
                "Example: 'A beautiful landscape view with mountains and a lake. #Nature #Landscape #Mountains #Photography #Scenic'"
            ),
            (Self::General | Self::Other(_), false) => concat!(
                "REPLICATE THIS STRUCTURE EXACTLY: [Caption text without prefix or hashtags]. ",
                "Example: 'A beautiful landscape view with mountains and a lake.'"
            ),
        }
    }
}

pub fn hashtag_guidance(include_hashtags: bool) -> &'static str {
    if include_hashtags {
        "Include 3-5 relevant and trending hashtags that match the image content and platform."
    } else {
        "Do NOT include any hashtags."
    }
}
