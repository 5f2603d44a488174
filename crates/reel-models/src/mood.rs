//! Mood categories and the background music catalog.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

/// Number of curated tracks registered under each mood.
pub const TRACKS_PER_MOOD: usize = 5;

/// Default base URL of the curated track library.
pub const DEFAULT_MUSIC_BASE_URL: &str = "https://cdn.reelgen.app/music/";

/// Mood/style category driving background track selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    #[default]
    Upbeat,
    Energetic,
    Calm,
    Happy,
    Inspirational,
    Corporate,
    Dramatic,
    Romantic,
    Chill,
}

impl Mood {
    /// All known moods.
    pub const ALL: &'static [Mood] = &[
        Mood::Upbeat,
        Mood::Energetic,
        Mood::Calm,
        Mood::Happy,
        Mood::Inspirational,
        Mood::Corporate,
        Mood::Dramatic,
        Mood::Romantic,
        Mood::Chill,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Upbeat => "upbeat",
            Mood::Energetic => "energetic",
            Mood::Calm => "calm",
            Mood::Happy => "happy",
            Mood::Inspirational => "inspirational",
            Mood::Corporate => "corporate",
            Mood::Dramatic => "dramatic",
            Mood::Romantic => "romantic",
            Mood::Chill => "chill",
        }
    }

    /// Resolve a caller-supplied key, falling back to the default mood.
    pub fn from_key(key: &str) -> Self {
        key.trim().parse().unwrap_or_default()
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Mood {
    type Err = MoodParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        Mood::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == lower)
            .ok_or_else(|| MoodParseError(s.to_string()))
    }
}

#[derive(Debug, Error)]
#[error("Unknown mood: {0}")]
pub struct MoodParseError(String);

/// Immutable mapping from mood to its curated track URLs.
#[derive(Debug, Clone)]
pub struct MusicCatalog {
    tracks: HashMap<Mood, Vec<Url>>,
}

impl MusicCatalog {
    /// Build the catalog laid out as `<base>/<mood>/<mood>-<n>.mp3`, n = 1..=5.
    pub fn from_base_url(base: &str) -> Result<Self, url::ParseError> {
        let base = if base.ends_with('/') {
            Url::parse(base)?
        } else {
            Url::parse(&format!("{}/", base))?
        };

        let mut tracks = HashMap::with_capacity(Mood::ALL.len());
        for mood in Mood::ALL {
            let urls = (1..=TRACKS_PER_MOOD)
                .map(|n| base.join(&format!("{0}/{0}-{1}.mp3", mood.as_str(), n)))
                .collect::<Result<Vec<_>, _>>()?;
            tracks.insert(*mood, urls);
        }

        Ok(Self { tracks })
    }

    /// Replace the tracks registered under one mood.
    pub fn with_tracks(mut self, mood: Mood, urls: Vec<Url>) -> Self {
        self.tracks.insert(mood, urls);
        self
    }

    /// Tracks for a mood, or the default mood's tracks if none are registered.
    pub fn tracks(&self, mood: Mood) -> &[Url] {
        match self.tracks.get(&mood) {
            Some(urls) if !urls.is_empty() => urls,
            _ => self
                .tracks
                .get(&Mood::default())
                .map(Vec::as_slice)
                .unwrap_or(&[]),
        }
    }
}

impl Default for MusicCatalog {
    fn default() -> Self {
        Self::from_base_url(DEFAULT_MUSIC_BASE_URL).unwrap_or_else(|_| Self {
            tracks: HashMap::new(),
        })
    }
}
