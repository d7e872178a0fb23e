//! Static factual knowledge: recognized topics and their canned answers.
//!
//! The gazetteer is an ordered list. Topic detection returns the first entry
//! whose name occurs in the input, so entry order decides ties such as
//! "united kingdom" versus "uk".

use std::collections::HashSet;
use std::path::Path;

use parley_core::error::{ParleyError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// One recognized topic with its optional capital and places answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicEntry {
    pub name: String,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub places: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GazetteerFile {
    #[serde(default)]
    topics: Vec<TopicEntry>,
}

/// Read-only topic table, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Gazetteer {
    entries: Vec<TopicEntry>,
}

const CAPITALS: &[(&str, &str)] = &[
    ("france", "The capital of France is Paris."),
    ("india", "The capital of India is New Delhi."),
    ("italy", "The capital of Italy is Rome."),
    ("united states", "The capital of United States is Washington, D.C."),
    ("usa", "The capital of United States is Washington, D.C."),
    ("united kingdom", "The capital of United Kingdom is London."),
    ("uk", "The capital of United Kingdom is London."),
    ("germany", "The capital of Germany is Berlin."),
    ("spain", "The capital of Spain is Madrid."),
    ("canada", "The capital of Canada is Ottawa."),
    ("australia", "The capital of Australia is Canberra."),
    ("japan", "The capital of Japan is Tokyo."),
    ("china", "The capital of China is Beijing."),
    ("russia", "The capital of Russia is Moscow."),
    ("brazil", "The capital of Brazil is Brasilia."),
    ("mexico", "The capital of Mexico is Mexico City."),
];

const PLACES: &[(&str, &str)] = &[
    (
        "france",
        "France offers many famous attractions including the iconic Eiffel Tower, the Louvre \
         Museum (home to the Mona Lisa), the Palace of Versailles, Mont Saint-Michel, and the \
         beautiful French Riviera.",
    ),
    (
        "paris",
        "Paris has many famous attractions including the Eiffel Tower, the Louvre Museum, \
         Notre-Dame Cathedral, Arc de Triomphe, Champs-Elysees, and Montmartre.",
    ),
    (
        "italy",
        "Italy offers many famous attractions including the Colosseum and Roman Forum in Rome, \
         the canals of Venice, the Leaning Tower of Pisa, Florence's Renaissance art and \
         architecture, and the beautiful Amalfi Coast.",
    ),
    (
        "rome",
        "Rome has many famous attractions including the Colosseum, Roman Forum, Vatican City \
         (with St. Peter's Basilica), the Pantheon, Trevi Fountain, Spanish Steps, and \
         countless museums and piazzas.",
    ),
    (
        "india",
        "India has many interesting places including the Taj Mahal in Agra, the historic Red \
         Fort in Delhi, the sacred city of Varanasi, the beaches of Goa, and the backwaters of \
         Kerala.",
    ),
];

/// Topics that only carry places answers, appended after the capital table.
const EXTRA_TOPICS: &[&str] = &["paris", "rome"];

impl Gazetteer {
    /// The built-in country/city table.
    pub fn builtin() -> Self {
        let lookup_places = |name: &str| {
            PLACES
                .iter()
                .find(|(topic, _)| *topic == name)
                .map(|(_, text)| text.to_string())
        };

        let mut entries: Vec<TopicEntry> = CAPITALS
            .iter()
            .map(|(name, capital)| TopicEntry {
                name: name.to_string(),
                capital: Some(capital.to_string()),
                places: lookup_places(name),
            })
            .collect();

        entries.extend(EXTRA_TOPICS.iter().map(|name| TopicEntry {
            name: name.to_string(),
            capital: None,
            places: lookup_places(name),
        }));

        Self { entries }
    }

    /// Build a gazetteer from explicit entries, normalizing names to
    /// trimmed lowercase. Rejects empty and duplicate names.
    pub fn from_entries(entries: Vec<TopicEntry>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(entries.len());

        for mut entry in entries {
            entry.name = entry.name.trim().to_lowercase();
            if entry.name.is_empty() {
                return Err(ParleyError::Knowledge("topic name cannot be empty".to_string()));
            }
            if !seen.insert(entry.name.clone()) {
                return Err(ParleyError::Knowledge(format!(
                    "duplicate topic '{}'",
                    entry.name
                )));
            }
            normalized.push(entry);
        }

        Ok(Self {
            entries: normalized,
        })
    }

    /// Parse a TOML document with an ordered `[[topics]]` array.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: GazetteerFile = toml::from_str(content)?;
        Self::from_entries(file.topics)
    }

    /// Load a TOML gazetteer file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let gazetteer = Self::from_toml_str(&content)?;
        info!(
            path = %path.display(),
            topics = gazetteer.len(),
            "Gazetteer loaded"
        );
        Ok(gazetteer)
    }

    /// Topic names in lookup order.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// First topic, in table order, that occurs as a substring of `text`.
    ///
    /// `text` is expected to be lowercase already.
    pub fn first_mention(&self, text: &str) -> Option<&str> {
        self.topics().find(|topic| text.contains(topic))
    }

    pub fn capital(&self, topic: &str) -> Option<&str> {
        self.entry(topic).and_then(|e| e.capital.as_deref())
    }

    pub fn places(&self, topic: &str) -> Option<&str> {
        self.entry(topic).and_then(|e| e.places.as_deref())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, topic: &str) -> Option<&TopicEntry> {
        self.entries.iter().find(|e| e.name == topic)
    }
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self::builtin()
    }
}
