use chrono::{DateTime, FixedOffset};
use std::fmt;

use crate::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Difficulty {
    Basic,
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Classifies a free-form difficulty label. Precedence when several
    /// keywords co-occur: basic > easy > hard > medium.
    pub fn classify(text: &str) -> Option<Difficulty> {
        let text = text.to_lowercase();
        if text.contains("basic") {
            Some(Difficulty::Basic)
        } else if text.contains("easy") {
            Some(Difficulty::Easy)
        } else if text.contains("hard") {
            Some(Difficulty::Hard)
        } else if text.contains("medium") {
            Some(Difficulty::Medium)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Basic => "Basic",
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProblemRecord {
    pub title: String,
    pub difficulty: Difficulty,
    pub topics: Vec<String>,
    pub company_tags: Vec<String>,
    pub interview_tags: Vec<String>,
    pub url: String,
    pub solution: String,
    pub language: String,
    pub timestamp: DateTime<FixedOffset>,
}

impl ProblemRecord {
    /// Fields the relay refuses to ship without. Checked before any network
    /// call is made.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.title.trim().is_empty() {
            return Err(SyncError::InvalidRecord("missing title"));
        }
        if self.url.trim().is_empty() {
            return Err(SyncError::InvalidRecord("missing url"));
        }
        if self.topics.is_empty() {
            return Err(SyncError::InvalidRecord("missing topics"));
        }
        if self.language.trim().is_empty() {
            return Err(SyncError::InvalidRecord("missing language"));
        }
        Ok(())
    }
}

impl fmt::Display for ProblemRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title           : {}", self.title)?;
        writeln!(f, "Difficulty      : {}", self.difficulty)?;
        writeln!(f, "Topics          : {}", self.topics.join(", "))?;
        writeln!(f, "Companies       : {}", self.company_tags.join(", "))?;
        writeln!(f, "Interview       : {}", self.interview_tags.join(", "))?;
        writeln!(f, "URL             : {}", self.url)?;
        writeln!(f, "Language        : {}", self.language)?;
        writeln!(f, "Captured        : {}", self.timestamp.to_rfc3339())?;
        writeln!(f, "Solution        : ")?;
        for line in self.solution.lines() {
            writeln!(f, "> {}", line)?;
        }
        Ok(())
    }
}

pub(crate) fn get_now() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(
        &chrono::offset::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
    )
    .unwrap()
}
