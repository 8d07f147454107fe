use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::Display;
use thiserror::Error;

use crate::fetcher::{Category, Identifier, MatchCategory, PlayerCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Match,
    Player,
}

/// A classified mention extracted from a query. When the query already spells
/// out a numeric provider ID, it is carried here and the resolver is skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReference {
    pub kind: EntityKind,
    pub text: String,
    pub date_hint: Option<String>,
    pub inline_id: Option<Identifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Intent {
    #[strum(serialize = "match")]
    Match,
    #[strum(serialize = "player")]
    Player,
    #[strum(serialize = "combined")]
    Combined,
}

#[derive(Debug, Clone)]
pub struct Classification {
    pub intent: Intent,
    /// One or two references; for combined intent the match reference
    /// comes first.
    pub references: Vec<EntityReference>,
}

#[derive(Debug, Error)]
#[error("could not tell whether {0:?} refers to a match or a player")]
pub struct ClassificationError(pub String);

/// Free-text request from the end user.
#[derive(Debug, Clone)]
pub struct Query {
    text: String,
}

// Lexical cues. Team, tournament and fixture words point at matches;
// role and statistics words point at people.
const MATCH_CUES: [&str; 14] = [
    "match", " vs ", " v ", "odi", "t20", "ipl", "final", "semi", "cup", "trophy", "series",
    "innings", "scorecard", "toss",
];
const PLAYER_CUES: [&str; 12] = [
    "player", "batting", "bowling", "batsman", "bowler", "all-rounder", "captain", "wicketkeeper",
    "career", "profile", "stats of", "statistics of",
];
const RESEARCH_CUES: [&str; 6] = [
    "recent form", "news", "background", "context", "history", "latest",
];
const PERSISTENCE_CUES: [&str; 4] = ["save", "archive", "persist", "keep a copy"];

static VS_RE: Lazy<Regex> = Lazy::new(|| {
    // Capitalized team tokens (up to three words) on both sides of "vs".
    Regex::new(
        r"\b([A-Z][A-Za-z]*(?:\s+[A-Z][A-Za-z]*){0,2})\s+[Vv][Ss]?\.?\s+([A-Z][A-Za-z]*(?:\s+[A-Z][A-Za-z]*){0,2})",
    )
    .unwrap()
});
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Z][a-z]+(?:\s+[A-Z][a-z]+)+)\b").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:\d{1,2}\s+)?(?:January|February|March|April|May|June|July|August|September|October|November|December)?\s*(?:19|20)\d{2}\b").unwrap()
});
static INLINE_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(match|player)?\s*id\s*[:#]?\s*(\d+)").unwrap());

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Query { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn wants_persistence(&self) -> bool {
        let lowered = self.text.to_lowercase();
        PERSISTENCE_CUES.iter().any(|cue| lowered.contains(cue))
    }

    /// Whether the query asks for narrative color the statistics provider
    /// cannot supply.
    pub fn wants_research(&self) -> bool {
        let lowered = self.text.to_lowercase();
        RESEARCH_CUES.iter().any(|cue| lowered.contains(cue))
    }

    /// Specific categories the query names. Empty means "everything for the
    /// subject kind".
    pub fn requested_categories(&self) -> Vec<Category> {
        let lowered = self.text.to_lowercase();
        let mut categories = Vec::new();
        let mut push = |category| {
            if !categories.contains(&category) {
                categories.push(category);
            }
        };
        if lowered.contains("scorecard") {
            push(Category::Match(MatchCategory::Scorecard));
        }
        if lowered.contains("commentary") {
            push(Category::Match(MatchCategory::Commentary));
        }
        if lowered.contains("batting") {
            push(Category::Player(PlayerCategory::BattingStats));
        }
        if lowered.contains("bowling") {
            push(Category::Player(PlayerCategory::BowlingStats));
        }
        if lowered.contains("career") {
            push(Category::Player(PlayerCategory::Career));
        }
        if lowered.contains("profile") {
            push(Category::Player(PlayerCategory::Profile));
        }
        if lowered.contains("general info") || lowered.contains("match info") {
            push(Category::Match(MatchCategory::GeneralInfo));
        }
        categories
    }

    /// Splits the query into one or two entity references and an intent,
    /// using lexical cues. A query that trips both cue sets keeps both
    /// references (combined intent); one that trips neither is ambiguous.
    pub fn classify(&self) -> Result<Classification, ClassificationError> {
        let lowered = self.text.to_lowercase();
        let date_hint = DATE_RE
            .find(&self.text)
            .map(|m| m.as_str().trim().to_string());

        let (match_id, player_id) = inline_identifiers(&self.text);

        let vs_capture = VS_RE.captures(&self.text);
        let has_match_cue = match_id.is_some()
            || vs_capture.is_some()
            || MATCH_CUES.iter().any(|cue| lowered.contains(cue));

        let name_capture = NAME_RE
            .captures_iter(&self.text)
            .map(|c| c[1].to_string())
            // A capitalized pair inside "India vs Australia" names teams, not a person.
            .find(|name| {
                vs_capture
                    .as_ref()
                    .map(|vs| !vs[0].contains(name.as_str()))
                    .unwrap_or(true)
            });
        let has_player_cue = player_id.is_some()
            || PLAYER_CUES.iter().any(|cue| lowered.contains(cue))
            || (name_capture.is_some() && !has_match_cue);

        let mut references = Vec::new();
        if has_match_cue {
            let text = vs_capture
                .as_ref()
                .map(|c| c[0].trim().to_string())
                .unwrap_or_else(|| self.text.trim().to_string());
            references.push(EntityReference {
                kind: EntityKind::Match,
                text,
                date_hint: date_hint.clone(),
                inline_id: match_id,
            });
        }
        if has_player_cue {
            let text = name_capture
                .clone()
                .unwrap_or_else(|| self.text.trim().to_string());
            references.push(EntityReference {
                kind: EntityKind::Player,
                text,
                date_hint: date_hint.clone(),
                inline_id: player_id,
            });
        }

        let intent = match (has_match_cue, has_player_cue) {
            (true, true) => Intent::Combined,
            (true, false) => Intent::Match,
            (false, true) => Intent::Player,
            (false, false) => return Err(ClassificationError(self.text.clone())),
        };

        Ok(Classification { intent, references })
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Pulls explicit `match id NNN` / `player id NNN` / bare `id NNN` mentions
/// out of the query. A bare id is attributed to the kind the surrounding
/// words suggest, player first.
fn inline_identifiers(text: &str) -> (Option<Identifier>, Option<Identifier>) {
    let mut match_id = None;
    let mut player_id = None;
    let mut bare_id = None;
    for capture in INLINE_ID_RE.captures_iter(text) {
        let id = capture[2].parse::<Identifier>().ok();
        match capture.get(1).map(|m| m.as_str().to_lowercase()) {
            Some(kind) if kind == "match" => match_id = match_id.or(id),
            Some(kind) if kind == "player" => player_id = player_id.or(id),
            _ => bare_id = bare_id.or(id),
        }
    }
    if let Some(id) = bare_id {
        let lowered = text.to_lowercase();
        let player_leaning = PLAYER_CUES.iter().any(|cue| lowered.contains(cue));
        if player_leaning && player_id.is_none() {
            player_id = Some(id);
        } else if match_id.is_none() && !player_leaning {
            match_id = Some(id);
        }
    }
    (match_id, player_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_query_with_inline_id_skips_resolution() {
        let query = Query::new("batting stats of player ID 1413");
        let classification = query.classify().expect("classifiable");
        assert_eq!(classification.intent, Intent::Player);
        assert_eq!(classification.references.len(), 1);
        let reference = &classification.references[0];
        assert_eq!(reference.kind, EntityKind::Player);
        assert_eq!(reference.inline_id.map(Identifier::get), Some(1413));
        assert_eq!(
            query.requested_categories(),
            vec![Category::Player(PlayerCategory::BattingStats)]
        );
    }

    #[test]
    fn match_query_classifies_with_date_hint() {
        let query = Query::new("report on the India vs Australia final 2023");
        let classification = query.classify().expect("classifiable");
        assert_eq!(classification.intent, Intent::Match);
        let reference = &classification.references[0];
        assert_eq!(reference.kind, EntityKind::Match);
        assert!(reference.text.contains("India"));
        assert_eq!(reference.date_hint.as_deref(), Some("2023"));
        assert!(reference.inline_id.is_none());
    }

    #[test]
    fn combined_query_keeps_both_references_match_first() {
        let query =
            Query::new("Virat Kohli's batting in the India vs Australia final, save the report");
        let classification = query.classify().expect("classifiable");
        assert_eq!(classification.intent, Intent::Combined);
        assert_eq!(classification.references.len(), 2);
        assert_eq!(classification.references[0].kind, EntityKind::Match);
        assert_eq!(classification.references[1].kind, EntityKind::Player);
        assert_eq!(classification.references[1].text, "Virat Kohli");
        assert!(query.wants_persistence());
    }

    #[test]
    fn bare_name_reads_as_player() {
        let query = Query::new("Give me a full report on Hardik Pandya");
        let classification = query.classify().expect("classifiable");
        assert_eq!(classification.intent, Intent::Player);
        assert_eq!(classification.references[0].text, "Hardik Pandya");
    }

    #[test]
    fn unclassifiable_text_is_an_error() {
        let query = Query::new("tell me something interesting");
        assert!(query.classify().is_err());
    }

    #[test]
    fn research_and_persistence_cues() {
        assert!(Query::new("recent form of Rohit Sharma").wants_research());
        assert!(!Query::new("scorecard of match id 5").wants_research());
        assert!(Query::new("archive the report").wants_persistence());
    }
}
