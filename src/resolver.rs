use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use rig::agent::Agent;
use rig::completion::Prompt;
use rig::providers::openai::CompletionModel;
use std::fmt::Write as _;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::ResolveError;
use crate::fetcher::Identifier;
use crate::query::{EntityKind, EntityReference};
use crate::search::{SearchClient, SearchHit};

/// Site the identifier search is scoped to.
const PROVIDER_SITE: &str = "cricbuzz.com";

/// Outcome of resolving one entity reference. `NotFound` is the single
/// absence signal: it is never inferred from an empty string, and no caller
/// may substitute a guessed number for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Found(Identifier),
    NotFound,
}

#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, reference: &EntityReference) -> Result<Resolution, ResolveError>;

    /// Resolves a match and a player in one call. The default implementation
    /// makes two calls; implementations backed by an extraction agent
    /// override it to save the extra round-trip.
    async fn resolve_pair(
        &self,
        match_ref: &EntityReference,
        player_ref: &EntityReference,
    ) -> Result<(Resolution, Resolution), ResolveError> {
        Ok((self.resolve(match_ref).await?, self.resolve(player_ref).await?))
    }
}

static ID_REPLY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bID:\s*(\d+)").unwrap());
static PAIR_REPLY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bMatch\s+ID:\s*(\d+|NOT\s+FOUND)\s*,\s*Player\s+ID:\s*(\d+|NOT\s+FOUND)")
        .unwrap()
});
static MATCH_URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"cricbuzz\.com/(?:live-cricket-scores|cricket-scores|cricket-match-squads|cricket-match-facts)/(\d+)")
        .unwrap()
});
static PLAYER_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"cricbuzz\.com/profiles/(\d+)").unwrap());

/// Strict parse of the extraction agent's fixed `ID: <integer>` shape.
/// Anything else reads as no identifier.
fn parse_id_reply(reply: &str) -> Option<Identifier> {
    let capture = ID_REPLY_RE.captures(reply)?;
    capture[1].parse().ok()
}

fn parse_pair_reply(reply: &str) -> Option<(Resolution, Resolution)> {
    let capture = PAIR_REPLY_RE.captures(reply)?;
    let to_resolution = |raw: &str| match raw.parse::<Identifier>() {
        Ok(id) => Resolution::Found(id),
        Err(_) => Resolution::NotFound,
    };
    Some((to_resolution(&capture[1]), to_resolution(&capture[2])))
}

/// A provider identifier lifted straight out of result URLs. Only trusted
/// when every hit agrees on a single value.
fn unambiguous_url_id(hits: &[SearchHit], kind: EntityKind) -> Option<Identifier> {
    let pattern: &Regex = match kind {
        EntityKind::Match => &MATCH_URL_RE,
        EntityKind::Player => &PLAYER_URL_RE,
    };
    let mut found: Option<Identifier> = None;
    for hit in hits {
        for capture in pattern.captures_iter(&hit.url) {
            let id: Identifier = capture[1].parse().ok()?;
            match found {
                None => found = Some(id),
                Some(existing) if existing == id => {}
                Some(_) => return None, // conflicting candidates, defer to the agent
            }
        }
    }
    found
}

fn format_hits(hits: &[SearchHit]) -> String {
    let mut formatted = String::new();
    for (index, hit) in hits.iter().enumerate() {
        let _ = writeln!(
            formatted,
            "{}. {} ({})\n   {}",
            index + 1,
            hit.title,
            hit.url,
            hit.content
        );
    }
    formatted
}

/// Resolves free-text references to provider identifiers by searching the
/// provider's public site and extracting the numeric key from the results.
pub struct SearchResolver {
    search: SearchClient,
    extractor: Agent<CompletionModel>,
    timeout: Duration,
}

impl SearchResolver {
    pub fn new(search: SearchClient, extractor: Agent<CompletionModel>, timeout: Duration) -> Self {
        SearchResolver {
            search,
            extractor,
            timeout,
        }
    }

    fn scoped_query(reference: &EntityReference) -> String {
        let path_hint = match reference.kind {
            EntityKind::Match => "cricket match",
            EntityKind::Player => "profiles",
        };
        let mut scoped = format!("site:{PROVIDER_SITE} {path_hint} {}", reference.text);
        if let Some(date) = &reference.date_hint {
            let _ = write!(scoped, " {date}");
        }
        scoped
    }

    async fn extract(&self, prompt: &str) -> Result<String, ResolveError> {
        let reply = timeout(self.timeout, self.extractor.prompt(prompt))
            .await
            .map_err(|_| ResolveError::Timeout)??;
        Ok(reply)
    }
}

#[async_trait]
impl Resolver for SearchResolver {
    async fn resolve(&self, reference: &EntityReference) -> Result<Resolution, ResolveError> {
        let hits = self
            .search
            .search(&Self::scoped_query(reference), 5)
            .await?;
        if hits.is_empty() {
            return Ok(Resolution::NotFound);
        }

        if let Some(id) = unambiguous_url_id(&hits, reference.kind) {
            return Ok(Resolution::Found(id));
        }

        let kind = match reference.kind {
            EntityKind::Match => "match",
            EntityKind::Player => "player",
        };
        let prompt = format!(
            "Find the Cricbuzz {kind} ID for {:?}.\n\nSearch results:\n{}",
            reference.text,
            format_hits(&hits)
        );
        let reply = self.extract(&prompt).await?;
        Ok(match parse_id_reply(&reply) {
            Some(id) => Resolution::Found(id),
            None => Resolution::NotFound,
        })
    }

    async fn resolve_pair(
        &self,
        match_ref: &EntityReference,
        player_ref: &EntityReference,
    ) -> Result<(Resolution, Resolution), ResolveError> {
        let match_hits = self
            .search
            .search(&Self::scoped_query(match_ref), 5)
            .await?;
        let player_hits = self
            .search
            .search(&Self::scoped_query(player_ref), 5)
            .await?;
        if match_hits.is_empty() && player_hits.is_empty() {
            return Ok((Resolution::NotFound, Resolution::NotFound));
        }

        // Both identifiers come back from a single agent call, in the fixed
        // pair shape.
        let prompt = format!(
            "Find the Cricbuzz match ID for {:?} and the Cricbuzz player ID for {:?}.\n\n\
             Match search results:\n{}\nPlayer search results:\n{}",
            match_ref.text,
            player_ref.text,
            format_hits(&match_hits),
            format_hits(&player_hits)
        );
        let reply = self.extract(&prompt).await?;
        Ok(parse_pair_reply(&reply).unwrap_or((Resolution::NotFound, Resolution::NotFound)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(url: &str) -> SearchHit {
        SearchHit {
            title: "hit".to_string(),
            url: url.to_string(),
            content: String::new(),
        }
    }

    #[test]
    fn reply_parse_is_strict() {
        assert_eq!(
            parse_id_reply("ID: 115192").map(Identifier::get),
            Some(115192)
        );
        assert_eq!(parse_id_reply("id: 42").map(Identifier::get), Some(42));
        assert!(parse_id_reply("ID: NOT FOUND").is_none());
        assert!(parse_id_reply("the id is probably around 115192").is_none());
        assert!(parse_id_reply("ID: 0").is_none()); // zero is not a valid identifier
    }

    #[test]
    fn pair_parse_handles_partial_results() {
        let both = parse_pair_reply("Match ID: 115192, Player ID: 1413").expect("pair");
        assert_eq!(
            both,
            (
                Resolution::Found(Identifier::new(115192).expect("id")),
                Resolution::Found(Identifier::new(1413).expect("id"))
            )
        );
        let partial = parse_pair_reply("Match ID: NOT FOUND, Player ID: 1413").expect("pair");
        assert_eq!(partial.0, Resolution::NotFound);
        assert!(parse_pair_reply("no identifiers here").is_none());
    }

    #[test]
    fn url_extraction_requires_agreement() {
        let agreeing = vec![
            hit("https://www.cricbuzz.com/live-cricket-scores/115192/ind-vs-aus"),
            hit("https://www.cricbuzz.com/cricket-scores/115192/ind-vs-aus-final"),
        ];
        assert_eq!(
            unambiguous_url_id(&agreeing, EntityKind::Match).map(Identifier::get),
            Some(115192)
        );

        let conflicting = vec![
            hit("https://www.cricbuzz.com/profiles/1413/virat-kohli"),
            hit("https://www.cricbuzz.com/profiles/576/rohit-sharma"),
        ];
        assert!(unambiguous_url_id(&conflicting, EntityKind::Player).is_none());

        // Match URLs never satisfy a player lookup.
        let wrong_kind = vec![hit("https://www.cricbuzz.com/live-cricket-scores/115192/x")];
        assert!(unambiguous_url_id(&wrong_kind, EntityKind::Player).is_none());
    }
}
