use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};
use tokio::time::timeout;

use crate::error::FetchError;
use crate::query::EntityKind;

/// Canonical numeric key for a match or player in the statistics provider's
/// system. Construction rejects zero, so a held value is always a valid
/// request parameter and no fetch path has to re-validate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier(u64);

impl Identifier {
    pub fn new(raw: u64) -> Result<Self, FetchError> {
        if raw == 0 {
            return Err(FetchError::InvalidIdentifier);
        }
        Ok(Identifier(raw))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Identifier {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s.trim().parse().map_err(|_| FetchError::InvalidIdentifier)?;
        Identifier::new(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum MatchCategory {
    #[strum(serialize = "Scorecard")]
    Scorecard,
    #[strum(serialize = "Commentary")]
    Commentary,
    #[strum(serialize = "General Info")]
    GeneralInfo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
pub enum PlayerCategory {
    #[strum(serialize = "Batting Statistics")]
    BattingStats,
    #[strum(serialize = "Bowling Statistics")]
    BowlingStats,
    #[strum(serialize = "Profile")]
    Profile,
    #[strum(serialize = "Career")]
    Career,
}

/// One specific kind of fetchable record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Match(MatchCategory),
    Player(PlayerCategory),
}

impl Category {
    pub fn kind(self) -> EntityKind {
        match self {
            Category::Match(_) => EntityKind::Match,
            Category::Player(_) => EntityKind::Player,
        }
    }

    /// Every category available for a subject kind, in provider order.
    pub fn for_kind(kind: EntityKind) -> Vec<Category> {
        match kind {
            EntityKind::Match => MatchCategory::iter().map(Category::Match).collect(),
            EntityKind::Player => PlayerCategory::iter().map(Category::Player).collect(),
        }
    }

    /// Provider-native endpoint path for this category.
    fn path(self, identifier: Identifier) -> String {
        match self {
            Category::Match(MatchCategory::Scorecard) => format!("mcenter/v1/{identifier}/scard"),
            Category::Match(MatchCategory::Commentary) => format!("mcenter/v1/{identifier}/comm"),
            Category::Match(MatchCategory::GeneralInfo) => format!("mcenter/v1/{identifier}"),
            Category::Player(PlayerCategory::BattingStats) => {
                format!("stats/v1/player/{identifier}/batting")
            }
            Category::Player(PlayerCategory::BowlingStats) => {
                format!("stats/v1/player/{identifier}/bowling")
            }
            Category::Player(PlayerCategory::Profile) => format!("stats/v1/player/{identifier}"),
            Category::Player(PlayerCategory::Career) => {
                format!("stats/v1/player/{identifier}/career")
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Match(c) => c.fmt(f),
            Category::Player(c) => c.fmt(f),
        }
    }
}

/// Structured result of a single fetch call. The payload is held exactly as
/// parsed from the provider and is never edited downstream; drafted content
/// must reproduce fetched figures verbatim.
#[derive(Debug, Clone)]
pub struct DataRecord {
    identifier: Identifier,
    category: Category,
    payload: Value,
    fetched_at: DateTime<Local>,
}

impl DataRecord {
    pub fn new(identifier: Identifier, category: Category, payload: Value) -> Self {
        DataRecord {
            identifier,
            category,
            payload,
            fetched_at: Local::now(),
        }
    }

    pub fn identifier(&self) -> Identifier {
        self.identifier
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn fetched_at(&self) -> DateTime<Local> {
        self.fetched_at
    }

    /// Pretty-printed payload, for readability only. No field is renamed,
    /// dropped, or reinterpreted.
    pub fn pretty(&self) -> String {
        serde_json::to_string_pretty(&self.payload).unwrap_or_else(|_| self.payload.to_string())
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        identifier: Identifier,
        category: Category,
    ) -> Result<DataRecord, FetchError>;
}

/// Client for the keyed statistics-provider API. Read-only, one category per
/// call; payloads are returned as received.
#[derive(Debug, Clone)]
pub struct CricketApiClient {
    http: reqwest::Client,
    api_key: String,
    api_host: String,
    timeout: Duration,
}

impl CricketApiClient {
    pub fn new(
        api_key: impl Into<String>,
        api_host: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        CricketApiClient {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            api_host: api_host.into(),
            timeout,
        }
    }

    fn url(&self, identifier: Identifier, category: Category) -> String {
        format!("https://{}/{}", self.api_host, category.path(identifier))
    }
}

#[async_trait]
impl Fetcher for CricketApiClient {
    async fn fetch(
        &self,
        identifier: Identifier,
        category: Category,
    ) -> Result<DataRecord, FetchError> {
        let request = self
            .http
            .get(self.url(identifier, category))
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.api_host)
            .send();

        // A timed-out call is handled like any other upstream failure,
        // never as a silent hang.
        let response = timeout(self.timeout, request)
            .await
            .map_err(|_| FetchError::Timeout)??;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(FetchError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let payload: Value = response.json().await?;
        Ok(DataRecord::new(identifier, category, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::EntityKind;

    #[test]
    fn identifier_rejects_zero_and_non_numeric() {
        assert!(Identifier::new(0).is_err());
        assert!("0".parse::<Identifier>().is_err());
        assert!("-3".parse::<Identifier>().is_err());
        assert!("abc".parse::<Identifier>().is_err());
        assert_eq!("1413".parse::<Identifier>().map(Identifier::get).ok(), Some(1413));
    }

    #[test]
    fn categories_cover_both_kinds() {
        let match_categories = Category::for_kind(EntityKind::Match);
        assert_eq!(match_categories.len(), 3);
        let player_categories = Category::for_kind(EntityKind::Player);
        assert_eq!(player_categories.len(), 4);
        for category in player_categories {
            assert_eq!(category.kind(), EntityKind::Player);
        }
    }

    #[test]
    fn endpoint_paths_follow_provider_layout() {
        let id = Identifier::new(115192).expect("valid id");
        let client = CricketApiClient::new("k", "cricket.example.com", Duration::from_secs(5));
        assert_eq!(
            client.url(id, Category::Match(MatchCategory::Scorecard)),
            "https://cricket.example.com/mcenter/v1/115192/scard"
        );
        assert_eq!(
            client.url(id, Category::Player(PlayerCategory::Career)),
            "https://cricket.example.com/stats/v1/player/115192/career"
        );
    }

    #[test]
    fn payload_is_preserved_verbatim() {
        let payload = serde_json::json!({"runs": "54.08", "matches": 113});
        let record = DataRecord::new(
            Identifier::new(1413).expect("valid id"),
            Category::Player(PlayerCategory::BattingStats),
            payload.clone(),
        );
        assert_eq!(record.payload(), &payload);
        assert!(record.pretty().contains("54.08"));
    }
}
