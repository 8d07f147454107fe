use async_trait::async_trait;

use crate::error::SearchError;
use crate::search::SearchClient;

/// A short sourced snippet used as additive color in a report. Facts without
/// a traceable source cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplementaryFact {
    text: String,
    attribution: String,
}

impl SupplementaryFact {
    /// Builds a fact, discarding it when the attribution is missing or blank.
    pub fn sourced(text: impl Into<String>, attribution: impl Into<String>) -> Option<Self> {
        let text = text.into();
        let attribution = attribution.into();
        if text.trim().is_empty() || attribution.trim().is_empty() {
            return None;
        }
        Some(SupplementaryFact { text, attribution })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn attribution(&self) -> &str {
        &self.attribution
    }
}

#[async_trait]
pub trait Researcher: Send + Sync {
    /// Finding nothing yields an empty list, not an error; absence of
    /// supplementary color is not fatal to a run.
    async fn research(&self, query: &str) -> Result<Vec<SupplementaryFact>, SearchError>;
}

/// Pulls a small set of sourced facts from the open web, used only to fill
/// gaps the statistics provider cannot.
pub struct WebResearcher {
    search: SearchClient,
    max_facts: usize,
}

impl WebResearcher {
    pub fn new(search: SearchClient, max_facts: usize) -> Self {
        WebResearcher { search, max_facts }
    }
}

#[async_trait]
impl Researcher for WebResearcher {
    async fn research(&self, query: &str) -> Result<Vec<SupplementaryFact>, SearchError> {
        let hits = self.search.search(query, self.max_facts).await?;
        let facts = hits
            .into_iter()
            .filter_map(|hit| {
                let attribution = if hit.title.trim().is_empty() {
                    hit.url.clone()
                } else {
                    format!("{} ({})", hit.title.trim(), hit.url)
                };
                SupplementaryFact::sourced(hit.content.trim(), attribution)
            })
            .take(self.max_facts)
            .collect();
        Ok(facts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsourced_facts_are_discarded() {
        assert!(SupplementaryFact::sourced("a fact", "").is_none());
        assert!(SupplementaryFact::sourced("", "somewhere.com").is_none());
        let fact = SupplementaryFact::sourced("Kohli scored 82*", "espn.in").expect("sourced");
        assert_eq!(fact.text(), "Kohli scored 82*");
        assert_eq!(fact.attribution(), "espn.in");
    }
}
