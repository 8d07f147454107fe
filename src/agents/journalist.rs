use async_trait::async_trait;
use rig::{
    agent::Agent,
    client::CompletionClient,
    completion::Prompt,
    providers::openai::{Client, CompletionModel},
};
use std::time::Duration;
use tokio::time::timeout;

use super::{MATCH_WRITER_PREAMBLE, PLAYER_WRITER_PREAMBLE};
use crate::drafter::SectionWriter;
use crate::error::DraftError;
use crate::fetcher::Category;

/// Section prose via the drafting agents: one agent for match sections, one
/// for player sections, both pinned to the verbatim-figures rules.
pub struct RigSectionWriter {
    match_writer: Agent<CompletionModel>,
    player_writer: Agent<CompletionModel>,
    timeout: Duration,
}

impl RigSectionWriter {
    pub fn new(openai_api_key: &str, model: &str, timeout: Duration) -> Self {
        let openai_client = Client::new(openai_api_key);

        RigSectionWriter {
            match_writer: openai_client
                .agent(model)
                .preamble(MATCH_WRITER_PREAMBLE)
                .build(),
            player_writer: openai_client
                .agent(model)
                .preamble(PLAYER_WRITER_PREAMBLE)
                .build(),
            timeout,
        }
    }
}

#[async_trait]
impl SectionWriter for RigSectionWriter {
    async fn narrate_section(
        &self,
        subject: &str,
        category: Category,
        payload_pretty: &str,
    ) -> Result<String, DraftError> {
        let agent = match category {
            Category::Match(_) => &self.match_writer,
            Category::Player(_) => &self.player_writer,
        };
        let prompt = format!(
            "Subject: {subject}\nSection: {category}\n\nRaw JSON from the statistics provider:\n{payload_pretty}"
        );
        let narrative = timeout(self.timeout, agent.prompt(prompt.as_str()))
            .await
            .map_err(|_| DraftError::Timeout)??;
        Ok(narrative)
    }
}
