use rig::{
    agent::Agent,
    client::CompletionClient,
    providers::openai::{Client, CompletionModel},
};

use super::ID_EXTRACTOR_PREAMBLE;

/// Builds the identifier-extraction agent used by the resolver. It sees
/// scoped search results and answers in the fixed `ID: <integer>` shape.
pub fn build_id_extractor(openai_api_key: &str, model: &str) -> Agent<CompletionModel> {
    let openai_client = Client::new(openai_api_key);

    openai_client
        .agent(model)
        .preamble(ID_EXTRACTOR_PREAMBLE)
        .build()
}
