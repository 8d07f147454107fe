use anyhow::Context;
use log::info;
use std::sync::Arc;
use tokio::sync::Semaphore;

use wicketwire::agents::{RigSectionWriter, build_id_extractor};
use wicketwire::archive::Archivist;
use wicketwire::drafter::JournalistDrafter;
use wicketwire::fetcher::CricketApiClient;
use wicketwire::narration::Narrator;
use wicketwire::orchestrator::Orchestrator;
use wicketwire::research::WebResearcher;
use wicketwire::resolver::SearchResolver;
use wicketwire::search::SearchClient;
use wicketwire::server::{self, ServerState};
use wicketwire::settings::Settings;
use wicketwire::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Configuration is validated before any workflow starts.
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(2);
        }
    };

    logging::init(settings.log_dir()).context("failed to install logger")?;
    info!("starting wicketwire on {}", settings.bind_addr);

    let search = SearchClient::new(settings.search_api_key.clone(), settings.request_timeout);
    let extractor = build_id_extractor(&settings.openai_api_key, &settings.lite_model);
    let resolver = SearchResolver::new(search.clone(), extractor, settings.request_timeout);
    let fetcher = CricketApiClient::new(
        settings.stats_api_key.clone(),
        settings.stats_api_host.clone(),
        settings.request_timeout,
    );
    let researcher = WebResearcher::new(search, 5);
    let writer = RigSectionWriter::new(
        &settings.openai_api_key,
        &settings.model,
        settings.draft_timeout,
    );
    let drafter = JournalistDrafter::new(writer);
    let desk = Orchestrator::new(
        resolver,
        fetcher,
        researcher,
        drafter,
        Archivist::new(settings.reports_dir()),
    );

    let state = Arc::new(ServerState {
        desk,
        archivist: Archivist::new(settings.reports_dir()),
        narrator: Narrator::new(
            &settings.openai_api_key,
            settings.audio_dir(),
            settings.request_timeout,
        ),
        limiter: Semaphore::new(settings.max_concurrent_runs),
    });

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;
    axum::serve(listener, server::router(state))
        .await
        .context("server error")?;

    Ok(())
}
