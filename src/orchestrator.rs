use futures::future::join_all;
use log::{info, warn};
use std::path::PathBuf;
use strum_macros::Display;
use thiserror::Error;
use uuid::Uuid;

use crate::archive::{ArchiveEntry, ArchiveMode, Archivist};
use crate::drafter::Drafter;
use crate::error::DraftError;
use crate::fetcher::{Category, DataRecord, Fetcher, Identifier};
use crate::query::{EntityKind, EntityReference, Intent, Query};
use crate::report::{Gap, ReportDocument};
use crate::research::{Researcher, SupplementaryFact};
use crate::resolver::{Resolution, Resolver};

/// Workflow stages, in order. Every run walks them front to back; a failure
/// names the stage it happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Stage {
    Classifying,
    Resolving,
    Fetching,
    Researching,
    Drafting,
    Archiving,
    Done,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("query could not be classified: {0}")]
    ClassificationAmbiguous(String),

    #[error("no identifier could be resolved for {0:?}")]
    IdentifierNotFound(String),

    #[error("every requested category failed to fetch")]
    NoData,

    #[error("not enough data to draft a report")]
    InsufficientData,

    #[error("drafting failed: {0}")]
    DraftFailed(String),

    #[error("fetch failed: {0}")]
    FetchFailed(String),
}

impl RunError {
    pub fn stage(&self) -> Stage {
        match self {
            RunError::ClassificationAmbiguous(_) => Stage::Classifying,
            RunError::IdentifierNotFound(_) => Stage::Resolving,
            RunError::NoData | RunError::FetchFailed(_) => Stage::Fetching,
            RunError::InsufficientData | RunError::DraftFailed(_) => Stage::Drafting,
        }
    }
}

/// How (and whether) the finished document was persisted. An archive failure
/// rides alongside the otherwise-successful document, never replacing it.
#[derive(Debug, Clone)]
pub enum ArchiveStatus {
    Saved {
        entry: ArchiveEntry,
        /// HTML sibling, when conversion succeeded.
        secondary: Option<PathBuf>,
        /// Conversion failure, reported without rolling back the primary.
        conversion_error: Option<String>,
    },
    Failed(String),
}

#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: Uuid,
    pub document: ReportDocument,
    pub markdown: String,
    pub archive: Option<ArchiveStatus>,
}

/// Coordinates one workflow per incoming query:
/// `Classifying → Resolving → Fetching → (Researching) → Drafting →
/// Archiving → Done`. Collaborators are injected, so every transition can be
/// exercised with stubs.
pub struct Orchestrator<R, F, S, D> {
    resolver: R,
    fetcher: F,
    researcher: S,
    drafter: D,
    archivist: Archivist,
}

impl<R, F, S, D> Orchestrator<R, F, S, D>
where
    R: Resolver,
    F: Fetcher,
    S: Researcher,
    D: Drafter,
{
    pub fn new(resolver: R, fetcher: F, researcher: S, drafter: D, archivist: Archivist) -> Self {
        Orchestrator {
            resolver,
            fetcher,
            researcher,
            drafter,
            archivist,
        }
    }

    pub async fn run(&self, query: &Query) -> Result<RunOutcome, RunError> {
        let run_id = Uuid::new_v4();

        info!("[{run_id}] {}: {:?}", Stage::Classifying, query.text());
        let classification = query
            .classify()
            .map_err(|err| RunError::ClassificationAmbiguous(err.to_string()))?;
        let mut intent = classification.intent;
        info!(
            "[{run_id}] intent {intent}, {} reference(s)",
            classification.references.len()
        );

        info!("[{run_id}] {}", Stage::Resolving);
        let resolved = self.resolve_references(run_id, &classification.references).await;
        let mut subjects: Vec<(EntityReference, Identifier)> = Vec::new();
        let mut unresolved: Vec<EntityReference> = Vec::new();
        for (reference, resolution) in resolved {
            match resolution {
                Resolution::Found(identifier) => subjects.push((reference, identifier)),
                Resolution::NotFound => unresolved.push(reference),
            }
        }
        if subjects.is_empty() {
            let text = unresolved
                .first()
                .map(|r| r.text.clone())
                .unwrap_or_else(|| query.text().to_string());
            return Err(RunError::IdentifierNotFound(text));
        }
        if !unresolved.is_empty() {
            // One of two references failed: downgrade to the surviving subject.
            intent = match subjects[0].0.kind {
                EntityKind::Match => Intent::Match,
                EntityKind::Player => Intent::Player,
            };
            for reference in &unresolved {
                warn!(
                    "[{run_id}] no identifier for {:?}; continuing with {intent} intent",
                    reference.text
                );
            }
        }

        info!("[{run_id}] {}", Stage::Fetching);
        let (records, gaps) = self.fetch_records(run_id, query, &subjects).await;
        if records.is_empty() {
            return Err(RunError::NoData);
        }

        let facts = if query.wants_research() || !gaps.is_empty() {
            info!("[{run_id}] {}", Stage::Researching);
            self.gather_facts(run_id, query).await
        } else {
            Vec::new()
        };

        info!("[{run_id}] {}", Stage::Drafting);
        let subject = subjects
            .iter()
            .map(|(reference, _)| reference.text.as_str())
            .collect::<Vec<_>>()
            .join(" & ");
        let document = self
            .drafter
            .draft(&subject, &records, &gaps, &facts, intent)
            .await
            .map_err(|err| match err {
                DraftError::InsufficientData => RunError::InsufficientData,
                other => RunError::DraftFailed(other.to_string()),
            })?;

        // Provider identifiers never reach a published document.
        let identifiers: Vec<Identifier> = subjects.iter().map(|(_, id)| *id).collect();
        let document = document.redacted(&identifiers);
        let markdown = document.to_markdown();

        let archive = if query.wants_persistence() {
            info!("[{run_id}] {}", Stage::Archiving);
            Some(self.persist(run_id, &document, &subject))
        } else {
            None
        };

        info!("[{run_id}] {}", Stage::Done);
        Ok(RunOutcome {
            run_id,
            document,
            markdown,
            archive,
        })
    }

    /// Resolves one reference for a single-category surface (the raw batting
    /// and bowling endpoints) and fetches exactly that category.
    pub async fn fetch_single(
        &self,
        query: &Query,
        category: Category,
    ) -> Result<DataRecord, RunError> {
        let classification = query
            .classify()
            .map_err(|err| RunError::ClassificationAmbiguous(err.to_string()))?;
        let reference = classification
            .references
            .into_iter()
            .find(|r| r.kind == category.kind())
            .ok_or_else(|| RunError::ClassificationAmbiguous(query.text().to_string()))?;

        let identifier = match reference.inline_id {
            Some(identifier) => identifier,
            None => match self.resolver.resolve(&reference).await {
                Ok(Resolution::Found(identifier)) => identifier,
                Ok(Resolution::NotFound) => {
                    return Err(RunError::IdentifierNotFound(reference.text));
                }
                Err(err) => {
                    warn!("resolution failed for {:?}: {err}", reference.text);
                    return Err(RunError::IdentifierNotFound(reference.text));
                }
            },
        };

        self.fetcher
            .fetch(identifier, category)
            .await
            .map_err(|err| RunError::FetchFailed(err.to_string()))
    }

    /// An inline numeric ID short-circuits resolution; a match/player pair
    /// with neither inline goes through the resolver's single pair call.
    /// Resolver transport errors degrade to `NotFound` for that reference.
    async fn resolve_references(
        &self,
        run_id: Uuid,
        references: &[EntityReference],
    ) -> Vec<(EntityReference, Resolution)> {
        if let [match_ref, player_ref] = references {
            if match_ref.inline_id.is_none() && player_ref.inline_id.is_none() {
                return match self.resolver.resolve_pair(match_ref, player_ref).await {
                    Ok((match_resolution, player_resolution)) => vec![
                        (match_ref.clone(), match_resolution),
                        (player_ref.clone(), player_resolution),
                    ],
                    Err(err) => {
                        warn!("[{run_id}] pair resolution failed: {err}");
                        vec![
                            (match_ref.clone(), Resolution::NotFound),
                            (player_ref.clone(), Resolution::NotFound),
                        ]
                    }
                };
            }
        }

        let mut resolved = Vec::new();
        for reference in references {
            let resolution = match reference.inline_id {
                Some(identifier) => Resolution::Found(identifier),
                None => match self.resolver.resolve(reference).await {
                    Ok(resolution) => resolution,
                    Err(err) => {
                        warn!("[{run_id}] resolution failed for {:?}: {err}", reference.text);
                        Resolution::NotFound
                    }
                },
            };
            resolved.push((reference.clone(), resolution));
        }
        resolved
    }

    /// Fetches every category implied by the query concurrently. Categories
    /// of one identifier have no ordering requirement among themselves, but
    /// none starts before its identifier is resolved.
    async fn fetch_records(
        &self,
        run_id: Uuid,
        query: &Query,
        subjects: &[(EntityReference, Identifier)],
    ) -> (Vec<DataRecord>, Vec<Gap>) {
        let requested = query.requested_categories();
        let fetcher = &self.fetcher;
        let mut tasks = Vec::new();
        for (reference, identifier) in subjects {
            let identifier = *identifier;
            for category in plan_categories(reference.kind, &requested) {
                tasks.push(async move { (category, fetcher.fetch(identifier, category).await) });
            }
        }

        let mut records = Vec::new();
        let mut gaps = Vec::new();
        for (category, result) in join_all(tasks).await {
            match result {
                Ok(record) => records.push(record),
                Err(err) => {
                    // A single failed category becomes a visible gap, not an
                    // aborted run.
                    warn!("[{run_id}] {category} failed: {err}");
                    gaps.push(Gap {
                        category,
                        message: err.to_string(),
                    });
                }
            }
        }
        (records, gaps)
    }

    async fn gather_facts(&self, run_id: Uuid, query: &Query) -> Vec<SupplementaryFact> {
        match self.researcher.research(query.text()).await {
            Ok(facts) => facts,
            Err(err) => {
                warn!("[{run_id}] research failed, continuing without color: {err}");
                Vec::new()
            }
        }
    }

    fn persist(&self, run_id: Uuid, document: &ReportDocument, subject: &str) -> ArchiveStatus {
        match self.archivist.archive(document, subject, ArchiveMode::Append) {
            Ok(entry) => {
                let (secondary, conversion_error) = match self.archivist.convert_to_html(&entry) {
                    Ok(sibling) => (Some(sibling), None),
                    Err(err) => {
                        warn!("[{run_id}] conversion failed: {err}");
                        (None, Some(err.to_string()))
                    }
                };
                ArchiveStatus::Saved {
                    entry,
                    secondary,
                    conversion_error,
                }
            }
            Err(err) => {
                warn!("[{run_id}] archive failed, report still returned: {err}");
                ArchiveStatus::Failed(err.to_string())
            }
        }
    }
}

/// Categories to fetch for a subject: the ones the query names, or all of
/// them when it names none for this kind.
fn plan_categories(kind: EntityKind, requested: &[Category]) -> Vec<Category> {
    let all = Category::for_kind(kind);
    let narrowed: Vec<Category> = all
        .iter()
        .copied()
        .filter(|category| requested.contains(category))
        .collect();
    if narrowed.is_empty() { all } else { narrowed }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_narrows_to_requested_categories_of_the_same_kind() {
        use crate::fetcher::{MatchCategory, PlayerCategory};

        let requested = vec![
            Category::Player(PlayerCategory::BattingStats),
            Category::Match(MatchCategory::Scorecard),
        ];
        assert_eq!(
            plan_categories(EntityKind::Player, &requested),
            vec![Category::Player(PlayerCategory::BattingStats)]
        );
        assert_eq!(
            plan_categories(EntityKind::Match, &requested),
            vec![Category::Match(MatchCategory::Scorecard)]
        );
        assert_eq!(plan_categories(EntityKind::Match, &[]).len(), 3);
    }

    #[test]
    fn run_errors_name_their_stage() {
        assert_eq!(
            RunError::IdentifierNotFound("x".into()).stage(),
            Stage::Resolving
        );
        assert_eq!(RunError::NoData.stage(), Stage::Fetching);
        assert_eq!(RunError::InsufficientData.stage(), Stage::Drafting);
        assert_eq!(Stage::Classifying.to_string(), "classifying");
    }
}
