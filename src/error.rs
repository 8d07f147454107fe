use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

// Enum for handling various application-level errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError), // Startup configuration failures.

    #[error("Resolver error: {0}")]
    Resolve(#[from] ResolveError), // Errors while resolving provider identifiers.

    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError), // Errors from the statistics provider.

    #[error("Search error: {0}")]
    Search(#[from] SearchError), // Errors from the web-search collaborator.

    #[error("Draft error: {0}")]
    Draft(#[from] DraftError), // Errors while drafting a report.

    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError), // Errors while persisting a report.

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError), // Secondary-format conversion failures.

    #[error("Narration error: {0}")]
    Narration(#[from] NarrationError), // Speech-synthesis failures.

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("missing required environment keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("search failed: {0}")]
    Search(#[from] SearchError),

    #[error("extraction agent error: {0}")]
    Agent(#[from] rig::completion::PromptError),

    #[error("resolution timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum FetchError {
    // Rejected locally, before any network round-trip.
    #[error("invalid identifier: must be a positive integer")]
    InvalidIdentifier,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("provider request timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("search provider returned {status}: {message}")]
    Upstream { status: u16, message: String },

    #[error("search request timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("no data records to draft from")]
    InsufficientData,

    #[error("drafting agent error: {0}")]
    Agent(#[from] rig::completion::PromptError),

    #[error("drafting timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("report name {0:?} sanitizes to nothing")]
    EmptyName(String),

    #[error("invalid archive file name: {0:?}")]
    InvalidName(String),

    #[error("no archived report named {0:?}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("failed to write converted artifact: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("OpenAI API error: {0}")]
    OpenAI(#[from] async_openai::error::OpenAIError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("document contains no narratable text")]
    EmptyDocument,

    #[error("speech synthesis timed out")]
    Timeout,

    #[error("invalid audio file name: {0:?}")]
    InvalidName(String),

    #[error("no narration named {0:?}")]
    NotFound(String),
}
