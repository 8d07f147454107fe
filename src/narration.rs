use async_openai::{
    Audio, Client,
    config::OpenAIConfig,
    types::{CreateSpeechRequestArgs, SpeechModel, Voice},
};
use chrono::Local;
use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use std::fs::{create_dir_all, read};
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::NarrationError;

/// A generated narration on disk.
#[derive(Debug, Clone)]
pub struct NarrationArtifact {
    pub file_name: String,
    pub path: PathBuf,
}

/// Speech-narration collaborator: turns a finished markdown report into an
/// mp3 artifact. Treated as a black box by the rest of the workflow.
pub struct Narrator {
    client: Client<OpenAIConfig>,
    audio_dir: PathBuf,
    timeout: Duration,
}

impl Narrator {
    pub fn new(openai_api_key: &str, audio_dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        let openai_config = OpenAIConfig::new().with_api_key(openai_api_key);
        Narrator {
            client: Client::with_config(openai_config),
            audio_dir: audio_dir.into(),
            timeout,
        }
    }

    pub async fn narrate(&self, markdown: &str) -> Result<NarrationArtifact, NarrationError> {
        let script = narration_script(markdown);
        if script.trim().is_empty() {
            return Err(NarrationError::EmptyDocument);
        }

        let audio = Audio::new(&self.client);
        let request = CreateSpeechRequestArgs::default()
            .input(script)
            .voice(Voice::Onyx)
            .model(SpeechModel::Tts1)
            .build()?;

        let response = timeout(self.timeout, audio.speech(request))
            .await
            .map_err(|_| NarrationError::Timeout)??;

        create_dir_all(&self.audio_dir)?;
        let file_name = format!("narration_{}.mp3", Local::now().format("%Y%m%d_%H%M%S"));
        let path = self.audio_dir.join(&file_name);
        let path_str = path.to_string_lossy().into_owned();
        response.save(&path_str).await?;

        Ok(NarrationArtifact { file_name, path })
    }

    /// Reads a previously generated narration for streaming.
    pub fn open(&self, file_name: &str) -> Result<Vec<u8>, NarrationError> {
        if file_name.contains(['/', '\\']) || file_name.contains("..") {
            return Err(NarrationError::InvalidName(file_name.to_string()));
        }
        let path = self.audio_dir.join(file_name);
        if !path.is_file() {
            return Err(NarrationError::NotFound(file_name.to_string()));
        }
        Ok(read(path)?)
    }
}

/// Strips markdown structure down to speakable text. Tables read terribly
/// aloud, so their cells are skipped; headings become sentence breaks.
fn narration_script(markdown: &str) -> String {
    let mut script = String::new();
    let mut table_depth: usize = 0;
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    for event in Parser::new_ext(markdown, options) {
        match event {
            Event::Start(Tag::Table(_)) => table_depth += 1,
            Event::End(TagEnd::Table) => table_depth = table_depth.saturating_sub(1),
            Event::Text(text) | Event::Code(text) if table_depth == 0 => {
                script.push_str(&text);
            }
            Event::SoftBreak | Event::HardBreak if table_depth == 0 => script.push(' '),
            Event::End(TagEnd::Paragraph) | Event::End(TagEnd::Heading(_))
                if table_depth == 0 =>
            {
                script.push_str("\n\n");
            }
            _ => {}
        }
    }
    script.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_drops_markup_and_tables() {
        let markdown = "# Player Report\n\nKohli made **82** runs.\n\n| A | B |\n| --- | --- |\n| 1 | 2 |\n\nA fine chase.";
        let script = narration_script(markdown);
        assert!(script.contains("Player Report"));
        assert!(script.contains("Kohli made 82 runs."));
        assert!(script.contains("A fine chase."));
        assert!(!script.contains('|'));
        assert!(!script.contains("1"), "table cells must be skipped: {script}");
    }

    #[test]
    fn empty_markdown_yields_empty_script() {
        assert!(narration_script("").is_empty());
        assert!(narration_script("\n\n").is_empty());
    }
}
