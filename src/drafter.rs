use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Write as _;

use crate::error::DraftError;
use crate::fetcher::{Category, DataRecord, MatchCategory, PlayerCategory};
use crate::query::Intent;
use crate::report::{Gap, ReportDocument, Section};
use crate::research::SupplementaryFact;

#[async_trait]
pub trait Drafter: Send + Sync {
    /// Produces a single well-structured document from the fetched records.
    /// Every record's content is incorporated without omission or numeric
    /// modification; supplementary facts are additive color only.
    async fn draft(
        &self,
        subject: &str,
        records: &[DataRecord],
        gaps: &[Gap],
        facts: &[SupplementaryFact],
        intent: Intent,
    ) -> Result<ReportDocument, DraftError>;
}

/// Writes the narrative prose at the top of one section. Kept behind a seam
/// so drafting can be exercised without a live model.
#[async_trait]
pub trait SectionWriter: Send + Sync {
    async fn narrate_section(
        &self,
        subject: &str,
        category: Category,
        payload_pretty: &str,
    ) -> Result<String, DraftError>;
}

/// Section order per intent; combined intent gets the match sections first,
/// then the player sections, cross-referenced by the narrative.
fn section_order(intent: Intent) -> Vec<Category> {
    let match_order = [
        Category::Match(MatchCategory::GeneralInfo),
        Category::Match(MatchCategory::Commentary),
        Category::Match(MatchCategory::Scorecard),
    ];
    let player_order = [
        Category::Player(PlayerCategory::Profile),
        Category::Player(PlayerCategory::Career),
        Category::Player(PlayerCategory::BattingStats),
        Category::Player(PlayerCategory::BowlingStats),
    ];
    match intent {
        Intent::Match => match_order.to_vec(),
        Intent::Player => player_order.to_vec(),
        Intent::Combined => match_order.iter().chain(player_order.iter()).copied().collect(),
    }
}

fn heading(category: Category) -> &'static str {
    match category {
        Category::Match(MatchCategory::GeneralInfo) => "Overview",
        Category::Match(MatchCategory::Commentary) => "Key Moments",
        Category::Match(MatchCategory::Scorecard) => "Scorecard",
        Category::Player(PlayerCategory::Profile) => "Profile",
        Category::Player(PlayerCategory::Career) => "Career",
        Category::Player(PlayerCategory::BattingStats) => "Batting Statistics",
        Category::Player(PlayerCategory::BowlingStats) => "Bowling Statistics",
    }
}

fn title(subject: &str, intent: Intent) -> String {
    match intent {
        Intent::Match => format!("Match Report: {subject}"),
        Intent::Player => format!("Player Report: {subject}"),
        Intent::Combined => format!("Match & Player Report: {subject}"),
    }
}

/// Assembles reports in the house style: a narrative paragraph per section,
/// followed by the fetched figures in tabular form so every number stays
/// traceable to its source record.
pub struct JournalistDrafter<W> {
    writer: W,
}

impl<W> JournalistDrafter<W> {
    pub fn new(writer: W) -> Self {
        JournalistDrafter { writer }
    }
}

#[async_trait]
impl<W: SectionWriter> Drafter for JournalistDrafter<W> {
    async fn draft(
        &self,
        subject: &str,
        records: &[DataRecord],
        gaps: &[Gap],
        facts: &[SupplementaryFact],
        intent: Intent,
    ) -> Result<ReportDocument, DraftError> {
        if records.is_empty() {
            return Err(DraftError::InsufficientData);
        }

        let mut sections = Vec::new();
        let mut covered = Vec::new();
        for category in section_order(intent) {
            if let Some(record) = records.iter().find(|r| r.category() == category) {
                sections.push(self.record_section(subject, record).await?);
                covered.push(category);
            } else if let Some(gap) = gaps.iter().find(|g| g.category == category) {
                sections.push(gap_section(gap));
                covered.push(category);
            }
            // Categories neither fetched nor gapped were not requested.
        }

        // A record outside the intent's layout (e.g. after an intent
        // downgrade) still must not be dropped.
        for record in records {
            if !covered.contains(&record.category()) {
                sections.push(self.record_section(subject, record).await?);
            }
        }
        for gap in gaps {
            if !covered.contains(&gap.category) {
                sections.push(gap_section(gap));
            }
        }

        if !facts.is_empty() {
            sections.push(facts_section(facts));
        }

        Ok(ReportDocument::new(title(subject, intent), sections))
    }
}

impl<W: SectionWriter> JournalistDrafter<W> {
    async fn record_section(
        &self,
        subject: &str,
        record: &DataRecord,
    ) -> Result<Section, DraftError> {
        let pretty = record.pretty();
        let narrative = self
            .writer
            .narrate_section(subject, record.category(), &pretty)
            .await?;
        let table = render_payload_table(record.payload());
        Ok(Section {
            heading: heading(record.category()).to_string(),
            body: format!("{}\n\n{}", narrative.trim(), table),
        })
    }
}

fn gap_section(gap: &Gap) -> Section {
    Section {
        heading: heading(gap.category).to_string(),
        body: format!(
            "> Data gap: {} could not be retrieved ({}).",
            gap.category, gap.message
        ),
    }
}

fn facts_section(facts: &[SupplementaryFact]) -> Section {
    let mut body = String::new();
    for fact in facts {
        let _ = writeln!(body, "- {} _(source: {})_", fact.text(), fact.attribution());
    }
    Section {
        heading: "Around the Grounds".to_string(),
        body: body.trim_end().to_string(),
    }
}

/// Renders a provider payload as a markdown table. Payloads in the
/// provider's `headers`/`values` matrix shape become a proper grid; anything
/// else is flattened to field/value rows. Every leaf value appears verbatim.
pub fn render_payload_table(payload: &Value) -> String {
    if let Some(table) = provider_matrix_table(payload) {
        return table;
    }
    let mut rows = Vec::new();
    flatten_value("", payload, &mut rows);
    let mut table = String::from("| Field | Value |\n| --- | --- |\n");
    for (field, value) in rows {
        let _ = writeln!(table, "| {} | {} |", escape_cell(&field), escape_cell(&value));
    }
    table.trim_end().to_string()
}

fn provider_matrix_table(payload: &Value) -> Option<String> {
    let headers = payload.get("headers")?.as_array()?;
    let values = payload.get("values")?.as_array()?;
    let mut table = String::from("|");
    for header in headers {
        let _ = write!(table, " {} |", escape_cell(&value_text(header)));
    }
    table.push('\n');
    table.push('|');
    for _ in headers {
        table.push_str(" --- |");
    }
    table.push('\n');
    for row in values {
        let cells = row.get("values")?.as_array()?;
        table.push('|');
        for cell in cells {
            let _ = write!(table, " {} |", escape_cell(&value_text(cell)));
        }
        table.push('\n');
    }
    Some(table.trim_end().to_string())
}

fn flatten_value(path: &str, value: &Value, rows: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let nested_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                flatten_value(&nested_path, nested, rows);
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                flatten_value(&format!("{path}[{index}]"), nested, rows);
            }
        }
        leaf => rows.push((path.to_string(), value_text(leaf))),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::Identifier;
    use serde_json::json;

    struct CannedWriter;

    #[async_trait]
    impl SectionWriter for CannedWriter {
        async fn narrate_section(
            &self,
            _subject: &str,
            category: Category,
            _payload_pretty: &str,
        ) -> Result<String, DraftError> {
            Ok(format!("Narrative for {category}."))
        }
    }

    fn record(category: Category, payload: Value) -> DataRecord {
        DataRecord::new(Identifier::new(1413).expect("id"), category, payload)
    }

    #[test]
    fn matrix_payloads_render_as_grids() {
        let payload = json!({
            "headers": ["ROWHEADER", "Test", "ODI", "T20"],
            "values": [
                {"values": ["Matches", "113", "292", "115"]},
                {"values": ["Average", "49.15", "58.18", "48.69"]}
            ]
        });
        let table = render_payload_table(&payload);
        assert!(table.contains("| ROWHEADER | Test | ODI | T20 |"));
        assert!(table.contains("| Matches | 113 | 292 | 115 |"));
        assert!(table.contains("| Average | 49.15 | 58.18 | 48.69 |"));
    }

    #[test]
    fn flattened_payloads_keep_every_leaf_verbatim() {
        let payload = json!({
            "name": "Virat Kohli",
            "rankings": {"odi": 3, "test": 7},
            "teams": ["India", "RCB"]
        });
        let table = render_payload_table(&payload);
        for expected in ["Virat Kohli", "3", "7", "India", "RCB", "rankings.odi", "teams[1]"] {
            assert!(table.contains(expected), "missing {expected} in:\n{table}");
        }
    }

    #[tokio::test]
    async fn empty_records_fail_with_insufficient_data() {
        let drafter = JournalistDrafter::new(CannedWriter);
        let err = drafter
            .draft("Kohli", &[], &[], &[], Intent::Player)
            .await
            .expect_err("must fail");
        assert!(matches!(err, DraftError::InsufficientData));
    }

    #[tokio::test]
    async fn player_layout_orders_sections_and_appends_gap_notices() {
        let drafter = JournalistDrafter::new(CannedWriter);
        let records = vec![record(
            Category::Player(PlayerCategory::BattingStats),
            json!({"runs": "12169"}),
        )];
        let gaps = vec![Gap {
            category: Category::Player(PlayerCategory::BowlingStats),
            message: "provider returned 503".to_string(),
        }];
        let document = drafter
            .draft("Virat Kohli", &records, &gaps, &[], Intent::Player)
            .await
            .expect("drafts");
        assert_eq!(document.title(), "Player Report: Virat Kohli");
        let headings: Vec<&str> = document
            .sections()
            .iter()
            .map(|s| s.heading.as_str())
            .collect();
        assert_eq!(headings, vec!["Batting Statistics", "Bowling Statistics"]);
        assert!(document.sections()[0].body.contains("12169"));
        assert!(document.sections()[1].body.contains("Data gap"));
    }

    #[tokio::test]
    async fn supplementary_facts_are_additive_only() {
        let drafter = JournalistDrafter::new(CannedWriter);
        let records = vec![record(
            Category::Match(MatchCategory::GeneralInfo),
            json!({"status": "India won by 6 wickets"}),
        )];
        let facts = vec![
            SupplementaryFact::sourced("A record crowd attended.", "news.example.com")
                .expect("sourced"),
        ];
        let document = drafter
            .draft("India vs Australia", &records, &[], &facts, Intent::Match)
            .await
            .expect("drafts");
        let last = document.sections().last().expect("facts section");
        assert_eq!(last.heading, "Around the Grounds");
        assert!(last.body.contains("A record crowd attended."));
        assert!(last.body.contains("news.example.com"));
    }
}
