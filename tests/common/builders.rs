//! Test builders — ergonomic constructors for provider records and pages.
//!
//! These builders are designed for readability in test assertions, not for
//! production use. They panic on invalid input rather than returning `Result`.

use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use gridiron_core::{ExternalRecord, PageCursor};
use gridiron_feeds::Page;
use serde_json::{json, Map, Value};

// ---------------------------------------------------------------------------
// RecordBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for provider records.
///
/// # Example
///
/// ```rust
/// let record = RecordBuilder::player(33)
///     .field("position_abbreviation", "QB")
///     .team(3)
///     .build();
/// ```
pub struct RecordBuilder {
    fields: Map<String, Value>,
}

impl RecordBuilder {
    /// A record with only an `id`.
    pub fn with_id(id: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert("id".into(), id.into());
        Self { fields }
    }

    /// A record with no `id` at all.
    pub fn without_id() -> Self {
        Self { fields: Map::new() }
    }

    /// A player with a random name.
    pub fn player(id: i64) -> Self {
        Self::with_id(id)
            .field("first_name", FirstName().fake::<String>())
            .field("last_name", LastName().fake::<String>())
    }

    pub fn team_record(id: i64, abbreviation: &str) -> Self {
        Self::with_id(id)
            .field("abbreviation", abbreviation)
            .field("full_name", format!("{abbreviation} Football Club"))
    }

    pub fn game(id: i64, season: i32, week: i32) -> Self {
        Self::with_id(id)
            .field("season", season)
            .field("week", week)
            .field("status", "Final")
    }

    pub fn field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Nested `{ "team": { "id": N } }` reference.
    pub fn team(self, team_id: i64) -> Self {
        self.field("team", json!({ "id": team_id }))
    }

    pub fn build(self) -> ExternalRecord {
        ExternalRecord(Value::Object(self.fields))
    }
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// `n` valid players with ids `first..first + n`.
pub fn players(first: i64, n: usize) -> Vec<ExternalRecord> {
    (0..n as i64)
        .map(|i| RecordBuilder::player(first + i).build())
        .collect()
}

/// A page that points at `next`.
pub fn page(records: Vec<ExternalRecord>, next: Option<&str>) -> Page {
    Page {
        records,
        next_cursor: next.map(PageCursor::new),
    }
}

/// The final page of a feed.
pub fn last_page(records: Vec<ExternalRecord>) -> Page {
    page(records, None)
}
