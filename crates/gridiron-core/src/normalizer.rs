//! Normalizer — maps one raw provider record onto one [`CanonicalEntity`].
//!
//! Pure and infallible: every record yields either an entity or a
//! [`Normalized::Skip`]. Typed fields are coerced best-effort (numbers sent as
//! strings, ids nested under `team`/`player`/`game` objects); anything that
//! cannot be coerced is left as `None`. A `0` from the provider stays `Some(0)`.

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};

use crate::entity::{
    CanonicalEntity, EntityData, Matchup, Player, PlayerAdvancedMetrics, PlayerStats, RawPayload,
    Team,
};
use crate::types::{ExternalId, ExternalRecord, ResourceType};

/// Result of normalising one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    Entity(CanonicalEntity),
    Skip(SkipReason),
}

/// Why a record was skipped. Skips are counted, never treated as failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record has no external id")]
    MissingExternalId,
    #[error("external id {0} is not a positive integer")]
    InvalidExternalId(String),
}

/// Normalise `record` as a member of `resource`.
pub fn normalize(record: ExternalRecord, resource: ResourceType) -> Normalized {
    let Some(obj) = record.0.as_object() else {
        return Normalized::Skip(SkipReason::NotAnObject);
    };
    let fields = Fields(obj);

    let external_id = match fields.external_id() {
        Ok(id) => id,
        Err(reason) => return Normalized::Skip(reason),
    };

    let data = match resource {
        ResourceType::Teams => EntityData::Team(team(&fields)),
        ResourceType::Players => EntityData::Player(player(&fields)),
        ResourceType::Games => EntityData::Matchup(matchup(&fields)),
        ResourceType::Stats => EntityData::PlayerStats(player_stats(&fields)),
        ResourceType::AdvancedMetrics => {
            EntityData::PlayerAdvancedMetrics(advanced_metrics(&fields))
        }
    };

    Normalized::Entity(CanonicalEntity {
        external_id,
        data,
        raw: RawPayload(record.into_inner()),
    })
}

// ---------------------------------------------------------------------------
// Per-kind mappings
// ---------------------------------------------------------------------------

fn team(f: &Fields<'_>) -> Team {
    Team {
        abbreviation: f.text("abbreviation"),
        full_name: f.text("full_name"),
        location: f.text("location"),
        name: f.text("name"),
        conference: f.text("conference"),
        division: f.text("division"),
    }
}

fn player(f: &Fields<'_>) -> Player {
    Player {
        first_name: f.text("first_name"),
        last_name: f.text("last_name"),
        position: f.text("position"),
        position_abbreviation: f.text("position_abbreviation"),
        height: f.text("height"),
        weight_lbs: f.get("weight").and_then(leading_int),
        jersey_number: f.text("jersey_number"),
        college: f.text("college"),
        experience: f.text("experience"),
        age: f.int("age"),
        team_id: f.related_id("team"),
    }
}

fn matchup(f: &Fields<'_>) -> Matchup {
    let (kickoff, date) = match f.get("date") {
        Some(v) => parse_when(v),
        None => (None, None),
    };

    Matchup {
        season: f.int("season").and_then(to_i32),
        week: f.int("week").and_then(to_i32),
        kickoff,
        date,
        status: f.text("status"),
        postseason: f.boolean("postseason"),
        home_team_id: f.related_id("home_team"),
        visitor_team_id: f.related_id("visitor_team"),
        home_team_score: f.int("home_team_score"),
        visitor_team_score: f.int("visitor_team_score"),
        venue: f.text("venue"),
    }
}

fn player_stats(f: &Fields<'_>) -> PlayerStats {
    let game = f.object("game");

    PlayerStats {
        player_id: f.related_id("player"),
        team_id: f.related_id("team"),
        game_id: f.related_id("game"),
        season: f
            .int("season")
            .or_else(|| game.as_ref().and_then(|g| g.int("season")))
            .and_then(to_i32),
        week: f
            .int("week")
            .or_else(|| game.as_ref().and_then(|g| g.int("week")))
            .and_then(to_i32),
        passing_completions: f.int("passing_completions"),
        passing_attempts: f.int("passing_attempts"),
        passing_yards: f.int("passing_yards"),
        passing_touchdowns: f.int("passing_touchdowns"),
        passing_interceptions: f.int("passing_interceptions"),
        rushing_attempts: f.int("rushing_attempts"),
        rushing_yards: f.int("rushing_yards"),
        rushing_touchdowns: f.int("rushing_touchdowns"),
        receptions: f.int("receptions"),
        receiving_targets: f.int("receiving_targets"),
        receiving_yards: f.int("receiving_yards"),
        receiving_touchdowns: f.int("receiving_touchdowns"),
        fumbles_lost: f.int("fumbles_lost"),
        qb_rating: f.float("qb_rating"),
    }
}

fn advanced_metrics(f: &Fields<'_>) -> PlayerAdvancedMetrics {
    PlayerAdvancedMetrics {
        player_id: f.related_id("player"),
        team_id: f.related_id("team"),
        season: f.int("season").and_then(to_i32),
        week: f.int("week").and_then(to_i32),
        avg_time_to_throw: f.float("avg_time_to_throw"),
        avg_air_yards_differential: f.float("avg_air_yards_differential"),
        completion_percentage_above_expectation: f
            .float("completion_percentage_above_expectation"),
        aggressiveness: f.float("aggressiveness"),
        avg_separation: f.float("avg_separation"),
        avg_yac_above_expectation: f.float("avg_yac_above_expectation"),
        rush_yards_over_expected: f.float("rush_yards_over_expected"),
        efficiency: f.float("efficiency"),
    }
}

// ---------------------------------------------------------------------------
// Field access and coercion
// ---------------------------------------------------------------------------

struct Fields<'a>(&'a Map<String, Value>);

impl<'a> Fields<'a> {
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.0.get(key).filter(|v| !v.is_null())
    }

    fn object(&self, key: &str) -> Option<Fields<'a>> {
        self.get(key).and_then(Value::as_object).map(Fields)
    }

    fn external_id(&self) -> Result<ExternalId, SkipReason> {
        let value = self.get("id").ok_or(SkipReason::MissingExternalId)?;
        match as_int(value) {
            Some(id) if id > 0 => Ok(ExternalId(id)),
            _ => Err(SkipReason::InvalidExternalId(value.to_string())),
        }
    }

    fn text(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(as_int)
    }

    fn float(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
            _ => None,
        }
    }

    fn boolean(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Id of a related entity: either a nested `{ "team": { "id": 3 } }`
    /// object or a flat `team_id` field.
    fn related_id(&self, name: &str) -> Option<i64> {
        self.object(name)
            .and_then(|o| o.int("id"))
            .or_else(|| self.int(&format!("{name}_id")))
    }
}

fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// `"225 lbs"` → 225. Plain numbers pass through [`as_int`].
fn leading_int(value: &Value) -> Option<i64> {
    if let Some(n) = as_int(value) {
        return Some(n);
    }
    let s = value.as_str()?.trim();
    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn to_i32(n: i64) -> Option<i32> {
    i32::try_from(n).ok()
}

fn parse_when(value: &Value) -> (Option<DateTime<Utc>>, Option<NaiveDate>) {
    let Some(s) = value.as_str().map(str::trim) else {
        return (None, None);
    };
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        let ts = ts.with_timezone(&Utc);
        return (Some(ts), Some(ts.date_naive()));
    }
    (None, NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
