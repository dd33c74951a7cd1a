//! Canonical entity shapes produced by the normalizer.
//!
//! Every typed field is optional: `None` means the provider did not send a
//! usable value, which is distinct from a real zero. The untouched provider
//! payload travels alongside in [`RawPayload`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EntityKind, ExternalId};

/// Verbatim provider payload, kept so fields added upstream after this
/// pipeline was written can still be recovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawPayload(pub serde_json::Value);

/// A normalised record ready for upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalEntity {
    pub external_id: ExternalId,
    pub data: EntityData,
    pub raw: RawPayload,
}

impl CanonicalEntity {
    pub fn kind(&self) -> EntityKind {
        self.data.kind()
    }

    /// Team the entity belongs to, for read-side filtering.
    pub fn team_id(&self) -> Option<i64> {
        match &self.data {
            EntityData::Team(_) => Some(self.external_id.0),
            EntityData::Player(p) => p.team_id,
            EntityData::PlayerStats(s) => s.team_id,
            EntityData::Matchup(m) => m.home_team_id,
            EntityData::PlayerAdvancedMetrics(a) => a.team_id,
        }
    }

    /// Teams involved; only matchups have two.
    pub fn team_ids(&self) -> Vec<i64> {
        match &self.data {
            EntityData::Matchup(m) => m.home_team_id.into_iter().chain(m.visitor_team_id).collect(),
            _ => self.team_id().into_iter().collect(),
        }
    }

    pub fn season(&self) -> Option<i32> {
        match &self.data {
            EntityData::PlayerStats(s) => s.season,
            EntityData::Matchup(m) => m.season,
            EntityData::PlayerAdvancedMetrics(a) => a.season,
            EntityData::Team(_) | EntityData::Player(_) => None,
        }
    }

    pub fn week(&self) -> Option<i32> {
        match &self.data {
            EntityData::PlayerStats(s) => s.week,
            EntityData::Matchup(m) => m.week,
            EntityData::PlayerAdvancedMetrics(a) => a.week,
            EntityData::Team(_) | EntityData::Player(_) => None,
        }
    }
}

/// Typed fields per entity kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityData {
    Team(Team),
    Player(Player),
    PlayerStats(PlayerStats),
    Matchup(Matchup),
    PlayerAdvancedMetrics(PlayerAdvancedMetrics),
}

impl EntityData {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityData::Team(_) => EntityKind::Team,
            EntityData::Player(_) => EntityKind::Player,
            EntityData::PlayerStats(_) => EntityKind::PlayerStats,
            EntityData::Matchup(_) => EntityKind::Matchup,
            EntityData::PlayerAdvancedMetrics(_) => EntityKind::PlayerAdvancedMetrics,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub abbreviation: Option<String>,
    pub full_name: Option<String>,
    pub location: Option<String>,
    pub name: Option<String>,
    pub conference: Option<String>,
    pub division: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub position: Option<String>,
    pub position_abbreviation: Option<String>,
    /// Height as the provider spells it (e.g. `6' 2"`).
    pub height: Option<String>,
    /// Weight in pounds.
    pub weight_lbs: Option<i64>,
    pub jersey_number: Option<String>,
    pub college: Option<String>,
    pub experience: Option<String>,
    pub age: Option<i64>,
    pub team_id: Option<i64>,
}

/// One player's line for one game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub player_id: Option<i64>,
    pub team_id: Option<i64>,
    pub game_id: Option<i64>,
    pub season: Option<i32>,
    pub week: Option<i32>,
    pub passing_completions: Option<i64>,
    pub passing_attempts: Option<i64>,
    pub passing_yards: Option<i64>,
    pub passing_touchdowns: Option<i64>,
    pub passing_interceptions: Option<i64>,
    pub rushing_attempts: Option<i64>,
    pub rushing_yards: Option<i64>,
    pub rushing_touchdowns: Option<i64>,
    pub receptions: Option<i64>,
    pub receiving_targets: Option<i64>,
    pub receiving_yards: Option<i64>,
    pub receiving_touchdowns: Option<i64>,
    pub fumbles_lost: Option<i64>,
    pub qb_rating: Option<f64>,
}

/// A scheduled or completed game between two teams.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub season: Option<i32>,
    pub week: Option<i32>,
    pub kickoff: Option<DateTime<Utc>>,
    /// Date-only schedule entries, when the provider has no kickoff time.
    pub date: Option<NaiveDate>,
    pub status: Option<String>,
    pub postseason: Option<bool>,
    pub home_team_id: Option<i64>,
    pub visitor_team_id: Option<i64>,
    pub home_team_score: Option<i64>,
    pub visitor_team_score: Option<i64>,
    pub venue: Option<String>,
}

/// Derived per-player efficiency metrics. A distinct kind from
/// [`PlayerStats`], so stats syncs never touch these records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerAdvancedMetrics {
    pub player_id: Option<i64>,
    pub team_id: Option<i64>,
    pub season: Option<i32>,
    pub week: Option<i32>,
    pub avg_time_to_throw: Option<f64>,
    pub avg_air_yards_differential: Option<f64>,
    pub completion_percentage_above_expectation: Option<f64>,
    pub aggressiveness: Option<f64>,
    pub avg_separation: Option<f64>,
    pub avg_yac_above_expectation: Option<f64>,
    pub rush_yards_over_expected: Option<f64>,
    pub efficiency: Option<f64>,
}
