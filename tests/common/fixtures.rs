//! Canned provider responses, shaped like the real API's JSON envelopes.

use serde_json::{json, Value};

/// Two Eastern-division teams, final page.
pub fn teams_envelope() -> Value {
    json!({
        "data": [
            {
                "id": 1,
                "conference": "AFC",
                "division": "EAST",
                "location": "Buffalo",
                "name": "Bills",
                "full_name": "Buffalo Bills",
                "abbreviation": "BUF"
            },
            {
                "id": 2,
                "conference": "AFC",
                "division": "EAST",
                "location": "Miami",
                "name": "Dolphins",
                "full_name": "Miami Dolphins",
                "abbreviation": "MIA"
            }
        ],
        "meta": { "per_page": 25 }
    })
}

/// A players page with the given ids, pointing at `next` (string or number
/// cursor as the provider sends it).
pub fn players_envelope(ids: &[i64], next: Option<Value>) -> Value {
    let data: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "first_name": "Player",
                "last_name": format!("{id}"),
                "position": "Wide Receiver",
                "position_abbreviation": "WR",
                "weight": "195 lbs",
                "team": { "id": 1, "abbreviation": "BUF" }
            })
        })
        .collect();
    let mut meta = json!({ "per_page": ids.len() });
    if let Some(next) = next {
        meta["next_cursor"] = next;
    }
    json!({ "data": data, "meta": meta })
}

/// One completed regular-season game.
pub fn games_envelope() -> Value {
    json!({
        "data": [{
            "id": 7001,
            "season": 2024,
            "week": 1,
            "date": "2024-09-06T00:20:00.000Z",
            "status": "Final",
            "postseason": false,
            "home_team": { "id": 17, "abbreviation": "KC" },
            "visitor_team": { "id": 3, "abbreviation": "BAL" },
            "home_team_score": 27,
            "visitor_team_score": 20,
            "venue": "GEHA Field at Arrowhead Stadium"
        }],
        "meta": {}
    })
}

/// Malformed body the provider sometimes returns behind a proxy error page.
pub const HTML_ERROR_PAGE: &str = "<html><body>Bad Gateway</body></html>";
