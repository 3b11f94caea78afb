//! Core types shared across FRA Atlas: claim records, claim status, query
//! state, search parameters, and the per-search result set.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use tracing::warn;

use crate::geo::{self, Footprint, LatLng};

/// Database identifier of a claim row.
pub type ClaimId = i64;

// ---------------------------------------------------------------------------
// Claim records
// ---------------------------------------------------------------------------

/// One Forest Rights Act claim as served by the records API.
///
/// Text columns that the API sends as `null` decode to empty strings (required
/// columns) or `None` (descriptive columns), so one sparse row never fails a
/// whole response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimRecord {
    pub id: ClaimId,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub patta_holder_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub father_or_husband_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub village_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub district: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub state: String,
    /// Free-text magnitude plus unit, e.g. "2.5 hectare".
    #[serde(default, deserialize_with = "null_as_empty")]
    pub total_area_claimed: String,
    /// Comma-joined "lat,lng".
    #[serde(default, deserialize_with = "null_as_empty")]
    pub coordinates: String,
    /// External business identifier printed on the claim form.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub claim_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub land_use: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cultivation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub water_bodies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forest_cover: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homestead: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_application: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl ClaimRecord {
    /// Minimal record with only the identifying columns set. Handy for fixtures.
    pub fn new(id: ClaimId, patta_holder_name: impl Into<String>) -> Self {
        Self {
            id,
            patta_holder_name: patta_holder_name.into(),
            father_or_husband_name: String::new(),
            village_name: String::new(),
            district: String::new(),
            state: String::new(),
            total_area_claimed: String::new(),
            coordinates: String::new(),
            claim_id: String::new(),
            status: String::new(),
            land_use: None,
            cultivation: None,
            phone: None,
            water_bodies: None,
            forest_cover: None,
            homestead: None,
            age: None,
            gender: None,
            address: None,
            block: None,
            date_of_application: None,
        }
    }

    pub fn claim_status(&self) -> ClaimStatus {
        ClaimStatus::parse(&self.status)
    }

    /// Map position, or `None` when the coordinates are missing or malformed.
    pub fn position(&self) -> Option<LatLng> {
        geo::parse_coordinates(&self.coordinates)
    }

    /// Approximate claim footprint for map context. Requires both a position
    /// and an area with a recognized unit.
    pub fn footprint(&self) -> Option<Footprint> {
        geo::claim_footprint(self.position()?, &self.total_area_claimed)
    }
}

/// Drop records whose `id` repeats an earlier one, keeping first occurrences
/// and the original order.
pub fn dedupe_by_id(records: Vec<ClaimRecord>) -> Vec<ClaimRecord> {
    let mut seen = HashSet::with_capacity(records.len());
    let before = records.len();
    let unique: Vec<ClaimRecord> = records.into_iter().filter(|r| seen.insert(r.id)).collect();
    if unique.len() != before {
        warn!(dropped = before - unique.len(), "Dropped claims with duplicate ids");
    }
    unique
}

// ---------------------------------------------------------------------------
// Claim status
// ---------------------------------------------------------------------------

/// Claim status. The API treats status as free text; four values are
/// recognized and everything else renders with a neutral fallback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClaimStatus {
    Verified,
    Pending,
    Approved,
    Rejected,
    Other(String),
}

impl ClaimStatus {
    /// Case-insensitive parse; unknown values keep their original text.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "verified" => ClaimStatus::Verified,
            "pending" => ClaimStatus::Pending,
            "approved" => ClaimStatus::Approved,
            "rejected" => ClaimStatus::Rejected,
            _ => ClaimStatus::Other(raw.trim().to_string()),
        }
    }

    /// Display label for badges and tables.
    pub fn label(&self) -> &str {
        match self {
            ClaimStatus::Verified => "Verified",
            ClaimStatus::Pending => "Pending",
            ClaimStatus::Approved => "Approved",
            ClaimStatus::Rejected => "Rejected",
            ClaimStatus::Other(raw) => raw.as_str(),
        }
    }

    /// Marker fill color.
    pub fn marker_color(&self) -> &'static str {
        match self {
            ClaimStatus::Verified => "#16a34a",
            ClaimStatus::Pending => "#eab308",
            ClaimStatus::Approved => "#2563eb",
            ClaimStatus::Rejected => "#dc2626",
            ClaimStatus::Other(_) => "#6b7280",
        }
    }

    /// Footprint outline color: verified claims stand out, the rest share one.
    pub fn outline_color(&self) -> &'static str {
        match self {
            ClaimStatus::Verified => "green",
            _ => "blue",
        }
    }
}

/// Per-status tallies over a record set (the sidebar layer badges).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub verified: usize,
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub other: usize,
}

impl StatusCounts {
    pub fn tally(records: &[ClaimRecord]) -> Self {
        let mut counts = StatusCounts::default();
        for record in records {
            match record.claim_status() {
                ClaimStatus::Verified => counts.verified += 1,
                ClaimStatus::Pending => counts.pending += 1,
                ClaimStatus::Approved => counts.approved += 1,
                ClaimStatus::Rejected => counts.rejected += 1,
                ClaimStatus::Other(_) => counts.other += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.verified + self.pending + self.approved + self.rejected + self.other
    }
}

// ---------------------------------------------------------------------------
// Query state and search parameters
// ---------------------------------------------------------------------------

/// Current search text and filter selections. Empty means "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryState {
    pub query: String,
    pub status_filter: String,
    pub state_filter: String,
    pub district_filter: String,
}

impl QueryState {
    pub fn params(&self) -> SearchParams {
        SearchParams::new(&self.query, &self.status_filter, &self.state_filter, &self.district_filter)
    }
}

/// Normalized parameters for one remote search. Blank inputs become `None`
/// and are left off the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub status: Option<String>,
    pub state: Option<String>,
    pub district: Option<String>,
}

impl SearchParams {
    pub fn new(q: &str, status: &str, state: &str, district: &str) -> Self {
        Self {
            q: non_blank(q),
            status: non_blank(status),
            state: non_blank(state),
            district: non_blank(district),
        }
    }

    /// Text-only search.
    pub fn text(q: &str) -> Self {
        Self::new(q, "", "", "")
    }

    /// True when no parameter constrains the search.
    pub fn is_empty(&self) -> bool {
        self.q.is_none() && self.status.is_none() && self.state.is_none() && self.district.is_none()
    }

    /// `(name, value)` pairs for the query string, omitting unset parameters.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("q", &self.q),
            ("status", &self.status),
            ("state", &self.state),
            ("district", &self.district),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// Result set
// ---------------------------------------------------------------------------

/// Most recent search response plus the dropdown flags. Replaced wholesale by
/// each search, never merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResultSet {
    pub records: Vec<ClaimRecord>,
    pub loading: bool,
    pub visible: bool,
}
