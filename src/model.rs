// Core structs: RowRecord, filter criteria enums, error types.
use chrono::NaiveTime;
use std::cmp::Ordering;

use crate::payload::FlightPayload;

/// In-memory summary of one rendered result row.
///
/// The record owns the row's serialized markup; the filter context holding
/// the record is the single owner and rendering only borrows the fragment.
#[derive(Debug, Clone)]
pub struct RowRecord {
    /// Outer markup of the `<tr>` element as captured at initialization.
    pub markup: String,
    /// Ticket price. `f64::INFINITY` when no parsable price was found,
    /// which keeps the row out of any finite upper-bound filter.
    pub price: f64,
    pub stops: u32,
    /// Departure time from the first cell. `None` is the sentinel for a
    /// missing or malformed time and sorts after every real time.
    pub departure: Option<NaiveTime>,
    /// Structured flight-offer payload, `None` when the row carried no
    /// payload or it failed to parse. Each filter decides its own
    /// inclusion policy for payload-less rows.
    pub payload: Option<FlightPayload>,
}

impl RowRecord {
    /// Ordering used by the "earliest" sort mode: ascending departure time,
    /// sentinel (`None`) last.
    pub fn departure_ordering(&self, other: &Self) -> Ordering {
        match (self.departure, other.departure) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    /// Keep the originally captured order.
    #[default]
    Best,
    Cheapest,
    Earliest,
}

impl SortMode {
    /// Maps a sort-select control value; unknown values fall back to `Best`.
    pub fn from_control(value: &str) -> Self {
        match value {
            "cheapest" => Self::Cheapest,
            "earliest" => Self::Earliest,
            _ => Self::Best,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopsFilter {
    #[default]
    Any,
    Exact(u32),
    /// Two or more stops.
    TwoPlus,
}

impl StopsFilter {
    pub fn from_control(value: &str) -> Self {
        match value {
            "any" | "" => Self::Any,
            "2" => Self::TwoPlus,
            other => match other.parse::<u32>() {
                Ok(n) => Self::Exact(n),
                Err(_) => Self::Any,
            },
        }
    }

    pub fn matches(&self, stops: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(n) => stops == *n,
            Self::TwoPlus => stops >= 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepartureBucket {
    #[default]
    Any,
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl DepartureBucket {
    pub fn from_control(value: &str) -> Self {
        match value {
            "morning" => Self::Morning,
            "afternoon" => Self::Afternoon,
            "evening" => Self::Evening,
            "night" => Self::Night,
            _ => Self::Any,
        }
    }

    /// Bucket membership by departure hour. Morning is [4,11], afternoon
    /// [12,17], evening [18,21], night wraps midnight (>=22 or <=3).
    pub fn contains_hour(&self, hour: u32) -> bool {
        match self {
            Self::Any => true,
            Self::Morning => (4..=11).contains(&hour),
            Self::Afternoon => (12..=17).contains(&hour),
            Self::Evening => (18..=21).contains(&hour),
            Self::Night => hour >= 22 || hour <= 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TripTypeFilter {
    #[default]
    Any,
    OneWay,
    RoundTrip,
    MultiCity,
}

impl TripTypeFilter {
    pub fn from_control(value: &str) -> Self {
        match value {
            "one-way" => Self::OneWay,
            "round-trip" => Self::RoundTrip,
            "multi-city" => Self::MultiCity,
            _ => Self::Any,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("flight payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("row carries an empty flight payload attribute")]
    EmptyAttribute,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(String),
    #[error("server answered with status {0}")]
    Status(u16),
}
