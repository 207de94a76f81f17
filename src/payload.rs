// Flight-offer JSON payloads embedded in result rows.
//
// The server emits two shapes: a bare offer `{ "itineraries": [...] }` and a
// wrapper `{ "flightOffers": [ ... ] }`. Both are modelled as one untagged
// union and normalized into `FlightPayload` so the filters never branch on
// the wire shape again.
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::model::PayloadError;

#[derive(Debug, Clone, Deserialize)]
pub struct Segment {
    #[serde(rename = "carrierCode", default)]
    pub carrier_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Itinerary {
    #[serde(default)]
    pub segments: Vec<Segment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FareDetail {
    #[serde(default)]
    pub cabin: Option<String>,
}

/// Per-segment fare details arrive either as a JSON array or as an object
/// keyed by segment id, depending on which upstream API produced the offer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FareDetails {
    List(Vec<FareDetail>),
    Keyed(BTreeMap<String, FareDetail>),
}

impl FareDetails {
    pub fn cabins(&self) -> Vec<&str> {
        let details: Vec<&FareDetail> = match self {
            Self::List(list) => list.iter().collect(),
            Self::Keyed(map) => map.values().collect(),
        };
        details
            .into_iter()
            .filter_map(|d| d.cabin.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FlightOffer {
    #[serde(default)]
    pub itineraries: Vec<Itinerary>,
    #[serde(rename = "fareDetailsBySegment", default)]
    pub fare_details: Option<FareDetails>,
    #[serde(rename = "class", default)]
    pub cabin_class: Option<String>,
}

#[derive(Deserialize)]
struct WrappedPayload {
    #[serde(rename = "flightOffers")]
    flight_offers: Vec<FlightOffer>,
    #[serde(rename = "numberOfBookableSeats", default)]
    bookable_seats: Option<u32>,
    #[serde(default)]
    travelers: Option<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct BarePayload {
    #[serde(default)]
    itineraries: Vec<Itinerary>,
    #[serde(rename = "fareDetailsBySegment", default)]
    fare_details: Option<FareDetails>,
    #[serde(rename = "class", default)]
    cabin_class: Option<String>,
    #[serde(rename = "numberOfBookableSeats", default)]
    bookable_seats: Option<u32>,
    #[serde(default)]
    travelers: Option<Vec<serde_json::Value>>,
}

// Wrapped must be tried first: a bare payload accepts any object since all
// of its fields default.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawPayload {
    Wrapped(WrappedPayload),
    Bare(BarePayload),
}

/// Canonical form of an embedded payload after shape normalization.
#[derive(Debug, Clone)]
pub struct FlightPayload {
    pub offers: Vec<FlightOffer>,
    pub bookable_seats: Option<u32>,
    pub traveler_count: Option<usize>,
}

impl FlightPayload {
    /// Distinct carrier codes across every segment of every offer.
    pub fn carrier_codes(&self) -> BTreeSet<String> {
        let mut codes = BTreeSet::new();
        for offer in &self.offers {
            for itinerary in &offer.itineraries {
                for segment in &itinerary.segments {
                    if let Some(code) = &segment.carrier_code {
                        if !code.is_empty() {
                            codes.insert(code.clone());
                        }
                    }
                }
            }
        }
        codes
    }

    /// Itineraries used for trip-type classification. Wrapped payloads are
    /// classified by their first offer only.
    pub fn trip_itineraries(&self) -> &[Itinerary] {
        self.offers
            .first()
            .map(|o| o.itineraries.as_slice())
            .unwrap_or(&[])
    }

    /// Case-insensitive substring match of a cabin-class filter value
    /// (underscores stripped) against every offer's fare details and
    /// top-level class field.
    pub fn matches_cabin(&self, wanted: &str) -> bool {
        let needle = wanted.to_lowercase().replace('_', "");
        if needle.is_empty() {
            return true;
        }
        for offer in &self.offers {
            if let Some(details) = &offer.fare_details {
                if details
                    .cabins()
                    .iter()
                    .any(|c| c.to_lowercase().contains(&needle))
                {
                    return true;
                }
            }
            if let Some(class) = &offer.cabin_class {
                if class.to_lowercase().contains(&needle) {
                    return true;
                }
            }
        }
        false
    }

}

/// Parses the raw `data-flight` attribute value into the canonical payload.
///
/// The attribute may still carry one level of entity escaping when the
/// template double-escaped it, so `&quot;` is folded back before parsing.
pub fn parse_flight_payload(raw: &str) -> Result<FlightPayload, PayloadError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PayloadError::EmptyAttribute);
    }
    let unescaped = trimmed.replace("&quot;", "\"");
    let parsed: RawPayload = serde_json::from_str(&unescaped)?;
    Ok(match parsed {
        RawPayload::Wrapped(w) => FlightPayload {
            offers: w.flight_offers,
            bookable_seats: w.bookable_seats,
            traveler_count: w.travelers.map(|t| t.len()),
        },
        RawPayload::Bare(b) => FlightPayload {
            offers: vec![FlightOffer {
                itineraries: b.itineraries,
                fare_details: b.fare_details,
                cabin_class: b.cabin_class,
            }],
            bookable_seats: b.bookable_seats,
            traveler_count: b.travelers.map(|t| t.len()),
        },
    })
}
