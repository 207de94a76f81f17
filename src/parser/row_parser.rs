// Results-table row capture.
use chrono::NaiveTime;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::model::RowRecord;
use crate::payload::{parse_flight_payload, FlightPayload};

/// Extracts [`RowRecord`]s from the rendered results table.
///
/// Structured `data-*` attributes win when present; otherwise the textual
/// heuristics of the rendered cells are used.
pub struct RowParser {
    row: Selector,
    price_el: Selector,
    first_cell: Selector,
    second_leg: Selector,
    flight_json: Selector,
    time_re: Regex,
    price_strip_re: Regex,
}

impl RowParser {
    pub fn new() -> Self {
        Self {
            row: Selector::parse("tbody tr").unwrap(),
            price_el: Selector::parse(".price").unwrap(),
            first_cell: Selector::parse("td:first-child").unwrap(),
            second_leg: Selector::parse("td:first-child p + p").unwrap(),
            flight_json: Selector::parse(".flight-json").unwrap(),
            time_re: Regex::new(r"\d{2}:\d{2}").unwrap(),
            price_strip_re: Regex::new(r"[^0-9.\-]+").unwrap(),
        }
    }

    /// Captures every row currently present in the document's row container,
    /// in document order.
    pub fn capture_rows(&self, doc: &Html) -> Vec<RowRecord> {
        doc.select(&self.row).map(|el| self.extract_row(el)).collect()
    }

    fn extract_row(&self, row: ElementRef<'_>) -> RowRecord {
        RowRecord {
            markup: row.html(),
            price: self.price_of(row),
            stops: self.stops_of(row),
            departure: self.departure_of(row),
            payload: self.payload_of(row),
        }
    }

    /// Price from `data-price` when present (the text fallback is ignored
    /// entirely), else from the `.price` element's text with everything but
    /// digits, `.` and `-` stripped. Unparsable prices become `INFINITY` so
    /// any finite max-price filter drops the row.
    fn price_of(&self, row: ElementRef<'_>) -> f64 {
        if let Some(attr) = row.value().attr("data-price") {
            return attr.trim().parse::<f64>().unwrap_or(f64::INFINITY);
        }
        let Some(el) = row.select(&self.price_el).next() else {
            return f64::INFINITY;
        };
        let text: String = el.text().collect();
        let stripped = self.price_strip_re.replace_all(&text, "");
        stripped.parse::<f64>().unwrap_or(f64::INFINITY)
    }

    /// Stop count from `data-stops`, else inferred from a second
    /// paragraph in the first cell. The inference can only see one stop;
    /// two-or-more requires the attribute.
    fn stops_of(&self, row: ElementRef<'_>) -> u32 {
        if let Some(attr) = row.value().attr("data-stops") {
            return attr.trim().parse::<u32>().unwrap_or(0);
        }
        if row.select(&self.second_leg).next().is_some() {
            1
        } else {
            0
        }
    }

    /// First `HH:MM` substring of the first cell's text. A missing match or
    /// an out-of-range time yields the sentinel (`None`).
    fn departure_of(&self, row: ElementRef<'_>) -> Option<NaiveTime> {
        let cell = row.select(&self.first_cell).next()?;
        let text: String = cell.text().collect();
        let matched = self.time_re.find(&text)?;
        NaiveTime::parse_from_str(matched.as_str(), "%H:%M").ok()
    }

    fn payload_of(&self, row: ElementRef<'_>) -> Option<FlightPayload> {
        let raw = row
            .select(&self.flight_json)
            .next()
            .and_then(|el| el.value().attr("data-flight"))?;
        match parse_flight_payload(raw) {
            Ok(payload) => Some(payload),
            Err(e) => {
                debug!("row payload ignored: {e}");
                None
            }
        }
    }
}

impl Default for RowParser {
    fn default() -> Self {
        Self::new()
    }
}
