// Results Filter: captures rendered rows once and filters/sorts/re-renders
// them without touching the server.

pub mod criteria;

pub use criteria::FilterCriteria;

use scraper::Selector;
use std::collections::BTreeSet;
use tracing::debug;

use crate::model::{DepartureBucket, RowRecord, SortMode, TripTypeFilter};
use crate::page::ResultsPage;
use crate::parser::RowParser;
use chrono::Timelike;

/// Working state of the results filter.
///
/// Owns the row records captured at initialization; every apply starts from
/// this full list, never from the currently displayed subset. The context is
/// replaced wholesale when the page is re-initialized after a table swap.
pub struct FilterContext {
    rows: Vec<RowRecord>,
    display: Vec<usize>,
    carriers: BTreeSet<String>,
    controls_present: bool,
}

impl FilterContext {
    /// Captures the rows currently present in the page and wires up the
    /// filter state. Safe to call repeatedly; each call re-derives
    /// everything from the markup as it stands.
    ///
    /// When the apply/clear controls are missing the page has no filter UI:
    /// the airline list is still populated but nothing else attaches and
    /// [`apply`](Self::apply) / [`clear`](Self::clear) become no-ops.
    pub fn initialize(page: &mut ResultsPage) -> Self {
        debug!("initializing results filters");
        let parser = RowParser::new();
        let rows = parser.capture_rows(&page.document());
        if rows.is_empty() {
            debug!("no result rows found");
        }

        let mut carriers = BTreeSet::new();
        for row in &rows {
            if let Some(payload) = &row.payload {
                carriers.extend(payload.carrier_codes());
            }
        }
        populate_airline_list(page, &carriers);

        let controls_present = has_filter_controls(page);
        let context = Self {
            display: (0..rows.len()).collect(),
            rows,
            carriers,
            controls_present,
        };
        if !context.controls_present {
            debug!("filter controls not found, filter UI disabled");
            return context;
        }

        // Establish the initial displayed count.
        context.render(page);
        context
    }

    /// Applies the criteria over the full captured list, sorts the
    /// survivors and re-renders the row container.
    pub fn apply(&mut self, criteria: &FilterCriteria, page: &mut ResultsPage) {
        if !self.controls_present {
            return;
        }
        debug!("applying result filters");
        let mut selected: Vec<usize> = (0..self.rows.len())
            .filter(|&i| row_passes(&self.rows[i], criteria))
            .collect();

        match criteria.sort {
            SortMode::Cheapest => {
                selected.sort_by(|&a, &b| self.rows[a].price.total_cmp(&self.rows[b].price));
            }
            SortMode::Earliest => {
                selected.sort_by(|&a, &b| self.rows[a].departure_ordering(&self.rows[b]));
            }
            SortMode::Best => {}
        }

        self.display = selected;
        self.render(page);
    }

    /// Resets every filter control to its default/empty state and restores
    /// the full originally-captured list in its original order.
    pub fn clear(&mut self, page: &mut ResultsPage) {
        if !self.controls_present {
            return;
        }
        debug!("clearing result filters");
        reset_controls(page);
        self.display = (0..self.rows.len()).collect();
        self.render(page);
    }

    /// Rewrites the row container with the displayed rows in order and
    /// updates the count label. Row fragments are owned by the context and
    /// only borrowed here; a row is rendered at most once.
    fn render(&self, page: &mut ResultsPage) {
        let fragments: Vec<&str> = self
            .display
            .iter()
            .map(|&i| self.rows[i].markup.as_str())
            .collect();
        page.write_rows(&fragments);
        page.set_results_count(&self.display.len().to_string());
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn visible_count(&self) -> usize {
        self.display.len()
    }

    pub fn visible_rows(&self) -> Vec<&RowRecord> {
        self.display.iter().map(|&i| &self.rows[i]).collect()
    }

    /// Distinct carrier codes observed across all captured rows.
    pub fn carriers(&self) -> &BTreeSet<String> {
        &self.carriers
    }
}

/// Returns the control elements to their defaults: dropdowns back to their
/// first option, price and passenger inputs emptied, airline boxes
/// unchecked. Reading the criteria afterwards yields the inactive defaults.
fn reset_controls(page: &mut ResultsPage) {
    for id in [
        "sortSelect",
        "stopsFilter",
        "departureTime",
        "filterTripType",
        "filterCabinClass",
    ] {
        if let Ok(option) = Selector::parse(&format!("#{id} option")) {
            page.remove_attr(&option, "selected");
        }
    }
    for id in ["minPrice", "maxPrice", "filterPassengers"] {
        if let Ok(input) = Selector::parse(&format!("#{id}")) {
            page.remove_attr(&input, "value");
        }
    }
    let checkbox = Selector::parse(".airline-checkbox").unwrap();
    page.remove_attr(&checkbox, "checked");
}

fn has_filter_controls(page: &ResultsPage) -> bool {
    let apply = Selector::parse("#applyFilters").unwrap();
    let clear = Selector::parse("#clearFilters").unwrap();
    let doc = page.document();
    doc.select(&apply).next().is_some() && doc.select(&clear).next().is_some()
}

/// Adds a checkbox entry per observed carrier to `#airlinesContainer`,
/// alphabetically, skipping codes already present so re-initialization after
/// a table swap does not duplicate entries.
fn populate_airline_list(page: &mut ResultsPage, carriers: &BTreeSet<String>) {
    let checkbox = Selector::parse("#airlinesContainer .airline-checkbox").unwrap();
    let existing: BTreeSet<String> = page
        .document()
        .select(&checkbox)
        .filter_map(|el| el.value().attr("value").map(str::to_string))
        .collect();

    let mut fragment = String::new();
    for code in carriers {
        if existing.contains(code) {
            continue;
        }
        // Codes come from row payloads; escape them so a hostile code
        // cannot corrupt the spliced fragment.
        let attr = crate::page::escape_attr_value(code);
        let text = crate::page::escape_text(code);
        fragment.push_str(&format!(
            r#"<label class="d-block"><input type="checkbox" value="{attr}" id="air_{attr}" class="airline-checkbox"> {text}</label>"#
        ));
    }
    if !fragment.is_empty() {
        page.append_to_container("airlinesContainer", &fragment);
    }
}

/// One row against all criteria, in the documented order: stops, price
/// range, departure bucket, carriers, trip type, cabin class, passengers.
fn row_passes(row: &RowRecord, criteria: &FilterCriteria) -> bool {
    if !criteria.stops.matches(row.stops) {
        return false;
    }

    let min = criteria.min_price.unwrap_or(f64::NEG_INFINITY);
    let max = criteria.max_price.unwrap_or(f64::INFINITY);
    if row.price < min || row.price > max {
        return false;
    }

    if criteria.departure != DepartureBucket::Any {
        // A malformed or missing time cannot be bucketed.
        match row.departure {
            Some(time) if criteria.departure.contains_hour(time.hour()) => {}
            _ => return false,
        }
    }

    if !criteria.airlines.is_empty() {
        match &row.payload {
            Some(payload) => {
                if payload.carrier_codes().is_disjoint(&criteria.airlines) {
                    return false;
                }
            }
            None => return false,
        }
    }

    if criteria.trip_type != TripTypeFilter::Any {
        let Some(payload) = &row.payload else {
            return false;
        };
        let itineraries = payload.trip_itineraries();
        let matches = match criteria.trip_type {
            TripTypeFilter::OneWay => itineraries.len() == 1,
            TripTypeFilter::RoundTrip => itineraries.len() == 2,
            TripTypeFilter::MultiCity => {
                itineraries.len() > 2 || itineraries.iter().any(|it| it.segments.len() > 2)
            }
            TripTypeFilter::Any => true,
        };
        if !matches {
            return false;
        }
    }

    if let Some(cabin) = &criteria.cabin_class {
        let Some(payload) = &row.payload else {
            return false;
        };
        if !payload.matches_cabin(cabin) {
            return false;
        }
    }

    // Declared seat/traveler counts are advisory and an offer without them
    // is assumed bookable, so the passenger filter can only exclude rows
    // whose payload is missing or unparsable.
    if criteria.passengers > 1 && row.payload.is_none() {
        return false;
    }

    true
}
