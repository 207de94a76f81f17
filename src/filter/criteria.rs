// Filter criteria, read off the page's control elements at apply time.
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;

use crate::model::{DepartureBucket, SortMode, StopsFilter, TripTypeFilter};

/// Transient snapshot of the filter controls. Never stored between applies;
/// every apply re-reads whatever the controls hold at that moment.
#[derive(Debug, Clone)]
pub struct FilterCriteria {
    pub sort: SortMode,
    pub stops: StopsFilter,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub departure: DepartureBucket,
    /// Checked airline checkboxes; empty means the carrier filter is off.
    pub airlines: BTreeSet<String>,
    pub trip_type: TripTypeFilter,
    /// Cabin-class needle; `None` means any cabin.
    pub cabin_class: Option<String>,
    pub passengers: u32,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            sort: SortMode::default(),
            stops: StopsFilter::default(),
            min_price: None,
            max_price: None,
            departure: DepartureBucket::default(),
            airlines: BTreeSet::new(),
            trip_type: TripTypeFilter::default(),
            cabin_class: None,
            passengers: 1,
        }
    }
}

impl FilterCriteria {
    /// Reads the criteria from the fixed control elements of the given
    /// document. Absent optional controls leave their criterion inactive.
    pub fn from_document(doc: &Html) -> Self {
        let sort = control_value(doc, "sortSelect")
            .map(|v| SortMode::from_control(&v))
            .unwrap_or_default();
        let stops = control_value(doc, "stopsFilter")
            .map(|v| StopsFilter::from_control(&v))
            .unwrap_or_default();
        let min_price = control_value(doc, "minPrice").and_then(|v| v.trim().parse::<f64>().ok());
        let max_price = control_value(doc, "maxPrice").and_then(|v| v.trim().parse::<f64>().ok());
        let departure = control_value(doc, "departureTime")
            .map(|v| DepartureBucket::from_control(&v))
            .unwrap_or_default();
        let trip_type = control_value(doc, "filterTripType")
            .map(|v| TripTypeFilter::from_control(&v))
            .unwrap_or_default();
        let cabin_class = control_value(doc, "filterCabinClass")
            .filter(|v| !v.is_empty() && v.as_str() != "any");
        let passengers = control_value(doc, "filterPassengers")
            .and_then(|v| v.trim().parse::<u32>().ok())
            .unwrap_or(1)
            .max(1);

        let checked = Selector::parse(".airline-checkbox[checked]").unwrap();
        let airlines = doc
            .select(&checked)
            .filter_map(|el| el.value().attr("value").map(str::to_string))
            .collect();

        Self {
            sort,
            stops,
            min_price,
            max_price,
            departure,
            airlines,
            trip_type,
            cabin_class,
            passengers,
        }
    }
}

/// Current value of a control element: the `value` attribute for inputs,
/// the selected (or first) option for selects, the text otherwise.
fn control_value(doc: &Html, id: &str) -> Option<String> {
    let selector = Selector::parse(&format!("#{id}")).ok()?;
    let el = doc.select(&selector).next()?;
    match el.value().name() {
        "input" => Some(el.value().attr("value").unwrap_or_default().to_string()),
        "select" => {
            let option = Selector::parse("option").unwrap();
            let options: Vec<ElementRef<'_>> = el.select(&option).collect();
            options
                .iter()
                .find(|o| o.value().attr("selected").is_some())
                .or_else(|| options.first())
                .map(option_value)
        }
        _ => Some(el.text().collect()),
    }
}

fn option_value(option: &ElementRef<'_>) -> String {
    match option.value().attr("value") {
        Some(value) => value.to_string(),
        None => option.text().collect::<String>().trim().to_string(),
    }
}
