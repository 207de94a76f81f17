// Submission interceptor: recognizes the tracked search form, refreshes the
// results in the background and swaps the new table into the held page.
use scraper::{ElementRef, Html, Selector};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error};

use crate::fetch::Transport;
use crate::filter::FilterContext;
use crate::page::ResultsPage;

/// Named fields whose joint presence marks the tracked search form.
/// Exact, case-sensitive match; anything else passes through untouched.
const SIGNATURE_FIELDS: [&str; 3] = ["Origin", "Destination", "Departuredate"];

/// Settling delay between the table swap and the filter re-scan.
const REINIT_DELAY: Duration = Duration::from_millis(50);

/// Named fields of a submitted form, captured in document order.
#[derive(Debug, Clone)]
pub struct SearchForm {
    fields: Vec<(String, String)>,
}

impl SearchForm {
    /// Extracts the named controls of a form markup fragment. Unnamed
    /// controls are skipped, as a native form submission would skip them.
    pub fn from_fragment(markup: &str) -> Self {
        let fragment = Html::parse_fragment(markup);
        let named = Selector::parse("input[name], select[name], textarea[name]").unwrap();
        let mut fields = Vec::new();
        for el in fragment.select(&named) {
            let Some(name) = el.value().attr("name") else {
                continue;
            };
            fields.push((name.to_string(), control_value(el)));
        }
        Self { fields }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether this form is the search form the interceptor tracks.
    pub fn matches_search_signature(&self) -> bool {
        SIGNATURE_FIELDS
            .iter()
            .all(|wanted| self.fields.iter().any(|(name, _)| name.as_str() == *wanted))
    }
}

fn control_value(el: ElementRef<'_>) -> String {
    match el.value().name() {
        "input" => el.value().attr("value").unwrap_or_default().to_string(),
        "select" => {
            let option = Selector::parse("option").unwrap();
            let options: Vec<ElementRef<'_>> = el.select(&option).collect();
            options
                .iter()
                .find(|o| o.value().attr("selected").is_some())
                .or_else(|| options.first())
                .map(|o| match o.value().attr("value") {
                    Some(value) => value.to_string(),
                    None => o.text().collect::<String>().trim().to_string(),
                })
                .unwrap_or_default()
        }
        _ => el.text().collect(),
    }
}

/// What the interceptor did with a submit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The form does not match the signature; native submission proceeds.
    Passthrough,
    /// A refresh was already in flight; this submission is dropped.
    AlreadyInFlight,
    /// The background refresh completed. A flag is false when the response
    /// lacked that region and the replacement was skipped.
    Completed {
        table_replaced: bool,
        count_replaced: bool,
    },
    /// Network or HTTP failure; logged, the page is left as it was.
    Failed,
}

/// The submit-event handler.
///
/// One interceptor serves the whole page lifetime. Overlapping submissions
/// are dropped while one is in flight; there is no queueing and the first
/// request is never cancelled.
pub struct SubmitInterceptor<T: Transport> {
    transport: T,
    in_flight: AtomicBool,
    tooltip_hook: Option<Box<dyn Fn() + Send + Sync>>,
}

impl<T: Transport> SubmitInterceptor<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            in_flight: AtomicBool::new(false),
            tooltip_hook: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Registers the optional tooltip re-activation hook, invoked after a
    /// successful region replacement.
    pub fn with_tooltip_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.tooltip_hook = Some(Box::new(hook));
        self
    }

    /// Handles one submit event against the held page.
    ///
    /// On success the results regions found in the response replace the live
    /// ones and the filter context is rebuilt from the new rows. Whatever
    /// happens, the overlay is hidden and the results dim is restored before
    /// returning.
    pub async fn handle_submit(
        &self,
        form: &SearchForm,
        url: &str,
        page: &mut ResultsPage,
        filters: &mut FilterContext,
    ) -> SubmitOutcome {
        if !form.matches_search_signature() {
            return SubmitOutcome::Passthrough;
        }
        if self.in_flight.swap(true, Ordering::SeqCst) {
            debug!("submission ignored, a refresh is already in flight");
            return SubmitOutcome::AlreadyInFlight;
        }

        page.show_overlay();
        page.dim_results();

        let outcome = match self.transport.post_form(url, form.fields()).await {
            Ok(response) if response.is_success() => {
                let swap = page.replace_results_regions(&response.body);
                if let Some(hook) = &self.tooltip_hook {
                    hook();
                }
                // Let the swapped markup settle, then re-scan the rows.
                tokio::time::sleep(REINIT_DELAY).await;
                *filters = FilterContext::initialize(page);
                SubmitOutcome::Completed {
                    table_replaced: swap.table_replaced,
                    count_replaced: swap.count_replaced,
                }
            }
            Ok(response) => {
                error!("search refresh answered with status {}", response.status);
                SubmitOutcome::Failed
            }
            Err(e) => {
                error!("search refresh failed: {e}");
                SubmitOutcome::Failed
            }
        };

        page.hide_overlay();
        page.restore_results();
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }
}
