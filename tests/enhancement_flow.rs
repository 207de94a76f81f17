// End-to-end flow: submit interception, background refresh, region swap and
// filter re-initialization over the swapped rows.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use faresift::model::FetchError;
use faresift::{
    FetchResponse, FilterContext, FilterCriteria, ResultsPage, SearchForm, SortMode,
    SubmitInterceptor, SubmitOutcome, Transport,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn page_markup(rows: &str, count: usize) -> String {
    format!(
        r#"<html><body>
        <form><input name="Origin" value="AMS"><input name="Destination" value="JFK">
        <input name="Departuredate" value="2026-09-01"></form>
        <div id="airlinesContainer"></div>
        <button id="applyFilters">Apply</button>
        <button id="clearFilters">Clear</button>
        <p>Found <span id="resultsCount">{count}</span> flights</p>
        <div class="table-responsive"><table><tbody>{rows}</tbody></table></div>
        </body></html>"#
    )
}

fn row(id: &str, price: f64, time: &str, carrier: &str) -> String {
    format!(
        r#"<tr id="{id}" data-price="{price}"><td><p>{time}</p></td>
        <td><span class="flight-json" data-flight='{{"itineraries":[{{"segments":[{{"carrierCode":"{carrier}"}}]}}]}}'>i</span></td></tr>"#
    )
}

fn search_form() -> SearchForm {
    SearchForm::from_fragment(
        r#"<form>
        <input name="Origin" value="AMS">
        <input name="Destination" value="JFK">
        <input name="Departuredate" value="2026-09-01">
        </form>"#,
    )
}

/// Canned transport recording what the interceptor posts.
struct MockTransport {
    status: u16,
    body: String,
    fail: bool,
    calls: AtomicUsize,
    posted: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    fn replying(body: &str) -> Self {
        Self {
            status: 200,
            body: body.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
            posted: Mutex::new(Vec::new()),
        }
    }

    fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    fn failing() -> Self {
        let mut transport = Self::replying("");
        transport.fail = true;
        transport
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn post_form(
        &self,
        _url: &str,
        fields: &[(String, String)],
    ) -> Result<FetchResponse, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.posted.lock().unwrap() = fields.to_vec();
        if self.fail {
            return Err(FetchError::Http("connection refused".to_string()));
        }
        Ok(FetchResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

#[tokio::test]
async fn successful_submission_swaps_regions_and_rescans_rows() {
    init_tracing();
    let old_rows = row("old1", 420.0, "08:00", "AA");
    let mut page = ResultsPage::new(&page_markup(&old_rows, 1));
    let mut filters = FilterContext::initialize(&mut page);

    let new_rows = [
        row("new1", 210.0, "09:30", "LH"),
        row("new2", 180.0, "21:15", "AF"),
    ]
    .concat();
    let transport = MockTransport::replying(&page_markup(&new_rows, 2));
    let interceptor = SubmitInterceptor::new(transport);

    let outcome = interceptor
        .handle_submit(&search_form(), "/flights/search", &mut page, &mut filters)
        .await;

    assert_eq!(
        outcome,
        SubmitOutcome::Completed {
            table_replaced: true,
            count_replaced: true,
        }
    );
    assert!(page.html().contains(r#"id="new1""#));
    assert!(!page.html().contains(r#"id="old1""#));
    assert_eq!(page.results_count_text().unwrap(), "2");
    assert_eq!(filters.row_count(), 2);
    assert!(!page.overlay_visible());
    assert!(!page.results_dimmed());

    // New carriers reach the airline list through the re-initialization.
    assert!(page.html().contains(r#"id="air_LH""#));
    assert!(page.html().contains(r#"id="air_AF""#));
}

#[tokio::test]
async fn submitted_fields_mirror_the_form() {
    init_tracing();
    let mut page = ResultsPage::new(&page_markup(&row("a", 100.0, "08:00", "AA"), 1));
    let mut filters = FilterContext::initialize(&mut page);
    let transport = MockTransport::replying(&page_markup("", 0));
    let interceptor = SubmitInterceptor::new(transport);

    interceptor
        .handle_submit(&search_form(), "/flights/search", &mut page, &mut filters)
        .await;

    let posted = interceptor_fields(&interceptor);
    assert_eq!(
        posted,
        vec![
            ("Origin".to_string(), "AMS".to_string()),
            ("Destination".to_string(), "JFK".to_string()),
            ("Departuredate".to_string(), "2026-09-01".to_string()),
        ]
    );
}

fn interceptor_fields(interceptor: &SubmitInterceptor<MockTransport>) -> Vec<(String, String)> {
    interceptor.transport().posted.lock().unwrap().clone()
}

#[tokio::test]
async fn response_without_table_leaves_current_table_untouched() {
    init_tracing();
    let mut page = ResultsPage::new(&page_markup(&row("keep", 300.0, "11:00", "BA"), 1));
    let mut filters = FilterContext::initialize(&mut page);
    let table_before = page.table_fragment().unwrap();

    let transport = MockTransport::replying("<html><body><h1>maintenance</h1></body></html>");
    let interceptor = SubmitInterceptor::new(transport);
    let outcome = interceptor
        .handle_submit(&search_form(), "/flights/search", &mut page, &mut filters)
        .await;

    assert_eq!(
        outcome,
        SubmitOutcome::Completed {
            table_replaced: false,
            count_replaced: false,
        }
    );
    assert_eq!(page.table_fragment().unwrap(), table_before);
    // Finalization still ran.
    assert!(!page.overlay_visible());
    assert!(!page.results_dimmed());
}

#[tokio::test]
async fn network_failure_is_logged_and_page_survives() {
    init_tracing();
    let mut page = ResultsPage::new(&page_markup(&row("keep", 300.0, "11:00", "BA"), 1));
    let mut filters = FilterContext::initialize(&mut page);
    let table_before = page.table_fragment().unwrap();

    let interceptor = SubmitInterceptor::new(MockTransport::failing());
    let outcome = interceptor
        .handle_submit(&search_form(), "/flights/search", &mut page, &mut filters)
        .await;

    assert_eq!(outcome, SubmitOutcome::Failed);
    assert_eq!(page.table_fragment().unwrap(), table_before);
    assert!(!page.overlay_visible());
    assert!(!page.results_dimmed());
}

#[tokio::test]
async fn http_error_status_fails_without_swapping() {
    init_tracing();
    let mut page = ResultsPage::new(&page_markup(&row("keep", 300.0, "11:00", "BA"), 1));
    let mut filters = FilterContext::initialize(&mut page);

    let transport = MockTransport::replying(&page_markup("", 0)).with_status(502);
    let interceptor = SubmitInterceptor::new(transport);
    let outcome = interceptor
        .handle_submit(&search_form(), "/flights/search", &mut page, &mut filters)
        .await;

    assert_eq!(outcome, SubmitOutcome::Failed);
    assert!(page.html().contains(r#"id="keep""#));
}

#[tokio::test]
async fn non_matching_form_passes_through_without_fetching() {
    init_tracing();
    let mut page = ResultsPage::new(&page_markup(&row("keep", 300.0, "11:00", "BA"), 1));
    let mut filters = FilterContext::initialize(&mut page);

    let newsletter =
        SearchForm::from_fragment(r#"<form><input name="email" value="x@y.example"></form>"#);
    let transport = MockTransport::replying(&page_markup("", 0));
    let interceptor = SubmitInterceptor::new(transport);
    let outcome = interceptor
        .handle_submit(&newsletter, "/flights/search", &mut page, &mut filters)
        .await;

    assert_eq!(outcome, SubmitOutcome::Passthrough);
    assert_eq!(interceptor.transport().calls.load(Ordering::SeqCst), 0);
    assert!(!page.overlay_visible());
}

#[tokio::test]
async fn tooltip_hook_runs_after_replacement() {
    init_tracing();
    let mut page = ResultsPage::new(&page_markup(&row("a", 100.0, "08:00", "AA"), 1));
    let mut filters = FilterContext::initialize(&mut page);

    let invocations = std::sync::Arc::new(AtomicUsize::new(0));
    let seen = invocations.clone();
    let transport = MockTransport::replying(&page_markup(&row("b", 90.0, "10:00", "KL"), 1));
    let interceptor =
        SubmitInterceptor::new(transport).with_tooltip_hook(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

    interceptor
        .handle_submit(&search_form(), "/flights/search", &mut page, &mut filters)
        .await;
    assert_eq!(invocations.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn filters_work_over_freshly_swapped_rows() {
    init_tracing();
    let mut page = ResultsPage::new(&page_markup(&row("old", 999.0, "06:00", "AA"), 1));
    let mut filters = FilterContext::initialize(&mut page);

    let new_rows = [
        row("n1", 500.0, "06:00", "AA"),
        row("n2", 150.0, "07:00", "BA"),
        row("n3", 300.0, "08:00", "LH"),
    ]
    .concat();
    let transport = MockTransport::replying(&page_markup(&new_rows, 3));
    let interceptor = SubmitInterceptor::new(transport);
    interceptor
        .handle_submit(&search_form(), "/flights/search", &mut page, &mut filters)
        .await;

    let criteria = FilterCriteria {
        min_price: Some(200.0),
        max_price: Some(1000.0),
        sort: SortMode::Cheapest,
        ..FilterCriteria::default()
    };
    filters.apply(&criteria, &mut page);

    let prices: Vec<f64> = filters.visible_rows().iter().map(|r| r.price).collect();
    assert_eq!(prices, vec![300.0, 500.0]);
    assert_eq!(page.results_count_text().unwrap(), "2");

    filters.clear(&mut page);
    assert_eq!(page.results_count_text().unwrap(), "3");
    let html = page.html();
    let positions: Vec<usize> = ["n1", "n2", "n3"]
        .iter()
        .map(|id| html.find(&format!(r#"id="{id}""#)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));
}
