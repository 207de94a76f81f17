//! Progressive enhancement engine for a server-rendered flight-search
//! results page.
//!
//! The page markup is held as data in a [`ResultsPage`]; two components
//! operate on it:
//!
//! - [`SubmitInterceptor`] recognizes the tracked search form, POSTs its
//!   fields in the background and swaps the results table and count from
//!   the response into the held page.
//! - [`FilterContext`] captures the rendered result rows into an in-memory
//!   list and filters/sorts/re-renders them from criteria read off the
//!   page's control elements.
//!
//! Everything is page-lifetime only: no persistence, no server-side logic.

pub mod fetch;
pub mod filter;
pub mod interceptor;
pub mod model;
pub mod page;
pub mod parser;
pub mod payload;

pub use fetch::{FetchResponse, HttpTransport, Transport};
pub use filter::{FilterContext, FilterCriteria};
pub use interceptor::{SearchForm, SubmitInterceptor, SubmitOutcome};
pub use model::{DepartureBucket, RowRecord, SortMode, StopsFilter, TripTypeFilter};
pub use page::ResultsPage;
pub use payload::{parse_flight_payload, FlightPayload};
