// Background fetch of refreshed results.

pub mod http;
pub mod traits;

pub use http::HttpTransport;
pub use traits::{FetchResponse, Transport};
