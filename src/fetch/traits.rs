use crate::model::FetchError;

/// Raw result of a background form submission.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Seam between the interceptor and the network, so tests can substitute a
/// canned transport.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// POSTs the form fields as a multipart body to `url` with the
    /// `X-Requested-With: XMLHttpRequest` marker header.
    async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<FetchResponse, FetchError>;
}
