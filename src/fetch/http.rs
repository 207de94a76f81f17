use reqwest::multipart::Form;
use reqwest::Client;

use crate::fetch::traits::{FetchResponse, Transport};
use crate::model::FetchError;

/// Real network transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (compatible) faresift/0.1")
            .build()
            .unwrap();

        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<FetchResponse, FetchError> {
        let mut form = Form::new();
        for (name, value) in fields {
            form = form.text(name.clone(), value.clone());
        }

        let response = self
            .client
            .post(url)
            .multipart(form)
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Http(e.to_string()))?;

        Ok(FetchResponse { status, body })
    }
}
