//! Home Assistant REST client.
//!
//! Wraps `reqwest::Client` with the resolved API base and bearer
//! credential. Every call is a single request; nothing is cached or
//! retried.

use std::time::Duration;

use serde::Serialize;

use crate::config::UpstreamTarget;
use crate::error::GatewayError;

/// A forwarded upstream response: status, content type, and raw body.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    /// HTTP status returned by the upstream.
    pub status: u16,
    /// `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// Response body, unparsed.
    pub body: String,
}

impl UpstreamResponse {
    /// Returns `true` for a 2xx status.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Converts a non-success response into [`GatewayError::UpstreamStatus`].
    ///
    /// # Errors
    ///
    /// Returns the upstream status as an error when it is not 2xx.
    pub fn error_for_status(self) -> Result<Self, GatewayError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(GatewayError::upstream_status(self.status, &self.body))
        }
    }
}

/// REST client bound to one upstream instance.
#[derive(Debug, Clone)]
pub struct HomeAssistantClient {
    http: reqwest::Client,
    target: UpstreamTarget,
}

impl HomeAssistantClient {
    /// Builds a client with the given per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if the TLS backend cannot be
    /// initialised.
    pub fn new(target: UpstreamTarget, timeout: Duration) -> Result<Self, GatewayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Internal(format!("building http client: {e}")))?;
        Ok(Self { http, target })
    }

    /// The upstream this client talks to.
    #[must_use]
    pub const fn target(&self) -> &UpstreamTarget {
        &self.target
    }

    /// URL of `path` under the API base.
    #[must_use]
    pub fn api_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.target.api_base(),
            path.trim_start_matches('/')
        )
    }

    /// `GET <api_base>/`: cheap connectivity check.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the upstream cannot be reached.
    pub async fn probe(&self) -> Result<UpstreamResponse, GatewayError> {
        self.get("").await
    }

    /// `POST <api_base>/template`: renders a Jinja template.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the upstream cannot be reached.
    pub async fn render_template(&self, template: &str) -> Result<UpstreamResponse, GatewayError> {
        self.post("template", &serde_json::json!({ "template": template }))
            .await
    }

    /// `GET <api_base>/states/<entity_id>`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the upstream cannot be reached.
    pub async fn entity_state(&self, entity_id: &str) -> Result<UpstreamResponse, GatewayError> {
        self.get(&format!("states/{entity_id}")).await
    }

    /// `POST <api_base>/services/<domain>/<service>`.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the upstream cannot be reached.
    pub async fn call_service<B: Serialize + ?Sized>(
        &self,
        domain: &str,
        service: &str,
        data: &B,
    ) -> Result<UpstreamResponse, GatewayError> {
        self.post(&format!("services/{domain}/{service}"), data)
            .await
    }

    async fn get(&self, path: &str) -> Result<UpstreamResponse, GatewayError> {
        let url = self.api_url(path);
        tracing::debug!(%url, "GET upstream");
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.target.access_token())
            .send()
            .await?;
        Self::read(response).await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<UpstreamResponse, GatewayError> {
        let url = self.api_url(path);
        tracing::debug!(%url, "POST upstream");
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.target.access_token())
            .json(body)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn read(response: reqwest::Response) -> Result<UpstreamResponse, GatewayError> {
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn client() -> HomeAssistantClient {
        let Ok(target) = UpstreamTarget::external("http://ha.local:8123", "tok") else {
            panic!("valid target");
        };
        let Ok(client) = HomeAssistantClient::new(target, Duration::from_secs(1)) else {
            panic!("client builds");
        };
        client
    }

    #[test]
    fn api_url_joins_paths() {
        let client = client();
        assert_eq!(client.api_url(""), "http://ha.local:8123/api/");
        assert_eq!(
            client.api_url("/states/sensor.x"),
            "http://ha.local:8123/api/states/sensor.x"
        );
    }

    #[test]
    fn error_for_status_passes_success_through() {
        let ok = UpstreamResponse {
            status: 200,
            content_type: None,
            body: "ok".to_string(),
        };
        assert!(ok.error_for_status().is_ok());

        let missing = UpstreamResponse {
            status: 404,
            content_type: None,
            body: "Entity not found.".to_string(),
        };
        let Err(err) = missing.error_for_status() else {
            panic!("expected error");
        };
        assert_eq!(err.status_code().as_u16(), 404);
    }
}
