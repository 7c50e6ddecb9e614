use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::GatewayError;
use crate::config::BackendConfig;
use crate::workflows::billing::{
    BillingPlan, BillingPlanGateway, BillingPlanId, BillingPlanLineItem, SimulationResponse,
};
use crate::workflows::leads::{ConvertLeadPayload, EmployerRecord, LeadGateway, LeadId};

/// JSON client for the agency backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

#[derive(Serialize)]
struct ConfirmBody<'a> {
    items: &'a [BillingPlanLineItem],
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|err| GatewayError::Transport(format!("invalid backend url: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(GatewayError::Transport(format!(
                "backend url {base_url} cannot carry a path"
            )));
        }

        Ok(Self {
            client,
            base_url,
            api_token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// Base URL extended by `segments`, each percent-encoded as a single path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        if let Some(bad) = segments
            .iter()
            .find(|segment| matches!(**segment, "" | "." | ".."))
        {
            return Err(GatewayError::Rejected(format!(
                "'{bad}' is not a valid resource id"
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| GatewayError::Transport("backend url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, GatewayError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "backend responded");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        response
            .json::<T>()
            .await
            .map_err(|err| GatewayError::Decode(err.to_string()))
    }
}

fn status_error(status: StatusCode, body: &str) -> GatewayError {
    let message = error_message(body);
    match status {
        StatusCode::NOT_FOUND => GatewayError::NotFound,
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            GatewayError::Rejected(message)
        }
        other => GatewayError::Status {
            status: other.as_u16(),
            message,
        },
    }
}

/// Pull `message` or `error` out of a JSON error body, falling back to the raw text.
fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let field = parsed.as_ref().and_then(|value| {
        ["message", "error"]
            .iter()
            .find_map(|name| value.get(*name).and_then(Value::as_str))
    });

    match field {
        Some(message) => message.to_string(),
        None if body.trim().is_empty() => "no response body".to_string(),
        None => body.trim().to_string(),
    }
}

#[async_trait]
impl BillingPlanGateway for HttpBackend {
    async fn fetch_plan(&self, id: &BillingPlanId) -> Result<BillingPlan, GatewayError> {
        let request = self.client.get(self.url(&["billing-plans", id.0.as_str()])?);
        Self::decode(self.send(request).await?).await
    }

    async fn simulate(&self, id: &BillingPlanId) -> Result<SimulationResponse, GatewayError> {
        let request = self
            .client
            .post(self.url(&["billing-plans", id.0.as_str(), "simulate"])?);
        Self::decode(self.send(request).await?).await
    }

    async fn confirm(
        &self,
        id: &BillingPlanId,
        items: &[BillingPlanLineItem],
    ) -> Result<(), GatewayError> {
        let request = self
            .client
            .post(self.url(&["billing-plans", id.0.as_str(), "confirm"])?)
            .json(&ConfirmBody { items });
        self.send(request).await?;
        Ok(())
    }
}

#[async_trait]
impl LeadGateway for HttpBackend {
    async fn convert(
        &self,
        id: &LeadId,
        payload: &ConvertLeadPayload,
    ) -> Result<EmployerRecord, GatewayError> {
        let request = self
            .client
            .post(self.url(&["leads", id.0.as_str(), "convert"])?)
            .json(payload);
        Self::decode(self.send(request).await?).await
    }
}
