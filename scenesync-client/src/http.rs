//! HTTP implementation of the collaborator traits on top of `ureq`.
//!
//! `ureq` is blocking, so every request runs on `spawn_blocking`. The agent
//! carries its own overall timeout matching the executor's per-attempt window;
//! when the executor gives up on an attempt first, the blocking thread finishes
//! on its own and its result is discarded.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use scenesync_core::{EndpointConfig, SessionId};

use crate::error::CallError;
use crate::protocol::{error_detail, PersistedHistory, RenderRequest, RenderResponse, SessionResponse};
use crate::service::{HistoryStore, Renderer, SessionService};

/// Client for the rendering, session, and history endpoints of one backend.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    agent: ureq::Agent,
    base_url: String,
}

impl HttpBackend {
    pub fn new(endpoint: &EndpointConfig, request_timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_millis(endpoint.connect_timeout_ms))
            .timeout(request_timeout)
            .build();
        Self {
            agent,
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn call_json<T>(&self, method: &'static str, path: &str, body: Option<Value>) -> Result<T, CallError>
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.call(method, path, body, |response| {
            response
                .into_json::<T>()
                .map_err(|e| CallError::Decode(e.to_string()))
        })
        .await
    }

    async fn call<T, D>(
        &self,
        method: &'static str,
        path: &str,
        body: Option<Value>,
        decode: D,
    ) -> Result<T, CallError>
    where
        T: Send + 'static,
        D: FnOnce(ureq::Response) -> Result<T, CallError> + Send + 'static,
    {
        let agent = self.agent.clone();
        let url = self.url(path);
        tracing::debug!(method, url = %url, "outbound request");

        tokio::task::spawn_blocking(move || {
            let request = agent.request(method, &url);
            let result = match body {
                Some(body) => request.send_json(body),
                None => request.call(),
            };
            decode(result.map_err(map_ureq_error)?)
        })
        .await
        .map_err(|err| CallError::Transport(format!("request task failed: {err}")))?
    }
}

#[async_trait]
impl Renderer for HttpBackend {
    async fn render(&self, request: &RenderRequest) -> Result<RenderResponse, CallError> {
        let body = serde_json::to_value(request)
            .map_err(|e| CallError::Validation(format!("unserializable render request: {e}")))?;
        self.call_json("POST", "render", Some(body)).await
    }
}

#[async_trait]
impl SessionService for HttpBackend {
    async fn create_session(&self) -> Result<SessionId, CallError> {
        let response: SessionResponse = self
            .call_json("POST", "sessions", Some(Value::Object(Default::default())))
            .await?;
        Ok(response.session_id)
    }

    async fn resume_session(&self, id: &SessionId) -> Result<SessionId, CallError> {
        let response: SessionResponse = self.call_json("GET", &format!("sessions/{id}"), None).await?;
        Ok(response.session_id)
    }
}

#[async_trait]
impl HistoryStore for HttpBackend {
    async fn load(&self, session: &SessionId) -> Result<Option<PersistedHistory>, CallError> {
        match self
            .call_json("GET", &format!("sessions/{session}/history"), None)
            .await
        {
            Ok(history) => Ok(Some(history)),
            Err(CallError::RemoteRejection { status: 404, .. }) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn save(&self, session: &SessionId, history: &PersistedHistory) -> Result<(), CallError> {
        let body = serde_json::to_value(history)
            .map_err(|e| CallError::Validation(format!("unserializable history: {e}")))?;
        self.call("PUT", &format!("sessions/{session}/history"), Some(body), |_| Ok(()))
            .await
    }
}

fn map_ureq_error(err: ureq::Error) -> CallError {
    match err {
        ureq::Error::Status(status, response) => {
            let body = response.into_string().unwrap_or_default();
            CallError::from_status(status, error_detail(&body))
        }
        ureq::Error::Transport(transport) => CallError::Transport(transport.to_string()),
    }
}
