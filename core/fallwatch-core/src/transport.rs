//! Appliance transport.
//!
//! The session controller only sees the [`ApplianceTransport`] trait; the HTTP
//! implementation lives here alongside the small JSON client it shares with
//! the clip catalog.

use async_trait::async_trait;
use fallwatch_protocol::{
    FallLog, FallsResponse, ModeRequest, ModeResponse, StatusResponse, FALLS_PATH, MODE_PATH,
    PING_PATH, STATUS_PATH,
};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::error::{MonitorError, TransportError};
use crate::types::Mode;

/// Calls the monitoring core makes against the appliance.
#[async_trait]
pub trait ApplianceTransport: Send + Sync {
    async fn status(&self) -> Result<StatusResponse, TransportError>;

    async fn ping(&self) -> Result<(), TransportError>;

    async fn set_mode(&self, mode: Mode) -> Result<ModeResponse, TransportError>;

    async fn falls(&self) -> Result<FallLog, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpApplianceTransport {
    http: JsonHttp,
}

impl HttpApplianceTransport {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, MonitorError> {
        Ok(Self {
            http: JsonHttp::new(base, timeout)?,
        })
    }

    pub fn base(&self) -> &Url {
        &self.http.base
    }
}

#[async_trait]
impl ApplianceTransport for HttpApplianceTransport {
    async fn status(&self) -> Result<StatusResponse, TransportError> {
        self.http.get_json(STATUS_PATH).await
    }

    async fn ping(&self) -> Result<(), TransportError> {
        self.http.get_ok(PING_PATH).await
    }

    async fn set_mode(&self, mode: Mode) -> Result<ModeResponse, TransportError> {
        let request = ModeRequest {
            armed: mode.is_armed(),
        };
        self.http.post_json(MODE_PATH, &request).await
    }

    async fn falls(&self) -> Result<FallLog, TransportError> {
        let response: FallsResponse = self.http.get_json(FALLS_PATH).await?;
        response
            .into_log()
            .map_err(|info| TransportError::Protocol {
                endpoint: FALLS_PATH.to_string(),
                info,
            })
    }
}

/// Appends `path` to the base address, keeping any path prefix the base has.
pub(crate) fn endpoint_url(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    let prefix = base.path().trim_end_matches('/');
    let suffix = path.trim_start_matches('/');
    url.set_path(&format!("{}/{}", prefix, suffix));
    url.set_query(None);
    url
}

#[derive(Debug, Clone)]
pub(crate) struct JsonHttp {
    client: reqwest::Client,
    base: Url,
}

impl JsonHttp {
    pub(crate) fn new(base: Url, timeout: Duration) -> Result<Self, MonitorError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::Unreachable {
                endpoint: base.to_string(),
                details: format!("failed to build HTTP client: {}", err),
            })?;
        Ok(Self { client, base })
    }

    pub(crate) fn base(&self) -> &Url {
        &self.base
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<T, TransportError> {
        let response = self.send(path, self.client.get(endpoint_url(&self.base, path))).await?;
        decode(path, response).await
    }

    pub(crate) async fn get_ok(&self, path: &str) -> Result<(), TransportError> {
        self.send(path, self.client.get(endpoint_url(&self.base, path)))
            .await
            .map(|_| ())
    }

    pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned + Default>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, TransportError> {
        let request = self.client.post(endpoint_url(&self.base, path)).json(body);
        let response = self.send(path, request).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|err| request_failed(path, &err))?;
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(T::default());
        }
        serde_json::from_slice(&bytes).map_err(|err| TransportError::Malformed {
            endpoint: path.to_string(),
            details: err.to_string(),
        })
    }

    async fn send(
        &self,
        path: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, TransportError> {
        let response = request
            .send()
            .await
            .map_err(|err| request_failed(path, &err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                endpoint: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}

async fn decode<T: DeserializeOwned>(
    path: &str,
    response: reqwest::Response,
) -> Result<T, TransportError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|err| request_failed(path, &err))?;
    serde_json::from_slice(&bytes).map_err(|err| TransportError::Malformed {
        endpoint: path.to_string(),
        details: err.to_string(),
    })
}

fn request_failed(path: &str, err: &reqwest::Error) -> TransportError {
    let details = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    TransportError::Unreachable {
        endpoint: path.to_string(),
        details,
    }
}
