use super::dto::{SolveStatus, SubmitResponse, VersionResponse};
use super::types::{EngineError, EngineOutput, EngineRequest, ScenarioEngine};
use crate::config::EngineConfig;
use async_trait::async_trait;
use base64::Engine as _;
use log::info;
use reqwest::{RequestBuilder, Response};
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;

/// Talks to the solver service: submit a solve, then poll until it settles.
#[derive(Clone)]
pub struct HttpScenarioEngine {
    client: reqwest::Client,
    base_url: String,
    authorization: Option<String>,
    poll_interval: Duration,
}

impl HttpScenarioEngine {
    pub fn from_config(cfg: &EngineConfig) -> Result<Self, EngineError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent("agscenario/0.1");
        if let Some(raw) = &cfg.proxy {
            let url = if raw.contains("://") {
                raw.clone()
            } else {
                format!("socks5h://{}", raw)
            };
            let proxy = reqwest::Proxy::all(&url).map_err(|e| EngineError::Http(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
        let client = builder.build().map_err(|e| EngineError::Http(e.to_string()))?;
        let authorization = cfg.user.as_ref().map(|user| {
            let pair = format!("{}:{}", user, cfg.password.as_deref().unwrap_or_default());
            format!(
                "Basic {}",
                base64::engine::general_purpose::STANDARD.encode(pair)
            )
        });
        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            authorization,
            poll_interval: cfg.poll_interval,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.authorization {
            Some(auth) => builder.header("Authorization", auth),
            None => builder,
        }
    }

    async fn submit(&self, request: &EngineRequest) -> Result<String, EngineError> {
        let resp = self
            .authorized(self.client.post(self.url("solves")))
            .json(request)
            .send()
            .await
            .map_err(|e| EngineError::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        // a 201 may carry the id only in Location
        let location_id = resp
            .headers()
            .get("Location")
            .and_then(|l| l.to_str().ok())
            .and_then(|s| s.trim_end_matches('/').rsplit('/').next())
            .map(|s| s.to_string());
        let body = resp.text().await.unwrap_or_default();
        if body.trim().is_empty() {
            return location_id.ok_or_else(|| {
                EngineError::InvalidResponse("empty submit response without Location".to_string())
            });
        }
        match serde_json::from_str::<SubmitResponse>(&body) {
            Ok(r) => Ok(r.id),
            Err(e) => location_id.ok_or_else(|| {
                EngineError::InvalidResponse(format!("{}, body: {}", e, body))
            }),
        }
    }

    fn retry_after(&self, resp: &Response) -> Duration {
        resp.headers()
            .get("Retry-After")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.trim().parse::<f64>().ok())
            .map(|s| Duration::from_secs_f64(s.max(0.0)))
            .unwrap_or(self.poll_interval)
    }
}

/// Maps a non-success status from the engine. Auth and rate-limit answers
/// are transient; any other 4xx means the engine will not take the request.
fn status_error(status: u16, text: &str) -> EngineError {
    match status {
        401 | 403 => EngineError::Http(format!("unauthorized ({})", status)),
        429 => EngineError::Http("rate limited (429)".to_string()),
        400..=499 => EngineError::Rejected(format!("{}: {}", status, text)),
        _ => EngineError::Http(format!("{}: {}", status, text)),
    }
}

#[async_trait]
impl ScenarioEngine for HttpScenarioEngine {
    async fn version(&self) -> Result<String, EngineError> {
        let resp = self
            .authorized(self.client.get(self.url("version")))
            .send()
            .await
            .map_err(|e| EngineError::Http(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(EngineError::Http(format!("version: {}", resp.status())));
        }
        let body = resp
            .text()
            .await
            .map_err(|e| EngineError::Http(e.to_string()))?;
        match serde_json::from_str::<VersionResponse>(&body) {
            Ok(v) => Ok(v.version),
            Err(_) => Ok(body.trim().to_string()),
        }
    }

    async fn run(&self, request: EngineRequest) -> Result<EngineOutput, EngineError> {
        let solve_id = self.submit(&request).await?;
        info!(
            "Model run {} submitted to engine as solve {}",
            request.model_run_id, solve_id
        );

        let poll_url = self.url(&format!("solves/{}", solve_id));
        let mut poll_count = 0u32;
        loop {
            poll_count += 1;
            let resp = self
                .authorized(self.client.get(&poll_url))
                .send()
                .await
                .map_err(|e| EngineError::Http(e.to_string()))?;
            if !resp.status().is_success() {
                let status = resp.status().as_u16();
                let text = resp.text().await.unwrap_or_default();
                return Err(status_error(status, &format!("poll solve {}: {}", solve_id, text)));
            }
            let wait = self.retry_after(&resp);
            let has_retry_after = resp.headers().get("Retry-After").is_some();
            let body = resp
                .text()
                .await
                .map_err(|e| EngineError::Http(e.to_string()))?;
            if body.trim().is_empty() {
                sleep(wait).await;
                continue;
            }

            let value: Value = serde_json::from_str(&body)
                .map_err(|e| EngineError::InvalidResponse(format!("{}, body: {}", e, body)))?;

            // in-progress responses may carry only a progress figure
            if has_retry_after && value.get("status").is_none() {
                if poll_count % 10 == 0 {
                    if let Some(p) = value.get("progress").and_then(|v| v.as_f64()) {
                        info!("... solve {} at {:.0}% ({} polls)", solve_id, p * 100.0, poll_count);
                    }
                }
                sleep(wait).await;
                continue;
            }

            let status: SolveStatus = serde_json::from_value(value)
                .map_err(|e| EngineError::InvalidResponse(format!("{}, body: {}", e, body)))?;
            match status.status.as_str() {
                "COMPLETE" => {
                    info!("Solve {} complete after {} polls", solve_id, poll_count);
                    return status.output.ok_or_else(|| {
                        EngineError::InvalidResponse(format!("solve {} complete without output", solve_id))
                    });
                }
                "ERROR" | "FAILED" => {
                    return Err(EngineError::Failed(
                        status.message.unwrap_or_else(|| "unknown engine error".to_string()),
                    ));
                }
                "CANCELLED" => {
                    return Err(EngineError::Http(format!("solve {} was cancelled", solve_id)));
                }
                _ => {
                    if poll_count % 10 == 0 {
                        info!("... solve {} {} ({} polls)", solve_id, status.status, poll_count);
                    }
                    sleep(wait).await;
                }
            }
        }
    }
}
