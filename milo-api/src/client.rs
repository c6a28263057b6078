//! REST client for the device's control API.
//!
//! The endpoint set is fixed by the device firmware; this client is a thin
//! adapter that builds requests, checks statuses, and decodes JSON bodies
//! into the typed snapshots from [`crate::state`].

use std::net::IpAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::{ApiError, Result};
use crate::state::{AudioSource, DeviceState, VolumeState};

/// Default per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct VolumeSetBody {
    volume: u8,
    show_bar: bool,
}

#[derive(Serialize)]
struct VolumeAdjustBody {
    delta: i32,
    show_bar: bool,
}

/// Client for the device's HTTP control API.
///
/// Cheap to clone; clones share the HTTP connection pool and the
/// consecutive-failure counter.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    consecutive_failures: Arc<AtomicU32>,
}

impl ApiClient {
    /// Create a client for a device at the given address and HTTP port.
    pub fn new(host: IpAddr, port: u16) -> Result<Self> {
        Self::from_base_url(&format!("http://{host}:{port}"))
    }

    /// Create a client against an explicit base URL.
    pub fn from_base_url(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            consecutive_failures: Arc::new(AtomicU32::new(0)),
        })
    }

    /// Base URL requests are built against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Number of requests that have failed since the last success.
    ///
    /// The owner watches this to decide when to force a fresh
    /// probe/connect cycle instead of surfacing errors to the user.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Relaxed)
    }

    /// Fetch the full device state. `GET /api/audio/state`
    pub async fn get_audio_state(&self) -> Result<DeviceState> {
        self.get_json("/api/audio/state").await
    }

    /// Switch the active audio source. `POST /api/audio/source/{id}`
    pub async fn set_source(&self, source: AudioSource) -> Result<()> {
        self.post(&format!("/api/audio/source/{}", source.id())).await
    }

    /// Enable or disable multiroom routing. `POST /api/routing/multiroom/{bool}`
    pub async fn set_multiroom(&self, enabled: bool) -> Result<()> {
        self.post(&format!("/api/routing/multiroom/{enabled}")).await
    }

    /// Enable or disable the equalizer. `POST /api/routing/equalizer/{bool}`
    pub async fn set_equalizer(&self, enabled: bool) -> Result<()> {
        self.post(&format!("/api/routing/equalizer/{enabled}")).await
    }

    /// Fetch the current volume state. `GET /api/volume/status`
    pub async fn volume_status(&self) -> Result<VolumeState> {
        self.get_json("/api/volume/status").await
    }

    /// Set the absolute volume (clamped to 0..=100). `POST /api/volume/set`
    pub async fn set_volume(&self, volume: u8, show_bar: bool) -> Result<()> {
        let body = VolumeSetBody {
            volume: volume.min(100),
            show_bar,
        };
        self.post_json("/api/volume/set", &body).await
    }

    /// Adjust the volume by a signed delta. `POST /api/volume/adjust`
    pub async fn adjust_volume(&self, delta: i32, show_bar: bool) -> Result<()> {
        let body = VolumeAdjustBody { delta, show_bar };
        self.post_json("/api/volume/adjust", &body).await
    }

    /// Minimal read-only call used by the probe/retry loop.
    ///
    /// Succeeds iff the device answers `GET /api/audio/state` with status
    /// 200; the body is discarded.
    pub async fn probe(&self) -> Result<()> {
        let result = async {
            let url = self.endpoint("/api/audio/state")?;
            let response = self.http.get(url).send().await?;
            check_status(&response)
        }
        .await;
        self.record(result)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let result = async {
            let url = self.endpoint(path)?;
            let response = self.http.get(url).send().await?;
            check_status(&response)?;
            let body = response.json::<T>().await?;
            Ok(body)
        }
        .await;
        self.record(result)
    }

    async fn post(&self, path: &str) -> Result<()> {
        let result = async {
            let url = self.endpoint(path)?;
            let response = self.http.post(url).send().await?;
            check_status(&response)
        }
        .await;
        self.record(result)
    }

    async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        let result = async {
            let url = self.endpoint(path)?;
            let response = self.http.post(url).json(body).send().await?;
            check_status(&response)
        }
        .await;
        self.record(result)
    }

    /// Update the consecutive-failure counter from a request outcome.
    fn record<T>(&self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => {
                self.consecutive_failures.store(0, Ordering::Relaxed);
            }
            Err(e) => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!("API request failed ({failures} consecutive): {e}");
            }
        }
        result
    }
}

fn check_status(response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(ApiError::Status(status.as_u16()))
    }
}
