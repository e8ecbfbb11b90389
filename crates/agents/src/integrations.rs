//! Publishing platform connections.
//!
//! Only the `connected` flag is durable; `Connecting` exists while a
//! handshake is outstanding.

use std::{
    collections::BTreeSet,
    fmt,
    str::FromStr,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
    tracing::{debug, info, warn},
    vigil_common::Localizer,
    vigil_cron::StateStore,
};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Youtube,
    Tiktok,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Self::Youtube, Self::Tiktok];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Youtube => "youtube",
            Self::Tiktok => "tiktok",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Youtube => "YouTube",
            Self::Tiktok => "TikTok",
        }
    }

    /// State store key holding the persisted `connected` flag.
    #[must_use]
    pub fn state_key(self) -> &'static str {
        match self {
            Self::Youtube => "agent_youtubeConnected",
            Self::Tiktok => "agent_tiktokConnected",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "youtube" => Ok(Self::Youtube),
            "tiktok" => Ok(Self::Tiktok),
            other => Err(Error::unknown_platform(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationState {
    Disconnected,
    Connecting,
    Connected,
}

impl IntegrationState {
    #[must_use]
    pub fn render(self, localizer: &Localizer) -> String {
        localizer.t(match self {
            Self::Disconnected => "integrationDisconnected",
            Self::Connecting => "integrationConnecting",
            Self::Connected => "integrationConnected",
        })
    }
}

/// Authorizes the agent against a platform.
#[async_trait]
pub trait Handshake: Send + Sync {
    async fn handshake(&self, platform: Platform) -> Result<()>;
}

/// Succeeds after a fixed delay without contacting anything.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedHandshake {
    delay: Duration,
}

impl SimulatedHandshake {
    pub const DEFAULT_DELAY: Duration = Duration::from_secs(2);

    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedHandshake {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

#[async_trait]
impl Handshake for SimulatedHandshake {
    async fn handshake(&self, platform: Platform) -> Result<()> {
        debug!(platform = %platform, delay_ms = self.delay.as_millis() as u64, "simulated handshake");
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

pub struct IntegrationManager {
    store: Arc<dyn StateStore>,
    handshake: Arc<dyn Handshake>,
    connecting: Mutex<BTreeSet<Platform>>,
}

impl IntegrationManager {
    pub fn new(store: Arc<dyn StateStore>, handshake: Arc<dyn Handshake>) -> Self {
        Self {
            store,
            handshake,
            connecting: Mutex::new(BTreeSet::new()),
        }
    }

    pub async fn state(&self, platform: Platform) -> Result<IntegrationState> {
        if self.is_connecting(platform) {
            return Ok(IntegrationState::Connecting);
        }
        let connected = self
            .store
            .load::<bool>(platform.state_key())
            .await?
            .unwrap_or(false);
        Ok(if connected {
            IntegrationState::Connected
        } else {
            IntegrationState::Disconnected
        })
    }

    /// Every platform's state, in [`Platform::ALL`] order.
    pub async fn status(&self) -> Result<Vec<(Platform, IntegrationState)>> {
        let mut out = Vec::with_capacity(Platform::ALL.len());
        for platform in Platform::ALL {
            out.push((platform, self.state(platform).await?));
        }
        Ok(out)
    }

    /// Run the handshake and persist the connection. Connecting an already
    /// connected or connecting platform is a no-op.
    pub async fn connect(&self, platform: Platform) -> Result<IntegrationState> {
        match self.state(platform).await? {
            IntegrationState::Disconnected => {},
            state => return Ok(state),
        }
        self.set_connecting(platform, true);
        info!(platform = %platform, "connecting");

        let outcome = self.handshake.handshake(platform).await;
        self.set_connecting(platform, false);
        if let Err(e) = outcome {
            warn!(platform = %platform, error = %e, "handshake failed");
            return Err(e);
        }

        self.store.save(platform.state_key(), &true).await?;
        info!(platform = %platform, "connected");
        Ok(IntegrationState::Connected)
    }

    pub async fn disconnect(&self, platform: Platform) -> Result<()> {
        self.store.save(platform.state_key(), &false).await?;
        info!(platform = %platform, "disconnected");
        Ok(())
    }

    fn is_connecting(&self, platform: Platform) -> bool {
        self.connecting
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&platform)
    }

    fn set_connecting(&self, platform: Platform, connecting: bool) {
        let mut set = self.connecting.lock().unwrap_or_else(|e| e.into_inner());
        if connecting {
            set.insert(platform);
        } else {
            set.remove(&platform);
        }
    }
}
