//! Rate limiting middleware using token bucket algorithm.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use governor::RateLimiter;
use governor::clock::{DefaultClock, QuantaInstant};
use governor::middleware::NoOpMiddleware;
use governor::state::keyed::DefaultKeyedStateStore;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tower_governor::GovernorLayer;
use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor};
use tracing::debug;

/// Time after which one request of a client's quota is replenished.
pub const REPLENISH_INTERVAL: Duration = Duration::from_secs(2);

/// Requests a client may burst before being throttled.
pub const BURST_SIZE: u32 = 100;

/// How often idle clients are evicted from the limiter.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

type Middleware = NoOpMiddleware<QuantaInstant>;

/// Token buckets keyed by client IP.
pub type ClientLimiter =
    RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock, Middleware>;

/// Per-client rate limiter for the REST API.
///
/// # Limits
///
/// - **Burst**: 100 requests
/// - **Replenish**: one request every 2 seconds
///
/// Requests exceeding the limit receive `429 Too Many Requests`.
///
/// # Key Extraction
///
/// `Forwarded` reads the client IP from `X-Forwarded-For`, `X-Real-IP` or
/// `Forwarded`, falling back to the peer address. `Peer` only uses the
/// socket peer address, which requires the router to be served with
/// `ConnectInfo<SocketAddr>`.
///
/// # Eviction
///
/// A client entry stays in memory until its bucket has fully refilled and
/// [`sweep`](Self::sweep) runs, which with the default quota means about
/// 200 seconds of inactivity.
#[derive(Clone)]
pub enum RateLimit {
    Peer(Arc<GovernorConfig<PeerIpKeyExtractor, Middleware>>),
    Forwarded(Arc<GovernorConfig<SmartIpKeyExtractor, Middleware>>),
}

impl RateLimit {
    /// Limiter with the default quota.
    pub fn new(behind_proxy: bool) -> Self {
        Self::with_quota(behind_proxy, REPLENISH_INTERVAL, BURST_SIZE)
    }

    /// # Panics
    ///
    /// Panics if `replenish` is zero or `burst` is zero.
    pub fn with_quota(behind_proxy: bool, replenish: Duration, burst: u32) -> Self {
        if behind_proxy {
            let config = GovernorConfigBuilder::default()
                .key_extractor(SmartIpKeyExtractor)
                .period(replenish)
                .burst_size(burst)
                .finish()
                .expect("rate limiter quota is non-zero");
            Self::Forwarded(Arc::new(config))
        } else {
            let config = GovernorConfigBuilder::default()
                .period(replenish)
                .burst_size(burst)
                .finish()
                .expect("rate limiter quota is non-zero");
            Self::Peer(Arc::new(config))
        }
    }

    /// Layers the limiter over every route of `router`.
    pub fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        match self {
            Self::Peer(config) => {
                let layer: GovernorLayer<_, _, axum::body::Body> =
                    GovernorLayer::new(config.clone());
                router.layer(layer)
            }
            Self::Forwarded(config) => {
                let layer: GovernorLayer<_, _, axum::body::Body> =
                    GovernorLayer::new(config.clone());
                router.layer(layer)
            }
        }
    }

    pub fn limiter(&self) -> &Arc<ClientLimiter> {
        match self {
            Self::Peer(config) => config.limiter(),
            Self::Forwarded(config) => config.limiter(),
        }
    }

    /// Evicts clients whose bucket has fully refilled and returns how many
    /// are still tracked.
    pub fn sweep(&self) -> usize {
        let limiter = self.limiter();
        limiter.retain_recent();
        limiter.shrink_to_fit();
        limiter.len()
    }

    /// Sweeps every `every` until the returned task is aborted.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let limit = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let tracked_clients = limit.sweep();
                debug!(tracked_clients, "Rate limiter swept");
            }
        })
    }
}
