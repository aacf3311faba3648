use std::sync::{Arc, OnceLock};
use std::time::Duration;

use http::Extensions;
use reqwest_middleware::{Middleware, Next};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

/// openFDA allows 240 requests per minute without an API key.
pub(crate) const OPENFDA_MIN_INTERVAL: Duration = Duration::from_millis(250);

/// Spaces outgoing requests at least `min_interval` apart.
#[derive(Debug)]
pub(crate) struct RequestSpacing {
    min_interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RequestSpacing {
    pub(crate) fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            next_slot: Mutex::new(None),
        }
    }

    /// Waits for the next free slot and reserves the one after it.
    pub(crate) async fn acquire(&self) {
        let slot = {
            let mut next_slot = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = next_slot.map_or(now, |at| at.max(now));
            *next_slot = Some(slot + self.min_interval);
            slot
        };
        sleep_until(slot).await;
    }
}

// Unit tests hit local mock servers and share this budget across threads.
fn shared_interval() -> Duration {
    if cfg!(test) {
        Duration::from_millis(5)
    } else {
        OPENFDA_MIN_INTERVAL
    }
}

static OPENFDA_SPACING: OnceLock<Arc<RequestSpacing>> = OnceLock::new();

#[derive(Clone, Debug)]
pub(crate) struct RateLimitMiddleware {
    spacing: Arc<RequestSpacing>,
}

impl RateLimitMiddleware {
    /// Middleware sharing one process-wide openFDA request budget.
    pub(crate) fn new() -> Self {
        Self {
            spacing: OPENFDA_SPACING
                .get_or_init(|| Arc::new(RequestSpacing::new(shared_interval())))
                .clone(),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for RateLimitMiddleware {
    async fn handle(
        &self,
        req: reqwest::Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<reqwest::Response> {
        self.spacing.acquire().await;
        next.run(req, extensions).await
    }
}
