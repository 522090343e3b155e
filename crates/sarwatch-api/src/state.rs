//! Application state shared by every handler.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sarwatch_db::CatalogStore;

pub type Clock = fn() -> DateTime<Utc>;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogStore>,
    /// How far back `/recent_products` reaches.
    pub recent_products_window: Duration,
    pub clock: Clock,
}

impl AppState {
    pub fn new(catalog: Arc<dyn CatalogStore>, recent_products_days: i64) -> Self {
        Self {
            catalog,
            recent_products_window: Duration::days(recent_products_days),
            clock: Utc::now,
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }
}
