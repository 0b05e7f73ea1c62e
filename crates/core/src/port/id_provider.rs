// ID Provider Port (for deterministic testing)

use rand::distributions::Alphanumeric;
use rand::Rng;

/// Length of generated correlation ids
pub const CORRELATION_ID_LEN: usize = 9;

/// ID provider interface (allows deterministic IDs in tests)
pub trait IdProvider: Send + Sync {
    /// Generate a new correlation id
    fn generate_id(&self) -> String;
}

/// Short random lowercase alphanumeric ids (production)
///
/// Only used to correlate log lines; not a security token.
pub struct ShortIdProvider;

impl IdProvider for ShortIdProvider {
    fn generate_id(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(CORRELATION_ID_LEN)
            .map(|b| char::from(b).to_ascii_lowercase())
            .collect()
    }
}

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Yields `req-1`, `req-2`, ...
    #[derive(Default)]
    pub struct SequentialIdProvider {
        next: AtomicU64,
    }

    impl IdProvider for SequentialIdProvider {
        fn generate_id(&self) -> String {
            format!("req-{}", self.next.fetch_add(1, Ordering::SeqCst) + 1)
        }
    }
}
