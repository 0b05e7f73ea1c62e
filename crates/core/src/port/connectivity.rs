// Connectivity Port - the process-wide online flag

use std::sync::atomic::{AtomicBool, Ordering};

/// Online/offline signal consulted when a transport call fails
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Settable online flag (starts online)
#[derive(Debug)]
pub struct OnlineFlag {
    online: AtomicBool,
}

impl Default for OnlineFlag {
    fn default() -> Self {
        Self {
            online: AtomicBool::new(true),
        }
    }
}

impl OnlineFlag {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
        }
    }

    pub fn set_online(&self, online: bool) {
        let previous = self.online.swap(online, Ordering::SeqCst);
        if previous != online {
            tracing::info!(online, "Connectivity changed");
        }
    }
}

impl Connectivity for OnlineFlag {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_toggles() {
        let flag = OnlineFlag::default();
        assert!(flag.is_online());
        flag.set_online(false);
        assert!(!flag.is_online());
        flag.set_online(true);
        assert!(flag.is_online());
    }
}
