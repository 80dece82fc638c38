use serde::{Deserialize, Serialize};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncPhase {
    Initializing = 0,
    CatchingUp = 1,
    Synced = 2,
}

/// `current` is the indexed head, `total` the node's best block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub current: u64,
    pub total: u64,
    pub message: Option<String>,
}

pub struct SyncStatusManager {
    status: Mutex<SyncStatus>,
}

impl SyncStatusManager {
    pub fn new() -> Self {
        let status = SyncStatus {
            phase: SyncPhase::Initializing,
            current: 0,
            total: 0,
            message: None,
        };

        Self {
            status: Mutex::new(status),
        }
    }

    /// Record a new observation and derive the phase from it.
    pub fn update_progress(&self, current: u64, total: u64) {
        let mut status = self.status.lock().unwrap();
        status.current = current;
        status.total = total;
        status.phase = if current >= total {
            SyncPhase::Synced
        } else {
            SyncPhase::CatchingUp
        };
        status.message = None;
    }

    pub fn update_message(&self, message: Option<String>) {
        let mut status = self.status.lock().unwrap();
        status.message = message;
    }

    pub fn get_status(&self) -> SyncStatus {
        let status = self.status.lock().unwrap();
        status.clone()
    }
}

impl Default for SyncStatusManager {
    fn default() -> Self {
        Self::new()
    }
}

pub type SyncStatusManagerRef = std::sync::Arc<SyncStatusManager>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_phase() {
        let status = SyncStatusManager::new();
        assert_eq!(status.get_status().phase, SyncPhase::Initializing);

        status.update_progress(10, 20);
        let current = status.get_status();
        assert_eq!(current.phase, SyncPhase::CatchingUp);
        assert_eq!((current.current, current.total), (10, 20));

        status.update_message(Some("node unreachable".to_string()));
        assert_eq!(
            status.get_status().message.as_deref(),
            Some("node unreachable")
        );

        status.update_progress(20, 20);
        let current = status.get_status();
        assert_eq!(current.phase, SyncPhase::Synced);
        assert_eq!(current.message, None);
    }
}
