use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-token async locks serializing read-modify-write cycles on one session.
///
/// Entries are held weakly and pruned once no guard or waiter references them.
#[derive(Default)]
pub struct SessionLocks {
    slots: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, token: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.retain(|_, weak| weak.strong_count() > 0);
            match slots.get(token).and_then(Weak::upgrade) {
                Some(slot) => slot,
                None => {
                    let slot = Arc::new(AsyncMutex::new(()));
                    slots.insert(token.to_string(), Arc::downgrade(&slot));
                    slot
                }
            }
        };
        slot.lock_owned().await
    }

    #[cfg(test)]
    fn live_slots(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.values().filter(|w| w.strong_count() > 0).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_token_is_serialized() {
        let locks = Arc::new(SessionLocks::new());
        let guard = locks.acquire("tok").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("tok").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_distinct_tokens_do_not_block() {
        let locks = SessionLocks::new();
        let _a = locks.acquire("a").await;
        let _b = tokio::time::timeout(Duration::from_millis(50), locks.acquire("b"))
            .await
            .expect("independent token must not wait");
    }

    #[tokio::test]
    async fn test_slots_released_after_use() {
        let locks = SessionLocks::new();
        {
            let _guard = locks.acquire("tok").await;
            assert_eq!(locks.live_slots(), 1);
        }
        assert_eq!(locks.live_slots(), 0);
    }
}
