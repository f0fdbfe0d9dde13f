use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::{
    Mutex as AsyncMutex, OwnedMutexGuard, OwnedRwLockReadGuard, OwnedRwLockWriteGuard, RwLock,
};

/// Serializes work on the same stored file name.
///
/// Raw and converted artifacts are keyed by file name alone, so save, convert,
/// record, reconvert and delete for one name must not interleave. Every name
/// guard also shares a store-wide lock that [`FileLocks::lock_all`] takes
/// exclusively, so a wipe waits for in-flight work and blocks new work.
#[derive(Clone, Default)]
pub struct FileLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
    all: Arc<RwLock<()>>,
}

pub struct FileGuard {
    guard: Option<OwnedMutexGuard<()>>,
    name: String,
    locks: FileLocks,
    _shared: OwnedRwLockReadGuard<()>,
}

/// Exclusive hold over every file name.
pub struct StoreGuard {
    _exclusive: OwnedRwLockWriteGuard<()>,
}

impl FileLocks {
    pub async fn lock(&self, name: &str) -> FileGuard {
        let shared = self.all.clone().read_owned().await;
        let entry = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            map.entry(name.to_string()).or_default().clone()
        };
        FileGuard {
            guard: Some(entry.lock_owned().await),
            name: name.to_string(),
            locks: self.clone(),
            _shared: shared,
        }
    }

    /// Waits for every outstanding [`FileGuard`] and holds off new ones.
    pub async fn lock_all(&self) -> StoreGuard {
        StoreGuard {
            _exclusive: self.all.clone().write_owned().await,
        }
    }

    fn release(&self, name: &str) {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        // the map holds one reference; anything more is a waiter or a holder
        if map.get(name).is_some_and(|m| Arc::strong_count(m) == 1) {
            map.remove(name);
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        // unlock first so the guard's reference no longer counts
        self.guard.take();
        self.locks.release(&self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_name_is_exclusive() {
        let locks = FileLocks::default();
        let first = locks.lock("a.csv").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock("a.csv").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        // other names are unaffected
        let _other = locks.lock("b.csv").await;

        drop(first);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn lock_all_waits_for_in_flight_work() {
        let locks = FileLocks::default();
        let held = locks.lock("a.csv").await;

        let wipe = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _all = locks.lock_all().await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!wipe.is_finished());

        drop(held);
        wipe.await.unwrap();
    }

    #[tokio::test]
    async fn names_wait_while_everything_is_held() {
        let locks = FileLocks::default();
        let all = locks.lock_all().await;

        let worker = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _g = locks.lock("b.csv").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!worker.is_finished());

        drop(all);
        worker.await.unwrap();
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn entries_are_released() {
        let locks = FileLocks::default();
        {
            let _g = locks.lock("a.csv").await;
            assert_eq!(locks.tracked(), 1);
        }
        assert_eq!(locks.tracked(), 0);
    }
}
