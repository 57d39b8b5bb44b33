use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

/// Single-value cache: holds a computed value until `invalidate` or, when a
/// TTL is set, until it expires.
pub struct TtlCache<T> {
    slot: RwLock<Option<(Arc<T>, Instant)>>,
    ttl: Option<Duration>,
    // bumped by every invalidate
    generation: AtomicU64,
}

impl<T> TtlCache<T> {
    /// `ttl_secs == 0` keeps the value until invalidated
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_ttl((ttl_secs > 0).then(|| Duration::from_secs(ttl_secs)))
    }

    fn with_ttl(ttl: Option<Duration>) -> Self {
        Self {
            slot: RwLock::new(None),
            ttl,
            generation: AtomicU64::new(0),
        }
    }

    pub fn get(&self) -> Option<Arc<T>> {
        let slot = self.slot.read().ok()?;
        let (value, stored_at) = slot.as_ref()?;
        match self.ttl {
            Some(ttl) if stored_at.elapsed() >= ttl => None,
            _ => Some(Arc::clone(value)),
        }
    }

    /// Current generation, taken before computing a value for `set_if_current`
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn set(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some((Arc::clone(&value), Instant::now()));
        }
        value
    }

    /// Stores `value` only if nothing was invalidated since `generation` was
    /// read. The value is returned either way.
    pub fn set_if_current(&self, generation: u64, value: T) -> Arc<T> {
        let value = Arc::new(value);
        if let Ok(mut slot) = self.slot.write() {
            if self.generation.load(Ordering::Acquire) == generation {
                *slot = Some((Arc::clone(&value), Instant::now()));
            }
        }
        value
    }

    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.slot.write() {
            self.generation.fetch_add(1, Ordering::AcqRel);
            *slot = None;
        }
    }
}
