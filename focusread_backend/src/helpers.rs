use std::sync::RwLock;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::borrow::Borrow;
use std::hash::Hash;
use std::fmt::Debug;
use std::time::{Instant, Duration};
use crate::errors::Result;

/// Source of "now" for anything that expires.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
pub struct ManualClock {
    now: std::sync::Mutex<Instant>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new() -> Self {
        ManualClock { now: std::sync::Mutex::new(Instant::now()) }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
impl<'a, C: Clock> Clock for &'a C {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

pub struct Cache<K, V, C = SystemClock> {
    expires: Duration,
    clock: C,
    cache: RwLock<HashMap<K, (Instant, V)>>,
    expiry_queue: RwLock<VecDeque<(Instant, K)>>,
}

impl<K: Hash + Eq + Clone + Debug, V: Clone, C: Clock> Cache<K, V, C> {

    pub fn with_clock(expires: Duration, clock: C) -> Self {
        Cache {
            expires,
            clock,
            cache: RwLock::new(HashMap::new()),
            expiry_queue: RwLock::new(VecDeque::new()),
        }
    }

    pub fn insert(&self, key: K, value: V) -> Result<()> {
        if let (Ok(mut cache), Ok(mut queue)) = (self.cache.write(), self.expiry_queue.write()) {
            let expires = self.clock.now() + self.expires;
            cache.insert(key.clone(), (expires, value));
            queue.push_back((expires, key));
            Ok(())
        } else {
            Err("Poisoned locks?".into())
        }
    }

    pub fn get<Q: ?Sized>(&self, key: &Q)
        -> Result<Option<V>>
        where   K: Borrow<Q>,
                Q: Hash + Eq
    {
        if let Ok(cache) = self.cache.read() {
            if let Some(&(expires, ref val)) = cache.get(key) {
                if self.clock.now() >= expires {
                    Ok(None) // The map is not cleaned yet, but the value has expired
                } else {
                    Ok(Some(val.clone()))
                }
            } else {
                Ok(None)
            }
        } else {
            Err("Poisoned locks?".into())
        }
    }

    /// Drops expired entries. Returns (entries left, entries removed).
    pub fn clean_expired(&self) -> Result<(usize, usize)> {
        if let (Ok(mut cache), Ok(mut queue)) = (self.cache.write(), self.expiry_queue.write()) {
            let now = self.clock.now();
            let mut removed = 0;
            while let Some(&(expires, _)) = queue.front() {
                if now < expires {
                    break;
                }
                if let Some((expires, key)) = queue.pop_front() {
                    // A re-insert pushes a newer expiry for the same key; keep the live value.
                    let stale = match cache.get(&key) {
                        Some(&(current, _)) => current <= expires,
                        None => false,
                    };
                    if stale {
                        cache.remove(&key);
                        debug!("Removed {:?} (expired: {:?}, now: {:?}) from cache.", key, expires, now);
                        removed += 1;
                    }
                }
            }
            Ok((cache.len(), removed))
        } else {
            Err("Poisoned locks?".into())
        }
    }
}

#[test]
fn test_cache_entry_expires_after_ttl() {
    let clock = ManualClock::new();
    let cache: Cache<String, u32, &ManualClock> = Cache::with_clock(Duration::from_secs(300), &clock);

    cache.insert("a".to_string(), 1).unwrap();
    assert_eq!(cache.get("a").unwrap(), Some(1));

    clock.advance(Duration::from_secs(299));
    assert_eq!(cache.get("a").unwrap(), Some(1));

    clock.advance(Duration::from_secs(1));
    assert_eq!(cache.get("a").unwrap(), None);
    assert_eq!(cache.get("missing").unwrap(), None);
}

#[test]
fn test_cache_clean_expired_keeps_refreshed_keys() {
    let clock = ManualClock::new();
    let cache: Cache<&'static str, u32, &ManualClock> = Cache::with_clock(Duration::from_secs(10), &clock);

    cache.insert("old", 1).unwrap();
    cache.insert("refreshed", 2).unwrap();
    clock.advance(Duration::from_secs(5));
    cache.insert("refreshed", 3).unwrap();
    clock.advance(Duration::from_secs(6));

    assert_eq!(cache.clean_expired().unwrap(), (1, 1));
    assert_eq!(cache.get("old").unwrap(), None);
    assert_eq!(cache.get("refreshed").unwrap(), Some(3));
}
