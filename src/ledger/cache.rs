// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for user lookups by id.
//!
//! Only used on the token-validation path, where the same user is looked up
//! on every call. Balances and other ledger rows are never cached.
//!
//! Fills are guarded by a generation counter: take [`UserCache::generation`]
//! before reading the store, pass it to [`UserCache::fill`]. If any
//! invalidation landed in between, the fill is dropped, so a row read before
//! a committed update or delete can never be cached after it.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

use super::model::{User, UserId};

struct CacheEntry {
    user: User,
    inserted_at: Instant,
}

struct Slots {
    entries: LruCache<UserId, CacheEntry>,
    /// Bumped by every invalidation
    generation: u64,
}

/// In-process read-through cache of user rows.
pub struct UserCache {
    cache: Mutex<Slots>,
    ttl: Duration,
}

impl UserCache {
    /// Create a new cache with the given capacity and TTL.
    ///
    /// - `capacity`: Max number of users to cache (at least 1).
    /// - `ttl`: Time-to-live for each cache entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(Slots {
                entries: LruCache::new(NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)),
                generation: 0,
            }),
            ttl,
        }
    }

    /// Returns `None` if not cached or expired.
    pub fn get(&self, id: UserId) -> Option<User> {
        let mut slots = self.cache.lock().ok()?;
        if let Some(entry) = slots.entries.get(&id) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.user.clone());
            }
            slots.entries.pop(&id);
        }
        None
    }

    /// Current generation; read it before loading the row to fill with.
    pub fn generation(&self) -> u64 {
        self.cache.lock().map(|slots| slots.generation).unwrap_or(u64::MAX)
    }

    /// Cache `user` unless an invalidation happened after `seen` was taken.
    /// Returns whether the entry was stored.
    pub fn fill(&self, user: User, seen: u64) -> bool {
        let Ok(mut slots) = self.cache.lock() else {
            return false;
        };
        if slots.generation != seen {
            return false;
        }
        slots.entries.put(
            user.id,
            CacheEntry {
                user,
                inserted_at: Instant::now(),
            },
        );
        true
    }

    pub fn invalidate(&self, id: UserId) {
        if let Ok(mut slots) = self.cache.lock() {
            slots.entries.pop(&id);
            slots.generation = slots.generation.wrapping_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use chrono::Utc;

    fn sample_user(id: UserId) -> User {
        let now = Utc::now();
        User {
            id,
            email: format!("user{id}@x.com"),
            password_digest: "digest".to_string(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        }
    }

    fn put(cache: &UserCache, user: User) {
        assert!(cache.fill(user, cache.generation()));
    }

    #[test]
    fn cache_put_and_get() {
        let cache = UserCache::new(10, Duration::from_secs(300));
        assert!(cache.get(1).is_none());

        assert!(cache.fill(sample_user(1), cache.generation()));
        assert_eq!(cache.get(1).unwrap().email, "user1@x.com");
    }

    #[test]
    fn cache_invalidate() {
        let cache = UserCache::new(10, Duration::from_secs(300));
        put(&cache, sample_user(1));
        cache.invalidate(1);
        assert!(cache.get(1).is_none());
    }

    #[test]
    fn fill_after_invalidation_is_dropped() {
        let cache = UserCache::new(10, Duration::from_secs(300));

        // Miss, then read the row while an update commits and invalidates.
        assert!(cache.get(1).is_none());
        let seen = cache.generation();
        let stale = sample_user(1);
        cache.invalidate(1);

        assert!(!cache.fill(stale, seen));
        assert!(cache.get(1).is_none());

        // The next miss fills normally.
        assert!(cache.fill(sample_user(1), cache.generation()));
        assert!(cache.get(1).is_some());
    }

    #[test]
    fn cache_ttl_expiry() {
        let cache = UserCache::new(10, Duration::from_millis(1));
        put(&cache, sample_user(1));

        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get(1).is_none());
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let cache = UserCache::new(2, Duration::from_secs(300));
        put(&cache, sample_user(1));
        put(&cache, sample_user(2));
        cache.get(1);
        put(&cache, sample_user(3));

        assert!(cache.get(1).is_some());
        assert!(cache.get(2).is_none());
        assert!(cache.get(3).is_some());
    }

    #[test]
    fn zero_capacity_still_caches_one() {
        let cache = UserCache::new(0, Duration::from_secs(300));
        put(&cache, sample_user(1));
        assert!(cache.get(1).is_some());
    }
}
