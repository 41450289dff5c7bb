//! Hand-rolled TTL+LRU cache fronting [`crate::users::UserStorage`]'s
//! by-id and by-email lookups, so that repeated principal resolution
//! (notification recipients, audit attribution) doesn't re-scan the
//! `users` table on every call.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use switchboard_models::User;

struct Entry {
    user: User,
    inserted_at: Instant,
}

/// Keyed by `userId`; email lookups are served by a secondary index into
/// the same entry map so both access paths share one eviction policy.
struct Inner {
    by_id: HashMap<String, Entry>,
    email_to_id: HashMap<String, String>,
    order: Vec<String>,
}

pub struct UserCache {
    inner: Mutex<Inner>,
    capacity: usize,
    ttl: Duration,
}

impl UserCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner { by_id: HashMap::new(), email_to_id: HashMap::new(), order: Vec::new() }),
            capacity,
            ttl,
        }
    }

    pub fn get(&self, user_id: &str) -> Option<User> {
        let mut inner = self.inner.lock();
        let expired = match inner.by_id.get(user_id) {
            Some(entry) => entry.inserted_at.elapsed() >= self.ttl,
            None => return None,
        };
        if expired {
            inner.evict(user_id);
            return None;
        }
        inner.touch(user_id);
        inner.by_id.get(user_id).map(|entry| entry.user.clone())
    }

    pub fn get_by_email(&self, email: &str) -> Option<User> {
        let user_id = self.inner.lock().email_to_id.get(email).cloned()?;
        self.get(&user_id)
    }

    pub fn put(&self, user: User) {
        let mut inner = self.inner.lock();
        let user_id = user.user_id.clone();
        inner.evict(&user_id);
        if inner.by_id.len() >= self.capacity {
            if let Some(oldest) = inner.order.first().cloned() {
                inner.evict(&oldest);
            }
        }
        inner.email_to_id.insert(user.email.clone(), user_id.clone());
        inner.order.push(user_id.clone());
        inner.by_id.insert(user_id, Entry { user, inserted_at: Instant::now() });
    }

    pub fn invalidate(&self, user_id: &str) {
        self.inner.lock().evict(user_id);
    }
}

impl Inner {
    fn touch(&mut self, user_id: &str) {
        if let Some(pos) = self.order.iter().position(|id| id == user_id) {
            let id = self.order.remove(pos);
            self.order.push(id);
        }
    }

    fn evict(&mut self, user_id: &str) {
        if let Some(entry) = self.by_id.remove(user_id) {
            self.email_to_id.remove(&entry.user.email);
        }
        self.order.retain(|id| id != user_id);
    }
}
