/// Transient notifications
///
/// Success and error messages shown under the main view. They can be
/// dismissed and disappear on their own after `TOAST_TTL`.
use std::time::{Duration, Instant};

pub const TOAST_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    created: Instant,
}

#[derive(Debug, Default)]
pub struct Toasts {
    next_id: u64,
    items: Vec<Toast>,
}

impl Toasts {
    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(Toast {
            id,
            kind,
            message: message.into(),
            created: now,
        });
        id
    }

    pub fn success(&mut self, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Success, message, Instant::now())
    }

    pub fn error(&mut self, message: impl Into<String>) -> u64 {
        self.push(ToastKind::Error, message, Instant::now())
    }

    pub fn dismiss(&mut self, id: u64) {
        self.items.retain(|t| t.id != id);
    }

    /// Drop toasts older than `TOAST_TTL`
    pub fn expire(&mut self, now: Instant) {
        self.items
            .retain(|t| now.saturating_duration_since(t.created) < TOAST_TTL);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toasts_expire_after_ttl() {
        let start = Instant::now();
        let mut toasts = Toasts::default();
        toasts.push(ToastKind::Success, "saved", start);
        toasts.push(ToastKind::Error, "failed", start + Duration::from_secs(2));

        toasts.expire(start + Duration::from_secs(3));
        assert_eq!(toasts.iter().count(), 2);

        toasts.expire(start + TOAST_TTL);
        let left: Vec<_> = toasts.iter().map(|t| t.message.as_str()).collect();
        assert_eq!(left, ["failed"]);

        toasts.expire(start + TOAST_TTL + Duration::from_secs(2));
        assert!(toasts.is_empty());
    }

    #[test]
    fn test_dismiss_by_id() {
        let mut toasts = Toasts::default();
        let a = toasts.success("a");
        let b = toasts.error("b");
        assert_ne!(a, b);
        toasts.dismiss(a);
        let left: Vec<_> = toasts.iter().map(|t| t.id).collect();
        assert_eq!(left, [b]);
    }
}
