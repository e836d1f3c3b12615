//! Common types used throughout Mailwave

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque account key. Determines the storage partition of the account's
/// browsing session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Unique identifier for a native window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WindowId(pub u64);

/// Unique identifier for an embedded content surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SurfaceId(pub u64);

impl WindowId {
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl SurfaceId {
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for WindowId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for SurfaceId {
    fn default() -> Self {
        Self::new()
    }
}

/// Logical size in device-independent pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Logical rectangle relative to the host window's content area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    /// Rectangle covering `area` below a strip of `top` pixels.
    pub fn below_top_inset(area: Size, top: u32) -> Self {
        Self {
            x: 0,
            y: top as i32,
            width: area.width,
            height: area.height.saturating_sub(top),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = WindowId::new();
        let b = WindowId::new();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_account_id_serializes_as_plain_string() {
        let id = AccountId::new("work");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"work\"");
        assert_eq!(id.to_string(), "work");
    }

    #[test]
    fn test_bounds_below_top_inset() {
        let bounds = Bounds::below_top_inset(Size::new(1280, 800), 32);
        assert_eq!(bounds, Bounds { x: 0, y: 32, width: 1280, height: 768 });

        // A window shorter than the inset collapses to zero height
        let bounds = Bounds::below_top_inset(Size::new(300, 20), 32);
        assert_eq!(bounds.height, 0);
    }
}
