//! Child windows opened for companion applications

use crate::host::NativeWindow;
use mailwave_core::urls::host_of;
use mailwave_core::WindowId;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Set of currently open child windows, in creation order.
///
/// A window is a member from [`insert`](Self::insert) until its close event
/// calls [`remove`](Self::remove).
#[derive(Default)]
pub struct ChildWindowRegistry {
    windows: RefCell<BTreeMap<WindowId, Rc<dyn NativeWindow>>>,
}

impl ChildWindowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, window: Rc<dyn NativeWindow>) {
        let id = window.id();
        log::debug!("Tracking child window {:?}", id);
        self.windows.borrow_mut().insert(id, window);
    }

    pub fn remove(&self, id: WindowId) -> Option<Rc<dyn NativeWindow>> {
        let removed = self.windows.borrow_mut().remove(&id);
        if removed.is_some() {
            log::debug!("Child window {:?} closed", id);
        }
        removed
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.windows.borrow().contains_key(&id)
    }

    pub fn get(&self, id: WindowId) -> Option<Rc<dyn NativeWindow>> {
        self.windows.borrow().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.windows.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.borrow().is_empty()
    }

    /// Handles of every tracked window, oldest first
    pub fn windows(&self) -> Vec<Rc<dyn NativeWindow>> {
        self.windows.borrow().values().cloned().collect()
    }

    /// First tracked window whose current URL is on `host`
    pub fn find_by_host(&self, host: &str) -> Option<Rc<dyn NativeWindow>> {
        let host = host.to_ascii_lowercase();
        // Surfaces are queried outside the borrow; a backend may call back
        // into the registry while answering.
        self.windows().into_iter().find(|window| {
            window
                .surface()
                .url()
                .and_then(|url| host_of(&url))
                .is_some_and(|window_host| window_host == host)
        })
    }

    /// Close every tracked window. Each close notification removes its entry.
    pub fn close_all(&self) {
        let windows = self.windows();
        log::info!("Closing {} child windows", windows.len());
        for window in windows {
            window.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{WindowHandlers, WindowSpec};
    use crate::testing::FakeWindow;
    use mailwave_core::Size;

    fn window(url: &str, registry: &Rc<ChildWindowRegistry>) -> Rc<FakeWindow> {
        let weak = Rc::downgrade(registry);
        let handlers = WindowHandlers {
            on_event: None,
            on_closed: Some(Rc::new(move |id| {
                if let Some(registry) = weak.upgrade() {
                    registry.remove(id);
                }
            })),
        };
        FakeWindow::new(WindowSpec::new(url, Size::new(800, 600), "persist:test"), handlers)
    }

    #[test]
    fn test_membership_follows_close_events() {
        let registry = Rc::new(ChildWindowRegistry::new());
        let meet = window("https://meet.google.com/abc", &registry);
        registry.insert(meet.clone());
        assert!(registry.contains(meet.id()));

        meet.close();
        assert!(!registry.contains(meet.id()));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_find_by_host_uses_current_url() {
        let registry = Rc::new(ChildWindowRegistry::new());
        let calendar = window("https://calendar.google.com/r", &registry);
        let meet = window("https://meet.google.com/abc", &registry);
        registry.insert(calendar.clone());
        registry.insert(meet.clone());

        let found = registry.find_by_host("MEET.google.com").unwrap();
        assert_eq!(found.id(), meet.id());
        assert!(registry.find_by_host("docs.google.com").is_none());

        // The calendar window navigated to docs
        calendar.surface.set_current_url("https://docs.google.com/document/d/1");
        let found = registry.find_by_host("docs.google.com").unwrap();
        assert_eq!(found.id(), calendar.id());
    }

    #[test]
    fn test_close_all_empties_registry() {
        let registry = Rc::new(ChildWindowRegistry::new());
        for url in ["https://meet.google.com/a", "https://docs.google.com/b"] {
            registry.insert(window(url, &registry));
        }
        assert_eq!(registry.len(), 2);

        registry.close_all();
        assert!(registry.is_empty());
    }
}
