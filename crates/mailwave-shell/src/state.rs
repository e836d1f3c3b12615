//! Observable view state and its subscriber registry

use serde::{Serialize, Serializer};
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NavigationHistory {
    pub can_go_back: bool,
    pub can_go_forward: bool,
}

/// Unread count of an account, or `Disabled` when the account opted out of
/// the badge. Serializes as a number or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreadCount {
    Count(u32),
    Disabled,
}

impl UnreadCount {
    pub fn is_enabled(self) -> bool {
        matches!(self, UnreadCount::Count(_))
    }

    pub fn count(self) -> Option<u32> {
        match self {
            UnreadCount::Count(n) => Some(n),
            UnreadCount::Disabled => None,
        }
    }
}

impl Serialize for UnreadCount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            UnreadCount::Count(n) => serializer.serialize_u32(*n),
            UnreadCount::Disabled => serializer.serialize_none(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservableState {
    pub title: String,
    pub navigation_history: NavigationHistory,
    pub unread_count: UnreadCount,
    pub attention_required: bool,
}

impl ObservableState {
    pub fn new(unread_tracking: bool) -> Self {
        Self {
            title: String::new(),
            navigation_history: NavigationHistory::default(),
            unread_count: if unread_tracking {
                UnreadCount::Count(0)
            } else {
                UnreadCount::Disabled
            },
            attention_required: false,
        }
    }
}

/// Partial update shallow-merged onto an [`ObservableState`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatePatch {
    pub title: Option<String>,
    pub navigation_history: Option<NavigationHistory>,
    pub unread_count: Option<UnreadCount>,
    pub attention_required: Option<bool>,
}

impl StatePatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn navigation_history(history: NavigationHistory) -> Self {
        Self {
            navigation_history: Some(history),
            ..Self::default()
        }
    }

    pub fn unread_count(count: u32) -> Self {
        Self {
            unread_count: Some(UnreadCount::Count(count)),
            ..Self::default()
        }
    }

    pub fn with_attention_required(mut self, attention_required: bool) -> Self {
        self.attention_required = Some(attention_required);
        self
    }

    pub fn with_unread_count(mut self, count: u32) -> Self {
        self.unread_count = Some(UnreadCount::Count(count));
        self
    }

    /// Merge onto `previous`. A disabled unread count stays disabled.
    pub fn apply_to(&self, previous: &ObservableState) -> ObservableState {
        let unread_count = match (previous.unread_count, self.unread_count) {
            (UnreadCount::Disabled, _) => UnreadCount::Disabled,
            (_, Some(next)) => next,
            (current, None) => current,
        };

        ObservableState {
            title: self.title.clone().unwrap_or_else(|| previous.title.clone()),
            navigation_history: self
                .navigation_history
                .unwrap_or(previous.navigation_history),
            unread_count,
            attention_required: self
                .attention_required
                .unwrap_or(previous.attention_required),
        }
    }
}

/// Called with `(new, previous)` after every state change
pub type StateListener = Rc<dyn Fn(&ObservableState, &ObservableState)>;

#[derive(Default)]
struct ListenerList {
    next_id: Cell<u64>,
    listeners: RefCell<Vec<(u64, StateListener)>>,
}

/// Handle returned by [`StateStore::subscribe`]
#[must_use = "dropping a Subscription keeps the listener registered; call unsubscribe() to remove it"]
pub struct Subscription {
    id: u64,
    list: Weak<ListenerList>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(list) = self.list.upgrade() {
            list.listeners.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}

/// Current [`ObservableState`] plus the listeners observing it
pub struct StateStore {
    state: RefCell<ObservableState>,
    listeners: Rc<ListenerList>,
}

impl StateStore {
    pub fn new(initial: ObservableState) -> Self {
        Self {
            state: RefCell::new(initial),
            listeners: Rc::new(ListenerList::default()),
        }
    }

    pub fn get(&self) -> ObservableState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self, listener: impl Fn(&ObservableState, &ObservableState) + 'static) -> Subscription {
        let id = self.listeners.next_id.get();
        self.listeners.next_id.set(id + 1);
        self.listeners
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));
        Subscription {
            id,
            list: Rc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.listeners.borrow().len()
    }

    /// Replace the state with `patch` merged onto it, then notify every
    /// listener synchronously. No borrow is held while listeners run, so they
    /// may read the store or apply further patches.
    pub fn apply(&self, patch: &StatePatch) -> ObservableState {
        let (next, previous) = {
            let mut state = self.state.borrow_mut();
            let next = patch.apply_to(&state);
            let previous = std::mem::replace(&mut *state, next.clone());
            (next, previous)
        };

        let listeners: Vec<StateListener> = self
            .listeners
            .listeners
            .borrow()
            .iter()
            .map(|(_, listener)| Rc::clone(listener))
            .collect();
        for listener in listeners {
            listener(&next, &previous);
        }

        next
    }
}
