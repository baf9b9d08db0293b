//! The content contract and per-content change notification.
//!
//! A content is one opaque, user-visible panel. The engine never looks
//! inside it; it needs identity, titles, and a way to hear about property
//! changes so tab ordering and host-visible labels stay current.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::Hash;

/// One dockable panel, implemented by the host application.
///
/// Implementations are typically cheap handles (`Rc` around the real panel
/// state) so the engine can own them inside tab groups.
pub trait DockContent {
    /// Stable identity; also the key used in persisted layouts.
    type Id: Clone + PartialEq + Eq + Hash + fmt::Debug + 'static;

    fn id(&self) -> &Self::Id;

    /// Short title shown on the tab.
    fn title(&self) -> String;

    /// Longer title for window captions; defaults to the short title.
    fn long_title(&self) -> String {
        self.title()
    }

    /// Whether this content may ever be moved to a popout window.
    fn can_popout(&self) -> bool {
        true
    }

    /// The content's change-notification channel, if it has one.
    ///
    /// The manager subscribes while the content is docked and unsubscribes
    /// when it is removed.
    fn events(&self) -> Option<&ContentEvents> {
        None
    }
}

/// A property change announced through [`ContentEvents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentChange {
    Title,
    LongTitle,
    Foreground,
}

/// Token returned by [`ContentEvents::subscribe`]; pass it back to
/// [`ContentEvents::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Callback = Box<dyn Fn(ContentChange)>;

/// A small publish/subscribe channel owned by one content.
///
/// Hosts call [`emit`](Self::emit) when the title, long title or foreground
/// color of the panel changes. Single threaded; callbacks run synchronously
/// and must not subscribe or unsubscribe reentrantly.
#[derive(Default)]
pub struct ContentEvents {
    subscribers: RefCell<Vec<(u64, Callback)>>,
    next_id: Cell<u64>,
}

impl ContentEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(ContentChange) + 'static) -> Subscription {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        self.subscribers.borrow_mut().push((id, Box::new(callback)));
        Subscription(id)
    }

    pub fn unsubscribe(&self, subscription: Subscription) {
        self.subscribers
            .borrow_mut()
            .retain(|(id, _)| *id != subscription.0);
    }

    pub fn emit(&self, change: ContentChange) {
        for (_, callback) in self.subscribers.borrow().iter() {
            callback(change);
        }
    }
}

impl fmt::Debug for ContentEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentEvents")
            .field("subscribers", &self.subscribers.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn emit_reaches_all_subscribers_until_unsubscribed() {
        let events = ContentEvents::new();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen1 = seen.clone();
        let sub1 = events.subscribe(move |change| seen1.borrow_mut().push((1, change)));
        let seen2 = seen.clone();
        let _sub2 = events.subscribe(move |change| seen2.borrow_mut().push((2, change)));

        events.emit(ContentChange::Title);
        events.unsubscribe(sub1);
        events.emit(ContentChange::Foreground);

        assert_eq!(
            *seen.borrow(),
            vec![
                (1, ContentChange::Title),
                (2, ContentChange::Title),
                (2, ContentChange::Foreground),
            ],
        );
    }
}
