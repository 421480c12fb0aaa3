//! Reordering of id lists.
//!
//! `move_item` is the only primitive: take `active` out and put it where
//! `over` was. Gestures (pointer, touch, keyboard) are captured by a
//! [`DragSession`] and applied once, when they complete.

/// Moves `active` to the former position of `over`.
///
/// Returns false and leaves the list untouched when the ids are equal or
/// either one is absent.
///
/// # Examples
///
/// ```
/// use smarttable::move_item;
///
/// let mut ids = vec!["a", "b", "c", "d"];
/// assert!(move_item(&mut ids, &"b", &"d"));
/// assert_eq!(ids, vec!["a", "c", "d", "b"]);
/// ```
pub fn move_item<T: PartialEq>(ids: &mut Vec<T>, active: &T, over: &T) -> bool {
    if active == over {
        return false;
    }
    let (Some(from), Some(to)) = (
        ids.iter().position(|id| id == active),
        ids.iter().position(|id| id == over),
    ) else {
        return false;
    };
    let item = ids.remove(from);
    ids.insert(to, item);
    true
}

/// Copying variant of [`move_item`].
pub fn moved<T: PartialEq + Clone>(ids: &[T], active: &T, over: &T) -> Vec<T> {
    let mut out = ids.to_vec();
    move_item(&mut out, active, over);
    out
}

/// One drag gesture. Nothing is applied until [`DragSession::finish`];
/// cancelling or dropping the session leaves the list as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession<T> {
    active: T,
    over: Option<T>,
}

impl<T: PartialEq + Clone> DragSession<T> {
    pub fn start(active: T) -> Self {
        DragSession { active, over: None }
    }

    pub fn active(&self) -> &T {
        &self.active
    }

    pub fn over(&self) -> Option<&T> {
        self.over.as_ref()
    }

    /// Records the item currently under the dragged one.
    pub fn hover(&mut self, over: T) {
        self.over = Some(over);
    }

    /// Leaving every drop target.
    pub fn leave(&mut self) {
        self.over = None;
    }

    /// Completes the gesture as one move. Returns whether the list changed.
    pub fn finish(self, ids: &mut Vec<T>) -> bool {
        match &self.over {
            Some(over) => move_item(ids, &self.active, over),
            None => false,
        }
    }

    pub fn cancel(self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_forward_and_back() {
        assert_eq!(moved(&["a", "b", "c", "d"], &"b", &"d"), vec!["a", "c", "d", "b"]);
        assert_eq!(moved(&["a", "b", "c", "d"], &"d", &"a"), vec!["d", "a", "b", "c"]);
    }

    #[test]
    fn test_move_noops() {
        let ids = vec!["a", "b"];
        assert_eq!(moved(&ids, &"a", &"a"), ids);
        assert_eq!(moved(&ids, &"a", &"z"), ids);
        assert_eq!(moved(&ids, &"z", &"a"), ids);
    }

    #[test]
    fn test_drag_session() {
        let mut ids = vec![1, 2, 3];

        let mut drag = DragSession::start(1);
        drag.hover(2);
        drag.hover(3);
        assert_eq!(drag.over(), Some(&3));
        assert!(drag.finish(&mut ids));
        assert_eq!(ids, vec![2, 3, 1]);

        let mut drag = DragSession::start(2);
        drag.hover(1);
        drag.cancel();
        assert_eq!(ids, vec![2, 3, 1]);

        let mut drag = DragSession::start(3);
        drag.hover(2);
        drag.leave();
        assert!(!drag.finish(&mut ids));
    }
}
