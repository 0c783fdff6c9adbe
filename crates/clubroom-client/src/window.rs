//! Visible-window state machine for one (chat, thread) selection.
//!
//! Long histories are not rendered whole: only the trailing `size`
//! messages of the active thread partition are materialized, expanded in
//! steps via "load older".

use clubroom_shared::constants::{INITIAL_WINDOW_SIZE, WINDOW_LOAD_STEP};
use clubroom_shared::ChatMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WindowState {
    Idle,
    LoadingOlder,
}

/// How many of the most-recent thread messages are materialized for
/// display, plus the in-flight "loading older" flag.
#[derive(Debug, Clone)]
pub struct VisibleWindow {
    size: usize,
    state: WindowState,
}

impl VisibleWindow {
    /// Fresh window over a thread with `total` messages.
    pub fn new(total: usize) -> Self {
        Self {
            size: INITIAL_WINDOW_SIZE.min(total),
            state: WindowState::Idle,
        }
    }

    /// Shrink back to the initial window.  Called on chat or thread change.
    pub fn reset(&mut self, total: usize) {
        self.size = INITIAL_WINDOW_SIZE.min(total);
        self.state = WindowState::Idle;
    }

    /// Current window size.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether a "load older" expansion is in flight.
    pub fn is_loading_older(&self) -> bool {
        self.state == WindowState::LoadingOlder
    }

    /// Enter the `LoadingOlder` state.  Returns `false` (and changes
    /// nothing) when an expansion is already in flight or the window
    /// already covers the whole thread.
    pub fn begin_load_older(&mut self, total: usize) -> bool {
        if self.state == WindowState::LoadingOlder || self.size >= total {
            return false;
        }
        self.state = WindowState::LoadingOlder;
        true
    }

    /// Complete an expansion started with [`Self::begin_load_older`].
    pub fn finish_load_older(&mut self, total: usize) {
        if self.state == WindowState::LoadingOlder {
            self.size = total.min(self.size + WINDOW_LOAD_STEP);
            self.state = WindowState::Idle;
        }
    }

    /// Synchronous begin-and-finish expansion.  Returns whether the window
    /// grew.
    pub fn load_older(&mut self, total: usize) -> bool {
        let before = self.size;
        if self.begin_load_older(total) {
            self.finish_load_older(total);
        }
        self.size > before
    }

    /// The trailing messages of the thread partition.
    ///
    /// The slice is never smaller than the initial window, so messages
    /// that arrive after a reset on a then-empty thread still render
    /// without another reset.
    pub fn visible_slice<'a>(&self, messages: &'a [ChatMessage]) -> &'a [ChatMessage] {
        let effective = self.size.max(INITIAL_WINDOW_SIZE).min(messages.len());
        &messages[messages.len() - effective..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubroom_shared::UserId;

    fn msgs(n: usize) -> Vec<ChatMessage> {
        (0..n)
            .map(|i| {
                let mut m =
                    ChatMessage::outgoing(UserId::from("alice"), format!("m{i}"), i as f64);
                m.message_id = format!("m{i}");
                m
            })
            .collect()
    }

    #[test]
    fn initial_window_is_bounded_by_total() {
        assert_eq!(VisibleWindow::new(3).size(), 3);
        assert_eq!(VisibleWindow::new(500).size(), 10);
    }

    #[test]
    fn load_older_never_exceeds_total_and_is_monotonic() {
        let total = 450;
        let mut window = VisibleWindow::new(total);
        let mut previous = window.size();

        for _ in 0..10 {
            window.load_older(total);
            assert!(window.size() >= previous);
            assert!(window.size() <= total);
            previous = window.size();
        }
        assert_eq!(window.size(), total);

        // Fully expanded: further requests change nothing.
        assert!(!window.load_older(total));
    }

    #[test]
    fn load_older_is_guarded_against_reentry() {
        let mut window = VisibleWindow::new(500);
        assert!(window.begin_load_older(500));
        assert!(window.is_loading_older());

        // A second request while one is in flight is refused.
        assert!(!window.begin_load_older(500));

        window.finish_load_older(500);
        assert!(!window.is_loading_older());
        assert_eq!(window.size(), 210);
    }

    #[test]
    fn reset_shrinks_back_to_initial() {
        let mut window = VisibleWindow::new(500);
        window.load_older(500);
        assert_eq!(window.size(), 210);

        window.reset(500);
        assert_eq!(window.size(), 10);
        assert!(!window.is_loading_older());
    }

    #[test]
    fn visible_slice_is_trailing() {
        let messages = msgs(50);
        let window = VisibleWindow::new(messages.len());

        let slice = window.visible_slice(&messages);
        assert_eq!(slice.len(), 10);
        assert_eq!(slice[0].message_id, "m40");
        assert_eq!(slice[9].message_id, "m49");
    }

    #[test]
    fn slice_recovers_after_reset_on_empty_thread() {
        let mut window = VisibleWindow::new(0);
        assert_eq!(window.size(), 0);

        // Messages that arrived after the reset still render.
        let messages = msgs(30);
        assert_eq!(window.visible_slice(&messages).len(), 10);

        window.load_older(messages.len());
        assert_eq!(window.visible_slice(&messages).len(), 30);
    }

    #[test]
    fn visible_slice_of_short_thread_is_whole_thread() {
        let messages = msgs(4);
        let window = VisibleWindow::new(messages.len());
        assert_eq!(window.visible_slice(&messages).len(), 4);
    }
}
