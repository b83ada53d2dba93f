//! Conversation context window.
//!
//! Bounds how much prior conversation is forwarded with each message.

use ana_core::types::ConversationTurn;

/// Number of prior turns forwarded by default.
pub const DEFAULT_HISTORY_TURNS: usize = 6;

/// Rolling window over prior conversation turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindow {
    /// Maximum turns kept. `None` keeps the full history.
    max_turns: Option<usize>,
}

impl HistoryWindow {
    pub fn new(max_turns: Option<usize>) -> Self {
        Self { max_turns }
    }

    pub fn unbounded() -> Self {
        Self { max_turns: None }
    }

    pub fn max_turns(&self) -> Option<usize> {
        self.max_turns
    }

    /// The most recent suffix of `history` that fits the window.
    ///
    /// Order is preserved; only the oldest turns are dropped.
    pub fn select<'a>(&self, history: &'a [ConversationTurn]) -> &'a [ConversationTurn] {
        match self.max_turns {
            Some(max) if history.len() > max => &history[history.len() - max..],
            _ => history,
        }
    }
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new(Some(DEFAULT_HISTORY_TURNS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turns(n: usize) -> Vec<ConversationTurn> {
        (0..n)
            .map(|i| {
                if i % 2 == 0 {
                    ConversationTurn::user(format!("turn {}", i))
                } else {
                    ConversationTurn::assistant(format!("turn {}", i))
                }
            })
            .collect()
    }

    #[test]
    fn test_default_window_is_six() {
        assert_eq!(HistoryWindow::default().max_turns(), Some(6));
    }

    #[test]
    fn test_short_history_untouched() {
        let history = turns(4);
        assert_eq!(HistoryWindow::default().select(&history), &history[..]);
    }

    #[test]
    fn test_exact_window_untouched() {
        let history = turns(6);
        assert_eq!(HistoryWindow::default().select(&history).len(), 6);
    }

    #[test]
    fn test_long_history_keeps_recent_suffix_in_order() {
        let history = turns(10);
        let selected = HistoryWindow::default().select(&history);
        let contents: Vec<&str> = selected.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(
            contents,
            vec!["turn 4", "turn 5", "turn 6", "turn 7", "turn 8", "turn 9"]
        );
    }

    #[test]
    fn test_unbounded_keeps_everything() {
        let history = turns(50);
        assert_eq!(HistoryWindow::unbounded().select(&history).len(), 50);
    }

    #[test]
    fn test_zero_window_drops_all() {
        let history = turns(3);
        assert!(HistoryWindow::new(Some(0)).select(&history).is_empty());
    }

    #[test]
    fn test_empty_history() {
        assert!(HistoryWindow::default().select(&[]).is_empty());
    }
}
