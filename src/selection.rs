use parking_lot::RwLock;

/// Externally-chosen detection index.
///
/// The index refers to a position in the current frame's detection list
/// and goes stale as soon as a new frame reorders or resizes that list.
/// Writes are intentionally unvalidated; the renderer bounds-checks
/// before use, so stale or out-of-range values are a silent no-op.
#[derive(Debug, Default)]
pub struct SelectionState {
    selected: RwLock<Option<i64>>,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the selection. Accepts any integer, or `None` to clear.
    pub fn select(&self, index: Option<i64>) {
        *self.selected.write() = index;
    }

    /// Reset to no selection.
    pub fn clear(&self) {
        *self.selected.write() = None;
    }

    /// Read the current selection.
    pub fn current(&self) -> Option<i64> {
        *self.selected.read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_and_clear() {
        let state = SelectionState::new();
        assert_eq!(state.current(), None);

        state.select(Some(2));
        assert_eq!(state.current(), Some(2));

        state.clear();
        assert_eq!(state.current(), None);
    }

    #[test]
    fn accepts_out_of_range_and_negative_indices() {
        let state = SelectionState::new();
        state.select(Some(5));
        assert_eq!(state.current(), Some(5));

        state.select(Some(-1));
        assert_eq!(state.current(), Some(-1));
    }
}
