//! Checkpoints: atomic groups of edits that can be reverted.
use crate::error::CalcResult;
use crate::tree::arena::Arena;
use crate::tree::handle::TableSnapshot;

/// A saved arena state. Consumed by [`Arena::rollback`] or [`Arena::commit`].
///
/// Checkpoints nest and must be closed in reverse order of creation.
#[must_use = "a checkpoint must be rolled back or committed"]
#[derive(Debug)]
pub struct Checkpoint {
    depth: usize,
    journal_len: usize,
    size: usize,
    table: TableSnapshot,
}

impl Checkpoint {
    /// Buffer size when the checkpoint was taken.
    pub fn size(&self) -> usize {
        self.size
    }
}

impl Arena {
    pub fn checkpoint(&mut self) -> Checkpoint {
        self.depth += 1;
        Checkpoint {
            depth: self.depth,
            journal_len: self.journal.len(),
            size: self.bytes.len(),
            table: self.handles.snapshot(),
        }
    }

    /// Revert content, size and handle table to the state at `checkpoint`. Handles registered
    /// since then stay uninitialized.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        debug_assert_eq!(checkpoint.depth, self.depth, "checkpoints closed out of order");
        log::debug!(
            "rolling back {} edits to {} bytes",
            self.journal.len() - checkpoint.journal_len,
            checkpoint.size
        );
        self.unwind(checkpoint.journal_len);
        debug_assert_eq!(self.bytes.len(), checkpoint.size);
        self.handles.restore(checkpoint.table);
        self.close(checkpoint.depth);
    }

    /// Keep every edit made since `checkpoint`.
    pub fn commit(&mut self, checkpoint: Checkpoint) {
        debug_assert_eq!(checkpoint.depth, self.depth, "checkpoints closed out of order");
        self.close(checkpoint.depth);
    }

    fn close(&mut self, depth: usize) {
        self.depth = depth.saturating_sub(1);
        if self.depth == 0 {
            self.journal.clear();
        }
    }

    /// Run `edit` atomically: its changes are kept when it succeeds and rolled back when it
    /// fails.
    pub fn atomically<T>(&mut self, edit: impl FnOnce(&mut Arena) -> CalcResult<T>) -> CalcResult<T> {
        let checkpoint = self.checkpoint();
        match edit(self) {
            Ok(value) => {
                self.commit(checkpoint);
                Ok(value)
            }
            Err(err) => {
                self.rollback(checkpoint);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CalcError;
    use crate::tree::arena::Arena;
    use crate::tree::owned::shapes::*;

    #[test]
    fn rollback_restores_bytes_and_handles() {
        let mut arena = Arena::new();
        let h = arena.push_tree(&add([sym("a"), sym("b")])).unwrap();
        let before = arena.bytes().to_vec();

        let cp = arena.checkpoint();
        let later = arena.push_tree(&int(7)).unwrap();
        arena.remove_bytes(0, 2);
        assert!(!arena.is_live(h));
        arena.rollback(cp);

        assert_eq!(arena.bytes(), &before[..]);
        assert_eq!(arena.resolve(h).unwrap(), 0);
        assert!(!arena.is_live(later));
        assert!(arena.is_well_formed());
    }

    #[test]
    fn nested_checkpoints() {
        let mut arena = Arena::new();
        arena.push(&sym("x")).unwrap();
        let outer = arena.checkpoint();
        arena.push(&sym("y")).unwrap();
        let inner = arena.checkpoint();
        arena.push(&sym("z")).unwrap();
        arena.commit(inner);
        assert_eq!(arena.tree_count(), 3);
        arena.rollback(outer);
        assert_eq!(arena.tree_count(), 1);
    }

    #[test]
    fn atomically_reverts_on_error() {
        let mut arena = Arena::with_capacity(8, 4);
        arena.push(&sym("x")).unwrap();
        let result: Result<(), _> = arena.atomically(|arena| {
            arena.push(&sym("y"))?;
            arena.push(&sym("z"))?;
            Ok(())
        });
        assert!(matches!(result, Err(CalcError::CapacityExceeded { .. })));
        assert_eq!(arena.size(), 3);
    }
}
