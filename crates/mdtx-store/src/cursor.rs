//! Forward-only cursor protocol.
//!
//! Database cursors are lazy finite sequences: not restartable, and they
//! must be explicitly closed even when a consumer aborts early. Close
//! failures are reported as query errors.

use crate::error::Result;

/// A forward-only stream of records from the store.
pub trait Cursor {
    type Item;

    /// Fetch the next record, or `None` when the cursor is exhausted.
    fn next(&mut self) -> Result<Option<Self::Item>>;

    /// Release the cursor's resources.
    fn close(self: Box<Self>) -> Result<()>;
}

/// Boxed cursor alias used across the store trait.
pub type BoxCursor<T> = Box<dyn Cursor<Item = T>>;

/// A cursor over an already-materialized result set.
///
/// The in-memory store snapshots matching records at query time; the driver
/// batch size has no effect on a materialized set, so it is not retained.
pub struct VecCursor<T> {
    items: std::vec::IntoIter<T>,
}

impl<T> VecCursor<T> {
    pub fn new(items: Vec<T>) -> Self {
        VecCursor {
            items: items.into_iter(),
        }
    }
}

impl<T> Cursor for VecCursor<T> {
    type Item = T;

    fn next(&mut self) -> Result<Option<T>> {
        Ok(self.items.next())
    }

    fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_cursor_drains_in_order() {
        let mut cursor = VecCursor::new(vec![1, 2, 3]);
        assert_eq!(cursor.next().unwrap(), Some(1));
        assert_eq!(cursor.next().unwrap(), Some(2));
        assert_eq!(cursor.next().unwrap(), Some(3));
        assert_eq!(cursor.next().unwrap(), None);
        // Exhausted cursors stay exhausted.
        assert_eq!(cursor.next().unwrap(), None);
    }

    #[test]
    fn test_vec_cursor_close_midway() {
        let mut cursor: BoxCursor<i32> = Box::new(VecCursor::new(vec![1, 2, 3]));
        assert_eq!(cursor.next().unwrap(), Some(1));
        assert!(cursor.close().is_ok());
    }
}
