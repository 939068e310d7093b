//! Realizing cursor over a collection or view.

use crate::collection::{Shared, Step};
use crate::entry::EntryId;
use crate::error::CollectionError;
use crate::filter::ChainRef;
use std::rc::Rc;

/// Forward cursor over a collection or view that realizes pending entries
/// one at a time.
///
/// Already realized entries come first, then pending entries in registration
/// order as they get realized. Elements added while the cursor is live,
/// including by listeners it triggers, are visited by the same traversal.
///
/// A provider failure is yielded once as `Err` and that entry is skipped for
/// the rest of the traversal; it stays pending in the collection.
pub struct Iter<T> {
    shared: Rc<Shared<T>>,
    chain: ChainRef<T>,
    next: usize,
    last: Option<EntryId>,
    /// Last pending entry this traversal looked at.
    scanned: Option<EntryId>,
}

impl<T: Clone + PartialEq + 'static> Iter<T> {
    pub(crate) fn new(shared: Rc<Shared<T>>, chain: ChainRef<T>) -> Self {
        Self {
            shared,
            chain,
            next: 0,
            last: None,
            scanned: None,
        }
    }

    /// Removes the element returned by the last call to `next`.
    ///
    /// Same as removing it from the collection directly, including the
    /// `when_object_removed` notification. Returns false if there is no such
    /// element or it is gone already.
    pub fn remove(&mut self) -> bool {
        let Some(id) = self.last.take() else {
            return false;
        };
        match self.shared.remove_entry(id) {
            Some(index) => {
                if index < self.next {
                    self.next -= 1;
                }
                true
            }
            None => false,
        }
    }
}

impl<T: Clone + PartialEq + 'static> Iterator for Iter<T> {
    type Item = Result<T, CollectionError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let current = self
                .shared
                .entries
                .borrow()
                .realized_at(self.next)
                .map(|entry| (entry.id, entry.value.clone()));
            if let Some((id, value)) = current {
                self.next += 1;
                if self.chain.accepts(&value) {
                    self.last = Some(id);
                    return Some(Ok(value));
                }
                continue;
            }

            // Realized values land at the end of the realized sequence, where
            // the next pass picks them up.
            match self.shared.realize_next(&self.chain, &mut self.scanned) {
                Ok(Step::Exhausted) => return None,
                Ok(Step::Realized(_)) | Ok(Step::Discarded) => {}
                Err(error) => {
                    self.last = None;
                    return Some(Err(error));
                }
            }
        }
    }
}
