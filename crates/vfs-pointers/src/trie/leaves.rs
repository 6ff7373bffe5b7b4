//! Pointer registrations attached to one trie node.

use thin_vec::ThinVec;

use crate::pointer::PointerId;

/// Zero, one or many pointer ids.
///
/// Almost every node carries at most one pointer, so the single case is kept
/// inline and only shared paths pay for a vector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Leaves {
    #[default]
    Empty,
    Single(PointerId),
    Multi(ThinVec<PointerId>),
}

impl Leaves {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Single(_) => 1,
            Self::Multi(ids) => ids.len(),
        }
    }

    pub fn contains(&self, id: PointerId) -> bool {
        self.iter().any(|leaf| leaf == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = PointerId> + '_ {
        let slice: &[PointerId] = match self {
            Self::Empty => &[],
            Self::Single(id) => std::slice::from_ref(id),
            Self::Multi(ids) => ids,
        };
        slice.iter().copied()
    }

    /// Attaches `id`; attaching an id twice is a no-op.
    pub fn add(&mut self, id: PointerId) {
        if self.contains(id) {
            return;
        }
        *self = match std::mem::take(self) {
            Self::Empty => Self::Single(id),
            Self::Single(existing) => {
                let mut ids = ThinVec::with_capacity(2);
                ids.push(existing);
                ids.push(id);
                Self::Multi(ids)
            }
            Self::Multi(mut ids) => {
                ids.push(id);
                Self::Multi(ids)
            }
        };
    }

    /// Detaches `id`, returning how many pointers remain.
    pub fn remove(&mut self, id: PointerId) -> usize {
        *self = match std::mem::take(self) {
            Self::Single(existing) if existing == id => Self::Empty,
            Self::Multi(mut ids) => {
                ids.retain(|leaf| *leaf != id);
                match ids.len() {
                    0 => Self::Empty,
                    1 => Self::Single(ids[0]),
                    _ => Self::Multi(ids),
                }
            }
            other => other,
        };
        self.len()
    }
}
