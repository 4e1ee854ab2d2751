//! Capture-group boundary bookkeeping.

use regtrav_core::{BitSet, GroupNumber};

/// One capture side effect recorded on the path.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CaptureOp {
    /// Boundary set to the current position.
    Update(u32),
    /// Boundary reset to "unmatched" (loop re-entry).
    Clear(u32),
    /// Group closed, for flavors that expose the last matched group.
    LastGroup(GroupNumber),
}

#[derive(Debug, Default)]
pub struct CaptureLog {
    ops: Vec<CaptureOp>,
}

impl CaptureLog {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, op: CaptureOp) {
        self.ops.push(op);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.ops.truncate(len);
    }

    pub fn clear(&mut self) {
        self.ops.clear();
    }

    pub fn as_slice(&self) -> &[CaptureOp] {
        &self.ops
    }

    /// Latest state of `boundary` on the path: `Some(true)` if set,
    /// `Some(false)` if cleared, `None` if untouched.
    pub fn boundary_state(&self, boundary: usize) -> Option<bool> {
        let b = boundary as u32;
        self.ops.iter().rev().find_map(|op| match *op {
            CaptureOp::Update(x) if x == b => Some(true),
            CaptureOp::Clear(x) if x == b => Some(false),
            _ => None,
        })
    }
}

/// Net capture effect of a path.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Default)]
pub struct CaptureBoundaries {
    /// Boundaries set to the current position.
    pub updates: BitSet,
    /// Boundaries reset to unmatched.
    pub clears: BitSet,
    pub first_group: Option<GroupNumber>,
    pub last_group: Option<GroupNumber>,
}

impl CaptureBoundaries {
    pub fn new(boundary_count: usize) -> Self {
        Self {
            updates: BitSet::new(boundary_count),
            clears: BitSet::new(boundary_count),
            first_group: None,
            last_group: None,
        }
    }

    /// Recompute from a capture log. Later operations win.
    pub fn replay(&mut self, ops: &[CaptureOp]) {
        self.updates.clear();
        self.clears.clear();
        self.first_group = None;
        self.last_group = None;
        for op in ops {
            match *op {
                CaptureOp::Update(b) => {
                    self.updates.insert(b as usize);
                    self.clears.remove(b as usize);
                }
                CaptureOp::Clear(b) => {
                    self.clears.insert(b as usize);
                    self.updates.remove(b as usize);
                }
                CaptureOp::LastGroup(g) => {
                    self.first_group.get_or_insert(g);
                    self.last_group = Some(g);
                }
            }
        }
    }

    /// Copy restricted to the boundaries in `mask`.
    pub fn masked(&self, mask: &BitSet) -> Self {
        let mut out = self.clone();
        out.updates.intersect_with(mask);
        out.clears.intersect_with(mask);
        out
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.clears.is_empty() && self.last_group.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replay_later_ops_win() {
        let mut log = CaptureLog::new();
        log.push(CaptureOp::Update(2));
        log.push(CaptureOp::Clear(2));
        log.push(CaptureOp::Clear(3));
        log.push(CaptureOp::Update(3));
        log.push(CaptureOp::LastGroup(1));
        log.push(CaptureOp::LastGroup(2));

        let mut b = CaptureBoundaries::new(6);
        b.replay(log.as_slice());
        assert_eq!(b.updates.iter().collect::<Vec<_>>(), [3]);
        assert_eq!(b.clears.iter().collect::<Vec<_>>(), [2]);
        assert_eq!(b.first_group, Some(1));
        assert_eq!(b.last_group, Some(2));

        assert_eq!(log.boundary_state(2), Some(false));
        assert_eq!(log.boundary_state(3), Some(true));
        assert_eq!(log.boundary_state(4), None);

        log.truncate(1);
        b.replay(log.as_slice());
        assert_eq!(b.updates.iter().collect::<Vec<_>>(), [2]);
        assert!(b.clears.is_empty());
        assert_eq!(b.last_group, None);
    }

    #[test]
    fn masked_keeps_only_observable_bits() {
        let mut b = CaptureBoundaries::new(6);
        b.replay(&[CaptureOp::Update(0), CaptureOp::Update(3), CaptureOp::Clear(5)]);

        let mut mask = BitSet::new(6);
        mask.insert(2);
        mask.insert(3);
        let m = b.masked(&mask);
        assert_eq!(m.updates.iter().collect::<Vec<_>>(), [3]);
        assert!(m.clears.is_empty());
        assert!(!m.is_empty());
    }
}
