//! Transition guards.
//!
//! A guard is a condition or side effect a transition depends on: counter
//! updates and comparisons, zero-width iteration bookkeeping, capture updates
//! and conditional-group checks. Guards are appended to a log during descent;
//! static checks against the log prune impossible paths early, and
//! canonicalization turns the raw log into the list attached to a successor.

use regtrav_core::GroupNumber;

#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum GuardKind {
    CountSet1,
    CountInc,
    /// Placed where an iteration is left: the iteration, already counted, is
    /// one of the first `min`.
    CountLtMin,
    CountGeMin,
    CountLtMax,
    EnterZeroWidth,
    ExitZeroWidth,
    EscapeZeroWidth,
    UpdateCaptureGroup,
    CheckGroupMatched,
    CheckGroupNotMatched,
    UpdateRecursiveBackref,
}

impl GuardKind {
    pub fn from_bits(b: u8) -> Self {
        match b {
            0 => Self::CountSet1,
            1 => Self::CountInc,
            2 => Self::CountLtMin,
            3 => Self::CountGeMin,
            4 => Self::CountLtMax,
            5 => Self::EnterZeroWidth,
            6 => Self::ExitZeroWidth,
            7 => Self::EscapeZeroWidth,
            8 => Self::UpdateCaptureGroup,
            9 => Self::CheckGroupMatched,
            10 => Self::CheckGroupNotMatched,
            11 => Self::UpdateRecursiveBackref,
            _ => panic!("invalid guard kind: {b}"),
        }
    }

    pub fn to_bits(self) -> u8 {
        self as u8
    }

    pub fn is_counter_effect(self) -> bool {
        matches!(self, Self::CountSet1 | Self::CountInc)
    }

    pub fn is_counter_check(self) -> bool {
        matches!(self, Self::CountLtMin | Self::CountGeMin | Self::CountLtMax)
    }

    pub fn is_zero_width(self) -> bool {
        matches!(
            self,
            Self::EnterZeroWidth | Self::ExitZeroWidth | Self::EscapeZeroWidth
        )
    }

    pub fn is_group_check(self) -> bool {
        matches!(self, Self::CheckGroupMatched | Self::CheckGroupNotMatched)
    }
}

/// Packed guard.
///
/// Layout:
/// - Bits 0-31: operand (counter slot, zero-width slot, boundary or group)
/// - Bits 32-39: kind
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Guard(u64);

impl Guard {
    const KIND_SHIFT: u32 = 32;

    pub fn new(kind: GuardKind, operand: u32) -> Self {
        Self(u64::from(operand) | (u64::from(kind.to_bits()) << Self::KIND_SHIFT))
    }

    #[inline]
    pub fn kind(self) -> GuardKind {
        GuardKind::from_bits((self.0 >> Self::KIND_SHIFT) as u8)
    }

    #[inline]
    pub fn operand(self) -> u32 {
        self.0 as u32
    }

    pub fn count_set1(q: u32) -> Self {
        Self::new(GuardKind::CountSet1, q)
    }

    pub fn count_inc(q: u32) -> Self {
        Self::new(GuardKind::CountInc, q)
    }

    pub fn count_lt_min(q: u32) -> Self {
        Self::new(GuardKind::CountLtMin, q)
    }

    pub fn count_ge_min(q: u32) -> Self {
        Self::new(GuardKind::CountGeMin, q)
    }

    pub fn count_lt_max(q: u32) -> Self {
        Self::new(GuardKind::CountLtMax, q)
    }

    pub fn enter_zero_width(z: u32) -> Self {
        Self::new(GuardKind::EnterZeroWidth, z)
    }

    pub fn exit_zero_width(z: u32) -> Self {
        Self::new(GuardKind::ExitZeroWidth, z)
    }

    pub fn escape_zero_width(z: u32) -> Self {
        Self::new(GuardKind::EscapeZeroWidth, z)
    }

    pub fn update_capture_group(boundary: usize) -> Self {
        Self::new(GuardKind::UpdateCaptureGroup, boundary as u32)
    }

    pub fn check_group_matched(group: GroupNumber) -> Self {
        Self::new(GuardKind::CheckGroupMatched, u32::from(group))
    }

    pub fn check_group_not_matched(group: GroupNumber) -> Self {
        Self::new(GuardKind::CheckGroupNotMatched, u32::from(group))
    }

    pub fn update_recursive_backref(group: GroupNumber) -> Self {
        Self::new(GuardKind::UpdateRecursiveBackref, u32::from(group))
    }

    /// The same check with the opposite expectation.
    fn opposite_check(self) -> Option<Self> {
        match self.kind() {
            GuardKind::CheckGroupMatched => {
                Some(Self::new(GuardKind::CheckGroupNotMatched, self.operand()))
            }
            GuardKind::CheckGroupNotMatched => {
                Some(Self::new(GuardKind::CheckGroupMatched, self.operand()))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let n = self.operand();
        match self.kind() {
            GuardKind::CountSet1 => write!(f, "set1(q{n})"),
            GuardKind::CountInc => write!(f, "inc(q{n})"),
            GuardKind::CountLtMin => write!(f, "lt_min(q{n})"),
            GuardKind::CountGeMin => write!(f, "ge_min(q{n})"),
            GuardKind::CountLtMax => write!(f, "lt_max(q{n})"),
            GuardKind::EnterZeroWidth => write!(f, "enter_zw(z{n})"),
            GuardKind::ExitZeroWidth => write!(f, "exit_zw(z{n})"),
            GuardKind::EscapeZeroWidth => write!(f, "escape_zw(z{n})"),
            GuardKind::UpdateCaptureGroup => write!(f, "update_cg(b{n})"),
            GuardKind::CheckGroupMatched => write!(f, "matched(g{n})"),
            GuardKind::CheckGroupNotMatched => write!(f, "not_matched(g{n})"),
            GuardKind::UpdateRecursiveBackref => write!(f, "update_rb(g{n})"),
        }
    }
}

impl std::fmt::Debug for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

// ============================================================================
// Static checks
// ============================================================================

/// What the log proves about a counter.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum CounterValue {
    Exact(u32),
    /// No reset on the log; the counter is at least 1 plus the increments seen.
    AtLeast(u32),
}

/// Static verdict on a check.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Verdict {
    /// Always true on this path; the guard can be omitted.
    Holds,
    /// Never true on this path; the path is impossible.
    Fails,
    /// Must be checked at match time.
    Unknown,
}

/// State of a zero-width iteration at the point it is left.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Iteration {
    /// Started before this search; may have consumed input.
    Unknown,
    /// Started in this search, so nothing was consumed.
    Empty,
    /// Empty, but a capture boundary got a new value in it.
    EmptyCapturesChanged,
}

/// Append-only guard log with truncation.
#[derive(Debug, Default)]
pub struct GuardLog {
    guards: Vec<Guard>,
}

impl GuardLog {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn push(&mut self, guard: Guard) {
        self.guards.push(guard);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.guards.truncate(len);
    }

    pub fn clear(&mut self) {
        self.guards.clear();
    }

    pub fn as_slice(&self) -> &[Guard] {
        &self.guards
    }

    pub fn contains(&self, guard: Guard) -> bool {
        self.guards.contains(&guard)
    }

    /// Guards pushed since `from`.
    pub fn since(&self, from: usize) -> &[Guard] {
        &self.guards[from.min(self.guards.len())..]
    }

    pub fn counter_value(&self, q: u32) -> CounterValue {
        let mut incs = 0;
        for g in self.guards.iter().rev().filter(|g| g.operand() == q) {
            match g.kind() {
                GuardKind::CountInc => incs += 1,
                GuardKind::CountSet1 => return CounterValue::Exact(1 + incs),
                _ => {}
            }
        }
        CounterValue::AtLeast(1 + incs)
    }

    /// Evaluate a counter comparison against `bound` (the quantifier's min or max).
    ///
    /// `CountLtMax` and `CountGeMin` compare the completed iterations, before
    /// the next increment. `CountLtMin` compares the iteration being left,
    /// which the log already counts.
    pub fn check_counter(&self, kind: GuardKind, q: u32, bound: u32) -> Verdict {
        match (kind, self.counter_value(q)) {
            (GuardKind::CountLtMin, CounterValue::Exact(v)) => {
                if v <= bound {
                    Verdict::Holds
                } else {
                    Verdict::Fails
                }
            }
            (GuardKind::CountLtMin, CounterValue::AtLeast(v)) => {
                if v > bound {
                    Verdict::Fails
                } else {
                    Verdict::Unknown
                }
            }
            (GuardKind::CountLtMax, CounterValue::Exact(v)) => {
                if v < bound {
                    Verdict::Holds
                } else {
                    Verdict::Fails
                }
            }
            (GuardKind::CountLtMax, CounterValue::AtLeast(v)) => {
                if v >= bound {
                    Verdict::Fails
                } else {
                    Verdict::Unknown
                }
            }
            (GuardKind::CountGeMin, CounterValue::Exact(v)) => {
                if v >= bound {
                    Verdict::Holds
                } else {
                    Verdict::Fails
                }
            }
            (GuardKind::CountGeMin, CounterValue::AtLeast(v)) => {
                if v >= bound {
                    Verdict::Holds
                } else {
                    Verdict::Unknown
                }
            }
            (other, _) => panic!("not a counter check: {other:?}"),
        }
    }

    /// Compare a group check against earlier checks on the log.
    pub fn check_group(&self, guard: Guard) -> Verdict {
        if guard.opposite_check().is_some_and(|o| self.contains(o)) {
            return Verdict::Fails;
        }
        if self.contains(guard) {
            return Verdict::Holds;
        }
        Verdict::Unknown
    }

    /// Classify the current iteration of zero-width slot `z`.
    ///
    /// With `monitor_captures`, an empty iteration still counts as progress
    /// if it updated a boundary not already updated earlier in this search.
    pub fn iteration(&self, z: u32, monitor_captures: bool) -> Iteration {
        let Some(enter) = self
            .guards
            .iter()
            .rposition(|g| g.kind().is_zero_width() && g.operand() == z)
        else {
            return Iteration::Unknown;
        };
        if self.guards[enter].kind() != GuardKind::EnterZeroWidth {
            return Iteration::Unknown;
        }
        if !monitor_captures {
            return Iteration::Empty;
        }
        let (before, after) = self.guards.split_at(enter);
        let changed = after.iter().any(|g| {
            g.kind() == GuardKind::UpdateCaptureGroup && !before.contains(g)
        });
        if changed {
            Iteration::EmptyCapturesChanged
        } else {
            Iteration::Empty
        }
    }
}

// ============================================================================
// Canonicalization
// ============================================================================

/// Reduce a raw guard log to the list attached to a successor.
///
/// `left_loops` holds `(counter slot, log mark)` for every loop left through
/// its pass-through or escape on the current path. Counter effects recorded
/// before that mark are dead unless a later check of the same slot reads
/// them. `keep` is scratch space, reused across calls.
///
/// - counter effects of loops already left are dropped
/// - `EnterZeroWidth` followed by `EscapeZeroWidth` of the same slot cancel
/// - an `EnterZeroWidth` superseded by another of the same slot is dropped
/// - repeated group checks collapse
/// - capture-update guards survive only alongside a zero-width guard
pub fn canonicalize(
    raw: &[Guard],
    left_loops: &[(u32, u32)],
    keep: &mut Vec<bool>,
    out: &mut Vec<Guard>,
) {
    out.clear();
    keep.clear();
    keep.resize(raw.len(), true);

    for (i, g) in raw.iter().enumerate() {
        if !g.kind().is_counter_effect() {
            continue;
        }
        let q = g.operand();
        let Some(&(_, mark)) = left_loops
            .iter()
            .find(|&&(slot, mark)| slot == q && (i as u32) < mark)
        else {
            continue;
        };
        let read_later = raw[i + 1..mark as usize]
            .iter()
            .any(|c| c.kind().is_counter_check() && c.operand() == q);
        if !read_later {
            keep[i] = false;
        }
    }

    for i in 0..raw.len() {
        if !keep[i] || raw[i].kind() != GuardKind::EnterZeroWidth {
            continue;
        }
        let z = raw[i].operand();
        let next = (i + 1..raw.len())
            .find(|&j| keep[j] && raw[j].kind().is_zero_width() && raw[j].operand() == z);
        match next.map(|j| (j, raw[j].kind())) {
            Some((j, GuardKind::EscapeZeroWidth)) => {
                keep[i] = false;
                keep[j] = false;
            }
            Some((_, GuardKind::EnterZeroWidth)) => keep[i] = false,
            _ => {}
        }
    }

    for i in 0..raw.len() {
        if keep[i] && raw[i].kind().is_group_check() && raw[..i].contains(&raw[i]) {
            keep[i] = false;
        }
    }

    let zero_width = raw
        .iter()
        .zip(keep.iter())
        .any(|(g, &k)| k && g.kind().is_zero_width());
    out.extend(raw.iter().zip(keep.iter()).filter_map(|(&g, &k)| {
        let dropped = g.kind() == GuardKind::UpdateCaptureGroup && !zero_width;
        (k && !dropped).then_some(g)
    }));
}
