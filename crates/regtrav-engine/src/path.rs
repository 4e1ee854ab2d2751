//! Path stack encoding.
//!
//! Each element records one step of the current descent. Elements are packed
//! into a `u64`; all access goes through typed accessors.
//!
//! Alongside every element the stack keeps a `Mark`: the guard and capture log
//! lengths at push time. Popping truncates both logs back to the mark.

use regtrav_core::NodeId;

/// What a path element did to its group.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Action {
    /// Not a group element.
    None,
    Enter,
    Exit,
    /// Left a quantified group through its pass-through alternative.
    PassThrough,
    /// Left a loop after a failed empty-iteration check.
    Escape,
}

impl Action {
    /// Decode from the action field.
    ///
    /// Layout: `0=None, 1=Enter, 2=Exit, 3=PassThrough, 4=Escape`.
    pub fn from_bits(b: u8) -> Self {
        match b {
            0 => Self::None,
            1 => Self::Enter,
            2 => Self::Exit,
            3 => Self::PassThrough,
            4 => Self::Escape,
            _ => panic!("invalid path action: {b}"),
        }
    }

    pub fn to_bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Enter => 1,
            Self::Exit => 2,
            Self::PassThrough => 3,
            Self::Escape => 4,
        }
    }
}

/// Packed path element.
///
/// Layout:
/// - Bits 0-31: node id
/// - Bits 32-47: alternative index
/// - Bits 48-55: action
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct PathElement(u64);

impl PathElement {
    const ALT_SHIFT: u32 = 32;
    const ACTION_SHIFT: u32 = 48;

    pub fn new(node: NodeId, action: Action, alt_index: u16) -> Self {
        Self(
            u64::from(node.0)
                | (u64::from(alt_index) << Self::ALT_SHIFT)
                | (u64::from(action.to_bits()) << Self::ACTION_SHIFT),
        )
    }

    /// Element for a non-group node.
    pub fn plain(node: NodeId) -> Self {
        Self::new(node, Action::None, 0)
    }

    #[inline]
    pub fn node(self) -> NodeId {
        NodeId(self.0 as u32)
    }

    #[inline]
    pub fn alt_index(self) -> u16 {
        (self.0 >> Self::ALT_SHIFT) as u16
    }

    #[inline]
    pub fn action(self) -> Action {
        Action::from_bits((self.0 >> Self::ACTION_SHIFT) as u8)
    }

    pub fn with_action(self, action: Action) -> Self {
        Self::new(self.node(), action, self.alt_index())
    }

    #[inline]
    pub fn is_group_action(self, node: NodeId, action: Action) -> bool {
        self.node() == node && self.action() == action
    }
}

impl std::fmt::Debug for PathElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.action() {
            Action::None => write!(f, "{}", self.node()),
            Action::Enter => write!(f, "Enter({}, {})", self.node(), self.alt_index()),
            Action::PassThrough => write!(f, "PassThrough({}, {})", self.node(), self.alt_index()),
            action => write!(f, "{action:?}({})", self.node()),
        }
    }
}

/// Log watermarks taken when an element is pushed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Mark {
    pub guards: u32,
    pub captures: u32,
}

/// Stack of path elements with per-element log marks.
#[derive(Debug, Default)]
pub struct Path {
    elements: Vec<PathElement>,
    marks: Vec<Mark>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: PathElement, mark: Mark) {
        self.elements.push(element);
        self.marks.push(mark);
    }

    pub fn pop(&mut self) -> Option<(PathElement, Mark)> {
        let element = self.elements.pop()?;
        let mark = self.marks.pop()?;
        Some((element, mark))
    }

    #[inline]
    pub fn top(&self) -> Option<PathElement> {
        self.elements.last().copied()
    }

    #[inline]
    pub fn top_mark(&self) -> Option<Mark> {
        self.marks.last().copied()
    }

    /// Rewrite the top element in place, keeping its mark.
    pub fn replace_top(&mut self, element: PathElement) {
        if let Some(top) = self.elements.last_mut() {
            *top = element;
        }
    }

    /// The element just below the top.
    pub fn below_top(&self) -> Option<PathElement> {
        let n = self.elements.len();
        (n >= 2).then(|| self.elements[n - 2])
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.marks.clear();
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = PathElement> + '_ {
        self.elements.iter().copied()
    }

    pub fn iter_marked(&self) -> impl DoubleEndedIterator<Item = (PathElement, Mark)> + '_ {
        self.elements.iter().copied().zip(self.marks.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_fields_round_trip() {
        let e = PathElement::new(NodeId(0xDEAD_BEEF), Action::PassThrough, 0xFFFF);
        assert_eq!(e.node(), NodeId(0xDEAD_BEEF));
        assert_eq!(e.alt_index(), 0xFFFF);
        assert_eq!(e.action(), Action::PassThrough);

        let exit = e.with_action(Action::Exit);
        assert_eq!(exit.node(), NodeId(0xDEAD_BEEF));
        assert_eq!(exit.alt_index(), 0xFFFF);
        assert_eq!(exit.action(), Action::Exit);
    }

    #[test]
    fn plain_element_has_no_action() {
        let e = PathElement::plain(NodeId(7));
        assert_eq!(e.action(), Action::None);
        assert_eq!(format!("{e:?}"), "#7");
    }

    #[test]
    fn element_debug() {
        assert_eq!(
            format!("{:?}", PathElement::new(NodeId(3), Action::Enter, 1)),
            "Enter(#3, 1)"
        );
        assert_eq!(
            format!("{:?}", PathElement::new(NodeId(3), Action::Escape, 0)),
            "Escape(#3)"
        );
    }

    #[test]
    #[should_panic(expected = "invalid path action")]
    fn invalid_action_bits() {
        Action::from_bits(9);
    }

    #[test]
    fn stack_keeps_marks() {
        let mut path = Path::new();
        path.push(PathElement::plain(NodeId(1)), Mark::default());
        path.push(
            PathElement::new(NodeId(2), Action::Enter, 0),
            Mark {
                guards: 3,
                captures: 1,
            },
        );
        assert_eq!(path.below_top(), Some(PathElement::plain(NodeId(1))));

        path.replace_top(PathElement::new(NodeId(2), Action::PassThrough, 0));
        let (top, mark) = path.pop().unwrap();
        assert_eq!(top.action(), Action::PassThrough);
        assert_eq!(mark.guards, 3);
        assert_eq!(path.len(), 1);
        assert_eq!(path.below_top(), None);
    }
}
