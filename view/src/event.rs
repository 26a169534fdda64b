/// Focus and action events a host delivers to its widgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The widget was clicked or tabbed into.
    Select,
    /// Another widget took the selection.
    Deselect,
    /// Enter was pressed.
    Action,
    /// Focus left the widget entirely.
    Defocus,
}

/// An event with a consumed flag so a widget can claim it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldEvent {
    pub kind: EventKind,
    consumed: bool,
}

impl FieldEvent {
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            consumed: false,
        }
    }

    pub fn consume(&mut self) {
        self.consumed = true;
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed
    }
}

impl From<EventKind> for FieldEvent {
    fn from(kind: EventKind) -> Self {
        Self::new(kind)
    }
}
