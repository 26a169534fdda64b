pub mod color;
pub mod event;
pub mod format;
pub mod param_field;
pub mod text_field;
pub mod value_mode;
pub mod volts;

pub use color::Rgba;
pub use event::{EventKind, FieldEvent};
pub use format::{FloatFormat, FormatError};
pub use param_field::{AutoHideMode, Normalization, ParamControl, ParamTextField, SaveOutcome};
pub use text_field::{FieldStyle, TextField, TextFieldState, TextType};
pub use value_mode::{DisplayKind, LinearMode, Span, ValueMode};

use ratatui::layout::Rect;

/// Compute a centered rectangle within `area`.
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect::new(x, y, w, h)
}
