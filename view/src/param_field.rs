//! Text field bound to a parameter control.
//!
//! [`ParamTextField`] shows a control's value through a printf-style format
//! and writes edits back when the field loses focus or Enter is pressed. The
//! host calls [`ParamTextField::step`] once per frame so that changes made
//! elsewhere (automation, a knob drag) show up in the text.
//!
//! The field keeps a [`Weak`] handle to the control: the host owns controls,
//! and a field whose control is gone simply stops syncing.

use std::rc::{Rc, Weak};

use crate::event::{EventKind, FieldEvent};
use crate::format::FloatFormat;
use crate::text_field::{FieldStyle, TextField, TextFieldState, TextType};

/// A numeric control a field can mirror.
///
/// Methods take `&self`; implementors use interior mutability since the
/// field and the host share the control on one thread.
pub trait ParamControl {
    fn value(&self) -> f32;
    fn min_value(&self) -> f32;
    fn max_value(&self) -> f32;
    fn set_value(&self, value: f32);
}

/// Translation between control value and displayed number.
pub type Translate = fn(f32) -> f32;

/// What [`ParamTextField::save_value`] had to do to the typed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Parsed and in range.
    Accepted,
    /// Empty text, treated as zero.
    Defaulted,
    ClampedToMin,
    ClampedToMax,
    /// No number could be read; the control kept its value.
    Rejected,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    /// Value the control holds after the save.
    pub value: f32,
    /// Text now shown in the field.
    pub text: String,
    pub normalization: Normalization,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AutoHideMode {
    #[default]
    Off,
    /// Hide the field when it loses focus.
    OnDefocus,
}

pub struct ParamTextField {
    field: TextFieldState,
    control: Weak<dyn ParamControl>,
    format: FloatFormat,
    knob_to_text: Option<Translate>,
    text_to_knob: Option<Translate>,
    editing: bool,
    last_control_value: Option<f32>,
    auto_hide: AutoHideMode,
    visible: bool,
    style: FieldStyle,
}

impl ParamTextField {
    pub fn new<C: ParamControl + 'static>(
        text_type: TextType,
        max_length: usize,
        control: &Rc<C>,
        format: FloatFormat,
    ) -> Self {
        let control: Weak<C> = Rc::downgrade(control);
        let control: Weak<dyn ParamControl> = control;
        Self {
            field: TextFieldState::new(text_type, max_length),
            control,
            format,
            knob_to_text: None,
            text_to_knob: None,
            editing: false,
            last_control_value: None,
            auto_hide: AutoHideMode::Off,
            visible: true,
            style: FieldStyle::default(),
        }
    }

    /// Set both translation functions.
    pub fn with_translation(mut self, knob_to_text: Translate, text_to_knob: Translate) -> Self {
        self.knob_to_text = Some(knob_to_text);
        self.text_to_knob = Some(text_to_knob);
        self
    }

    pub fn with_auto_hide(mut self, mode: AutoHideMode) -> Self {
        self.auto_hide = mode;
        self
    }

    pub fn with_style(mut self, style: FieldStyle) -> Self {
        self.style = style;
        self
    }

    pub fn field(&self) -> &TextFieldState {
        &self.field
    }

    /// Direct access for key handling while editing.
    pub fn field_mut(&mut self) -> &mut TextFieldState {
        &mut self.field
    }

    pub fn text(&self) -> &str {
        self.field.text()
    }

    pub fn format(&self) -> &FloatFormat {
        &self.format
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn last_control_value(&self) -> Option<f32> {
        self.last_control_value
    }

    /// Whether the control this field was bound to still exists.
    pub fn is_bound(&self) -> bool {
        self.control.strong_count() > 0
    }

    /// Whether the current text would be accepted by [`save_value`](Self::save_value).
    pub fn is_valid(&self) -> bool {
        let text = self.field.text().trim();
        text.is_empty() || parse_leading_float(text).is_some_and(f32::is_finite)
    }

    /// Widget that draws this field.
    pub fn widget(&self, focused: bool) -> TextField<'_> {
        TextField::new(&self.field)
            .style(self.style)
            .focused(focused)
            .visible(self.visible)
    }

    /// Write the typed value to the control and reformat the text.
    ///
    /// Empty text counts as zero and out-of-range values are clamped. Text
    /// with no readable number leaves the control alone. Either way the text
    /// ends up showing the value the control holds. Returns `None` when the
    /// control no longer exists.
    pub fn save_value(&mut self) -> Option<SaveOutcome> {
        let control = self.control.upgrade()?;
        let (min, max) = (control.min_value(), control.max_value());

        let text = self.field.text().trim();
        let (parsed, mut normalization) = if text.is_empty() {
            (Some(0.0), Normalization::Defaulted)
        } else {
            (
                parse_leading_float(text).filter(|v| v.is_finite()),
                Normalization::Accepted,
            )
        };

        let knob = parsed
            .map(|v| self.text_to_knob.map_or(v, |f| f(v)))
            .filter(|v| !v.is_nan());
        let value = match knob {
            Some(mut v) => {
                if v < min {
                    v = min;
                    normalization = Normalization::ClampedToMin;
                } else if v > max {
                    v = max;
                    normalization = Normalization::ClampedToMax;
                }
                control.set_value(v);
                v
            }
            None => {
                log::warn!("ignoring unreadable value {:?}", self.field.text());
                normalization = Normalization::Rejected;
                control.value()
            }
        };

        self.last_control_value = Some(value);
        let text = self.format_knob_value(value);
        self.field.set_text(&text);
        Some(SaveOutcome {
            value,
            text: self.field.text().to_string(),
            normalization,
        })
    }

    /// Sync the text with the control. Call once per frame.
    ///
    /// Does nothing while the user is editing. Returns true when the text
    /// was rewritten.
    pub fn step(&mut self) -> bool {
        if self.editing {
            return false;
        }
        let Some(control) = self.control.upgrade() else {
            return false;
        };
        let value = control.value();
        if self.last_control_value == Some(value) {
            return false;
        }
        let text = self.format_knob_value(value);
        self.field.set_text(&text);
        self.last_control_value = Some(value);
        true
    }

    /// Show `value` (in text units) without touching the control.
    ///
    /// If the value would land outside the control's range, the nearest
    /// bound is shown instead.
    pub fn set_text_value(&mut self, value: f32) {
        let mut value = value;
        if let Some(control) = self.control.upgrade() {
            let knob = self.text_to_knob.map_or(value, |f| f(value));
            let (min, max) = (control.min_value(), control.max_value());
            if knob < min {
                value = self.knob_to_text.map_or(min, |f| f(min));
            } else if knob > max {
                value = self.knob_to_text.map_or(max, |f| f(max));
            }
        }
        let text = self.format.format_bounded(value);
        self.field.set_text(&text);
    }

    pub fn set_text(&mut self, text: &str) {
        self.field.set_text(text);
    }

    /// React to a focus event. Returns the save result for events that save.
    pub fn handle_event(&mut self, event: &mut FieldEvent) -> Option<SaveOutcome> {
        match event.kind {
            EventKind::Select => {
                if self.visible && !event.is_consumed() {
                    event.consume();
                    self.editing = true;
                    self.field.select_all();
                    log::debug!(
                        "select: cursor = {}, selection = {}",
                        self.field.cursor(),
                        self.field.selection()
                    );
                }
                None
            }
            EventKind::Deselect | EventKind::Defocus => {
                let outcome = self.save_value();
                if self.auto_hide == AutoHideMode::OnDefocus {
                    self.visible = false;
                }
                self.editing = false;
                event.consume();
                outcome
            }
            EventKind::Action => {
                if !self.visible {
                    return None;
                }
                event.consume();
                let outcome = self.save_value();
                self.field.select_all();
                outcome
            }
        }
    }

    fn format_knob_value(&self, value: f32) -> String {
        let shown = self.knob_to_text.map_or(value, |f| f(value));
        self.format.format_bounded(shown)
    }
}

/// Parse the longest numeric prefix of `text`, like C's `strtof`.
///
/// Leading whitespace is skipped. Returns `None` when no digits are found.
pub fn parse_leading_float(text: &str) -> Option<f32> {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        end += 1;
        let frac_start = end;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
        digits += end - frac_start;
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse().ok()
}
