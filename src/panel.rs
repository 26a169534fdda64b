use std::cell::Cell;
use std::cmp::Ordering;
use std::path::Path;
use std::rc::Rc;

use serde::Deserialize;
use view::param_field::Translate;
use view::value_mode::{self, LinearMode, Span, ValueMode};
use view::{
    volts, AutoHideMode, EventKind, FieldEvent, FieldStyle, FloatFormat, ParamControl,
    ParamTextField, SaveOutcome, TextType,
};

use crate::config::StyleConfig;

/// Panel used when no panel file is given or the file does not exist.
pub const BUILTIN_PANEL: &str = r##"
[style]
background = "#1e1e1e"
text = "#d0d0d0"
border = "#606060"
border_width = 1

[[param]]
name = "Voltage"
min = -10.0
max = 10.0
default = 0.0
format = "%.2f"
text_type = "real"
max_length = 8

[[param]]
name = "Pattern"
min = -10.0
max = 10.0
default = 0.0
format = "%.0f"
text_type = "digits"
max_length = 2
translation = "pattern"

[[param]]
name = "Level"
min = 0.0
max = 1.0
default = 0.8
format = "%.1f"
text_type = "real"
max_length = 5
translation = "percent"

[[param]]
name = "Swing"
min = 0.0
max = 1.0
default = 0.0
format = "%.3f"
text_type = "real"
max_length = 6
auto_hide = true
"##;

#[derive(Debug, Deserialize)]
pub struct PanelConfig {
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default, rename = "param")]
    pub params: Vec<ParamConfig>,
    #[serde(default, rename = "mode")]
    pub modes: Vec<ModeConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ParamConfig {
    pub name: String,
    #[serde(default)]
    pub min: f32,
    #[serde(default = "default_max")]
    pub max: f32,
    pub default: Option<f32>,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub text_type: TextTypeName,
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    #[serde(default)]
    pub translation: Translation,
    #[serde(default)]
    pub auto_hide: bool,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTypeName {
    Any,
    Digits,
    #[default]
    Real,
    Alphanumeric,
}

impl From<TextTypeName> for TextType {
    fn from(name: TextTypeName) -> Self {
        match name {
            TextTypeName::Any => TextType::Any,
            TextTypeName::Digits => TextType::DigitsOnly,
            TextTypeName::Real => TextType::RealNumberOnly,
            TextTypeName::Alphanumeric => TextType::AlphaNumeric,
        }
    }
}

/// Named knob/text translation pairs a panel file can refer to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Translation {
    #[default]
    None,
    /// Knob 0..1 shown as 0..100.
    Percent,
    /// Knob volts shown as pattern number 1..64.
    Pattern,
}

impl Translation {
    fn functions(self) -> Option<(Translate, Translate)> {
        let pair: (Translate, Translate) = match self {
            Translation::None => return None,
            Translation::Percent => (knob_to_percent, percent_to_knob),
            Translation::Pattern => (knob_to_pattern, pattern_to_knob),
        };
        Some(pair)
    }
}

fn knob_to_percent(v: f32) -> f32 {
    v * 100.0
}

fn percent_to_knob(v: f32) -> f32 {
    v / 100.0
}

fn knob_to_pattern(v: f32) -> f32 {
    volts::volts_to_pattern(v) as f32
}

fn pattern_to_knob(v: f32) -> f32 {
    let pattern = v.round().clamp(1.0, volts::NUM_PATTERNS as f32) as i32;
    volts::pattern_to_volts(pattern - 1)
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    #[default]
    Linear,
    Note,
}

#[derive(Debug, Deserialize)]
pub struct ModeConfig {
    pub name: String,
    #[serde(default)]
    pub kind: ModeKind,
    #[serde(default = "default_voltage")]
    pub voltage: [f32; 2],
    pub display: Option<[f32; 2]>,
    pub output: Option<[f32; 2]>,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub round_display: f32,
    #[serde(default)]
    pub round_output: f32,
    #[serde(default)]
    pub whole_numbers_only: bool,
    #[serde(default)]
    pub zero_value: f32,
}

fn default_max() -> f32 {
    1.0
}

fn default_format() -> String {
    "%.2f".into()
}

fn default_max_length() -> usize {
    10
}

fn default_voltage() -> [f32; 2] {
    [volts::PATTERN_MIN_V, volts::PATTERN_MAX_V]
}

/// Read a panel file. A missing file falls back to [`BUILTIN_PANEL`].
pub fn load(path: Option<&str>) -> anyhow::Result<PanelConfig> {
    let content = match path {
        Some(p) if Path::new(p).exists() => std::fs::read_to_string(p)?,
        Some(p) => {
            log::warn!("Panel file '{}' not found, using built-in panel", p);
            BUILTIN_PANEL.to_string()
        }
        None => BUILTIN_PANEL.to_string(),
    };
    Ok(toml::from_str(&content)?)
}

/// A knob the panel owns. Fields hold only a weak reference to it.
#[derive(Debug)]
pub struct Knob {
    pub name: String,
    value: Cell<f32>,
    min: f32,
    max: f32,
}

impl Knob {
    pub fn new(name: impl Into<String>, min: f32, max: f32, value: f32) -> Self {
        Self {
            name: name.into(),
            value: Cell::new(value.clamp(min, max)),
            min,
            max,
        }
    }

    /// Move by `fraction` of the knob's range.
    pub fn nudge(&self, fraction: f32) {
        let v = self.value.get() + fraction * (self.max - self.min);
        self.value.set(v.clamp(self.min, self.max));
    }

    /// Position within the range, `0.0..=1.0`.
    pub fn ratio(&self) -> f64 {
        ((self.value.get() - self.min) / (self.max - self.min)).clamp(0.0, 1.0) as f64
    }
}

impl ParamControl for Knob {
    fn value(&self) -> f32 {
        self.value.get()
    }

    fn min_value(&self) -> f32 {
        self.min
    }

    fn max_value(&self) -> f32 {
        self.max
    }

    fn set_value(&self, value: f32) {
        self.value.set(value);
    }
}

pub struct Row {
    pub knob: Rc<Knob>,
    pub field: ParamTextField,
    pub automated: bool,
    phase: f32,
}

/// Knobs with their text fields, plus the value modes shown for the
/// selected knob.
pub struct Panel {
    pub rows: Vec<Row>,
    pub modes: Vec<ValueMode>,
    pub style: FieldStyle,
    selected: usize,
}

/// Sweep period of automated knobs in seconds.
const AUTOMATION_PERIOD: f32 = 8.0;

impl Panel {
    pub fn from_config(config: &PanelConfig) -> anyhow::Result<Self> {
        let style = config.style.to_field_style()?;

        let mut rows = Vec::with_capacity(config.params.len());
        for p in &config.params {
            if p.min.partial_cmp(&p.max) != Some(Ordering::Less) {
                anyhow::bail!("param '{}': min ({}) must be below max ({})", p.name, p.min, p.max);
            }
            let format = FloatFormat::parse(&p.format)
                .map_err(|e| anyhow::anyhow!("param '{}': {}", p.name, e))?;
            let knob = Rc::new(Knob::new(&p.name, p.min, p.max, p.default.unwrap_or(p.min)));
            let mut field = ParamTextField::new(p.text_type.into(), p.max_length, &knob, format)
                .with_style(style);
            if let Some((knob_to_text, text_to_knob)) = p.translation.functions() {
                field = field.with_translation(knob_to_text, text_to_knob);
            }
            if p.auto_hide {
                field = field.with_auto_hide(AutoHideMode::OnDefocus);
            }
            rows.push(Row {
                knob,
                field,
                automated: false,
                phase: 0.0,
            });
        }

        let mut modes = value_mode::builtin_modes();
        for m in &config.modes {
            modes.push(build_mode(m)?);
        }

        let mut panel = Self {
            rows,
            modes,
            style,
            selected: 0,
        };
        panel.step();
        log::info!(
            "Panel ready: {} params, {} modes",
            panel.rows.len(),
            panel.modes.len()
        );
        Ok(panel)
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_row(&self) -> Option<&Row> {
        self.rows.get(self.selected)
    }

    /// Whether the selected field is taking key input.
    pub fn is_editing(&self) -> bool {
        self.selected_row().is_some_and(|r| r.field.is_editing())
    }

    /// Move the selection to `ix`. An edit in progress on the old row is saved.
    pub fn select_row(&mut self, ix: usize) {
        if ix >= self.rows.len() || ix == self.selected {
            return;
        }
        self.deselect();
        self.selected = ix;
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.select_row(self.selected + 1);
        }
    }

    pub fn select_prev(&mut self) {
        if self.selected > 0 {
            self.select_row(self.selected - 1);
        }
    }

    /// Start editing the selected field. A hidden field is shown first.
    pub fn begin_edit(&mut self) {
        let Some(row) = self.rows.get_mut(self.selected) else {
            return;
        };
        row.field.set_visible(true);
        row.field.handle_event(&mut EventKind::Select.into());
    }

    /// Enter: start editing, or commit while editing.
    pub fn action(&mut self) -> Option<SaveOutcome> {
        if !self.is_editing() {
            self.begin_edit();
            return None;
        }
        let row = self.rows.get_mut(self.selected)?;
        let outcome = row.field.handle_event(&mut EventKind::Action.into());
        log_outcome(&row.knob.name, outcome.as_ref());
        outcome
    }

    /// Stop editing the selected field and save it.
    pub fn deselect(&mut self) -> Option<SaveOutcome> {
        self.send_focus(EventKind::Deselect)
    }

    /// Focus left the panel.
    pub fn defocus(&mut self) -> Option<SaveOutcome> {
        self.send_focus(EventKind::Defocus)
    }

    fn send_focus(&mut self, kind: EventKind) -> Option<SaveOutcome> {
        if !self.is_editing() {
            return None;
        }
        let row = self.rows.get_mut(self.selected)?;
        let outcome = row.field.handle_event(&mut FieldEvent::from(kind));
        log_outcome(&row.knob.name, outcome.as_ref());
        outcome
    }

    /// Key input for the field being edited.
    pub fn edit(&mut self, input: EditKey) {
        if !self.is_editing() {
            return;
        }
        let Some(row) = self.rows.get_mut(self.selected) else {
            return;
        };
        let field = row.field.field_mut();
        match input {
            EditKey::Char(c) => field.insert(c),
            EditKey::Backspace => field.backspace(),
            EditKey::Delete => field.delete(),
            EditKey::Left { extend } => field.move_left(extend),
            EditKey::Right { extend } => field.move_right(extend),
            EditKey::Home { extend } => field.home(extend),
            EditKey::End { extend } => field.end(extend),
        }
    }

    /// Click at `column` of the text area of row `ix`, `avail_width` wide.
    pub fn click(&mut self, ix: usize, column: u16, avail_width: u16) {
        self.select_row(ix);
        if !self.is_editing() {
            self.begin_edit();
        }
        if let Some(row) = self.rows.get_mut(self.selected) {
            let pos = row.field.field().position_at(column, avail_width, true);
            row.field.field_mut().set_cursor(pos);
        }
    }

    /// Turn the selected knob by `fraction` of its range.
    pub fn nudge(&mut self, fraction: f32) {
        if let Some(row) = self.rows.get(self.selected) {
            row.knob.nudge(fraction);
        }
    }

    pub fn toggle_automation(&mut self) {
        if let Some(row) = self.rows.get_mut(self.selected) {
            row.automated = !row.automated;
            log::info!(
                "Automation {} for '{}'",
                if row.automated { "on" } else { "off" },
                row.knob.name
            );
        }
    }

    /// Advance automated knobs by `dt` seconds.
    pub fn tick(&mut self, dt: f32) {
        for row in self.rows.iter_mut().filter(|r| r.automated) {
            row.phase = (row.phase + dt / AUTOMATION_PERIOD).fract();
            let s = 0.5 - 0.5 * (row.phase * std::f32::consts::TAU).cos();
            let (min, max) = (row.knob.min_value(), row.knob.max_value());
            row.knob.set_value(min + s * (max - min));
        }
    }

    /// Sync every field with its knob. Returns how many fields changed.
    pub fn step(&mut self) -> usize {
        self.rows
            .iter_mut()
            .map(|r| r.field.step())
            .filter(|&changed| changed)
            .count()
    }

    /// Display string and output value of every mode for the selected knob.
    pub fn mode_readout(&self) -> Vec<ModeReadout> {
        let Some(row) = self.selected_row() else {
            return Vec::new();
        };
        readout(&self.modes, row.knob.value())
    }
}

/// Key presses a field understands while editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Char(char),
    Backspace,
    Delete,
    Left { extend: bool },
    Right { extend: bool },
    Home { extend: bool },
    End { extend: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModeReadout {
    pub name: String,
    pub display: String,
    pub output: f32,
}

pub fn readout(modes: &[ValueMode], volts: f32) -> Vec<ModeReadout> {
    modes
        .iter()
        .map(|m| ModeReadout {
            name: m.name.clone(),
            display: m.display_string(volts),
            output: m.output_value(volts),
        })
        .collect()
}

fn build_mode(m: &ModeConfig) -> anyhow::Result<ValueMode> {
    let voltage = span(&m.name, "voltage", m.voltage)?;
    match m.kind {
        ModeKind::Note => Ok(ValueMode::note(&m.name, voltage.min, voltage.max)),
        ModeKind::Linear => {
            let format = FloatFormat::parse(&m.format)
                .map_err(|e| anyhow::anyhow!("mode '{}': {}", m.name, e))?;
            Ok(ValueMode::linear(LinearMode {
                name: m.name.clone(),
                voltage,
                display: m
                    .display
                    .map(|r| span(&m.name, "display", r))
                    .transpose()?
                    .unwrap_or(voltage),
                output: m
                    .output
                    .map(|r| span(&m.name, "output", r))
                    .transpose()?
                    .unwrap_or(voltage),
                whole_numbers_only: m.whole_numbers_only,
                zero_point_angle: volts::ANGLE_STRAIGHT_UP,
                format,
                round_display: m.round_display,
                round_output: m.round_output,
                zero_value: m.zero_value,
            }))
        }
    }
}

fn span(mode: &str, which: &str, [min, max]: [f32; 2]) -> anyhow::Result<Span> {
    if min.partial_cmp(&max) != Some(Ordering::Less) {
        anyhow::bail!("mode '{}': {} range [{}, {}] is empty", mode, which, min, max);
    }
    Ok(Span::new(min, max))
}

fn log_outcome(name: &str, outcome: Option<&SaveOutcome>) {
    match outcome {
        Some(o) => log::debug!(
            "'{}' saved {} as {:?} ({:?})",
            name,
            o.value,
            o.text,
            o.normalization
        ),
        None => log::warn!("'{}' has no control to save to", name),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use view::Normalization;

    use super::*;

    fn builtin() -> Panel {
        Panel::from_config(&load(None).unwrap()).unwrap()
    }

    fn panel_file(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    fn type_text(panel: &mut Panel, text: &str) {
        for c in text.chars() {
            panel.edit(EditKey::Char(c));
        }
    }

    #[test]
    fn builtin_panel_loads() {
        let panel = builtin();
        assert_eq!(panel.rows.len(), 4);
        assert_eq!(panel.rows[0].field.text(), "0.00");
        // 0 V is pattern 33.
        assert_eq!(panel.rows[1].field.text(), "33");
        assert_eq!(panel.rows[2].field.text(), "80.0");
        let names: Vec<_> = panel.modes.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["VOLT", "NOTE", "PATT"]);
    }

    #[test]
    fn missing_file_uses_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let config = load(path.to_str()).unwrap();
        assert_eq!(config.params.len(), 4);
    }

    #[test]
    fn load_from_file() {
        let f = panel_file(
            r##"
[style]
background = "#000000"
border_width = 0

[[param]]
name = "Cutoff"
min = 20.0
max = 20000.0
default = 440.0
format = "%.0f"
text_type = "digits"
max_length = 5

[[mode]]
name = "SEMI"
kind = "linear"
voltage = [-10.0, 10.0]
output = [-24.0, 24.0]
format = "%+.0f"
round_output = 1.0

[[mode]]
name = "KEY"
kind = "note"
"##,
        );
        let panel = Panel::from_config(&load(f.path().to_str()).unwrap()).unwrap();
        assert_eq!(panel.style.border_width, 0);
        assert_eq!(panel.rows[0].field.text(), "440");
        assert_eq!(panel.modes.len(), 5);
        let semi = &panel.modes[3];
        assert_eq!(semi.output_value(5.0), 12.0);
        assert_eq!(semi.display_string(5.0), "+5");
        assert_eq!(panel.modes[4].display_string(0.0), "C4");
    }

    #[test]
    fn unknown_translation_is_an_error() {
        let f = panel_file(
            r#"
[[param]]
name = "X"
translation = "decibels"
"#,
        );
        assert!(load(f.path().to_str()).is_err());
    }

    #[test]
    fn empty_range_is_an_error() {
        let f = panel_file(
            r#"
[[param]]
name = "X"
min = 1.0
max = 1.0
"#,
        );
        let err = Panel::from_config(&load(f.path().to_str()).unwrap())
            .err()
            .unwrap();
        assert!(err.to_string().contains("min"), "{err}");
    }

    #[test]
    fn bad_format_is_an_error() {
        let f = panel_file(
            r#"
[[param]]
name = "X"
format = "%s"
"#,
        );
        assert!(Panel::from_config(&load(f.path().to_str()).unwrap()).is_err());

        let f = panel_file(
            r#"
[[mode]]
name = "M"
format = "no conversion"
"#,
        );
        assert!(Panel::from_config(&load(f.path().to_str()).unwrap()).is_err());

        let f = panel_file(
            r#"
[[param]]
name = "X"
format = "%99999999999999999999f"
"#,
        );
        assert!(Panel::from_config(&load(f.path().to_str()).unwrap()).is_err());
    }

    #[test]
    fn edit_and_deselect_writes_knob() {
        let mut panel = builtin();
        panel.action();
        assert!(panel.is_editing());
        type_text(&mut panel, "-3.5");
        let outcome = panel.deselect().unwrap();
        assert_eq!(outcome.normalization, Normalization::Accepted);
        assert_eq!(panel.rows[0].knob.value(), -3.5);
        assert_eq!(panel.rows[0].field.text(), "-3.50");
        assert!(!panel.is_editing());
    }

    #[test]
    fn enter_commits_and_keeps_editing() {
        let mut panel = builtin();
        panel.action();
        type_text(&mut panel, "99");
        let outcome = panel.action().unwrap();
        assert_eq!(outcome.normalization, Normalization::ClampedToMax);
        assert_eq!(panel.rows[0].knob.value(), 10.0);
        assert!(panel.is_editing());
        // Everything is selected, so typing replaces the text.
        type_text(&mut panel, "1");
        assert_eq!(panel.rows[0].field.text(), "1");
    }

    #[test]
    fn moving_selection_saves_edit() {
        let mut panel = builtin();
        panel.action();
        type_text(&mut panel, "2");
        panel.select_next();
        assert_eq!(panel.selected(), 1);
        assert_eq!(panel.rows[0].knob.value(), 2.0);
        assert!(!panel.is_editing());
    }

    #[test]
    fn pattern_field_writes_pattern_voltage() {
        let mut panel = builtin();
        panel.select_row(1);
        panel.action();
        type_text(&mut panel, "64");
        panel.deselect();
        assert!((panel.rows[1].knob.value() - 10.0).abs() < 1e-5);
        assert_eq!(panel.rows[1].field.text(), "64");
    }

    #[test]
    fn pattern_text_outside_pattern_range() {
        assert_eq!(pattern_to_knob(-3.0e9), volts::PATTERN_MIN_V);
        assert_eq!(pattern_to_knob(3.0e9), volts::PATTERN_MAX_V);
        assert_eq!(pattern_to_knob(0.0), volts::PATTERN_MIN_V);

        let f = panel_file(
            r#"
[[param]]
name = "Pattern"
min = -10.0
max = 10.0
format = "%.0f"
max_length = 12
translation = "pattern"
"#,
        );
        let mut panel = Panel::from_config(&load(f.path().to_str()).unwrap()).unwrap();
        panel.action();
        type_text(&mut panel, "-3000000000");
        let outcome = panel.deselect().unwrap();
        assert_eq!(panel.rows[0].knob.value(), volts::PATTERN_MIN_V);
        assert_eq!(outcome.text, "1");
    }

    #[test]
    fn percent_field() {
        let mut panel = builtin();
        panel.select_row(2);
        panel.action();
        type_text(&mut panel, "25");
        panel.deselect();
        assert!((panel.rows[2].knob.value() - 0.25).abs() < 1e-6);
        assert_eq!(panel.rows[2].field.text(), "25.0");
    }

    #[test]
    fn nudge_shows_up_after_step() {
        let mut panel = builtin();
        panel.nudge(0.05);
        assert_eq!(panel.rows[0].field.text(), "0.00");
        assert_eq!(panel.step(), 1);
        assert_eq!(panel.rows[0].field.text(), "1.00");
        assert_eq!(panel.step(), 0);
    }

    #[test]
    fn step_leaves_edited_text_alone() {
        let mut panel = builtin();
        panel.action();
        type_text(&mut panel, "7");
        panel.nudge(0.05);
        panel.step();
        assert_eq!(panel.rows[0].field.text(), "7");
    }

    #[test]
    fn automation_sweeps_knob() {
        let mut panel = builtin();
        panel.toggle_automation();
        panel.tick(AUTOMATION_PERIOD / 2.0);
        assert!((panel.rows[0].knob.value() - 10.0).abs() < 1e-3);
        assert_eq!(panel.step(), 1);
        assert_eq!(panel.rows[0].field.text(), "10.00");
        panel.toggle_automation();
        panel.tick(1.0);
        assert!((panel.rows[0].knob.value() - 10.0).abs() < 1e-3);
    }

    #[test]
    fn auto_hide_field_reappears_on_edit() {
        let mut panel = builtin();
        panel.select_row(3);
        panel.action();
        panel.deselect();
        assert!(!panel.rows[3].field.is_visible());
        panel.action();
        assert!(panel.rows[3].field.is_visible());
        assert!(panel.is_editing());
    }

    #[test]
    fn click_places_cursor() {
        let mut panel = builtin();
        panel.click(0, 1, 10);
        assert!(panel.is_editing());
        assert_eq!(panel.rows[0].field.field().cursor(), 1);
    }

    #[test]
    fn readout_lists_modes() {
        let panel = builtin();
        let r = panel.mode_readout();
        assert_eq!(r.len(), 3);
        assert_eq!(r[0].display, "00.0");
        assert_eq!(r[1].display, "C4");
        assert_eq!(r[2].display, "32");
        assert_eq!(r[2].output, 0.0);
    }
}
