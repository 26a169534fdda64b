//! Sequencer value modes.
//!
//! A [`ValueMode`] describes how a knob voltage is shown to the user and what
//! voltage the sequencer emits for it. Display uses round-down and output uses
//! round-to-nearest; the two are kept apart on purpose because output values
//! feed the synth directly.

use std::f32::consts::PI;

use crate::format::FloatFormat;
use crate::volts::{self, NUM_NOTES, NUM_OCTAVES, ZERO_OCTAVE};

/// How the display string is produced.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayKind {
    /// Rescale into the display range and format the number.
    Formatted(FloatFormat),
    /// Show the note name and octave of the raw voltage.
    NoteName,
}

/// A closed interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueMode {
    pub name: String,
    pub voltage: Span,
    pub display: Span,
    pub output: Span,
    pub whole_numbers_only: bool,
    /// Knob angle that represents the zero value.
    pub zero_point_angle: f32,
    pub zero_value: f32,
    /// Display granularity, rounded down. `0` disables.
    pub round_display: f32,
    /// Output granularity, rounded to nearest. `0` disables.
    pub round_output: f32,
    pub kind: DisplayKind,
    needs_translation_display: bool,
    needs_translation_output: bool,
}

/// Builder-style parameters for [`ValueMode::linear`].
#[derive(Debug, Clone)]
pub struct LinearMode {
    pub name: String,
    pub voltage: Span,
    pub display: Span,
    pub output: Span,
    pub whole_numbers_only: bool,
    pub zero_point_angle: f32,
    pub format: FloatFormat,
    pub round_display: f32,
    pub round_output: f32,
    pub zero_value: f32,
}

impl ValueMode {
    pub fn linear(m: LinearMode) -> Self {
        Self::build(
            m.name,
            m.voltage,
            m.display,
            m.output,
            m.whole_numbers_only,
            m.zero_point_angle,
            m.zero_value,
            m.round_display,
            m.round_output,
            DisplayKind::Formatted(m.format),
        )
    }

    /// Note mode: shows `"C#4"`-style labels and emits 1 V/oct output
    /// quantized to semitones.
    pub fn note(name: impl Into<String>, min_v: f32, max_v: f32) -> Self {
        let octave_span = Span::new(-ZERO_OCTAVE as f32, (NUM_OCTAVES - ZERO_OCTAVE) as f32);
        // The knob sweeps 0.67π..2.33π, so zero sits 4/10 of the way round.
        let zero_point_angle =
            0.67 * PI + ZERO_OCTAVE as f32 * 1.67 * PI / NUM_OCTAVES as f32;
        let zero_value = volts::rescale(0.0, octave_span.min, octave_span.max, min_v, max_v);
        let semitone = 1.0 / NUM_NOTES as f32;
        Self::build(
            name.into(),
            Span::new(min_v, max_v),
            octave_span,
            octave_span,
            false,
            zero_point_angle,
            zero_value,
            semitone,
            semitone,
            DisplayKind::NoteName,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        name: String,
        voltage: Span,
        display: Span,
        output: Span,
        whole_numbers_only: bool,
        zero_point_angle: f32,
        zero_value: f32,
        round_display: f32,
        round_output: f32,
        kind: DisplayKind,
    ) -> Self {
        Self {
            name,
            voltage,
            display,
            output,
            whole_numbers_only,
            zero_point_angle,
            zero_value,
            round_display,
            round_output,
            kind,
            needs_translation_display: display != voltage,
            needs_translation_output: output != voltage,
        }
    }

    pub fn needs_translation_display(&self) -> bool {
        self.needs_translation_display
    }

    pub fn needs_translation_output(&self) -> bool {
        self.needs_translation_output
    }

    pub fn display_string(&self, volts: f32) -> String {
        display_string(self, volts)
    }

    pub fn output_value(&self, volts: f32) -> f32 {
        output_value(self, volts)
    }
}

/// Display string for a knob voltage under `mode`.
pub fn display_string(mode: &ValueMode, volts: f32) -> String {
    match &mode.kind {
        DisplayKind::Formatted(format) => {
            let mut d = volts;
            if mode.needs_translation_display {
                d = volts::rescale(
                    volts,
                    mode.voltage.min,
                    mode.voltage.max,
                    mode.display.min,
                    mode.display.max,
                );
            }
            if mode.round_display > 0.0 {
                d = (d / mode.round_display).trunc() * mode.round_display;
            }
            format.format_bounded(d)
        }
        DisplayKind::NoteName => volts::note_name(volts),
    }
}

/// Output voltage for a knob voltage under `mode`.
pub fn output_value(mode: &ValueMode, volts: f32) -> f32 {
    let mut o = volts;
    if mode.needs_translation_output {
        o = volts::rescale(
            volts,
            mode.voltage.min,
            mode.voltage.max,
            mode.output.min,
            mode.output.max,
        );
    }
    if mode.round_output > 0.0 {
        o = (o / mode.round_output).round() * mode.round_output;
    }
    o
}

/// The stock sequencer modes: raw voltage, note, and pattern number.
pub fn builtin_modes() -> Vec<ValueMode> {
    let bipolar = Span::new(volts::PATTERN_MIN_V, volts::PATTERN_MAX_V);
    vec![
        ValueMode::linear(LinearMode {
            name: "VOLT".into(),
            voltage: bipolar,
            display: bipolar,
            output: bipolar,
            whole_numbers_only: false,
            zero_point_angle: volts::ANGLE_STRAIGHT_UP,
            format: FloatFormat::parse("%04.1f").unwrap_or_default(),
            round_display: 0.0,
            round_output: 0.0,
            zero_value: 0.0,
        }),
        ValueMode::note("NOTE", bipolar.min, bipolar.max),
        ValueMode::linear(LinearMode {
            name: "PATT".into(),
            voltage: bipolar,
            display: Span::new(1.0, volts::NUM_PATTERNS as f32),
            output: bipolar,
            whole_numbers_only: true,
            zero_point_angle: volts::ANGLE_STRAIGHT_UP,
            format: FloatFormat::parse("%02.0f").unwrap_or_default(),
            round_display: 1.0,
            round_output: 0.0,
            zero_value: 0.0,
        }),
    ]
}
