use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "tsfield", about = "Parameter text fields and sequencer value modes")]
pub struct Cli {
    /// Optional panel file (launches TUI)
    pub panel: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Open a panel in the terminal UI
    Run {
        /// Path to panel file (.toml); the built-in panel is used if omitted
        panel: Option<String>,
    },
    /// Print every value mode's display string and output for a voltage
    Modes {
        /// Knob voltage
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        volts: f32,
        /// Panel file providing extra modes
        panel: Option<String>,
    },
    /// Show pattern, octave and note for a voltage
    Volts {
        #[arg(allow_hyphen_values = true)]
        volts: f32,
    },
    /// Format a value with a printf-style format string
    Format {
        /// Format string, e.g. "%.2f"
        format: String,
        #[arg(allow_hyphen_values = true)]
        value: f32,
    },
}
