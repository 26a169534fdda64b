#![allow(clippy::collapsible_if)]

mod cli;
mod config;
mod panel;
mod tui;

use clap::Parser;
use cli::{Cli, Command};
use view::{volts, FloatFormat};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    env_logger::init();

    match cli.command {
        None => run(cli.panel.as_deref()),
        Some(Command::Run { panel: path }) => run(path.as_deref().or(cli.panel.as_deref())),
        Some(Command::Modes { volts: v, panel: path }) => {
            let config = panel::load(path.as_deref())?;
            let modes = panel::Panel::from_config(&config)?.modes;
            println!("{:<8} {:>10} {:>10}", "Mode", "Display", "Output");
            for r in panel::readout(&modes, v) {
                println!("{:<8} {:>10} {:>10.4}", r.name, r.display, r.output);
            }
            Ok(())
        }
        Some(Command::Volts { volts: v }) => {
            let pattern = volts::volts_to_pattern(v);
            println!("Volts:   {v}");
            println!("Pattern: {pattern} ({:.4} V)", volts::pattern_to_volts(pattern - 1));
            println!("Octave:  {}", volts::volts_to_octave(v));
            println!("Note:    {}", volts::volts_to_note_ix(v));
            println!("Name:    {}", volts::note_name(v));
            Ok(())
        }
        Some(Command::Format { format, value }) => {
            let format: FloatFormat = format.parse()?;
            println!("{}", format.format(value)?);
            Ok(())
        }
    }
}

fn run(path: Option<&str>) -> anyhow::Result<()> {
    let panel_config = panel::load(path)?;
    config::init(config::Config {
        style: panel_config.style.clone(),
    });
    let panel = panel::Panel::from_config(&panel_config)?;
    tui::run(panel)
}
