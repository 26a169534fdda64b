use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, DisableFocusChange, DisableMouseCapture, EnableFocusChange, EnableMouseCapture, Event,
    KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Terminal;

use view::{centered_rect, ParamControl, TextField};

use crate::config;
use crate::panel::{EditKey, Panel};

/// Height of one knob row: a bordered field is three cells tall.
const ROW_HEIGHT: u16 = 3;
const NAME_WIDTH: usize = 12;
const FIELD_WIDTH: u16 = 12;
const VALUE_WIDTH: u16 = 10;

const ACTIONS_IDLE: &[(&str, &str)] = &[
    ("↑↓", "Select"),
    ("Enter", "Edit"),
    ("←→", "Turn knob"),
    ("a", "Automate"),
    ("?", "Help"),
];
const ACTIONS_EDITING: &[(&str, &str)] = &[
    ("Enter", "Apply"),
    ("Esc", "Done"),
    ("Tab", "Done"),
];

#[derive(Default)]
struct Areas {
    content: Rect,
    fields: Vec<Rect>,
}

// ---------------------------------------------------------------------------
// App state
// ---------------------------------------------------------------------------

struct State {
    panel: Panel,
    areas: Areas,
    quit: bool,
    show_help: bool,
    help_lines: Vec<String>,
    last_tick: Instant,
}

pub fn run(panel: Panel) -> anyhow::Result<()> {
    let mut s = State {
        panel,
        areas: Areas::default(),
        quit: false,
        show_help: false,
        help_lines: build_help_lines(),
        last_tick: Instant::now(),
    };

    // Set up terminal.
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableFocusChange)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // When stderr is redirected (e.g. `tsfield 2> debug.log`), keep logging
    // enabled. When stderr is a terminal, suppress logging to avoid
    // corrupting the alternate screen.
    let prev_log_level = log::max_level();
    if std::io::IsTerminal::is_terminal(&std::io::stderr()) {
        log::set_max_level(log::LevelFilter::Off);
    }

    let result = event_loop(&mut terminal, &mut s);

    log::set_max_level(prev_log_level);

    execute!(
        terminal.backend_mut(),
        DisableFocusChange,
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    crossterm::terminal::disable_raw_mode()?;

    // Leaving saves whatever is being typed.
    s.panel.defocus();

    result.map_err(Into::into)
}

fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    s: &mut State,
) -> io::Result<()> {
    loop {
        let now = Instant::now();
        s.panel.tick((now - s.last_tick).as_secs_f32());
        s.last_tick = now;
        s.panel.step();

        render(terminal, s)?;
        if s.quit {
            break;
        }

        // Poll with timeout so automated knobs keep moving without input.
        if !event::poll(Duration::from_millis(33))? {
            continue;
        }
        let ev = event::read()?;
        process_event(s, ev);
        while event::poll(Duration::ZERO)? {
            process_event(s, event::read()?);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Event processing
// ---------------------------------------------------------------------------

fn process_event(s: &mut State, ev: Event) {
    match ev {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            if key.modifiers.contains(KeyModifiers::CONTROL)
                && matches!(key.code, KeyCode::Char('q') | KeyCode::Char('c'))
            {
                s.quit = true;
            } else if s.show_help {
                s.show_help = false;
            } else if s.panel.is_editing() {
                handle_edit_key(s, key.code, key.modifiers);
            } else {
                handle_key(s, key.code, key.modifiers);
            }
        }
        Event::Mouse(mouse) => {
            if s.show_help {
                if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                    s.show_help = false;
                }
                return;
            }
            handle_mouse(s, mouse.kind, mouse.column, mouse.row);
        }
        Event::FocusLost => {
            s.panel.defocus();
        }
        _ => {}
    }
}

fn handle_edit_key(s: &mut State, code: KeyCode, modifiers: KeyModifiers) {
    let extend = modifiers.contains(KeyModifiers::SHIFT);
    match code {
        KeyCode::Enter => {
            s.panel.action();
        }
        KeyCode::Esc | KeyCode::Tab => {
            s.panel.deselect();
        }
        KeyCode::Up => s.panel.select_prev(),
        KeyCode::Down => s.panel.select_next(),
        KeyCode::Backspace => s.panel.edit(EditKey::Backspace),
        KeyCode::Delete => s.panel.edit(EditKey::Delete),
        KeyCode::Left => s.panel.edit(EditKey::Left { extend }),
        KeyCode::Right => s.panel.edit(EditKey::Right { extend }),
        KeyCode::Home => s.panel.edit(EditKey::Home { extend }),
        KeyCode::End => s.panel.edit(EditKey::End { extend }),
        KeyCode::Char(ch) => s.panel.edit(EditKey::Char(ch)),
        _ => {}
    }
}

fn handle_key(s: &mut State, code: KeyCode, modifiers: KeyModifiers) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => s.panel.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => s.panel.select_next(),
        KeyCode::Enter => {
            s.panel.action();
        }
        KeyCode::Left => s.panel.nudge(-knob_step(modifiers)),
        KeyCode::Right => s.panel.nudge(knob_step(modifiers)),
        KeyCode::Char('a') => s.panel.toggle_automation(),
        KeyCode::Char('?') => s.show_help = true,
        _ => {}
    }
}

fn handle_mouse(s: &mut State, kind: MouseEventKind, x: u16, y: u16) {
    match kind {
        MouseEventKind::Down(MouseButton::Left) => {
            let hit = s
                .areas
                .fields
                .iter()
                .position(|r| r.contains((x, y).into()));
            if let Some(ix) = hit {
                let text_area = TextField::text_area(&s.panel.style, s.areas.fields[ix]);
                let column = x.saturating_sub(text_area.x);
                s.panel.click(ix, column, text_area.width);
            } else if let Some(ix) = row_at(y, s.areas.content, s.panel.rows.len()) {
                s.panel.select_row(ix);
                s.panel.deselect();
            } else {
                s.panel.defocus();
            }
        }
        MouseEventKind::ScrollUp => s.panel.nudge(0.01),
        MouseEventKind::ScrollDown => s.panel.nudge(-0.01),
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    s: &mut State,
) -> io::Result<()> {
    terminal.draw(|frame| {
        let area = frame.area();
        let [title_area, content_area, action_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(area);
        let [knobs_area, modes_area] =
            Layout::horizontal([Constraint::Fill(1), Constraint::Length(30)]).areas(content_area);

        let chrome = config::field_style();
        frame.render_widget(
            Paragraph::new(" tsfield")
                .style(Style::default().fg(Color::from(chrome.text)).add_modifier(Modifier::BOLD)),
            title_area,
        );

        s.areas.content = knobs_area;
        s.areas.fields = render_knobs(frame, knobs_area, &s.panel);
        render_modes(frame, modes_area, &s.panel, chrome.border.into());

        let actions = if s.panel.is_editing() {
            ACTIONS_EDITING
        } else {
            ACTIONS_IDLE
        };
        render_action_bar(frame, action_area, actions);

        if s.show_help {
            render_help(frame, area, &s.help_lines);
        }
    })?;
    Ok(())
}

/// Draw one row per knob. Returns the area of each text field.
fn render_knobs(frame: &mut ratatui::Frame, area: Rect, panel: &Panel) -> Vec<Rect> {
    let mut fields = Vec::with_capacity(panel.rows.len());
    let bar_width = area
        .width
        .saturating_sub(NAME_WIDTH as u16 + 2 + FIELD_WIDTH + VALUE_WIDTH + 2) as usize;

    for (i, row) in panel.rows.iter().enumerate() {
        let Some(row_area) = row_rect(area, i) else {
            break;
        };
        let selected = i == panel.selected();
        let [label_area, field_area] = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Length(FIELD_WIDTH),
        ])
        .areas(row_area);

        let filled = (row.knob.ratio() * bar_width as f64).round() as usize;
        let marker = match (selected, row.automated) {
            (true, true) => "▸~",
            (true, false) => "▸ ",
            (false, true) => " ~",
            (false, false) => "  ",
        };
        let label = format!(
            "{marker}{:<width$} {}{} {:>8.3}",
            truncate(&row.knob.name, NAME_WIDTH),
            "▓".repeat(filled),
            "░".repeat(bar_width.saturating_sub(filled)),
            row.knob.value(),
            width = NAME_WIDTH,
        );
        let style = if selected {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect::new(label_area.x, label_area.y + 1, label_area.width, 1),
        );

        let focused = selected && row.field.is_editing();
        frame.render_widget(row.field.widget(focused), field_area);
        fields.push(field_area);
    }
    fields
}

fn render_modes(frame: &mut ratatui::Frame, area: Rect, panel: &Panel, border: Color) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(" Modes ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let lines: Vec<Line> = panel
        .mode_readout()
        .into_iter()
        .map(|r| {
            Line::from(format!(
                "{:<6} {:>8} {:>+8.3}",
                truncate(&r.name, 6),
                truncate(&r.display, 8),
                r.output
            ))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines), inner);
}

fn render_action_bar(frame: &mut ratatui::Frame, area: Rect, actions: &[(&str, &str)]) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let key_style = Style::default()
        .fg(Color::Black)
        .bg(Color::White)
        .add_modifier(Modifier::BOLD);
    let label_style = Style::default().fg(Color::White);

    let y = area.y;
    let mut x = area.x;
    for &(key, desc) in actions {
        if x > area.x {
            x += 1;
        }
        for (text, style) in [(format!(" {key} "), key_style), (format!(" {desc}"), label_style)] {
            for ch in text.chars() {
                if x >= area.right() {
                    return;
                }
                if let Some(c) = frame.buffer_mut().cell_mut((x, y)) {
                    c.set_char(ch);
                    c.set_style(style);
                }
                x += 1;
            }
        }
    }
}

fn render_help(frame: &mut ratatui::Frame, area: Rect, lines: &[String]) {
    let popup = centered_rect(44, lines.len() as u16 + 2, area);
    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Help ");
    let text: Vec<Line> = lines
        .iter()
        .map(|l| {
            if l.starts_with("  ") || l.is_empty() {
                Line::from(l.as_str())
            } else {
                Line::styled(
                    l.as_str(),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )
            }
        })
        .collect();
    frame.render_widget(Paragraph::new(text).block(block), popup);
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn knob_step(modifiers: KeyModifiers) -> f32 {
    if modifiers.contains(KeyModifiers::CONTROL) {
        0.10
    } else if modifiers.contains(KeyModifiers::SHIFT) {
        0.01
    } else {
        0.05
    }
}

/// Area of row `ix`, or `None` once rows no longer fit in `area`.
fn row_rect(area: Rect, ix: usize) -> Option<Rect> {
    let offset = u16::try_from(ix).ok()?.checked_mul(ROW_HEIGHT)?;
    let y = area.y.checked_add(offset)?;
    (y.saturating_add(ROW_HEIGHT) <= area.bottom())
        .then(|| Rect::new(area.x, y, area.width, ROW_HEIGHT))
}

fn row_at(y: u16, area: Rect, rows: usize) -> Option<usize> {
    if y < area.y || y >= area.bottom() {
        return None;
    }
    let ix = ((y - area.y) / ROW_HEIGHT) as usize;
    (ix < rows).then_some(ix)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let t: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{t}…")
    }
}

fn build_help_lines() -> Vec<String> {
    vec![
        "Knobs:".into(),
        "  Up/Down    Select knob".into(),
        "  Left/Right Turn knob (5%)".into(),
        "  Shift+←/→  Fine turn (1%)".into(),
        "  Ctrl+←/→   Coarse turn (10%)".into(),
        "  Enter      Edit value".into(),
        "  a          Toggle automation".into(),
        "  Ctrl+Q     Quit".into(),
        "".into(),
        "Editing:".into(),
        "  Enter      Apply and keep editing".into(),
        "  Esc/Tab    Apply and stop editing".into(),
        "  Shift+←/→  Extend selection".into(),
        "".into(),
        "Mouse:".into(),
        "  Click      Edit field at cursor".into(),
        "  Scroll     Turn selected knob".into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> State {
        let config = crate::panel::load(None).unwrap();
        State {
            panel: Panel::from_config(&config).unwrap(),
            areas: Areas::default(),
            quit: false,
            show_help: false,
            help_lines: build_help_lines(),
            last_tick: Instant::now(),
        }
    }

    #[test]
    fn focus_lost_saves_edit() {
        let mut s = state();
        s.panel.action();
        s.panel.edit(EditKey::Char('4'));
        process_event(&mut s, Event::FocusLost);
        assert!(!s.panel.is_editing());
        assert_eq!(s.panel.rows[0].knob.value(), 4.0);
    }

    #[test]
    fn rows_stop_at_area_bottom() {
        let area = Rect::new(0, 2, 40, 10);
        assert_eq!(row_rect(area, 0), Some(Rect::new(0, 2, 40, ROW_HEIGHT)));
        assert_eq!(row_rect(area, 2), Some(Rect::new(0, 8, 40, ROW_HEIGHT)));
        assert_eq!(row_rect(area, 3), None);
    }

    #[test]
    fn row_index_beyond_u16_is_off_screen() {
        let area = Rect {
            x: 0,
            y: 0,
            width: 80,
            height: 100,
        };
        assert_eq!(row_rect(area, 30_000), None);
        assert_eq!(row_rect(area, usize::MAX), None);
        let low = Rect {
            x: 0,
            y: u16::MAX - 1,
            width: 80,
            height: 1,
        };
        assert_eq!(row_rect(low, 1), None);
    }
}
