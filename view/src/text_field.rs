use std::ops::Range;
use std::sync::LazyLock;

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Widget};
use regex::Regex;

use crate::color::Rgba;

static INVALID_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9]").unwrap());
static INVALID_REAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^0-9.\-]").unwrap());
static INVALID_ALNUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").unwrap());

/// Characters a field accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextType {
    #[default]
    Any,
    DigitsOnly,
    /// Digits, `.` and `-`.
    RealNumberOnly,
    AlphaNumeric,
}

impl TextType {
    fn invalid_chars(self) -> Option<&'static Regex> {
        match self {
            TextType::Any => None,
            TextType::DigitsOnly => Some(&INVALID_DIGITS),
            TextType::RealNumberOnly => Some(&INVALID_REAL),
            TextType::AlphaNumeric => Some(&INVALID_ALNUM),
        }
    }

    /// Whether `ch` passes the filter.
    pub fn allows(self, ch: char) -> bool {
        let mut buf = [0u8; 4];
        self.invalid_chars()
            .is_none_or(|re| !re.is_match(ch.encode_utf8(&mut buf)))
    }
}

/// Drop characters outside `text_type`, then keep at most `max_length` chars.
pub fn sanitize(text: &str, text_type: TextType, max_length: usize) -> String {
    match text_type.invalid_chars() {
        None => text.chars().take(max_length).collect(),
        Some(re) => re.replace_all(text, "").chars().take(max_length).collect(),
    }
}

/// State for a single-line, filtered text field.
///
/// `cursor` and `selection` are char positions. The selection spans from the
/// `selection` anchor to the cursor; it is empty when they are equal.
#[derive(Debug, Clone)]
pub struct TextFieldState {
    text: String,
    cursor: usize,
    selection: usize,
    max_length: usize,
    text_type: TextType,
}

impl Default for TextFieldState {
    fn default() -> Self {
        Self::new(TextType::Any, usize::MAX)
    }
}

impl TextFieldState {
    pub fn new(text_type: TextType, max_length: usize) -> Self {
        Self {
            text: String::new(),
            cursor: 0,
            selection: 0,
            max_length,
            text_type,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn selection(&self) -> usize {
        self.selection
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn text_type(&self) -> TextType {
        self.text_type
    }

    pub fn set_max_length(&mut self, max_length: usize) {
        self.max_length = max_length;
        self.on_text_change();
    }

    pub fn set_text_type(&mut self, text_type: TextType) {
        self.text_type = text_type;
        self.on_text_change();
    }

    /// Filter `text` with this field's character class and length limit.
    pub fn sanitize(&self, text: &str) -> String {
        sanitize(text, self.text_type, self.max_length)
    }

    /// Replace the whole buffer and move the cursor to the end.
    pub fn set_text(&mut self, text: &str) {
        self.text = self.sanitize(text);
        self.cursor = self.len();
        self.selection = self.cursor;
        self.on_text_change();
    }

    /// Insert text at the cursor, replacing the selection if there is one.
    pub fn insert_text(&mut self, text: &str) {
        self.delete_selection();
        let cleansed = self.sanitize(text);
        let at = self.byte_at(self.cursor);
        self.text.insert_str(at, &cleansed);
        self.cursor += cleansed.chars().count();
        self.selection = self.cursor;
        self.on_text_change();
    }

    pub fn insert(&mut self, ch: char) {
        let mut buf = [0u8; 4];
        self.insert_text(ch.encode_utf8(&mut buf));
    }

    pub fn backspace(&mut self) {
        if self.delete_selection() {
            self.on_text_change();
        } else if self.cursor > 0 {
            let at = self.byte_at(self.cursor - 1);
            self.text.remove(at);
            self.cursor -= 1;
            self.selection = self.cursor;
        }
    }

    pub fn delete(&mut self) {
        if self.delete_selection() {
            self.on_text_change();
        } else if self.cursor < self.len() {
            let at = self.byte_at(self.cursor);
            self.text.remove(at);
        }
    }

    /// Move the cursor one char left. With `extend` the selection anchor stays.
    pub fn move_left(&mut self, extend: bool) {
        self.cursor = self.cursor.saturating_sub(1);
        if !extend {
            self.selection = self.cursor;
        }
    }

    pub fn move_right(&mut self, extend: bool) {
        self.cursor = (self.cursor + 1).min(self.len());
        if !extend {
            self.selection = self.cursor;
        }
    }

    pub fn home(&mut self, extend: bool) {
        self.cursor = 0;
        if !extend {
            self.selection = self.cursor;
        }
    }

    pub fn end(&mut self, extend: bool) {
        self.cursor = self.len();
        if !extend {
            self.selection = self.cursor;
        }
    }

    /// Select everything; the cursor ends up at the end.
    pub fn select_all(&mut self) {
        self.selection = 0;
        self.cursor = self.len();
    }

    /// Move the cursor and collapse the selection onto it.
    pub fn set_cursor(&mut self, pos: usize) {
        self.cursor = pos.min(self.len());
        self.selection = self.cursor;
    }

    /// Selected char range, ordered.
    pub fn selected_range(&self) -> Range<usize> {
        self.cursor.min(self.selection)..self.cursor.max(self.selection)
    }

    pub fn selected_text(&self) -> &str {
        let r = self.selected_range();
        &self.text[self.byte_at(r.start)..self.byte_at(r.end)]
    }

    /// Chars visible in a box `avail_width` wide when each glyph is
    /// `glyph_width` wide.
    ///
    /// Half a glyph is kept free for the caret. The estimate only holds for
    /// monospace fonts. A focused field scrolls to keep the cursor in view; an
    /// unfocused one shows the start of the text.
    pub fn scroll_window(&self, avail_width: f32, glyph_width: f32, focused: bool) -> Range<usize> {
        let len = self.len();
        let glyph_width = glyph_width.max(f32::EPSILON);
        let max_text_width = avail_width - glyph_width / 2.0;
        if len as f32 * glyph_width <= max_text_width {
            return 0..len;
        }
        let n_chars = ((max_text_width / glyph_width) as isize - 1).max(1) as usize;
        if focused {
            let last = self.cursor.max(n_chars);
            let start = last - n_chars;
            start..(start + n_chars).min(len)
        } else {
            0..n_chars.min(len)
        }
    }

    /// Char position under `column` (relative to the text origin).
    pub fn position_at(&self, column: u16, avail_width: u16, focused: bool) -> usize {
        let window = self.scroll_window(avail_width as f32, 1.0, focused);
        (window.start + column as usize).min(window.end)
    }

    /// Delete the selected chars. Returns false when nothing was selected.
    fn delete_selection(&mut self) -> bool {
        if self.cursor == self.selection {
            return false;
        }
        let r = self.selected_range();
        let (start, end) = (self.byte_at(r.start), self.byte_at(r.end));
        self.text.replace_range(start..end, "");
        self.cursor = r.start;
        self.selection = r.start;
        true
    }

    fn on_text_change(&mut self) {
        self.text = self.sanitize(&self.text);
        let len = self.len();
        self.cursor = self.cursor.min(len);
        self.selection = self.selection.min(len);
    }

    fn byte_at(&self, char_pos: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_pos)
            .map_or(self.text.len(), |(i, _)| i)
    }
}

/// Colors and border of a text field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStyle {
    pub background: Rgba,
    pub text: Rgba,
    pub border: Rgba,
    /// Border thickness in cells; `0` draws no border.
    pub border_width: u16,
    /// Selection highlight; derived from text and background when `None`.
    pub caret: Option<Rgba>,
    /// Horizontal padding inside the border.
    pub text_offset: u16,
}

impl Default for FieldStyle {
    fn default() -> Self {
        Self {
            background: Rgba::from_rgb8(0x1e, 0x1e, 0x1e),
            text: Rgba::from_rgb8(0xee, 0xee, 0xee),
            border: Rgba::from_rgb8(0x66, 0x66, 0x66),
            border_width: 1,
            caret: None,
            text_offset: 0,
        }
    }
}

impl FieldStyle {
    /// Halfway between text and background at 70% alpha.
    pub fn caret_color(&self) -> Rgba {
        self.caret
            .unwrap_or_else(|| self.text.mix(self.background, 0.70))
    }
}

/// Single-line text field widget.
///
/// Draws background, border, the visible slice of the text, the selection
/// and the caret. Selection and caret are drawn only while `focused`.
pub struct TextField<'a> {
    state: &'a TextFieldState,
    style: FieldStyle,
    focused: bool,
    visible: bool,
}

impl<'a> TextField<'a> {
    pub fn new(state: &'a TextFieldState) -> Self {
        Self {
            state,
            style: FieldStyle::default(),
            focused: false,
            visible: true,
        }
    }

    pub fn style(mut self, style: FieldStyle) -> Self {
        self.style = style;
        self
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Area the text is drawn into for a widget rendered at `area`.
    pub fn text_area(style: &FieldStyle, area: Rect) -> Rect {
        let inner = if style.border_width > 0 && area.width > 2 && area.height > 2 {
            Block::bordered().inner(area)
        } else {
            area
        };
        let pad = style.text_offset.min(inner.width / 2);
        Rect::new(
            inner.x + pad,
            inner.y + inner.height.saturating_sub(1) / 2,
            inner.width - 2 * pad,
            inner.height.min(1),
        )
    }
}

impl Widget for TextField<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if !self.visible || area.height == 0 || area.width == 0 {
            return;
        }
        let bg = Color::from(self.style.background);
        let fg = Color::from(self.style.text);
        let base = Style::default().fg(fg).bg(bg);

        // Background.
        buf.set_style(area, base);
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                if let Some(cell) = buf.cell_mut((x, y)) {
                    cell.set_char(' ');
                }
            }
        }

        // Border.
        if self.style.border_width > 0 && area.width > 2 && area.height > 2 {
            Block::bordered()
                .border_style(Style::default().fg(Color::from(self.style.border)).bg(bg))
                .render(area, buf);
        }

        let text_area = Self::text_area(&self.style, area);
        if text_area.width == 0 || text_area.height == 0 {
            return;
        }

        let window = self
            .state
            .scroll_window(text_area.width as f32, 1.0, self.focused);
        let selection = if self.focused {
            self.state.selected_range()
        } else {
            0..0
        };
        let highlight = Style::default()
            .fg(fg)
            .bg(Color::from(self.style.caret_color().over(self.style.background)));
        let caret = Style::default().fg(bg).bg(fg);

        let y = text_area.y;
        let mut x = text_area.x;
        for (i, ch) in self
            .state
            .text()
            .chars()
            .enumerate()
            .skip(window.start)
            .take(window.len())
        {
            if x >= text_area.right() {
                break;
            }
            let style = if selection.contains(&i) {
                highlight
            } else if self.focused && selection.is_empty() && i == self.state.cursor() {
                caret
            } else {
                base
            };
            if let Some(cell) = buf.cell_mut((x, y)) {
                cell.set_char(ch);
                cell.set_style(style);
            }
            x += 1;
        }

        // Caret past the last visible char.
        if self.focused && selection.is_empty() && self.state.cursor() >= window.end {
            let cx = text_area.x + (self.state.cursor() - window.start) as u16;
            if cx < text_area.right()
                && let Some(cell) = buf.cell_mut((cx, y))
            {
                cell.set_char(' ');
                cell.set_style(caret);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(text_type: TextType, max: usize, text: &str) -> TextFieldState {
        let mut f = TextFieldState::new(text_type, max);
        f.set_text(text);
        f
    }

    fn row(buf: &Buffer, area: Rect, y: u16) -> String {
        (area.left()..area.right())
            .map(|x| buf[(x, y)].symbol().to_string())
            .collect()
    }

    #[test]
    fn sanitize_by_class() {
        assert_eq!(sanitize("a1b2-3.4", TextType::DigitsOnly, 10), "1234");
        assert_eq!(sanitize("-1.5e3x", TextType::RealNumberOnly, 10), "-1.53");
        assert_eq!(sanitize("ab-c 9!", TextType::AlphaNumeric, 10), "abc9");
        assert_eq!(sanitize("héllo wörld", TextType::Any, 5), "héllo");
        assert_eq!(sanitize("123456", TextType::DigitsOnly, 4), "1234");
    }

    #[test]
    fn set_text_moves_cursor_to_end() {
        let f = field(TextType::DigitsOnly, 5, "12x34567");
        assert_eq!(f.text(), "12345");
        assert_eq!(f.cursor(), 5);
        assert_eq!(f.selection(), 5);
    }

    #[test]
    fn insert_at_cursor() {
        let mut f = field(TextType::Any, 20, "helo");
        f.set_cursor(3);
        f.insert_text("l");
        assert_eq!(f.text(), "hello");
        assert_eq!(f.cursor(), 4);
        assert_eq!(f.selection(), 4);
    }

    #[test]
    fn insert_replaces_selection() {
        let mut f = field(TextType::Any, 20, "hello world");
        f.set_cursor(6);
        f.end(true);
        assert_eq!(f.selected_text(), "world");
        f.insert_text("there");
        assert_eq!(f.text(), "hello there");
        assert_eq!(f.cursor(), 11);
    }

    #[test]
    fn insert_filters_and_truncates() {
        let mut f = field(TextType::DigitsOnly, 4, "12");
        f.insert_text("a3b4c5");
        assert_eq!(f.text(), "1234");
        assert!(f.cursor() <= 4);
    }

    #[test]
    fn select_all_then_type_overwrites() {
        let mut f = field(TextType::RealNumberOnly, 8, "0.50");
        f.select_all();
        assert_eq!(f.selected_range(), 0..4);
        f.insert('7');
        assert_eq!(f.text(), "7");
        assert_eq!(f.cursor(), 1);
    }

    #[test]
    fn backspace_and_delete() {
        let mut f = field(TextType::Any, 20, "abcd");
        f.backspace();
        assert_eq!(f.text(), "abc");
        f.home(false);
        f.delete();
        assert_eq!(f.text(), "bc");
        assert_eq!(f.cursor(), 0);
        f.backspace();
        assert_eq!(f.text(), "bc");
    }

    #[test]
    fn backspace_removes_selection() {
        let mut f = field(TextType::Any, 20, "abcdef");
        f.set_cursor(1);
        f.move_right(true);
        f.move_right(true);
        f.backspace();
        assert_eq!(f.text(), "adef");
        assert_eq!(f.cursor(), 1);
    }

    #[test]
    fn multibyte_editing() {
        let mut f = field(TextType::Any, 20, "añb");
        f.move_left(false);
        f.backspace();
        assert_eq!(f.text(), "ab");
        f.insert('ü');
        assert_eq!(f.text(), "aüb");
        assert_eq!(f.cursor(), 2);
    }

    #[test]
    fn movement_clamps() {
        let mut f = field(TextType::Any, 20, "ab");
        f.move_right(false);
        assert_eq!(f.cursor(), 2);
        f.home(false);
        f.move_left(false);
        assert_eq!(f.cursor(), 0);
        f.set_cursor(99);
        assert_eq!(f.cursor(), 2);
    }

    #[test]
    fn shrinking_max_length_clamps_positions() {
        let mut f = field(TextType::Any, 20, "abcdef");
        f.set_max_length(3);
        assert_eq!(f.text(), "abc");
        assert_eq!(f.cursor(), 3);
        assert_eq!(f.selection(), 3);
    }

    #[test]
    fn changing_text_type_refilters() {
        let mut f = field(TextType::Any, 20, "a1b2");
        f.set_text_type(TextType::DigitsOnly);
        assert_eq!(f.text(), "12");
    }

    #[test]
    fn scroll_window_fits() {
        let f = field(TextType::Any, 50, "short");
        assert_eq!(f.scroll_window(10.0, 1.0, true), 0..5);
    }

    #[test]
    fn scroll_window_unfocused_shows_start() {
        let f = field(TextType::Any, 50, "abcdefghijklmnopqrst");
        // max width 9.5 → 9 glyphs → 8 shown.
        assert_eq!(f.scroll_window(10.0, 1.0, false), 0..8);
    }

    #[test]
    fn scroll_window_follows_cursor() {
        let mut f = field(TextType::Any, 50, "abcdefghijklmnopqrst");
        assert_eq!(f.scroll_window(10.0, 1.0, true), 12..20);
        f.set_cursor(3);
        assert_eq!(f.scroll_window(10.0, 1.0, true), 0..8);
        f.set_cursor(10);
        assert_eq!(f.scroll_window(10.0, 1.0, true), 2..10);
    }

    #[test]
    fn scroll_window_pixel_glyphs() {
        let f = field(TextType::Any, 50, "0123456789");
        // 60 px box, 8 px glyphs: 56 px usable → 7 glyphs → 6 shown.
        assert_eq!(f.scroll_window(60.0, 8.0, false), 0..6);
        // Always at least one char.
        assert_eq!(f.scroll_window(4.0, 8.0, false), 0..1);
    }

    #[test]
    fn position_at_accounts_for_scroll() {
        let f = field(TextType::Any, 50, "abcdefghijklmnopqrst");
        assert_eq!(f.position_at(0, 10, true), 12);
        assert_eq!(f.position_at(3, 10, true), 15);
        assert_eq!(f.position_at(99, 10, true), 20);
        assert_eq!(f.position_at(3, 10, false), 3);
    }

    #[test]
    fn caret_color_is_average() {
        let style = FieldStyle {
            background: Rgba::rgb(0.0, 0.0, 0.0),
            text: Rgba::rgb(1.0, 0.5, 0.0),
            ..FieldStyle::default()
        };
        assert_eq!(style.caret_color(), Rgba::new(0.5, 0.25, 0.0, 0.70));
    }

    #[test]
    fn render_with_border() {
        let f = field(TextType::Any, 50, "42");
        let area = Rect::new(0, 0, 8, 3);
        let mut buf = Buffer::empty(area);
        TextField::new(&f).render(area, &mut buf);
        assert_eq!(row(&buf, area, 0), "┌──────┐");
        assert_eq!(row(&buf, area, 1), "│42    │");
        assert_eq!(row(&buf, area, 2), "└──────┘");
    }

    #[test]
    fn render_scrolled_when_focused() {
        let f = field(TextType::Any, 50, "abcdefghij");
        let style = FieldStyle {
            border_width: 0,
            ..FieldStyle::default()
        };
        let area = Rect::new(0, 0, 6, 1);
        let mut buf = Buffer::empty(area);
        TextField::new(&f).style(style).focused(true).render(area, &mut buf);
        // 5.5 usable → 5 glyphs → 4 shown, caret after them.
        assert_eq!(row(&buf, area, 0), "ghij  ");
        let caret = &buf[(4, 0)];
        assert_eq!(caret.bg, Color::from(style.text));

        let mut buf = Buffer::empty(area);
        TextField::new(&f).style(style).render(area, &mut buf);
        assert_eq!(row(&buf, area, 0), "abcd  ");
        assert_eq!(buf[(4, 0)].bg, Color::from(style.background));
    }

    #[test]
    fn render_highlights_selection_only_when_focused() {
        let mut f = field(TextType::Any, 50, "abc");
        f.select_all();
        let style = FieldStyle {
            border_width: 0,
            ..FieldStyle::default()
        };
        let area = Rect::new(0, 0, 6, 1);
        let highlight = Color::from(style.caret_color().over(style.background));

        let mut buf = Buffer::empty(area);
        TextField::new(&f).style(style).focused(true).render(area, &mut buf);
        assert_eq!(buf[(0, 0)].bg, highlight);
        assert_eq!(buf[(2, 0)].bg, highlight);

        let mut buf = Buffer::empty(area);
        TextField::new(&f).style(style).render(area, &mut buf);
        assert_eq!(buf[(0, 0)].bg, Color::from(style.background));
    }

    #[test]
    fn hidden_field_draws_nothing() {
        let f = field(TextType::Any, 50, "abc");
        let area = Rect::new(0, 0, 6, 1);
        let mut buf = Buffer::empty(area);
        TextField::new(&f).visible(false).render(area, &mut buf);
        assert_eq!(buf, Buffer::empty(area));
    }
}
