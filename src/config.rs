use std::sync::OnceLock;

use serde::Deserialize;
use view::{FieldStyle, Rgba};

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Process-wide settings, taken from a panel file's `[style]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub style: StyleConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub background: String,
    pub text: String,
    pub border: String,
    pub caret: Option<String>,
    pub border_width: u16,
    pub text_offset: u16,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            background: "#1e1e1e".into(),
            text: "#eeeeee".into(),
            border: "#666666".into(),
            caret: None,
            border_width: 1,
            text_offset: 0,
        }
    }
}

impl StyleConfig {
    pub fn to_field_style(&self) -> anyhow::Result<FieldStyle> {
        let color = |name: &str, hex: &str| {
            Rgba::from_hex(hex)
                .ok_or_else(|| anyhow::anyhow!("invalid {name} color '{hex}' (expected #rrggbb)"))
        };
        Ok(FieldStyle {
            background: color("background", &self.background)?,
            text: color("text", &self.text)?,
            border: color("border", &self.border)?,
            border_width: self.border_width,
            caret: self
                .caret
                .as_deref()
                .map(|hex| color("caret", hex))
                .transpose()?,
            text_offset: self.text_offset,
        })
    }
}

pub fn init(config: Config) {
    CONFIG.set(config).ok();
}

/// Field style for new widgets; the library default before [`init`].
pub fn field_style() -> FieldStyle {
    CONFIG
        .get()
        .and_then(|c| c.style.to_field_style().ok())
        .unwrap_or_default()
}
