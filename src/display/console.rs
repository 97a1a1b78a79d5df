use std::collections::HashMap;

use log::{debug, info};

use crate::config::ClickAction;

use super::{Color, Display, Label};

/// Keeps the last state of every label and logs changes, for headless runs.
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    texts: HashMap<Label, String>,
    colors: HashMap<Label, Color>,
    visible: HashMap<Label, bool>,
    clicks: HashMap<Label, ClickAction>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self, label: Label) -> Option<&str> {
        self.texts.get(&label).map(String::as_str)
    }

    pub fn color(&self, label: Label) -> Option<Color> {
        self.colors.get(&label).copied()
    }

    pub fn is_visible(&self, label: Label) -> Option<bool> {
        self.visible.get(&label).copied()
    }

    pub fn click_action(&self, label: Label) -> Option<ClickAction> {
        self.clicks.get(&label).copied()
    }
}

impl Display for ConsoleDisplay {
    fn set_text(&mut self, label: Label, text: &str) {
        if self.text(label) == Some(text) {
            return;
        }
        match label {
            Label::LapTime(_) | Label::TotalTime | Label::ReferenceTime | Label::Driver => {
                info!("{:?}: {}", label, text)
            }
            _ => debug!("{:?}: {}", label, text),
        }
        self.texts.insert(label, text.to_string());
    }

    fn set_color(&mut self, label: Label, color: Color) {
        self.colors.insert(label, color);
    }

    fn set_visible(&mut self, label: Label, visible: bool) {
        self.visible.insert(label, visible);
    }

    fn on_click(&mut self, label: Label, action: ClickAction) {
        self.clicks.insert(label, action);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_latest_state() {
        let mut display = ConsoleDisplay::new();
        assert_eq!(display.text(Label::TotalTime), None);

        display.set_text(Label::TotalTime, "1:00.000");
        display.set_text(Label::TotalTime, "2:00.000");
        display.set_color(Label::TotalTime, Color::RED);
        display.set_visible(Label::TotalTime, false);

        assert_eq!(display.text(Label::TotalTime), Some("2:00.000"));
        assert_eq!(display.color(Label::TotalTime), Some(Color::RED));
        assert_eq!(display.is_visible(Label::TotalTime), Some(false));
    }
}
