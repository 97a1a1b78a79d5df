// Display capability and the formatting shared by every view

pub mod console;
pub mod view;

use crate::config::{AppConfig, ClickAction, DeltaColor};

pub use console::ConsoleDisplay;
pub use view::{LapsView, render_settings};

/// Text shown in place of a delta when there is nothing to compare against
pub const PLACEHOLDER: &str = "-.---";
/// Text shown in place of a lap time that is not set
pub const NO_TIME: &str = "-:--.---";
pub const NO_DRIVER_TEXT: &str = "OPEN CONFIG TO SET DRIVERS";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1., 1., 1.);
    pub const RED: Color = Color::rgb(1., 0., 0.);
    pub const GREEN: Color = Color::rgb(0., 1., 0.);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1. }
    }
}

/// Rows of the settings panel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SettingRow {
    LapCount,
    ShowDelta,
    DeltaColor,
    RedAt,
    GreenAt,
    ShowCurrent,
    Reference,
    ShowReference,
    ShowTotal,
    Refresh,
    LogLaps,
    LogBest,
    BestLap,
    LockBest,
    IgnoreInvalidation,
    Drivers,
}

/// Everything the core can write to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    LapNumber(usize),
    LapTime(usize),
    LapDelta(usize),
    CurrentTime,
    CurrentDelta,
    ReferenceName,
    ReferenceTime,
    ReferenceHolder,
    TotalTime,
    PersonalBestDelta,
    Driver,
    /// Standalone large delta readout
    DeltaWindow,
    Setting(SettingRow),
    Button(ClickAction),
}

/// Capability interface implemented by whatever renders the overlay. The core never talks to the
/// host UI any other way.
pub trait Display {
    fn set_text(&mut self, label: Label, text: &str);

    fn set_color(&mut self, label: Label, color: Color);

    fn set_visible(&mut self, label: Label, visible: bool);

    /// Register `action` to be reported when `label` is clicked
    fn on_click(&mut self, label: Label, action: ClickAction);
}

/// `m:ss.mmm`, or [`NO_TIME`] for times that are not positive
pub fn time_to_string(time_ms: f64) -> String {
    if !(time_ms > 0.) {
        return NO_TIME.to_string();
    }
    let time_ms = time_ms as u64;
    format!(
        "{}:{:02}.{:03}",
        time_ms / 60_000,
        (time_ms % 60_000) / 1000,
        time_ms % 1000
    )
}

/// Signed seconds with millisecond precision, `+1.234`
pub fn delta_to_string(delta_ms: f64) -> String {
    format!("{:+.3}", delta_ms / 1000.)
}

/// Red at or above `red_at_ms`, green at or below `green_at_ms`, a gradient from white or yellow
/// in between.
pub fn delta_color(delta_ms: f64, config: &AppConfig) -> Color {
    if !delta_ms.is_finite() {
        return Color::WHITE;
    }

    let red_at = config.red_at_ms as f64;
    let green_at = config.green_at_ms as f64;
    if delta_ms >= red_at {
        return Color::RED;
    }
    if delta_ms <= green_at {
        return Color::GREEN;
    }

    if delta_ms > 0. {
        let factor = (delta_ms / red_at) as f32;
        match config.delta_color {
            DeltaColor::Yellow => Color::rgb(1., 1. - factor, 0.),
            DeltaColor::White => Color::rgb(1., 1. - factor, 1. - factor),
        }
    } else {
        let factor = (delta_ms / green_at) as f32;
        match config.delta_color {
            DeltaColor::Yellow => Color::rgb(1. - factor, 1., 0.),
            DeltaColor::White => Color::rgb(1. - factor, 1., 1. - factor),
        }
    }
}

/// Write a delta and its colour to `label`
pub fn set_delta(display: &mut dyn Display, label: Label, delta_ms: f64, config: &AppConfig) {
    display.set_text(label, &delta_to_string(delta_ms));
    display.set_color(label, delta_color(delta_ms, config));
}

pub fn clear_delta(display: &mut dyn Display, label: Label) {
    display.set_text(label, PLACEHOLDER);
    display.set_color(label, Color::WHITE);
}
