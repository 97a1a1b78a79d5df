use crate::config::{AppConfig, ClickAction, DeltaColor, LogBest, MAX_LAP_ROWS};
use crate::timing::SessionTracker;

use super::{
    Color, Display, Label, NO_DRIVER_TEXT, SettingRow, clear_delta, set_delta, time_to_string,
};

/// Positions this close to the line are still considered "on the line"
const MIN_LIVE_POSITION: f32 = 0.00001;

/// Renders the session tracker onto lap rows, the current lap and the totals.
///
/// Lap rows, total and reference are only rewritten when a lap completes or the layout changed.
/// The current row and the delta are refreshed on every call.
#[derive(Debug)]
pub struct LapsView {
    last_lap_rendered: Option<u32>,
    layout_dirty: bool,
}

impl Default for LapsView {
    fn default() -> Self {
        Self::new()
    }
}

impl LapsView {
    pub fn new() -> Self {
        Self {
            last_lap_rendered: None,
            layout_dirty: true,
        }
    }

    /// Force a full redraw on the next render, after a settings change
    pub fn invalidate(&mut self) {
        self.layout_dirty = true;
    }

    /// Hook up the clickable labels.
    pub fn register_clicks(&self, display: &mut dyn Display) {
        display.on_click(Label::Driver, ClickAction::CycleDriver);
        for action in ClickAction::ALL {
            display.on_click(Label::Button(action), action);
        }
    }

    pub fn render(&mut self, tracker: &SessionTracker, config: &AppConfig, display: &mut dyn Display) {
        if self.layout_dirty {
            render_layout(config, display);
        }

        // the lap just changed, wait until its time settles
        if tracker.just_crossed_sf() {
            return;
        }

        let live = tracker.sf_crossed()
            && tracker.has_reference_curve()
            && !tracker.is_replay()
            && tracker.position() > MIN_LIVE_POSITION;

        render_current(tracker, config, live, display);

        let laps_stale = self.layout_dirty || self.last_lap_rendered != tracker.last_lap_refreshed();
        if laps_stale && !tracker.is_replay() {
            render_laps(tracker, config, display);
            self.last_lap_rendered = tracker.last_lap_refreshed();
            self.layout_dirty = false;
        }

        match tracker.personal_delta_ms().filter(|_| live) {
            Some(delta) => set_delta(display, Label::PersonalBestDelta, delta, config),
            None => clear_delta(display, Label::PersonalBestDelta),
        }

        let driver = if config.current_driver.is_empty() {
            NO_DRIVER_TEXT
        } else {
            &config.current_driver
        };
        display.set_text(Label::Driver, driver);
    }
}

fn render_layout(config: &AppConfig, display: &mut dyn Display) {
    let rows = config.lap_displayed_count.min(MAX_LAP_ROWS);
    for row in 0..MAX_LAP_ROWS {
        let visible = row < rows;
        display.set_visible(Label::LapNumber(row), visible);
        display.set_visible(Label::LapTime(row), visible);
        display.set_visible(Label::LapDelta(row), visible && config.show_delta);
    }

    display.set_visible(Label::CurrentTime, config.show_current);
    display.set_visible(Label::CurrentDelta, config.show_current && config.show_delta);

    display.set_visible(Label::ReferenceName, config.show_reference);
    display.set_visible(Label::ReferenceTime, config.show_reference);
    display.set_visible(Label::ReferenceHolder, config.show_reference);
    display.set_text(Label::ReferenceName, config.reference.label());

    display.set_visible(Label::TotalTime, config.show_total);
}

fn render_current(tracker: &SessionTracker, config: &AppConfig, live: bool, display: &mut dyn Display) {
    if live {
        display.set_text(
            Label::CurrentTime,
            &time_to_string(tracker.projection_ms()),
        );
        let delta = tracker.adjusted_performance_ms();
        set_delta(display, Label::CurrentDelta, delta, config);
        set_delta(display, Label::DeltaWindow, delta, config);
    } else {
        display.set_text(
            Label::CurrentTime,
            &time_to_string(tracker.current_time_ms() as f64),
        );
        clear_delta(display, Label::CurrentDelta);
        clear_delta(display, Label::DeltaWindow);
    }

    let time_color = if tracker.lap_invalidated() {
        Color::RED
    } else {
        Color::WHITE
    };
    display.set_color(Label::CurrentTime, time_color);
}

fn render_laps(tracker: &SessionTracker, config: &AppConfig, display: &mut dyn Display) {
    let laps = tracker.laps();
    let rows = config.lap_displayed_count.min(MAX_LAP_ROWS);
    let first = laps.len().saturating_sub(rows);
    let session_best_ms = tracker.records().session_best_ms();
    let reference_ms = tracker.reference_ms() as f64;
    let exit_lap = tracker
        .pit_exit()
        .exit_lap()
        .map(|lap| lap as usize)
        .filter(|&lap| lap > 0);
    let laps_done = tracker.laps_done() as usize;

    for row in 0..rows {
        let lap_index = first + row;
        let number = match exit_lap {
            Some(exit) if exit <= lap_index && lap_index < laps_done => {
                format!("{}. ({})", lap_index + 1, lap_index - exit + 1)
            }
            _ => format!("{}.", lap_index + 1),
        };
        display.set_text(Label::LapNumber(row), &number);

        match laps.get(lap_index) {
            Some(&lap_ms) => {
                display.set_text(Label::LapTime(row), &time_to_string(lap_ms as f64));
                let color = if lap_ms == session_best_ms {
                    Color::GREEN
                } else {
                    Color::WHITE
                };
                display.set_color(Label::LapTime(row), color);
                set_delta(
                    display,
                    Label::LapDelta(row),
                    lap_ms as f64 - reference_ms,
                    config,
                );
            }
            None => {
                display.set_text(Label::LapTime(row), &time_to_string(0.));
                display.set_color(Label::LapTime(row), Color::WHITE);
                clear_delta(display, Label::LapDelta(row));
            }
        }
    }

    display.set_text(Label::TotalTime, &time_to_string(tracker.total_ms() as f64));
    display.set_text(
        Label::ReferenceTime,
        &time_to_string(tracker.reference_ms() as f64),
    );
    display.set_text(Label::ReferenceHolder, tracker.records().best_holder());
}

fn yes_or_no(value: bool) -> &'static str {
    if value { "Yes" } else { "No" }
}

/// Write the settings panel values.
pub fn render_settings(config: &AppConfig, best_lap_ms: u32, display: &mut dyn Display) {
    let threshold = |ms: i32| format!("{:+.1} s", ms as f64 / 1000.);
    let refresh = match config.update_time_ms {
        0 => "Min".to_string(),
        50 => "0.05 s".to_string(),
        ms => format!("{:.1} s", ms as f64 / 1000.),
    };
    let log_best = match config.log_best {
        LogBest::Always => "Always",
        LogBest::Sessions => "Sessions",
        LogBest::Never => "Never",
    };
    let delta_color = match config.delta_color {
        DeltaColor::White => "White",
        DeltaColor::Yellow => "Yellow",
    };
    let lock = if config.lock_best { "Locked" } else { "Unlocked" };

    let rows = [
        (SettingRow::LapCount, config.lap_displayed_count.to_string()),
        (SettingRow::ShowDelta, yes_or_no(config.show_delta).to_string()),
        (SettingRow::DeltaColor, delta_color.to_string()),
        (SettingRow::RedAt, threshold(config.red_at_ms)),
        (SettingRow::GreenAt, threshold(config.green_at_ms)),
        (SettingRow::ShowCurrent, yes_or_no(config.show_current).to_string()),
        (SettingRow::Reference, config.reference.title().to_string()),
        (SettingRow::ShowReference, yes_or_no(config.show_reference).to_string()),
        (SettingRow::ShowTotal, yes_or_no(config.show_total).to_string()),
        (SettingRow::Refresh, refresh),
        (SettingRow::LogLaps, yes_or_no(config.log_laps).to_string()),
        (SettingRow::LogBest, log_best.to_string()),
        (SettingRow::BestLap, time_to_string(best_lap_ms as f64)),
        (SettingRow::LockBest, lock.to_string()),
        (
            SettingRow::IgnoreInvalidation,
            yes_or_no(config.ignore_lap_invalidation).to_string(),
        ),
        (SettingRow::Drivers, config.drivers_text()),
    ];
    for (row, text) in rows {
        display.set_text(Label::Setting(row), &text);
    }
}
