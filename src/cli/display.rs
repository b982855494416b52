//! Display utilities for the countdown CLI.
//!
//! Each `show_*` prints what the matching `render_*` returns, so the text can
//! be checked in tests without capturing stdout.

use crate::types::{IpcResponse, ResponseData};

/// Placeholder when the daemon sent no time.
const NO_TIME: &str = "-- : --";

// ============================================================================
// Display
// ============================================================================

/// Display utilities for CLI output.
pub struct Display;

impl Display {
    /// Shows a success message for countdown start.
    pub fn show_start_success(response: &IpcResponse) {
        println!("{}", Self::render_start_success(response));
    }

    /// Shows a success message for a new selection.
    pub fn show_set_success(response: &IpcResponse) {
        println!("{}", Self::render_set_success(response));
    }

    /// Shows a success message for countdown stop.
    pub fn show_stop_success(response: &IpcResponse) {
        println!("{}", Self::render_stop_success(response));
    }

    /// Shows the current countdown status.
    pub fn show_status(response: &IpcResponse) {
        println!("{}", Self::render_status(response));
    }

    /// Redraws the single watch line in place.
    pub fn show_watch_frame(data: &ResponseData) {
        use std::io::Write;

        print!("\r{}  ", Self::render_watch_frame(data));
        let _ = std::io::stdout().flush();
    }

    /// Shows a warning message.
    pub fn show_warning(message: &str) {
        eprintln!("警告: {}", message);
    }

    /// Shows an error message.
    pub fn show_error(message: &str) {
        eprintln!("エラー: {}", message);
    }

    // ------------------------------------------------------------------------
    // Rendering
    // ------------------------------------------------------------------------

    pub fn render_start_success(response: &IpcResponse) -> String {
        let mut lines = vec!["▶ カウントダウンを開始しました".to_string()];
        if let Some(data) = &response.data {
            lines.push(format!("  残り時間: {}", Self::time_of(data)));
            if let Some(warning) = &data.warning {
                lines.push(format!("  警告: {}", warning));
            }
        }
        lines.join("\n")
    }

    pub fn render_set_success(response: &IpcResponse) -> String {
        let mut lines = vec!["* 時間を設定しました".to_string()];
        if let Some(data) = &response.data {
            lines.push(format!("  設定: {}", Self::time_of(data)));
        }
        lines.join("\n")
    }

    pub fn render_stop_success(response: &IpcResponse) -> String {
        let mut lines = vec!["■ カウントダウンを停止しました".to_string()];
        if let Some(data) = &response.data {
            lines.push(format!("  残り時間: {}", Self::time_of(data)));
        }
        lines.join("\n")
    }

    pub fn render_status(response: &IpcResponse) -> String {
        let Some(data) = &response.data else {
            return "カウントダウンの状態を取得できませんでした".to_string();
        };

        let mut lines = vec![
            "カウントダウン ステータス".to_string(),
            "─────────────────────────────".to_string(),
            format!("状態: {}", Self::state_label(data.state.as_deref())),
            format!("残り時間: {}", Self::time_of(data)),
        ];
        if data.can_start == Some(true) {
            lines.push("'countdown start' で開始できます".to_string());
        }
        if let Some(warning) = &data.warning {
            lines.push(format!("警告: {}", warning));
        }
        lines.join("\n")
    }

    pub fn render_watch_frame(data: &ResponseData) -> String {
        format!(
            "{}  [{}]",
            Self::time_of(data),
            Self::state_label(data.state.as_deref())
        )
    }

    fn time_of(data: &ResponseData) -> &str {
        data.display.as_deref().unwrap_or(NO_TIME)
    }

    fn state_label(state: Option<&str>) -> &str {
        match state {
            Some("idle") => "待機中",
            Some("running") => "実行中",
            Some("completed") => "終了",
            Some(other) => other,
            None => "不明",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
