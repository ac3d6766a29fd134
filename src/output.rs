//! # Terminal Output
//!
//! Decides whether results go to stdout decorated (emoji) or plain, and
//! renders batch reports. Log lines go to stderr through `env_logger` and
//! are not affected by anything here.
//!
//! Decoration follows, in order:
//! - `--color=always|never` on the command line
//! - `NO_COLOR` (any value), `CLICOLOR=0`, `CLICOLOR_FORCE=1`, `TERM=dumb`
//! - whether stdout is a terminal

use std::env;

use crate::pipeline::BatchReport;

/// Output configuration for stdout results.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve from the `--color` value (`always`, `never` or `auto`).
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// `emoji_str` when decorating, `plain` otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// One line per action followed by a summary line.
///
/// `verb` names what was done, e.g. `built` or `deployed`.
pub fn render_report(config: &OutputConfig, verb: &str, report: &BatchReport, seconds: f64) -> String {
    let ok = emoji(config, "✅", "[OK]");
    let failed = emoji(config, "❌", "[FAILED]");

    let mut lines: Vec<String> = report
        .succeeded
        .iter()
        .map(|name| format!("{} {} {}", ok, verb, name))
        .collect();
    lines.extend(
        report
            .failed
            .iter()
            .map(|failure| format!("{} {}: {}", failed, failure.action, failure.error)),
    );

    let summary = if report.is_success() {
        format!(
            "{} {} {} action(s) in {:.2}s",
            emoji(config, "🚀", "[DONE]"),
            verb,
            report.succeeded.len(),
            seconds
        )
    } else {
        format!(
            "{} {} of {} action(s) failed in {:.2}s",
            emoji(config, "⚠️", "[ERROR]"),
            report.failed.len(),
            report.attempted(),
            seconds
        )
    };
    lines.push(summary);
    lines.join("\n")
}
