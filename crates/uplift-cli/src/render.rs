use std::io::IsTerminal;
use std::time::Duration;

use anstyle::{AnsiColor, Effects, Style};
use indicatif::{ProgressBar, ProgressStyle};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum OutputStyle {
    Plain,
    Rich,
}

pub(crate) fn output_style(plain_flag: bool) -> OutputStyle {
    if plain_flag || !std::io::stdout().is_terminal() {
        OutputStyle::Plain
    } else {
        OutputStyle::Rich
    }
}

pub(crate) fn render_status_line(style: OutputStyle, status: &str, message: &str) -> String {
    match style {
        OutputStyle::Plain => format!("{status}: {message}"),
        OutputStyle::Rich => format!("{} {message}", colorize(status_style(), status)),
    }
}

pub(crate) fn render_final_line(style: OutputStyle, message: &str) -> String {
    match style {
        OutputStyle::Plain => message.to_string(),
        OutputStyle::Rich => colorize(final_style(), message),
    }
}

pub(crate) fn start_download_progress(style: OutputStyle, label: &str, total: u64) -> Option<ProgressBar> {
    if style != OutputStyle::Rich {
        return None;
    }

    let progress_bar = if total > 0 {
        let progress_bar = ProgressBar::new(total);
        if let Ok(template) = ProgressStyle::with_template(
            "{spinner:.cyan.bold} {msg:<10} [{bar:20.cyan/blue}] {bytes}/{total_bytes}",
        ) {
            progress_bar.set_style(template.progress_chars("=>-"));
        }
        progress_bar
    } else {
        let progress_bar = ProgressBar::new_spinner();
        if let Ok(template) =
            ProgressStyle::with_template("{spinner:.cyan.bold} {msg:<10} {bytes}")
        {
            progress_bar.set_style(template);
        }
        progress_bar
    };

    progress_bar.set_message(label.to_string());
    progress_bar.enable_steady_tick(Duration::from_millis(80));
    Some(progress_bar)
}

fn colorize(style: Style, text: &str) -> String {
    format!("{}{}{}", style.render(), text, style.render_reset())
}

fn status_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightCyan.into()))
        .effects(Effects::BOLD)
}

fn final_style() -> Style {
    Style::new()
        .fg_color(Some(AnsiColor::BrightGreen.into()))
        .effects(Effects::BOLD)
}
