use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::contexts::{ContextInfo, CustomContext, get_context_info};
use crate::selectors::TodoStats;
use crate::store::filter::FilterState;
use crate::store::image::ImageProcessingState;
use crate::store::plan::UserPlan;
use crate::store::pomodoro::{Phase, PomodoroState};
use crate::task::Task;

const PROGRESS_BAR_WIDTH: usize = 30;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    pub fn plain() -> Self {
        Self { color: false }
    }

    #[tracing::instrument(skip_all, fields(count = tasks.len()))]
    pub fn print_todo_table(
        &self,
        tasks: &[Task],
        custom: &[CustomContext],
        filter: &FilterState,
    ) -> anyhow::Result<()> {
        self.write_todo_table(io::stdout().lock(), tasks, custom, filter)
    }

    pub fn write_todo_table<W: Write>(
        &self,
        mut out: W,
        tasks: &[Task],
        custom: &[CustomContext],
        filter: &FilterState,
    ) -> anyhow::Result<()> {
        if tasks.is_empty() {
            writeln!(
                out,
                "No {} tasks in {}.",
                filter.status,
                filter.context
            )?;
            return Ok(());
        }

        let headers = vec![
            "ID".to_string(),
            "Done".to_string(),
            "Context".to_string(),
            "Task".to_string(),
        ];

        let rows = tasks
            .iter()
            .map(|task| {
                let info = get_context_info(task.context.as_str(), custom);
                let done = if task.completed { "[x]" } else { "[ ]" };
                let text = if task.completed {
                    self.paint(&task.text, "9")
                } else {
                    task.text.clone()
                };
                vec![
                    self.paint(&task.id.to_string(), "33"),
                    done.to_string(),
                    self.context_label(&info),
                    text,
                ]
            })
            .collect();

        write_table(&mut out, headers, rows)
    }

    pub fn print_stats(&self, stats: TodoStats) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "total      {}", stats.total)?;
        writeln!(out, "active     {}", stats.active)?;
        writeln!(out, "completed  {}", stats.completed)?;
        Ok(())
    }

    pub fn print_contexts(
        &self,
        contexts: &[ContextInfo<'_>],
        filter: &FilterState,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let headers = vec![
            "ID".to_string(),
            "Context".to_string(),
            "Kind".to_string(),
            "Description".to_string(),
        ];
        let rows = contexts
            .iter()
            .map(|info| {
                let selected = filter.context.to_string() == info.id;
                let id = if selected {
                    format!("{}*", info.id)
                } else {
                    info.id.to_string()
                };
                vec![
                    id,
                    self.context_label(info),
                    if info.builtin { "built-in" } else { "custom" }.to_string(),
                    info.description.to_string(),
                ]
            })
            .collect();
        write_table(&mut out, headers, rows)
    }

    pub fn print_plan(&self, plan: UserPlan) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", self.paint(plan.name(), "1"))?;
        for feature in plan.features() {
            writeln!(out, "  - {feature}")?;
        }
        Ok(())
    }

    pub fn print_pomodoro(&self, pomodoro: &PomodoroState) -> anyhow::Result<()> {
        self.write_pomodoro(io::stdout().lock(), pomodoro)
    }

    pub fn write_pomodoro<W: Write>(&self, mut out: W, pomodoro: &PomodoroState) -> anyhow::Result<()> {
        let phase = match pomodoro.phase() {
            Phase::Idle => "idle",
            Phase::FocusRunning => "focus",
            Phase::FocusPaused => "focus (paused)",
            Phase::BreakReady => "break ready",
            Phase::BreakRunning => "break",
            Phase::BreakPaused => "break (paused)",
        };
        writeln!(out, "phase      {phase}")?;
        writeln!(
            out,
            "clock      {} {}",
            pomodoro.clock(),
            progress_bar(pomodoro.progress_percent())
        )?;
        if let Some(task) = &pomodoro.active_task {
            writeln!(out, "task       {} {}", task.id, task.text)?;
        }
        writeln!(out, "completed  {}", pomodoro.completed_count)?;
        Ok(())
    }

    /// Redraws the single countdown line in place.
    pub fn print_tick(&self, pomodoro: &PomodoroState) -> anyhow::Result<()> {
        let mut err = io::stderr().lock();
        let label = if pomodoro.is_break { "break" } else { "focus" };
        write!(
            err,
            "\r{label} {} {}",
            pomodoro.clock(),
            progress_bar(pomodoro.progress_percent())
        )?;
        err.flush()?;
        Ok(())
    }

    pub fn print_progress(&self, percent: u8) -> anyhow::Result<()> {
        let mut err = io::stderr().lock();
        write!(err, "\rscanning {} {percent:>3}%", progress_bar(f64::from(percent)))?;
        err.flush()?;
        Ok(())
    }

    pub fn print_candidates(
        &self,
        image: &ImageProcessingState,
        custom: &[CustomContext],
    ) -> anyhow::Result<()> {
        self.write_candidates(io::stdout().lock(), image, custom)
    }

    pub fn write_candidates<W: Write>(
        &self,
        mut out: W,
        image: &ImageProcessingState,
        custom: &[CustomContext],
    ) -> anyhow::Result<()> {
        if let Some(error) = &image.error {
            writeln!(out, "{}", self.paint(&format!("warning: {error}"), "31"))?;
        }
        if image.candidates.is_empty() {
            writeln!(out, "No candidates pending review.")?;
            return Ok(());
        }

        let headers = vec![
            "#".to_string(),
            "Pick".to_string(),
            "Conf".to_string(),
            "Context".to_string(),
            "Candidate".to_string(),
        ];
        let rows = image
            .candidates
            .iter()
            .enumerate()
            .map(|(idx, candidate)| {
                let picked = if image.is_selected(&candidate.text) {
                    "[x]"
                } else {
                    "[ ]"
                };
                let context = candidate
                    .context
                    .as_ref()
                    .map(|id| self.context_label(&get_context_info(id.as_str(), custom)))
                    .unwrap_or_default();
                vec![
                    self.paint(&(idx + 1).to_string(), "33"),
                    picked.to_string(),
                    format!("{:.0}%", candidate.confidence * 100.0),
                    context,
                    candidate.text.clone(),
                ]
            })
            .collect();
        write_table(&mut out, headers, rows)?;
        writeln!(
            out,
            "{} of {} selected",
            image.selected.len(),
            image.candidates.len()
        )?;
        Ok(())
    }

    fn context_label(&self, info: &ContextInfo<'_>) -> String {
        let label = format!("{} {}", info.icon, info.label);
        match hex_to_rgb(info.color) {
            Some((r, g, b)) => self.paint(&label, &format!("38;2;{r};{g};{b}")),
            None => label,
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn progress_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * PROGRESS_BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled)
    )
}

fn hex_to_rgb(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#').filter(|h| h.is_ascii())?;
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        6 => Some((channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
        3 => {
            let short = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
            Some((short(0)?, short(1)?, short(2)?))
        }
        _ => None,
    }
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(UnicodeWidthStr::width(header.as_str()));
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(UnicodeWidthStr::width(strip_ansi(cell).as_str()));
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{header:width$} ")?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "")?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = width.saturating_sub(visible_width);
            write!(writer, "{}{} ", cell, " ".repeat(padding))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::ContextId;

    fn rendered(f: impl FnOnce(&mut Vec<u8>) -> anyhow::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).expect("render");
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn table_pads_by_display_width_ignoring_ansi() {
        let out = rendered(|buf| {
            write_table(
                buf,
                vec!["A".to_string(), "B".to_string()],
                vec![
                    vec!["\x1b[33m1\x1b[0m".to_string(), "x".to_string()],
                    vec!["📥 Inbox".to_string(), "y".to_string()],
                ],
            )
        });
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "A        B ");
        assert_eq!(lines[1], "-------- - ");
        assert_eq!(strip_ansi(lines[2]), "1        x ");
    }

    #[test]
    fn todo_table_marks_completion_and_context() {
        let mut done = Task::new(2, "file taxes".to_string(), ContextId::from("computer"));
        done.completed = true;
        let tasks = vec![
            Task::new(1, "call bank".to_string(), ContextId::from("calls")),
            done,
        ];
        let out = rendered(|buf| {
            Renderer::plain().write_todo_table(buf, &tasks, &[], &FilterState::default())
        });
        assert!(out.contains("[ ]"));
        assert!(out.contains("[x]"));
        assert!(out.contains("Calls"));
        assert!(out.contains("file taxes"));
    }

    #[test]
    fn empty_view_names_the_filter() {
        let out = rendered(|buf| {
            Renderer::plain().write_todo_table(buf, &[], &[], &FilterState::default())
        });
        assert_eq!(out.trim(), "No all tasks in all.");
    }

    #[test]
    fn pomodoro_block_shows_clock_and_task() {
        let mut pomodoro = PomodoroState::default();
        pomodoro.start(42, "write spec");
        for _ in 0..90 {
            pomodoro.tick();
        }
        let out = rendered(|buf| Renderer::plain().write_pomodoro(buf, &pomodoro));
        assert!(out.contains("phase      focus"));
        assert!(out.contains("23:30"));
        assert!(out.contains("42 write spec"));
    }

    #[test]
    fn hex_colors_expand() {
        assert_eq!(hex_to_rgb("#3B82F6"), Some((0x3B, 0x82, 0xF6)));
        assert_eq!(hex_to_rgb("#fff"), Some((255, 255, 255)));
        assert_eq!(hex_to_rgb("blue"), None);
    }

    #[test]
    fn progress_bar_is_fixed_width() {
        assert_eq!(progress_bar(0.0).len(), PROGRESS_BAR_WIDTH + 2);
        assert_eq!(progress_bar(250.0), format!("[{}]", "#".repeat(PROGRESS_BAR_WIDTH)));
    }
}
