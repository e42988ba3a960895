use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::NaiveDate;
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::dates::{
    DayClass, classify_date, days_in_month, first_weekday_of_month, month_name,
    weekday_names_short,
};
use crate::model::DayDetail;
use crate::store::AppState;

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

        Ok(Self { color })
    }

    /// One row per visible month: day totals plus how much of the month has
    /// been painted, decorated, or given a checklist.
    #[tracing::instrument(skip(self, state, today))]
    pub fn print_year_overview(&mut self, state: &AppState, today: NaiveDate) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(
            out,
            "{} ({} view, zoom {:.2}, {})",
            state.current_year, state.view_mode, state.zoom, state.language
        )?;

        let headers = vec![
            "Month".to_string(),
            "Days".to_string(),
            "Painted".to_string(),
            "Objects".to_string(),
            "Todos".to_string(),
        ];

        let mut rows = Vec::new();
        for month in visible_months(state, today) {
            let name = month_name(month.month_index, state.language)?;
            let painted = month
                .days
                .iter()
                .filter(|day| day.background_color.is_some())
                .count();
            let objects: usize = month.days.iter().map(|day| day.objects.len()).sum();
            let todos = month.days.iter().filter(|day| day.has_day_detail).count();
            rows.push(vec![
                name.to_string(),
                month.days.len().to_string(),
                painted.to_string(),
                objects.to_string(),
                todos.to_string(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    /// Classic weekday grid, Sunday first. Today is highlighted, past days
    /// dimmed; `*` marks a day with a checklist, `+` one with visuals.
    #[tracing::instrument(skip(self, state, today))]
    pub fn print_month_grid(
        &mut self,
        state: &AppState,
        month_index: u32,
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();
        let year = state.current_year;

        writeln!(out, "{} {}", month_name(month_index, state.language)?, year)?;
        for name in weekday_names_short(state.language) {
            write!(out, "{name:>3} ")?;
        }
        writeln!(out)?;

        let leading = first_weekday_of_month(year, month_index);
        let mut column = 0;
        for _ in 0..leading {
            write!(out, "    ")?;
            column += 1;
        }

        for day in 1..=days_in_month(year, month_index) {
            let key = format!("{year:04}-{:02}-{day:02}", month_index + 1);
            let visual = state.year_data.find_day(&key);
            let mark = match visual {
                Some(v) if v.has_day_detail => '*',
                Some(v) if v.background_color.is_some() || !v.objects.is_empty() => '+',
                _ => ' ',
            };

            let mut cell = format!("{day:>2}{mark}");
            if let Some(date) = NaiveDate::from_ymd_opt(year, month_index + 1, day) {
                cell = match classify_date(date, today) {
                    DayClass::Today => self.paint(&cell, "7"),
                    DayClass::Past => self.paint(&cell, "2"),
                    DayClass::Future => cell,
                };
            }
            write!(out, "{cell} ")?;

            column += 1;
            if column == 7 {
                writeln!(out)?;
                column = 0;
            }
        }
        if column != 0 {
            writeln!(out)?;
        }

        Ok(())
    }

    /// Checklist (in manual order) plus notes for one day.
    #[tracing::instrument(skip(self, detail))]
    pub fn print_day_detail(
        &mut self,
        date: &str,
        detail: Option<&DayDetail>,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let Some(detail) = detail else {
            writeln!(out, "No detail for {date}.")?;
            return Ok(());
        };

        writeln!(out, "{date}")?;

        let headers = vec!["#".to_string(), "Done".to_string(), "Text".to_string()];
        let mut rows = Vec::new();
        for (idx, item) in detail.checklist_sorted().into_iter().enumerate() {
            let done = if item.done { "[x]" } else { "[ ]" };
            let text = if item.done {
                self.paint(&item.text, "2")
            } else {
                item.text.clone()
            };
            rows.push(vec![(idx + 1).to_string(), done.to_string(), text]);
        }
        if rows.is_empty() {
            writeln!(out, "(no checklist)")?;
        } else {
            write_table(&mut out, headers, rows)?;
        }

        match detail.notes.as_deref() {
            Some(notes) if !notes.trim().is_empty() => writeln!(out, "notes: {notes}")?,
            _ => {}
        }
        if let Some(modified) = detail.last_modified {
            writeln!(out, "modified: {}", modified.format("%Y-%m-%d %H:%M:%S UTC"))?;
        }

        Ok(())
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

/// Remaining view trims months already fully behind `today` when the loaded
/// year is the current one; other years always show in full.
fn visible_months<'a>(
    state: &'a AppState,
    today: NaiveDate,
) -> impl Iterator<Item = &'a crate::model::MonthData> {
    use chrono::Datelike;
    use crate::model::ViewMode;

    let start = match state.view_mode {
        ViewMode::FullYear => 0,
        ViewMode::Remaining if state.current_year == today.year() => today.month0(),
        ViewMode::Remaining => 0,
    };
    state
        .year_data
        .months
        .iter()
        .filter(move |month| month.month_index >= start)
        .map(|month| month.as_ref())
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

    for idx in 0..column_count {
        write!(writer, "{:width$} ", headers[idx], width = widths[idx])?;
    }
    writeln!(writer)?;

    for idx in 0..column_count {
        write!(writer, "{:-<width$} ", "", width = widths[idx])?;
    }
    writeln!(writer)?;

    for row in rows {
        for idx in 0..column_count {
            let cell = &row[idx];
            let visible_width = UnicodeWidthStr::width(strip_ansi(cell).as_str());
            let padding = widths[idx].saturating_sub(visible_width);
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

    #[test]
    fn table_widths_ignore_ansi_codes() {
        let mut buffer = Vec::new();
        let headers = vec!["A".to_string(), "B".to_string()];
        let rows = vec![vec!["\x1b[31mred\x1b[0m".to_string(), "x".to_string()]];
        write_table(&mut buffer, headers, rows).expect("write table");
        let text = String::from_utf8(buffer).expect("utf8");
        assert!(text.contains("red"));
        assert!(text.lines().count() >= 3);
    }

    #[test]
    fn strip_ansi_removes_escape_sequences() {
        assert_eq!(strip_ansi("\x1b[7m15 \x1b[0m"), "15 ");
        assert_eq!(strip_ansi("plain"), "plain");
    }
}
