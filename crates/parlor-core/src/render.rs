use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use unicode_width::UnicodeWidthStr;

use crate::config::Config;
use crate::model::{Appointment, AppointmentStatus, Notification, Period, Service, TimeSlot};

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

    #[tracing::instrument(skip(self, services))]
    pub fn print_services(&mut self, services: &[Service]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Service".to_string(),
            "Price".to_string(),
            "Minutes".to_string(),
            "Description".to_string(),
        ];

        let mut rows = Vec::with_capacity(services.len());
        for service in services {
            rows.push(vec![
                self.paint(&service.id, "33"),
                service.name.clone(),
                format!("{:.2}", service.price),
                service.duration_minutes.to_string(),
                service.description.clone(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    #[tracing::instrument(skip(self, appointments))]
    pub fn print_appointments(&mut self, appointments: &[Appointment]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "Date".to_string(),
            "Time".to_string(),
            "Service".to_string(),
            "Status".to_string(),
            "Notes".to_string(),
        ];

        let mut rows = Vec::with_capacity(appointments.len());
        for appointment in appointments {
            let status = self.paint_status(appointment.status);
            rows.push(vec![
                self.paint(&appointment.id, "33"),
                appointment.date.format("%Y-%m-%d").to_string(),
                appointment.time.clone().unwrap_or_else(|| "-".to_string()),
                appointment.service_name.clone(),
                status,
                appointment.notes.clone().unwrap_or_default(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    /// Slots grouped by period, unavailable ones struck through in grey.
    #[tracing::instrument(skip(self, slots))]
    pub fn print_slots(&mut self, slots: &[TimeSlot]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        if slots.is_empty() {
            writeln!(out, "No bookable slots.")?;
            return Ok(());
        }

        for period in [Period::Morning, Period::Afternoon, Period::Evening] {
            let in_period: Vec<&TimeSlot> =
                slots.iter().filter(|s| s.period == period).collect();
            if in_period.is_empty() {
                continue;
            }

            writeln!(out, "{}", period.label())?;
            let mut line = String::new();
            for slot in in_period {
                let cell = if slot.available {
                    self.paint(&slot.time, "32")
                } else {
                    self.paint(&format!("{} (taken)", slot.time), "90")
                };
                line.push_str(&cell);
                line.push_str("  ");
            }
            writeln!(out, "  {}", line.trim_end())?;
        }

        Ok(())
    }

    #[tracing::instrument(skip(self, week))]
    pub fn print_week(&mut self, week: &[NaiveDate], today: NaiveDate) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        for date in week {
            writeln!(out, "{}", self.paint_day(*date, today))?;
        }
        Ok(())
    }

    /// The month grid as seven columns, Monday first, blanks where the
    /// month hasn't started or has ended.
    #[tracing::instrument(skip(self, grid))]
    pub fn print_month_grid(
        &mut self,
        grid: &[Option<NaiveDate>],
        today: NaiveDate,
    ) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        writeln!(out, "Mon Tue Wed Thu Fri Sat Sun")?;
        for week in grid.chunks(7) {
            let mut line = String::new();
            for cell in week {
                match cell {
                    Some(date) => {
                        let text = format!("{:>3}", date.day());
                        if *date == today {
                            line.push_str(&self.paint(&text, "7"));
                        } else {
                            line.push_str(&text);
                        }
                    }
                    None => line.push_str("   "),
                }
                line.push(' ');
            }
            writeln!(out, "{}", line.trim_end())?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, notifications))]
    pub fn print_notifications(&mut self, notifications: &[Notification]) -> anyhow::Result<()> {
        let mut out = io::stdout().lock();

        let headers = vec![
            "ID".to_string(),
            "".to_string(),
            "Title".to_string(),
            "Message".to_string(),
        ];

        let mut rows = Vec::with_capacity(notifications.len());
        for notification in notifications {
            let marker = if notification.read { " " } else { "*" };
            let title = if notification.read {
                notification.title.clone()
            } else {
                self.paint(&notification.title, "1")
            };
            rows.push(vec![
                self.paint(&notification.id, "33"),
                marker.to_string(),
                title,
                notification.message.clone(),
            ]);
        }

        write_table(&mut out, headers, rows)?;
        Ok(())
    }

    fn paint_day(&self, date: NaiveDate, today: NaiveDate) -> String {
        let text = date.format("%a %Y-%m-%d").to_string();
        if date == today {
            self.paint(&text, "7")
        } else {
            text
        }
    }

    fn paint_status(&self, status: AppointmentStatus) -> String {
        let code = match status {
            AppointmentStatus::Pending => "33",
            AppointmentStatus::Confirmed => "32",
            AppointmentStatus::Cancelled => "31",
            AppointmentStatus::Completed => "90",
        };
        self.paint(status.label(), code)
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color || !io::stdout().is_terminal() {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
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
