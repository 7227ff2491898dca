use std::io::{self, BufRead, Write};

use anyhow::{Context, anyhow};
use chrono::Utc;
use tokio::runtime::Runtime;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, BookingRequest};
use crate::availability;
use crate::calendar::{self, CalendarMode};
use crate::cli::Invocation;
use crate::config::Config;
use crate::datetime;
use crate::render::Renderer;
use crate::schedule::{self, DateOrder, StatusFilter};
use crate::session::{SessionStore, Theme};
use crate::slots;

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "services",
        "slots",
        "book",
        "appointments",
        "cancel",
        "remove",
        "calendar",
        "notifications",
        "login",
        "logout",
        "theme",
        "help",
        "version",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[instrument(skip(cfg, store, renderer, runtime, inv))]
pub fn dispatch(
    cfg: &Config,
    store: &SessionStore,
    renderer: &mut Renderer,
    runtime: &Runtime,
    inv: Invocation,
) -> anyhow::Result<()> {
    let session = store.load()?;
    let api = ApiClient::new(&cfg.api_url(), session.token.clone())?;

    debug!(
        command = %inv.command,
        args = ?inv.args,
        logged_in = session.is_logged_in(),
        "dispatching command"
    );

    match inv.command.as_str() {
        "services" => cmd_services(renderer, runtime, &api),
        "slots" => cmd_slots(cfg, renderer, runtime, &api, &inv.args),
        "book" => cmd_book(runtime, &api, &session, &inv.args),
        "appointments" => cmd_appointments(renderer, runtime, &api, &session, &inv.args),
        "cancel" => cmd_cancel(runtime, &api, &session, &inv.args),
        "remove" => cmd_remove(runtime, &api, &session, &inv.args),
        "calendar" => cmd_calendar(renderer, &inv.args),
        "notifications" => cmd_notifications(renderer, runtime, &api, &session, &inv.args),
        "login" => cmd_login(store, runtime, &api, &inv.args),
        "logout" => cmd_logout(store),
        "theme" => cmd_theme(store, &inv.args),
        "help" => cmd_help(),
        "version" => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        other => Err(anyhow!("unknown command: {other}")),
    }
}

fn require_login(session: &crate::session::Session) -> anyhow::Result<()> {
    if session.is_logged_in() {
        Ok(())
    } else {
        Err(anyhow!("not logged in; run 'parlor login <email>' first"))
    }
}

#[instrument(skip(renderer, runtime, api))]
fn cmd_services(
    renderer: &mut Renderer,
    runtime: &Runtime,
    api: &ApiClient,
) -> anyhow::Result<()> {
    info!("command services");

    let services = runtime
        .block_on(api.list_services())
        .context("could not load services")?;

    debug!(count = services.len(), "loaded services");
    renderer.print_services(&services)?;
    Ok(())
}

#[instrument(skip(cfg, renderer, runtime, api, args))]
fn cmd_slots(
    cfg: &Config,
    renderer: &mut Renderer,
    runtime: &Runtime,
    api: &ApiClient,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command slots");

    let service_id = args
        .first()
        .ok_or_else(|| anyhow!("usage: parlor slots <service-id> [date]"))?;
    let today = datetime::salon_today(Utc::now());
    let date = match args.get(1) {
        Some(raw) => datetime::parse_date_arg(raw, today)?,
        None => today,
    };

    let services = runtime
        .block_on(api.list_services())
        .context("could not load services")?;
    let service = services
        .iter()
        .find(|s| &s.id == service_id)
        .ok_or_else(|| anyhow!("unknown service: {service_id}"))?;

    let window = cfg.booking_window()?;
    let candidates = slots::generate(&window, service.duration_minutes);
    let annotated = runtime.block_on(availability::annotate(candidates, date, api));

    println!("{} on {}", service.name, date.format("%Y-%m-%d"));
    renderer.print_slots(&annotated)?;
    Ok(())
}

#[instrument(skip(runtime, api, session, args))]
fn cmd_book(
    runtime: &Runtime,
    api: &ApiClient,
    session: &crate::session::Session,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command book");
    require_login(session)?;

    let [service_id, date_raw, time, name, email, notes @ ..] = args else {
        return Err(anyhow!(
            "usage: parlor book <service-id> <date> <time> <name> <email> [notes...]"
        ));
    };

    let today = datetime::salon_today(Utc::now());
    let date = datetime::parse_date_arg(date_raw, today)?;
    if datetime::parse_clock_time(time).is_none() {
        return Err(anyhow!("invalid time: {time} (expected HH:MM)"));
    }

    let request = BookingRequest {
        client_name: name.clone(),
        client_email: email.clone(),
        service_id: service_id.clone(),
        date,
        time: time.clone(),
        notes: if notes.is_empty() {
            None
        } else {
            Some(notes.join(" "))
        },
    };
    request.validate()?;

    let created = runtime
        .block_on(api.create_appointment(&request))
        .context("could not create appointment")?;

    println!(
        "Booked {} on {} at {} (appointment {}).",
        created.service_name,
        created.date.format("%Y-%m-%d"),
        created.time.as_deref().unwrap_or("-"),
        created.id
    );
    Ok(())
}

#[instrument(skip(renderer, runtime, api, session, args))]
fn cmd_appointments(
    renderer: &mut Renderer,
    runtime: &Runtime,
    api: &ApiClient,
    session: &crate::session::Session,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command appointments");
    require_login(session)?;

    let mut want_past = false;
    let mut status_filter = StatusFilter::All;
    let mut order = DateOrder::Closest;

    for arg in args {
        if arg.eq_ignore_ascii_case("upcoming") {
            want_past = false;
        } else if arg.eq_ignore_ascii_case("past") {
            want_past = true;
        } else if let Some(raw) = arg.strip_prefix("status:") {
            status_filter = raw.parse()?;
        } else if let Some(raw) = arg.strip_prefix("order:") {
            order = raw.parse()?;
        } else {
            return Err(anyhow!(
                "unknown argument: {arg} (expected upcoming, past, status:<s>, order:<o>)"
            ));
        }
    }

    let appointments = runtime
        .block_on(api.list_appointments())
        .context("could not load appointments")?;

    let now = datetime::salon_now(Utc::now());
    let agenda = schedule::partition(appointments, now);
    let bucket = if want_past {
        agenda.past
    } else {
        agenda.upcoming
    };

    let filtered = schedule::filter_by_status(&bucket, status_filter);
    let sorted = schedule::sort_by_instant(&filtered, order);

    if sorted.is_empty() {
        println!(
            "No {} appointments.",
            if want_past { "past" } else { "upcoming" }
        );
        return Ok(());
    }

    renderer.print_appointments(&sorted)?;
    Ok(())
}

#[instrument(skip(runtime, api, session, args))]
fn cmd_cancel(
    runtime: &Runtime,
    api: &ApiClient,
    session: &crate::session::Session,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command cancel");
    require_login(session)?;

    let id = args
        .first()
        .ok_or_else(|| anyhow!("usage: parlor cancel <appointment-id>"))?;

    let cancelled = runtime
        .block_on(api.cancel_appointment(id))
        .context("could not cancel appointment")?;

    println!("Cancelled appointment {}.", cancelled.id);
    Ok(())
}

#[instrument(skip(runtime, api, session, args))]
fn cmd_remove(
    runtime: &Runtime,
    api: &ApiClient,
    session: &crate::session::Session,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command remove");
    require_login(session)?;

    let id = args
        .first()
        .ok_or_else(|| anyhow!("usage: parlor remove <appointment-id>"))?;

    runtime
        .block_on(api.delete_appointment(id))
        .context("could not remove appointment")?;

    println!("Removed appointment {id}.");
    Ok(())
}

#[instrument(skip(renderer, args))]
fn cmd_calendar(renderer: &mut Renderer, args: &[String]) -> anyhow::Result<()> {
    info!("command calendar");

    let today = datetime::salon_today(Utc::now());
    let mut mode = CalendarMode::Month;
    let mut date = today;

    for arg in args {
        if let Ok(parsed) = arg.parse::<CalendarMode>() {
            mode = parsed;
        } else {
            date = datetime::parse_date_arg(arg, today)?;
        }
    }

    match mode {
        CalendarMode::Week => {
            let week = calendar::week_of(date);
            renderer.print_week(&week, today)?;
        }
        CalendarMode::Month => {
            println!("{}", date.format("%B %Y"));
            let grid = calendar::month_grid(date);
            renderer.print_month_grid(&grid, today)?;
        }
    }
    Ok(())
}

#[instrument(skip(renderer, runtime, api, session, args))]
fn cmd_notifications(
    renderer: &mut Renderer,
    runtime: &Runtime,
    api: &ApiClient,
    session: &crate::session::Session,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command notifications");
    require_login(session)?;

    match args {
        [] => {
            let notifications = runtime
                .block_on(api.list_notifications())
                .context("could not load notifications")?;
            let unread = notifications.iter().filter(|n| !n.read).count();
            debug!(count = notifications.len(), unread, "loaded notifications");
            renderer.print_notifications(&notifications)?;
            Ok(())
        }
        [action, id] if action == "read" => {
            runtime
                .block_on(api.mark_notification_read(id))
                .context("could not mark notification read")?;
            println!("Marked notification {id} read.");
            Ok(())
        }
        [action, id] if action == "delete" => {
            runtime
                .block_on(api.delete_notification(id))
                .context("could not delete notification")?;
            println!("Deleted notification {id}.");
            Ok(())
        }
        _ => Err(anyhow!(
            "usage: parlor notifications [read <id> | delete <id>]"
        )),
    }
}

#[instrument(skip(store, runtime, api, args))]
fn cmd_login(
    store: &SessionStore,
    runtime: &Runtime,
    api: &ApiClient,
    args: &[String],
) -> anyhow::Result<()> {
    info!("command login");

    let email = args
        .first()
        .ok_or_else(|| anyhow!("usage: parlor login <email> [password]"))?;
    let password = match args.get(1) {
        Some(given) => given.clone(),
        None => prompt_password()?,
    };

    let response = runtime
        .block_on(api.login(email, &password))
        .context("login failed")?;

    let mut session = store.load()?;
    session.token = Some(response.token);
    session.user = response.user;
    store.save(&session)?;

    match session.user.as_ref().map(|u| u.name.as_str()) {
        Some(name) if !name.is_empty() => println!("Logged in as {name}."),
        _ => println!("Logged in."),
    }
    Ok(())
}

#[instrument(skip(store))]
fn cmd_logout(store: &SessionStore) -> anyhow::Result<()> {
    info!("command logout");
    store.clear()?;
    println!("Logged out.");
    Ok(())
}

#[instrument(skip(store, args))]
fn cmd_theme(store: &SessionStore, args: &[String]) -> anyhow::Result<()> {
    info!("command theme");

    let mut session = store.load()?;
    match args.first() {
        None => {
            println!("{}", session.theme.label());
            Ok(())
        }
        Some(raw) => {
            let theme: Theme = raw.parse()?;
            session.theme = theme;
            store.save(&session)?;
            println!("Theme set to {}.", theme.label());
            Ok(())
        }
    }
}

fn cmd_help() -> anyhow::Result<()> {
    println!(
        "\
parlor <command> [args]

  services                          list bookable services
  slots <service-id> [date]         show bookable slots for a service
  book <svc> <date> <time> <name> <email> [notes...]
                                    create an appointment
  appointments [upcoming|past] [status:<s>] [order:closest|farthest]
                                    list your appointments
  cancel <id>                       cancel an appointment
  remove <id>                       delete an appointment record
  calendar [week|month] [date]      show a calendar grid
  notifications [read <id> | delete <id>]
  login <email> [password]          authenticate and store the session
  logout                            drop the stored session
  theme [light|dark]                show or set the theme preference
  help, version"
    );
    Ok(())
}

fn prompt_password() -> anyhow::Result<String> {
    eprint!("password: ");
    io::stderr().flush().context("failed to flush prompt")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read password")?;

    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        warn!("empty password supplied");
    }
    Ok(password)
}
