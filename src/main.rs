use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{Datelike, Utc};
use clap::{Parser, Subcommand};
use log::{LevelFilter, error, info, warn};
use tokio::sync::mpsc;

use pitwall::{
    AppConfig, EventView, EventViewHandle, FileStore, HttpApi, PitwallApi, PitwallError,
    Preferences, SelectionFallback, ViewOptions,
    api::or_empty,
    auth::{self, AuthSession},
    calendar, config, feed,
    live::{display_gaps, pick_default_session},
    model::{EventDetail, LifecycleStatus, RegisterRequest, ResultRow, series::series_display_name},
    standings, telemetry_lite,
    writer::{load_recording, write_recording},
};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Base URL of the Pitwall API, overrides the config file and PITWALL_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show an event and the results of one of its sessions
    Event {
        slug: String,
        #[arg(short, long)]
        session: Option<i64>,
        #[arg(short, long)]
        class: Option<String>,
    },
    /// Follow an event, refreshing while it is live
    Live {
        slug: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        class: Option<String>,
        /// Pick a new default session when the selected one disappears
        #[arg(long)]
        reselect: bool,
    },
    /// Print the last snapshot of a recording made with `live --output`
    Replay {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Lap summary for one driver of a session
    Telemetry {
        slug: String,
        #[arg(short, long)]
        session: Option<i64>,
        /// `carNumber|driverName`, defaults to the first driver
        #[arg(short, long)]
        driver: Option<String>,
    },
    Calendar {
        #[arg(short, long)]
        series: Option<String>,
        #[arg(short, long)]
        year: Option<i32>,
        #[arg(long)]
        by_month: bool,
    },
    Seasons {
        series: String,
    },
    Series {
        slug: Option<String>,
    },
    Standings {
        series: String,
        #[arg(short, long)]
        year: Option<i32>,
        #[arg(short, long)]
        class: Option<String>,
        #[arg(long)]
        constructors: bool,
    },
    Feed {
        #[arg(short, long)]
        series: Option<String>,
        #[arg(short, long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        size: Option<u32>,
    },
    /// Followed series and notification settings stored on this device
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },
    /// Show the effective configuration, `--save` writes it to the config file
    Config {
        #[arg(long)]
        poll_interval_ms: Option<u64>,
        #[arg(long)]
        feed_page_size: Option<u32>,
        #[arg(long)]
        save: bool,
    },
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        display_name: String,
    },
}

#[derive(Subcommand, Debug)]
enum PrefsAction {
    Show,
    Follow { series: String },
    Unfollow { series: String },
    ToggleEmail,
    ToggleBrowser,
    Reset,
}

fn print_results(rows: &[ResultRow], gaps: &[Option<String>]) {
    if rows.is_empty() {
        println!("  No results available");
        return;
    }
    for (row, gap) in rows.iter().zip(gaps) {
        println!(
            "  {:>3}  {:<4} {:<28} {:<24} {:>6} {:>14} {:>12}  {}",
            row.position,
            row.driver_number.map(|n| n.to_string()).unwrap_or_default(),
            row.driver_name,
            row.team_name,
            row.laps.map(|l| l.to_string()).unwrap_or_default(),
            row.time.as_deref().unwrap_or(""),
            gap.as_deref().unwrap_or(""),
            row.status,
        );
    }
}

fn print_event_header(event: &EventDetail) {
    println!(
        "{} [{}] {}",
        event.name,
        series_display_name(&event.series.slug).unwrap_or(event.series.name.as_str()),
        event.status
    );
    println!(
        "{}, {} ({}) {} - {}",
        event.circuit.name, event.circuit.city, event.circuit.country, event.start_date, event.end_date
    );
    for session in event.result_sessions() {
        let marker = if event.is_session_selectable(session) { " " } else { "-" };
        println!(
            " {} {:>4} {:<16} {} {}",
            marker,
            session.id,
            session.tab_label(),
            session.start_time.format("%a %d %b %H:%M UTC"),
            session.status
        );
    }
    if event.status == LifecycleStatus::Upcoming {
        if let Some(race) = event.race_session() {
            println!("Race starts {}", race.start_time.format("%A %d %B %Y %H:%M UTC"));
        }
    }
}

fn print_view(view: &EventView) {
    let Some(event) = &view.event else {
        println!("Event not loaded");
        return;
    };
    print_event_header(event);
    if let Some(session) = &view.selected_session {
        println!();
        println!(
            "{}{}",
            session.schedule_label(),
            view.selected_class
                .as_deref()
                .map(|c| format!(" ({})", c))
                .unwrap_or_default()
        );
        print_results(&view.results, &view.gaps());
        println!("  {} laps of telemetry", view.telemetry.len());
    }
}

async fn select_session_or_default(
    api: &dyn PitwallApi,
    slug: &str,
    session: Option<i64>,
) -> Result<(EventDetail, Option<i64>), PitwallError> {
    let event = api.event(slug).await?;
    let session_id = match session {
        Some(id) => match event.session(id) {
            Some(_) => Some(id),
            None => {
                return Err(PitwallError::InvalidUserInput {
                    field: "session".to_string(),
                    reason: format!("{} has no session {}", slug, id),
                });
            }
        },
        None => pick_default_session(&event.status, &event.sessions).map(|s| s.id),
    };
    Ok((event, session_id))
}

async fn show_event(
    api: &dyn PitwallApi,
    slug: &str,
    session: Option<i64>,
    class_name: Option<String>,
) -> Result<(), PitwallError> {
    let (event, session_id) = select_session_or_default(api, slug, session).await?;
    print_event_header(&event);
    let Some(session_id) = session_id else {
        return Ok(());
    };

    let classes = or_empty(api.result_classes(slug, session_id).await, "result classes");
    let class_name = class_name.filter(|c| {
        let offered = classes.contains(c);
        if !offered {
            warn!("Class {} is not part of this session, showing all classes", c);
        }
        offered
    });
    let rows = or_empty(
        api.results(slug, session_id, class_name.as_deref()).await,
        "results",
    );
    let gaps = display_gaps(&rows, &event.series.slug, class_name.as_deref());
    println!();
    if !classes.is_empty() {
        println!("Classes: {}", classes.join(", "));
    }
    print_results(&rows, &gaps);
    Ok(())
}

async fn live(
    api: Arc<dyn PitwallApi>,
    app_config: &AppConfig,
    slug: String,
    output: Option<PathBuf>,
    class_name: Option<String>,
    reselect: bool,
) -> Result<(), PitwallError> {
    let (interrupt_tx, mut interrupt_rx) = mpsc::unbounded_channel::<()>();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(());
    })
    .map_err(|e| PitwallError::InterruptHandlerError { source: e })?;

    let options = ViewOptions {
        poll_interval: app_config.poll_interval(),
        fallback: if reselect {
            SelectionFallback::Reselect
        } else {
            SelectionFallback::KeepStale
        },
        initial_class: class_name,
    };
    let handle = EventViewHandle::spawn(api, slug, options);

    // the writer stops by itself once the view is shut down
    let writer = output.map(|file| {
        let views = handle.subscribe();
        tokio::spawn(async move { write_recording(&file, views).await })
    });

    let mut views = handle.subscribe();
    loop {
        tokio::select! {
            _ = interrupt_rx.recv() => {
                info!("Exiting...");
                break;
            }
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if view.is_loading() {
                    continue;
                }
                if view.event.is_none() {
                    if let Some(reason) = &view.last_refresh_error {
                        error!("Could not load event: {}", reason);
                        break;
                    }
                    continue;
                }
                println!("\n{}", "=".repeat(72));
                print_view(&view);
                if !view.polling {
                    break;
                }
            }
        }
    }

    handle.shutdown().await;
    if let Some(writer) = writer {
        match writer.await {
            Ok(result) => {
                result?;
            }
            Err(e) => error!("Recording task failed: {}", e),
        }
    }
    Ok(())
}

fn replay(input: &Path) -> Result<(), PitwallError> {
    let recording = load_recording(input)?;
    let Some(last) = recording.last() else {
        println!("{} holds no snapshots", input.display());
        return Ok(());
    };
    println!(
        "{} snapshots between {} and {}",
        recording.len(),
        recording[0].recorded_at,
        last.recorded_at
    );
    print_view(&last.view);
    Ok(())
}

async fn show_telemetry(
    api: &dyn PitwallApi,
    slug: &str,
    session: Option<i64>,
    driver: Option<String>,
) -> Result<(), PitwallError> {
    let (event, session_id) = select_session_or_default(api, slug, session).await?;
    let Some(session_id) = session_id else {
        println!("{} has no sessions with telemetry", event.name);
        return Ok(());
    };
    let telemetry = or_empty(api.telemetry(slug, session_id).await, "lap telemetry");
    let options = telemetry_lite::driver_options(&telemetry);
    let Some(key) = telemetry_lite::resolve_selected_driver(&options, driver.as_deref()) else {
        println!("No lap telemetry for this session");
        return Ok(());
    };

    println!("{} - Telemetry Lite", event.name);
    for option in &options {
        let marker = if option.key == key { "*" } else { " " };
        println!(" {} {}", marker, option.label);
    }
    let laps = telemetry_lite::driver_laps(&telemetry, &key);
    let summary = telemetry_lite::summarize(&laps);
    println!();
    println!("Laps: {}", summary.laps);
    println!("Best lap: {}", summary.best_lap().unwrap_or_else(|| "-".to_string()));
    println!(
        "Last position: {}",
        summary.last_position.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
    );
    println!(
        "Top speed: {}",
        summary
            .top_speed_kph
            .map(|s| format!("{} km/h", s))
            .unwrap_or_else(|| "-".to_string())
    );
    for (lap, seconds) in &summary.lap_times {
        println!("  lap {:>3}  {}", lap, telemetry_lite::format_lap_time(*seconds));
    }
    Ok(())
}

async fn show_calendar(
    api: &dyn PitwallApi,
    series: Option<String>,
    year: Option<i32>,
    by_month: bool,
) {
    let year = year.unwrap_or_else(|| Utc::now().year());
    let events = calendar::load_calendar(api, series.as_deref(), Some(year)).await;
    if events.is_empty() {
        println!("No events found");
        return;
    }
    let print_event = |event: &pitwall::model::EventSummary| {
        println!(
            "  {} - {}  {:<10} {:<36} {} [{}]",
            event.start_date.format("%b %d"),
            event.end_date.format("%d"),
            event.series_name,
            event.name,
            event.circuit_name,
            event.status
        );
    };
    if by_month {
        for (month, month_events) in calendar::group_by_month(&events) {
            println!("{}", month);
            month_events.into_iter().for_each(print_event);
        }
    } else {
        events.iter().for_each(print_event);
    }
}

async fn show_standings(
    api: &dyn PitwallApi,
    series: &str,
    year: Option<i32>,
    class_name: Option<String>,
    constructors: bool,
) -> Result<(), PitwallError> {
    let year = match year {
        Some(year) => year,
        None => standings::load_series_context(api, series)
            .await
            .selected_year
            .ok_or_else(|| PitwallError::InvalidUserInput {
                field: "year".to_string(),
                reason: format!("no seasons found for {}", series),
            })?,
    };
    let season = standings::load_season_standings(api, series, year, class_name.as_deref()).await;

    println!(
        "{} {}{}",
        series_display_name(series).unwrap_or(series),
        year,
        season
            .selected_class
            .as_deref()
            .map(|c| format!(" - {}", c))
            .unwrap_or_default()
    );
    if constructors {
        for standing in &season.constructors {
            println!(
                "  {:>3}  {:<32} {:>7.1} {:>3} wins",
                standing.position, standing.team_name, standing.points, standing.wins
            );
        }
    } else {
        for standing in &season.drivers {
            println!(
                "  {:>3}  {:<28} {:<24} {:>7.1} {:>3} wins",
                standing.position,
                standing.driver_name,
                standing.team_name,
                standing.points,
                standing.wins
            );
        }
    }
    let recent = season.recent_completed_events();
    if !recent.is_empty() {
        println!("\nRecent events");
        for event in recent {
            println!("  {}  {}", event.start_date, event.name);
        }
    }
    Ok(())
}

fn update_preferences(action: &PrefsAction) -> Result<(), PitwallError> {
    let mut store = FileStore::open_default()?;
    let mut preferences = Preferences::load(&store)?;
    match action {
        PrefsAction::Show => {}
        PrefsAction::Follow { series } => {
            if !preferences.follows(series) {
                preferences.toggle_series(series);
            }
        }
        PrefsAction::Unfollow { series } => {
            if preferences.follows(series) {
                preferences.toggle_series(series);
            }
        }
        PrefsAction::ToggleEmail => {
            preferences.toggle_email_notifications();
        }
        PrefsAction::ToggleBrowser => {
            preferences.toggle_browser_notifications();
        }
        PrefsAction::Reset => preferences = Preferences::default(),
    }
    if !matches!(action, PrefsAction::Show) {
        preferences.save(&mut store)?;
    }

    println!("Followed series: {}", preferences.followed_series.join(", "));
    println!("Email notifications: {}", preferences.email_notifications);
    println!("Browser notifications: {}", preferences.browser_notifications);
    println!("Stored in {}", store.path().display());
    if let Some(session) = AuthSession::load(&store)? {
        if let Some(user) = session.user {
            println!("Signed in as {} <{}>", user.display_name, user.email);
        }
    }
    Ok(())
}

async fn run(args: Args) -> Result<(), PitwallError> {
    let app_config = AppConfig::from_local_file()?
        .unwrap_or_default()
        .with_overrides(std::env::var(config::API_URL_ENV).ok(), args.api_url);
    let api: Arc<dyn PitwallApi> = Arc::new(HttpApi::new(&app_config.api_base_url)?);

    match args.command {
        Commands::Event {
            slug,
            session,
            class,
        } => show_event(api.as_ref(), &slug, session, class).await,
        Commands::Live {
            slug,
            output,
            class,
            reselect,
        } => live(api, &app_config, slug, output, class, reselect).await,
        Commands::Replay { input } => replay(&input),
        Commands::Telemetry {
            slug,
            session,
            driver,
        } => show_telemetry(api.as_ref(), &slug, session, driver).await,
        Commands::Calendar {
            series,
            year,
            by_month,
        } => {
            show_calendar(api.as_ref(), series, year, by_month).await;
            Ok(())
        }
        Commands::Seasons { series } => {
            let context = standings::load_series_context(api.as_ref(), &series).await;
            for year in context.years {
                println!("{}", year);
            }
            Ok(())
        }
        Commands::Series { slug: Some(slug) } => {
            let series = api.series(&slug).await?;
            println!("{} ({}) {}", series.name, series.slug, series.color());
            Ok(())
        }
        Commands::Series { slug: None } => {
            for series in or_empty(api.series_list().await, "series") {
                println!("{:<10} {:<20} {}", series.slug, series.name, series.color());
            }
            Ok(())
        }
        Commands::Standings {
            series,
            year,
            class,
            constructors,
        } => show_standings(api.as_ref(), &series, year, class, constructors).await,
        Commands::Feed { series, page, size } => {
            let size = size.unwrap_or(app_config.feed_page_size()).max(1);
            let page = feed::load_feed(api.as_ref(), page, size, series.as_deref()).await;
            for item in &page.content {
                println!(
                    "{}  {:<8} {}",
                    item.published_at.format("%Y-%m-%d"),
                    item.series_name.as_deref().unwrap_or(""),
                    feed::headline(item)
                );
            }
            if page.has_next() {
                println!("-- more on page {} --", page.number + 1);
            }
            Ok(())
        }
        Commands::Prefs { action } => update_preferences(&action),
        Commands::Config {
            poll_interval_ms,
            feed_page_size,
            save,
        } => {
            let mut app_config = app_config;
            if let Some(interval) = poll_interval_ms {
                app_config.poll_interval_ms = interval;
            }
            if let Some(size) = feed_page_size {
                app_config.feed_page_size = size;
            }
            println!("API URL: {}", app_config.api_base_url);
            println!("Poll interval: {:?}", app_config.poll_interval());
            println!("Feed page size: {}", app_config.feed_page_size());
            if save {
                app_config.save()?;
                info!("Saved configuration to {}", AppConfig::default_path()?.display());
            }
            Ok(())
        }
        Commands::Register {
            email,
            password,
            display_name,
        } => {
            let mut store = FileStore::open_default()?;
            let request = RegisterRequest {
                email,
                password,
                display_name,
            };
            let response = auth::register(api.as_ref(), &mut store, &request).await?;
            println!("Welcome, {}!", response.display_name);
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Args::parse();
    colog::default_builder()
        .filter_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .init();

    if let Err(e) = run(cli).await {
        error!("{}", e);
        if e.is_remote() {
            info!(
                "Point pitwall at a running API with --api-url or {}",
                config::API_URL_ENV
            );
        }
        std::process::exit(1);
    }
}
