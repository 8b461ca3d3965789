use anyhow::Result;
use chrono::Local;
use owo_colors::OwoColorize;

use leadcal_core::settings::ConnectionState;

use crate::app::App;
use crate::render::Render;
use crate::utils::tui::create_spinner;

pub async fn run(app: &App) -> Result<()> {
    let session = app.backend.session().await?;
    println!(
        "Signed in as {}",
        session.email.as_deref().unwrap_or(&session.user_id).bold()
    );

    let spinner = create_spinner("Loading calendar settings...");
    let result = app.calendar_sync().load_settings().await;
    spinner.finish_and_clear();
    let settings = result?;

    let state = ConnectionState::of(settings.as_ref());
    println!("Google Calendar: {}", state.render());

    let Some(settings) = settings.filter(|s| s.is_connected()) else {
        println!("\nRun `leadcal connect` to connect a Google Calendar account.");
        return Ok(());
    };

    let selected = if settings.selected_calendars.is_empty() {
        "none".dimmed().to_string()
    } else {
        settings
            .selected_calendars
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };
    println!("Synced calendars: {selected}");

    if let Some(default_id) = &settings.default_calendar_id {
        println!("Default calendar: {default_id}");
    }

    match settings.last_sync {
        Some(at) => println!(
            "Last sync: {}",
            at.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        ),
        None => println!("Last sync: {}", "never".dimmed()),
    }

    Ok(())
}
