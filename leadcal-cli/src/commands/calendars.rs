use anyhow::Result;

use crate::app::App;
use crate::render::render_calendar;
use crate::utils::tui::create_spinner;

pub async fn run(app: &App, select: Option<Vec<String>>, default: Option<String>) -> Result<()> {
    let sync = app.calendar_sync();

    if let Some(calendar_ids) = select {
        if !sync.update_selected_calendars(calendar_ids).await {
            anyhow::bail!("Could not update the synced calendars");
        }
    }

    if let Some(calendar_id) = default {
        if !sync.set_default_calendar(&calendar_id).await {
            anyhow::bail!("Could not set the default calendar");
        }
    }

    let spinner = create_spinner("Fetching calendars...");
    app.notifier.attach(&spinner);
    let calendars = sync.list_calendars().await;
    let settings = sync.load_settings().await;
    app.notifier.detach();
    spinner.finish_and_clear();

    let Some(calendars) = calendars else {
        anyhow::bail!("Could not list calendars");
    };
    let settings = settings?;

    if calendars.is_empty() {
        println!("No calendars found.");
        return Ok(());
    }

    for calendar in &calendars {
        println!("{}", render_calendar(calendar, settings.as_ref()));
    }

    Ok(())
}
