use anyhow::Result;
use owo_colors::OwoColorize;

use crate::app::App;
use crate::utils::tui::{create_spinner, prompt_password, prompt_text};

pub async fn run(app: &App, email: Option<String>) -> Result<()> {
    let email = match email {
        Some(email) => email,
        None => prompt_text("Email")?,
    };
    let password = prompt_password("Password")?;

    let spinner = create_spinner("Signing in...");
    let result = app.backend.login(&email, &password).await;
    spinner.finish_and_clear();

    let session = result?;
    println!(
        "Signed in as {}",
        session.email.as_deref().unwrap_or(&email).bold()
    );

    Ok(())
}
