use anyhow::Result;

use crate::app::App;

pub async fn run(app: &App) -> Result<()> {
    app.backend.logout().await?;
    println!("Signed out.");
    Ok(())
}
