//! Configuration types for leadcal.

mod leadcal_config;
mod sync_config;

pub use leadcal_config::LeadcalConfig;
pub use sync_config::SyncConfig;

use std::path::PathBuf;

use crate::error::{SyncError, SyncResult};

/// Directory holding leadcal's config and session files (~/.config/leadcal).
pub fn base_dir() -> SyncResult<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| SyncError::Config("Could not determine config directory".into()))?
        .join("leadcal"))
}
