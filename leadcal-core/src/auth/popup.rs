//! The authorization popup: where it opens and what the broker needs from it.

use std::fmt;

/// Window name the authorization popup is opened under.
pub const POPUP_NAME: &str = "Google Calendar Auth";

/// Position and outer size of the window the popup is opened from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreenGeometry {
    pub screen_x: i32,
    pub screen_y: i32,
    pub outer_width: i32,
    pub outer_height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupFeatures {
    pub width: u32,
    pub height: u32,
    pub left: i32,
    pub top: i32,
}

impl PopupFeatures {
    /// A `width`×`height` popup centered over `screen`.
    pub fn centered(width: u32, height: u32, screen: &ScreenGeometry) -> Self {
        PopupFeatures {
            width,
            height,
            left: screen.screen_x + (screen.outer_width - width as i32) / 2,
            top: screen.screen_y + (screen.outer_height - height as i32) / 2,
        }
    }
}

impl fmt::Display for PopupFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "width={},height={},left={},top={}",
            self.width, self.height, self.left, self.top
        )
    }
}

/// Handle to an open authorization popup.
pub trait AuthWindow: Send {
    fn is_closed(&self) -> bool;

    /// Close the popup. Must be harmless on an already closed window.
    fn close(&mut self);
}

pub trait WindowOpener: Send + Sync {
    /// Geometry of the window popups are centered on.
    fn screen(&self) -> ScreenGeometry;

    /// Open `url` in a popup. `None` means the popup was blocked.
    fn open(&self, url: &str, name: &str, features: &PopupFeatures) -> Option<Box<dyn AuthWindow>>;
}
