//! Pieces of the Google authorization handshake.

pub mod guard;
pub mod popup;

pub use guard::DuplicateGuard;
pub use popup::{AuthWindow, POPUP_NAME, PopupFeatures, ScreenGeometry, WindowOpener};
