pub mod calendars;
pub mod connect;
pub mod disconnect;
pub mod events;
pub mod login;
pub mod logout;
pub mod status;
pub mod sync;
