pub mod backend;
pub mod protocol;
pub mod session;
pub mod supabase;

pub use backend::{Backend, call};
pub use session::AuthSession;
pub use supabase::SupabaseBackend;
