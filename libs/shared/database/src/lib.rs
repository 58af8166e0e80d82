pub mod scope;
pub mod supabase;

pub use scope::RecordScope;
pub use supabase::{DatabaseError, SupabaseClient};
