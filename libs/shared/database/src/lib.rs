pub mod query;
pub mod supabase;

pub use query::{Filter, Order, Query};
pub use supabase::{DatabaseError, SupabaseClient};
