pub mod memory;
pub mod pipeline;
pub mod store;
pub mod supabase;

pub use memory::MemoryStore;
pub use pipeline::{Pipeline, Stage};
pub use store::{DocumentStore, Filter, InsertOneResult};
pub use supabase::SupabaseClient;
