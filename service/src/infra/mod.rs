//! Infrastructure layer.

pub mod backend;

pub use self::backend::{
    in_memory, supabase, Backend, InMemory, Remote, Supabase,
};
