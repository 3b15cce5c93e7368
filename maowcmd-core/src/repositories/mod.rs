// src/repositories/mod.rs

pub mod memory;
pub mod sqlite;

pub use maowcmd_common::traits::repository_traits::CooldownRepository;
pub use memory::InMemoryCooldownRepository;
pub use sqlite::SqliteCooldownRepository;
