// src/repositories/sqlite/mod.rs

pub mod cooldowns;

pub use cooldowns::SqliteCooldownRepository;
