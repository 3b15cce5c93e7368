// src/tasks/mod.rs

pub mod cooldown_maintenance;

pub use cooldown_maintenance::spawn_cooldown_prune_task;
