// src/platforms/mod.rs

pub mod discord;
