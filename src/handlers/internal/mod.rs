// handlers/internal/mod.rs - Cron-secret gated handlers (no JWT involved)

pub mod cron;
