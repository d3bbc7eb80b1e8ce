// handlers/mod.rs - Three route tiers with distinct middleware stacks
//
// Public (no auth) → Protected (JWT alone, then JWT + profile) → Internal (cron secret)

pub mod internal; // Cron trigger endpoints, gated by CRON_SECRET
pub mod protected; // JWT-authenticated API under /api/*
pub mod public; // Invitation preview and the email webhook sink
