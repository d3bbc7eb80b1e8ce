// handlers/public/mod.rs - Endpoints reachable without a bearer token

pub mod invitations;
pub mod webhooks;
