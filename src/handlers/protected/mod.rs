// handlers/protected/mod.rs - JWT-authenticated endpoints under /api
//
// auth, onboarding and invitation acceptance need only a valid token; the
// rest also require a resolved profile (tenant routes).

pub mod activities;
pub mod ai;
pub mod auth;
pub mod company;
pub mod initiatives;
pub mod invitations;
pub mod objectives;
pub mod onboarding;
pub mod profile;
