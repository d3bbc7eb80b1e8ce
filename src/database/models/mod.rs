pub mod activity;
pub mod company;
pub mod email_event;
pub mod initiative;
pub mod invitation;
pub mod objective;
pub mod profile;
pub mod report;

pub use activity::{Activity, ActivityStatus};
pub use company::Company;
pub use email_event::EmailEvent;
pub use initiative::{Initiative, InitiativeStatus};
pub use invitation::{Invitation, InvitationStatus};
pub use objective::{Objective, ObjectiveStatus};
pub use profile::{Profile, ProfilePermission, RoleType};
pub use report::{OkrAnalysis, WeeklyReport};
