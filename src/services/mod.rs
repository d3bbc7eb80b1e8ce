pub mod invitations;
pub mod onboarding;
pub mod progress;
pub mod reports;

pub use invitations::{InvitationError, InvitationService};
pub use onboarding::{OnboardingError, OnboardingService};
pub use reports::ReportService;
