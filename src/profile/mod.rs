//! Agent profiles — what the voice assistant knows about the prospect's
//! company, derived from their website.

pub mod deriver;
pub mod model;
pub mod template;

pub use deriver::{ProfileDeriver, fallback_profile, profile_from_response};
pub use model::{AgentProfile, UserData, welcome_message};
pub use template::{SYSTEM_TEMPLATE, domain_company_name};
