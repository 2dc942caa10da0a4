pub mod config;
pub mod identitystore_userids;
pub mod integrations;
pub mod pagerduty_users;
pub mod populate;
