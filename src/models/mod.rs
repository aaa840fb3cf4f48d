pub mod badge;
pub mod profile;
pub mod referral;
pub mod supporter;
pub mod trial;
pub mod vote;
pub mod wish;
