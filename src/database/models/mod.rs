pub mod account;
pub mod attempt;

pub use account::{Account, AccountProfile, AccountStatus, NewAccount, Role};
pub use attempt::{AttemptReason, ClientMeta, LoginAttempt};
