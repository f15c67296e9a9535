pub mod access_log;
pub mod kyc;
pub mod loan;
pub mod user;
