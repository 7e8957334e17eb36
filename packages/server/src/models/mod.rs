pub mod auth;
pub mod payout;
pub mod virtual_machine;
