mod common;

mod auth;
mod payout;
mod virtual_machine;
