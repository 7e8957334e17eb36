pub mod payout;
pub mod provider;
pub mod virtual_machine;

pub use payout::Payout;
pub use provider::Provider;
pub use virtual_machine::{HardwareSpec, VirtualMachine};
