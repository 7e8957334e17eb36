//! Per-entity business rules layered over the document repositories.

pub mod account;
pub mod error;
pub mod payout;
pub mod provider;
pub mod virtual_machine;

pub use account::AccountService;
pub use error::ServiceError;
pub use payout::PayoutStore;
pub use provider::ProviderStore;
pub use virtual_machine::{VirtualMachineStore, VmPatch};
