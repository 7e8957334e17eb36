pub mod metrics;
pub mod payout_status;
pub mod retry;
pub mod vm_status;

mod status;

pub use metrics::{METRIC_WINDOW, MetricHistory, MetricSample};
pub use payout_status::PayoutStatus;
pub use retry::RetryPolicy;
pub use status::ParseStatusError;
pub use vm_status::VmStatus;
