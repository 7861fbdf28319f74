pub mod metrics;
pub mod orders;
pub mod payments;
pub mod provider;
pub mod razorpay;
pub mod verification;

pub use metrics::{get_metrics, init_metrics};
pub use orders::{CreateOrder, OrderService};
pub use payments::{PaymentsService, RefundPayment};
pub use provider::{PaymentProvider, ProviderError};
pub use razorpay::RazorpayClient;
pub use verification::VerificationService;
