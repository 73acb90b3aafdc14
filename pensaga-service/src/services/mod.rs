pub mod accounts;
pub mod fulfillment;
pub mod metrics;
pub mod payments;
pub mod prompts;
pub mod providers;

pub use accounts::{AccountStore, InMemoryAccountStore, StoreError, SupabaseStore};
pub use fulfillment::{FulfillmentOutcome, fulfill_session, fulfill_without_store};
pub use metrics::{get_metrics, init_metrics};
pub use payments::{MockPaymentProvider, PaymentError, PaymentProvider, StripeClient};
pub use providers::{MockTextProvider, OllamaTextProvider, ProviderError, TextProvider};
