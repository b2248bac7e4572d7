pub mod card;
pub mod common;
pub mod payment;
pub mod subscription;
pub mod user;

pub use card::{CardPayload, CreditCardData, CreditCardHolderInfo};
pub use common::{BillingType, Plan, PlanCode};
pub use payment::{Payment, PaymentPage, PaymentStatus};
pub use subscription::{
    CheckoutOutcome, GatewaySubscription, LocalSubscription, MySubscription,
    SubscriptionStatus, UpdateSubscriptionRequest,
};
pub use user::{
    ApiDriver, ApiUser, DocumentKind, DriverDocument, ReviewStatus, Role,
};
