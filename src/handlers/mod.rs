pub mod checkout;

pub use checkout::{CheckoutFlow, CheckoutUi, Notice, NoticeLevel, LOGIN_ROUTE, SUBSCRIPTION_ROUTE};
