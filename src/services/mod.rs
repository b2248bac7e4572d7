pub mod auth;
pub mod http;
pub mod reconcile;
pub mod session;
pub mod subscription;

pub use auth::AuthService;
pub use http::{ApiClient, FileUpload};
pub use reconcile::{
    ManualCheck, ReconcileListener, ReconcileState, Reconciler, ReconciliationHandle,
    SubscriptionSource,
};
pub use session::{AuthTokens, FileSessionStore, MemorySessionStore, SessionStore};
pub use subscription::{SubscriptionGateway, SubscriptionService};
