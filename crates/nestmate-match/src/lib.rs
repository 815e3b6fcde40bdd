//! Nestmate Match — the group-formation protocol layer.
//!
//! Provides the lifecycle service (invite, accept, approve, confirm,
//! remove, decline/withdraw), the pure view projection, and the
//! approval-action dispatcher. Generic over `nestmate-core` traits; carries
//! no database dependency.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod lifecycle;
pub mod notifier;
pub mod projection;

pub use config::MatchConfig;
pub use dispatch::dispatch_approval;
pub use error::MatchError;
pub use lifecycle::GroupLifecycleService;
pub use notifier::TracingNotifier;
