//! Port traits at the seams of the domain, with first-class in-process
//! implementations where one makes sense outside production.

pub mod event_bus;
pub mod notifier;
pub mod static_data;
pub mod store;

pub use event_bus::{EventBus, GeofenceNotice, LocationUpdate};
pub use notifier::{LoggingNotifier, Notifier, NotifyResult};
pub use static_data::StaticDataProvider;
pub use store::{Store, StoreTx};
