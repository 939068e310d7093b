//! Testing utilities for domain-objects collections

pub mod events;
pub mod model;
pub mod provider;

pub use events::EventLog;
pub use model::{Task, COMPILE, JAVA_COMPILE, TASK, TEST};
pub use provider::RecordingProvider;

/// Installs a stderr logger when the `logging` feature is on. Safe to call
/// from every test.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::builder().is_test(true).try_init();
    }
}

pub mod prelude {
    pub use crate::events::EventLog;
    pub use crate::init_logging;
    pub use crate::model::*;
    pub use crate::provider::RecordingProvider;
}
