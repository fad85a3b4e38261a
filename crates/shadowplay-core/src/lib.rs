// shadowplay-core: ids, math, time, config, errors and tick conditions for the Shadowplay engine.

pub mod condition;
pub mod config;
pub mod error;
pub mod math;
pub mod time;
pub mod types;

pub mod prelude {
    pub use crate::condition::{BudgetPhase, DegradationLevel, TickCondition};
    pub use crate::config::TickConfig;
    pub use crate::error::{ConfigError, InputError, ShadowplayError};
    pub use crate::time::{Cadence, MonotonicClock, SimTime, SystemClock};
    pub use crate::types::{ChainId, JointId, LightId, PuppetId};
}
