//! Common imports for writing an application on the runtime.
//!
//! ```
//! use roster::prelude::*;
//! ```

pub use crate::application::Application;
pub use crate::command::{Action, Command};
pub use crate::query::{QueryClient, QueryKey, QueryResult, QueryState};
pub use crate::runtime::Runtime;
pub use crate::subscription::Subscription;
