//! Server-state caching, similar to SWR or TanStack Query.
//!
//! - [`QueryClient`]: the session's cache. Deduplicates concurrent loads per key and
//!   invalidates by key prefix.
//! - [`Query`]: a subscription that keeps one key on screen up to date.
//! - [`Mutation`]: a command for writes.
//!
//! # Example
//!
//! ```rust,ignore
//! fn subscriptions(&self) -> Vec<Subscription<Message>> {
//!     vec![
//!         Subscription::new(Query::new(
//!             QueryKey::new("users").with(self.page),
//!             move || Box::pin(load_page(page)),
//!             self.query_client.clone(),
//!         ))
//!         .map(Message::UsersLoaded),
//!     ]
//! }
//!
//! fn update(&mut self, msg: Message) -> Command<Message> {
//!     match msg {
//!         Message::UsersLoaded(result) => {
//!             self.users = result.state;
//!             Command::none()
//!         }
//!         Message::Refresh => self.query_client.invalidate_command(&QueryKey::new("users")),
//!     }
//! }
//! ```

mod cache;
mod client;
mod config;
mod key;
pub mod mutation;
pub mod watch;

pub use cache::CacheEntry;
pub use client::{QueryClient, QueryError};
pub use config::QueryConfig;
pub use key::QueryKey;
pub use mutation::{Mutation, MutationState};
pub use watch::{Query, QueryResult, QueryState};
