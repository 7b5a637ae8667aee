//! # Pathway Store
//!
//! The persistence collaborator of the Pathway backend: typed documents for
//! users, learning paths, topics, subscriptions and favorites, a
//! [`Repository`] trait per collection, and an in-memory implementation.
//!
//! Writes enforce required fields and unique indexes. Their failures are
//! [`StoreError`]s, which convert into request [`Fault`](pathway_core::Fault)s:
//!
//! | Store error | Fault |
//! |---|---|
//! | `Validation` | `Validation` (400) |
//! | `Duplicate` | `DuplicateEntry` (409) |
//! | `Closed`, `Encoding` | `Unclassified` (500) |

#![doc(html_root_url = "https://docs.rs/pathway-store/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod document;
mod error;
mod memory;
mod repository;

pub use document::{Document, Favorite, LearningPath, Subscription, Topic, User};
pub use error::{StoreError, StoreResult};
pub use memory::{Collection, MemoryStore};
pub use repository::Repository;
