//! SurrealDB repository implementations.

mod group;

pub use group::SurrealMatchGroupRepository;
