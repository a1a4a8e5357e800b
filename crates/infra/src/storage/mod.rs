//! Durable document storage

mod object_store;

pub use self::object_store::ObjectDocumentStore;
