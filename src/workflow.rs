//! Operation flows: reusable atomic Elasticsearch operations, templates that
//! chain them into steps, and instances executed through the console proxy.
//!
//! Templates can be bound to approval request types so that an approved
//! request starts its workflow automatically.

pub mod builtins;
pub mod condition;
pub mod executor;
pub mod instance;
pub mod operation;
pub mod render;
pub mod store;
pub mod template;
