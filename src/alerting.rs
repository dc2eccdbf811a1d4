//! Alert rules, fired alerts and the channels they are delivered through.
//!
//! [`engine::AlertEngine`] samples the cluster on an interval, feeds the samples to
//! [`evaluator::Evaluator`] and applies the resulting transitions to [`store::AlertStore`].

pub mod channel;
pub mod engine;
pub mod evaluator;
pub mod notify;
pub mod record;
pub mod rule;
pub mod sampler;
pub mod store;
