//! Client code for sw-cache.
//!
//! This crate provides the request classifier, the network layer, the cache
//! strategy executor and the lifecycle worker that ties them together. The
//! server crate drives a single [`Worker`].

pub mod classify;
pub mod fetch;
pub mod strategy;
pub mod worker;

pub use classify::Classifier;
pub use fetch::{FetchConfig, HttpNetwork, Network};
pub use strategy::{Executor, Served, Source, Strategy};
pub use worker::{ControlMessage, FetchOutcome, MessagePort, PartitionStats, Worker, WorkerState};
