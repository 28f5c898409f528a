//! Core data types shared by the producer and the consumer.

pub mod chat;
pub mod event;
pub mod request;
pub mod simulation;

pub use chat::*;
pub use event::*;
pub use request::*;
pub use simulation::*;
