pub mod coordinator;
pub mod processor;
pub mod service;
pub mod stage;
