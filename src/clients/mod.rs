pub mod broker;
pub mod failure;
pub mod health;
pub mod memory;
pub mod rbmq;
pub mod store;
