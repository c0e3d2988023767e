mod common;

mod config_tests;
mod queue_test;
mod store_tests;
