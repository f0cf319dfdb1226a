pub mod config;
pub mod core;
pub mod main_module;
pub mod onboarding;
pub mod security;
pub mod shared;
pub mod web;
