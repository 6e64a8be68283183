pub mod models;
pub mod senders;
pub mod service;
pub mod template;
