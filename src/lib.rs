pub mod app;
pub mod chat;
pub mod cli;
pub mod clipboard;
pub mod logging;
pub mod paths;
pub mod settings;
