pub mod app;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod debounce;
pub mod output;
pub mod record;
pub mod runner;
pub mod session;
pub mod share;
pub mod source;

#[cfg(test)]
mod tests;
