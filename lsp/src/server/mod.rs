mod analysis;
pub(crate) mod cli;
pub(crate) mod config;
mod entry;
mod handlers;
pub(crate) mod notifier;
mod state;
pub(crate) mod text;

pub use entry::run;
