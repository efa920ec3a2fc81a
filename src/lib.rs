pub mod config;
pub mod content;
pub mod dispatch;
pub mod event;
pub mod gate;
pub mod intake;
pub mod observability;
pub mod relay;
