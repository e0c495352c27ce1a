pub mod device;
pub mod runtime;
pub mod server;
