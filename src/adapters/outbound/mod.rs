/// Outbound adapters - Infrastructure implementations of outbound ports
pub mod cache;
pub mod console;
pub mod network;
