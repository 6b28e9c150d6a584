//! FFI surface exported to the mobile UI through flutter_rust_bridge.

pub mod api;
