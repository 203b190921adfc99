// HTTP interception surface for the proxy engine.

pub mod handler;
