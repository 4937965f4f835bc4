//! Gateway: the relay's HTTP surface.
//!
//! One port serves the health probe, the favicon no-op, and `POST /webhook`. The webhook is
//! (re)registered with Telegram once per process start, before requests are accepted.

mod server;

pub use server::{
    build_router, register_on_startup, run_server, serve, GatewayState, WebhookRegistration,
};
