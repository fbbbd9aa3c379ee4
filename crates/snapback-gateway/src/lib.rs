//! `snapback-gateway` — binary wiring: CLI surface, subsystem bootstrap,
//! shared application state and the `RequestHandler` implementation that
//! ties the Tool Registry, Auth Resolver and Analysis Router together
//! behind the stream/HTTP+SSE transports.

pub mod bootstrap;
pub mod cli;
pub mod doctor;
pub mod handler;
pub mod state;
