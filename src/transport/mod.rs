// ABOUTME: Package transport: TCP sessions that exchange one binary message at a time.
// ABOUTME: Exports the server, client, framing, session registry, and package wire schema.

mod client;
mod error;
mod frame;
mod package;
mod registry;
mod server;

pub use client::{PackageClient, push_package};
pub use error::TransportError;
pub use frame::{DEFAULT_BUFFER_SIZE, DEFAULT_MAX_MESSAGE_SIZE, Framing, LENGTH_PREFIX_SIZE};
pub use package::{PACKAGE_MAGIC, PACKAGE_SCHEMA_VERSION, PackageError, UpdatePackage};
pub use registry::{SessionInfo, SessionRegistry, SessionWriter};
pub use server::{LISTEN_BACKLOG, PackageServer, TransportEvent};
