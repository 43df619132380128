// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

pub mod config;
pub mod connection;
pub mod exception;
pub mod file_system;
pub mod mime;
pub mod param;
pub mod privilege;
pub mod request;
pub mod response;
pub mod server;

pub use config::Config;
pub use connection::{Connection, ConnectionState};
pub use exception::{Exception, StartupError};
pub use file_system::{FileState, ResolvedFile};
pub use mime::Mime;
pub use param::{HttpRequestMethod, HttpStatus, HttpVersion};
pub use request::Request;
pub use response::Response;
