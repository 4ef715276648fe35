//! Clients for collaborating services.

pub mod users;

pub use users::HttpUserDirectory;
