//! Business services that sit between route handlers and the outside world.

pub mod auth;
pub mod email;
pub mod storage;

pub use auth::{AuthError, AuthService};
pub use email::{EmailError, LogMailer, Mailer, SmtpMailer};
pub use storage::{LocalStorage, ObjectStorage, StorageError, StoredObject};
