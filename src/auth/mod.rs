// Authentication module
// Registration, login, JWT sessions, password recovery and ownership checks

pub mod error;
pub mod guard;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use guard::{authorize, Operation, Requirement};
pub use mailer::{LogMailer, RecoveryMailer};
pub use middleware::AuthenticatedUser;
pub use models::{User, UserResponse};
pub use password::{PasswordPolicy, PasswordService};
pub use repository::{PgUserRepository, UserStore};
pub use service::{AuthService, AuthSettings};
pub use token::TokenService;
