//! Farmdesk Auth — password authentication, session credentials,
//! platform administration and organization scoping.

pub mod admin;
pub mod audit;
pub mod config;
pub mod error;
pub mod password;
pub mod scope;
pub mod service;
pub mod token;

pub use admin::{AdminService, CreateUserInput};
pub use audit::AuditEvent;
pub use config::AuthConfig;
pub use error::AuthError;
pub use scope::{OrganizationScope, ScopedOrganization};
pub use service::{AuthService, AuthenticatedSession, SessionTokens, SignInInput, SignUpInput};
pub use token::AccessTokenClaims;
