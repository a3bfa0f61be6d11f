mod credentials;
mod middleware;
mod rate_limit;

pub use credentials::{
    Credential, CredentialError, CredentialStore, IssuedCredential, ADMIN_ID, SECRET_MARKER,
};
pub use middleware::{enforce_rate_limit, require_api_key};
pub use rate_limit::RateLimiter;
