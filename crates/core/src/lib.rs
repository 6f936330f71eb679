pub mod audit;
pub mod auth;
pub mod config;
pub mod gate;
pub mod ledger;
pub mod ticket;
pub mod users;

pub use auth::{
    create_authenticator, AuthError, AuthRequest, Authenticator, Identity, NoneAuthenticator,
    Operation, Role, UserTokenAuthenticator,
};
pub use config::{
    load_config, load_config_from_str, validate_config, AuthConfig, AuthMethod, Config,
    ConfigError, SanitizedConfig,
};
