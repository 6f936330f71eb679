mod none;
mod role;
mod traits;
mod types;
mod user_token;

pub use none::*;
pub use role::*;
pub use traits::*;
pub use types::*;
pub use user_token::*;

use std::sync::Arc;

use crate::config::AuthConfig;
use crate::users::UserStore;

/// Factory function to create authenticator from config
pub fn create_authenticator(
    config: &AuthConfig,
    users: Arc<dyn UserStore>,
) -> Result<Box<dyn Authenticator>, AuthError> {
    use crate::config::AuthMethod;

    match config.method {
        AuthMethod::None => Ok(Box::new(NoneAuthenticator::new(users))),
        AuthMethod::UserToken => Ok(Box::new(UserTokenAuthenticator::new(users))),
    }
}
