mod access_verifier_impl;
mod auth_service_impl;
mod credential_checker_impl;
mod duration;
mod range_resolver;
mod stream_pump;
mod token_service_impl;

pub use access_verifier_impl::*;
pub use auth_service_impl::*;
pub use credential_checker_impl::*;
pub use duration::*;
pub use range_resolver::*;
pub use stream_pump::*;
pub use token_service_impl::*;
