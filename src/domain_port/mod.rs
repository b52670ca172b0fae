// store

mod refresh_token_store;

pub use refresh_token_store::*;

// collaborators

mod clock;
mod media_catalog;

pub use clock::*;
pub use media_catalog::*;
