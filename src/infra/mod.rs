mod clock_system;
mod media_catalog_fs;
mod refresh_token_store_mem;

pub use clock_system::*;
pub use media_catalog_fs::*;
pub use refresh_token_store_mem::*;
