//! Database access layer.
//!
//! The default build ships [`UnavailableClient`], which reports the driver as
//! missing so connection diagnostics still work.
//!
//! # Feature Flags
//!
//! - `firebird` - Enable the `rsfbclient` driver (loads `libfbclient` at runtime)

pub mod catalog;
#[cfg(feature = "firebird")]
pub mod firebird;
pub mod probe;
pub mod result;
#[cfg(test)]
pub(crate) mod testing;
pub mod traits;

pub use catalog::SchemaCatalog;
#[cfg(feature = "firebird")]
pub use firebird::FirebirdClient;
pub use probe::{LibraryProbe, Preconditions};
pub use result::*;
pub use traits::{Connection, DatabaseClient, UnavailableClient, returns_rows};

use crate::config::FirebirdConfig;
use std::sync::Arc;

/// Create the client for this build.
pub fn create_client(config: &FirebirdConfig) -> Arc<dyn DatabaseClient> {
    #[cfg(feature = "firebird")]
    {
        Arc::new(FirebirdClient::new(config))
    }
    #[cfg(not(feature = "firebird"))]
    {
        let _ = config;
        Arc::new(UnavailableClient)
    }
}
