//! Credential loading for the stream grabber.
//!
//! Reads the `name = value` credential file and produces a validated
//! [`CredentialSet`]. Unknown names and missing fields are hard failures.

mod credentials;
mod error;

pub use credentials::{
    load, load_from_path, CredentialSet, ACCESS_TOKEN, ACCESS_TOKEN_SECRET, CONSUMER_KEY,
    CONSUMER_SECRET, FIELD_NAMES,
};
pub use error::{ConfigError, ConfigResult};
