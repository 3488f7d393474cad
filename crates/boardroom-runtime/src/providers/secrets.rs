//! Secure credential handling for LLM providers.
//!
//! Every provider holds its API key as an [`ApiCredential`]:
//!
//! - **No accidental logging**: credentials print as `[REDACTED]` in Debug/Display
//! - **Memory safety**: the value is zeroed on drop via `secrecy`
//! - **Explicit exposure**: the raw key is only reachable through `.expose()`
//!
//! ## Usage
//!
//! ```ignore
//! use crate::providers::secrets::ApiCredential;
//!
//! // Load from the environment variable named in the provider config
//! let cred = ApiCredential::from_env("cerebras", "CEREBRAS_API_KEY")?;
//!
//! // Use in HTTP header (explicit exposure)
//! request.bearer_auth(cred.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::{ProviderCause, ProviderError};

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Loaded from environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: String,
}

impl ApiCredential {
    /// Wrap a value. It cannot be logged after this point.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: impl Into<String>) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name: name.into(),
        }
    }

    /// Load the credential for `provider_id` from `env_var`.
    ///
    /// A missing or blank variable is [`ProviderCause::NotConfigured`].
    pub fn from_env(provider_id: &str, env_var: &str) -> Result<Self, ProviderError> {
        match std::env::var(env_var) {
            Ok(value) if !value.trim().is_empty() => Ok(Self::new(
                value.trim(),
                CredentialSource::Environment,
                format!("{provider_id} API key"),
            )),
            _ => Err(ProviderError::new(
                provider_id,
                ProviderCause::NotConfigured(format!(
                    "{provider_id} API key not set: configure '{env_var}' environment variable"
                )),
            )),
        }
    }

    /// Check if a credential is available (without loading it).
    pub fn is_available(env_var: &str) -> bool {
        std::env::var(env_var).is_ok_and(|v| !v.trim().is_empty())
    }

    /// Expose the credential value for use in API calls.
    ///
    /// Only call this where the credential is sent. Never store the result.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Check if the credential is empty.
    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }

    /// Get the source of this credential.
    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Get the human-readable name of this credential.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}
