//! Collaboration metadata and the per-run session built from it.
//!
//! A [`Session`] is resolved once, before the engine is constructed: it
//! pins the collaboration id, the policy and the derived keys for the whole
//! run. Nothing downstream fetches or mutates any of them again.

use crate::error::{EngineError, EngineResult};
use cleanroom_crypto::{derive_keys, KeyMaterial, SharedSecret};
use cleanroom_schema::{ClientSettings, Policy};
use cleanroom_types::CollaborationId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable holding the base64 shared secret by default.
pub const DEFAULT_SECRET_ENV: &str = "CLEANROOM_SHARED_SECRET";

/// What a collaboration publishes to its members.
#[derive(Debug, Clone)]
pub struct CollaborationMetadata {
    pub settings: ClientSettings,
    pub secret: SharedSecret,
}

/// Supplies collaboration metadata.
///
/// The production supplier is a remote collaboration service; the engine
/// only needs this one call from it.
pub trait CollaborationMetadataSource {
    fn fetch(&self, id: &CollaborationId) -> EngineResult<CollaborationMetadata>;
}

/// In-memory metadata, keyed by collaboration id.
#[derive(Debug, Clone, Default)]
pub struct StaticMetadataSource {
    entries: HashMap<CollaborationId, CollaborationMetadata>,
}

impl StaticMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: CollaborationId, settings: ClientSettings, secret: SharedSecret) {
        self.entries.insert(id, CollaborationMetadata { settings, secret });
    }

    pub fn with(
        mut self,
        id: CollaborationId,
        settings: ClientSettings,
        secret: SharedSecret,
    ) -> Self {
        self.insert(id, settings, secret);
        self
    }
}

impl CollaborationMetadataSource for StaticMetadataSource {
    fn fetch(&self, id: &CollaborationId) -> EngineResult<CollaborationMetadata> {
        self.entries
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::config(format!("unknown collaboration {id}")))
    }
}

/// Settings from a JSON file, secret from the environment.
///
/// The file maps collaboration ids to their settings:
///
/// ```json
/// { "b2f2e9a4-0d3e-4c55-8a4f-8f3d2a1c0b9e": { "allowCleartext": true, ... } }
/// ```
#[derive(Debug, Clone)]
pub struct SettingsFileSource {
    path: PathBuf,
    secret_env: String,
}

impl SettingsFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            secret_env: DEFAULT_SECRET_ENV.to_string(),
        }
    }

    /// Reads the secret from `name` instead of [`DEFAULT_SECRET_ENV`].
    pub fn with_secret_env(mut self, name: impl Into<String>) -> Self {
        self.secret_env = name.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_settings(&self) -> EngineResult<HashMap<CollaborationId, ClientSettings>> {
        let json = std::fs::read_to_string(&self.path).map_err(|e| {
            EngineError::config(format!("cannot read {}: {e}", self.path.display()))
        })?;
        serde_json::from_str(&json).map_err(|e| {
            EngineError::config(format!(
                "invalid collaboration settings in {}: {e}",
                self.path.display()
            ))
        })
    }

    fn read_secret(&self) -> EngineResult<SharedSecret> {
        let encoded = std::env::var(&self.secret_env).map_err(|_| {
            EngineError::config(format!("shared secret variable {} is not set", self.secret_env))
        })?;
        SharedSecret::from_base64(&encoded).map_err(EngineError::KeyDerivation)
    }
}

impl CollaborationMetadataSource for SettingsFileSource {
    fn fetch(&self, id: &CollaborationId) -> EngineResult<CollaborationMetadata> {
        let settings = self.read_settings()?.remove(id).ok_or_else(|| {
            EngineError::config(format!(
                "collaboration {id} not found in {}",
                self.path.display()
            ))
        })?;
        let secret = self.read_secret()?;
        debug!(collaboration = %id, path = %self.path.display(), "loaded collaboration settings");
        Ok(CollaborationMetadata { settings, secret })
    }
}

/// Everything a run needs from its collaboration, resolved up front.
#[derive(Debug, Clone)]
pub struct Session {
    collaboration_id: CollaborationId,
    policy: Policy,
    keys: KeyMaterial,
}

impl Session {
    /// Fetches metadata for `id` and derives the run's keys.
    ///
    /// The resulting policy is collaboration-origin and binding.
    pub fn establish(
        source: &dyn CollaborationMetadataSource,
        id: CollaborationId,
    ) -> EngineResult<Self> {
        let metadata = source.fetch(&id)?;
        let keys = derive_keys(&metadata.secret, &id).map_err(EngineError::KeyDerivation)?;
        info!(collaboration = %id, "session established");
        Ok(Self {
            collaboration_id: id,
            policy: Policy::from_collaboration(metadata.settings),
            keys,
        })
    }

    /// A session from locally supplied settings. Only usable for dry runs.
    pub fn local(
        id: CollaborationId,
        settings: ClientSettings,
        secret: &SharedSecret,
    ) -> EngineResult<Self> {
        let keys = derive_keys(secret, &id).map_err(EngineError::KeyDerivation)?;
        Ok(Self {
            collaboration_id: id,
            policy: Policy::local(settings),
            keys,
        })
    }

    pub fn collaboration_id(&self) -> &CollaborationId {
        &self.collaboration_id
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.policy.settings
    }

    pub fn keys(&self) -> &KeyMaterial {
        &self.keys
    }
}
