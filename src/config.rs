//! Store configuration: which roots to scan and how to recognize meta content.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::Provider;
use crate::parsers::MetaFilter;
use crate::utils::environment::{
    claude_projects_dir, codex_sessions_dir, discover_profile_roots, home_dir,
};

/// One directory holding session files of a single provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRoot {
    pub path: PathBuf,
    pub provider: Provider,
    /// Profile tag copied onto every file found under this root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

impl StoreRoot {
    pub fn new(path: impl Into<PathBuf>, provider: Provider) -> Self {
        Self { path: path.into(), provider, profile: None }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub roots: Vec<StoreRoot>,
    #[serde(default)]
    pub meta_filter: MetaFilter,
}

impl StoreConfig {
    /// Default roots for the current user, plus any profile roots that exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn from_env() -> Result<Self> {
        Ok(Self::from_home(&home_dir()?))
    }

    /// Default roots relative to `home`. Missing default roots are kept; they are
    /// skipped at scan time.
    pub fn from_home(home: &Path) -> Self {
        let mut roots = vec![
            StoreRoot::new(claude_projects_dir(home), Provider::Claude),
            StoreRoot::new(codex_sessions_dir(home), Provider::Codex),
        ];
        roots.extend(discover_profile_roots(home));
        Self { roots, meta_filter: MetaFilter::default() }
    }

    pub fn with_root(mut self, root: StoreRoot) -> Self {
        self.roots.push(root);
        self
    }

    pub fn with_meta_filter(mut self, meta_filter: MetaFilter) -> Self {
        self.meta_filter = meta_filter;
        self
    }

    /// Roots used only by Codex; files under them are classified without reading content.
    pub fn codex_roots(&self) -> Vec<PathBuf> {
        self.roots
            .iter()
            .filter(|root| root.provider.is_foreign())
            .map(|root| root.path.clone())
            .collect()
    }
}
