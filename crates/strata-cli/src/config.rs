use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use strata_tree::{ResourceTree, TreeBuilder};
use strata_types::{ResourceName, StorageLocation};

/// On-disk configuration: vault root, catalog state path, and the
/// declared resource topology.
#[derive(Debug, Deserialize)]
pub struct StrataConfig {
    /// Directory under which the filesystem vault stores replica bytes.
    pub vault_root: PathBuf,
    /// Where the CLI persists catalog state between invocations.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
    /// Declared resources, wired by the `children` lists.
    #[serde(default, rename = "resource")]
    pub resources: Vec<ResourceConfig>,
}

/// One `[[resource]]` block.
#[derive(Debug, Deserialize)]
pub struct ResourceConfig {
    pub name: String,
    pub kind: ResourceKind,
    /// Leaf only: storage host.
    pub host: Option<String>,
    /// Leaf only: vault path on that host.
    pub vault_path: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Leaf,
    Passthrough,
    Random,
    Replication,
}

impl StrataConfig {
    /// Load and parse the configuration file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    /// Where catalog state is persisted: the configured path, or
    /// `catalog.json` under the vault root.
    pub fn catalog_path(&self) -> PathBuf {
        self.catalog_path
            .clone()
            .unwrap_or_else(|| self.vault_root.join("catalog.json"))
    }

    /// Build the validated resource tree from the declared resources.
    pub fn build_tree(&self) -> anyhow::Result<ResourceTree> {
        let mut builder = TreeBuilder::new();
        for resource in &self.resources {
            let name = ResourceName::new(&resource.name)?;
            match resource.kind {
                ResourceKind::Leaf => {
                    let host = resource
                        .host
                        .as_deref()
                        .with_context(|| format!("leaf {} is missing `host`", resource.name))?;
                    let vault_path = resource.vault_path.as_deref().with_context(|| {
                        format!("leaf {} is missing `vault_path`", resource.name)
                    })?;
                    builder.add_leaf(name, StorageLocation::new(host, vault_path))?;
                }
                ResourceKind::Passthrough => {
                    builder.add_passthrough(name)?;
                }
                ResourceKind::Random => {
                    builder.add_random(name)?;
                }
                ResourceKind::Replication => {
                    builder.add_replication(name)?;
                }
            }
        }
        for resource in &self.resources {
            let parent = ResourceName::new(&resource.name)?;
            for child in &resource.children {
                builder.add_child(&parent, &ResourceName::new(child)?)?;
            }
        }
        Ok(builder.build()?)
    }
}
