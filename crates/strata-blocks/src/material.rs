use std::collections::HashMap;
use std::error::Error;

use serde::Deserialize;

use super::types::MaterialId;

#[derive(Clone, Debug)]
pub struct Material {
    pub id: MaterialId,
    pub key: String,
}

/// Name → id mapping for block materials. Id 0 is reserved for "none".
#[derive(Clone, Debug)]
pub struct MaterialCatalog {
    pub materials: Vec<Material>,
    pub by_key: HashMap<String, MaterialId>,
}

impl Default for MaterialCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialCatalog {
    pub fn new() -> Self {
        Self {
            materials: vec![Material {
                id: MaterialId::NONE,
                key: String::new(),
            }],
            by_key: HashMap::new(),
        }
    }

    /// Builds a catalog from a list of names. Ids are assigned in sorted
    /// key order so the mapping does not depend on input order.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut keys: Vec<String> = names.into_iter().map(Into::into).collect();
        keys.sort();
        keys.dedup();
        let mut catalog = MaterialCatalog::new();
        for key in keys {
            catalog.insert(key);
        }
        catalog
    }

    /// Registers `key` if missing and returns its id. "none" and the empty
    /// string always map to [`MaterialId::NONE`].
    pub fn insert(&mut self, key: impl Into<String>) -> MaterialId {
        let key = key.into();
        if key.is_empty() || key == "none" {
            return MaterialId::NONE;
        }
        if let Some(id) = self.by_key.get(&key) {
            return *id;
        }
        let id = MaterialId(self.materials.len() as u16);
        self.by_key.insert(key.clone(), id);
        self.materials.push(Material { id, key });
        id
    }

    pub fn get_id(&self, key: &str) -> Option<MaterialId> {
        if key == "none" {
            return Some(MaterialId::NONE);
        }
        self.by_key.get(key).copied()
    }

    pub fn get(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0 as usize)
    }

    pub fn name_of(&self, id: MaterialId) -> &str {
        match self.get(id) {
            Some(m) if !id.is_none() => m.key.as_str(),
            _ => "none",
        }
    }

    pub fn len(&self) -> usize {
        self.materials.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, Box<dyn Error>> {
        let cfg: MaterialsConfig = toml::from_str(toml_str)?;
        Ok(Self::from_names(cfg.materials.names))
    }
}

// --- Config ---

#[derive(Deserialize)]
pub struct MaterialsConfig {
    pub materials: MaterialNames,
}

#[derive(Deserialize)]
pub struct MaterialNames {
    #[serde(default)]
    pub names: Vec<String>,
}
