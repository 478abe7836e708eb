//! JSON-file store for characters and items: one directory per entity
//! type, one pretty-printed file per entity. Loaded entities live in an
//! identity map so every caller sees the same state; writes go through
//! an explicit dirty set keyed by (type, name) and land on disk only at
//! `commit`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::character::{Character, Item};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Player,
    Enemy,
    Weapon,
    Outfit,
    Accessory,
}

impl EntityType {
    pub const ALL: [EntityType; 5] = [
        EntityType::Player,
        EntityType::Enemy,
        EntityType::Weapon,
        EntityType::Outfit,
        EntityType::Accessory,
    ];

    pub fn dir_name(self) -> &'static str {
        match self {
            EntityType::Player => "players",
            EntityType::Enemy => "enemies",
            EntityType::Weapon => "weapons",
            EntityType::Outfit => "outfits",
            EntityType::Accessory => "accessories",
        }
    }

    pub fn is_character(self) -> bool {
        matches!(self, EntityType::Player | EntityType::Enemy)
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

type Key = (EntityType, String);

pub struct Store {
    root: PathBuf,
    characters: IndexMap<Key, Character>,
    items: IndexMap<Key, Item>,
    dirty: BTreeSet<Key>,
}

impl Store {
    /// Open (and create, if missing) a data directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for ty in EntityType::ALL {
            let dir = root.join(ty.dir_name());
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create store dir: {}", dir.display()))?;
        }
        debug!(root = %root.display(), "store opened");
        Ok(Self {
            root,
            characters: IndexMap::new(),
            items: IndexMap::new(),
            dirty: BTreeSet::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, ty: EntityType, name: &str) -> PathBuf {
        self.root.join(ty.dir_name()).join(format!("{name}.json"))
    }

    /// Resolve a name case-insensitively, so "karg" finds "Karg". The
    /// identity map is consulted first: entities put but not yet
    /// committed resolve the same as entities on disk.
    fn resolve_key(&self, ty: EntityType, name: &str) -> Result<Option<String>> {
        let lower = name.trim().to_lowercase();
        let loaded: Box<dyn Iterator<Item = &Key>> = if ty.is_character() {
            Box::new(self.characters.keys())
        } else {
            Box::new(self.items.keys())
        };
        for (loaded_ty, loaded_name) in loaded {
            if *loaded_ty == ty && loaded_name.to_lowercase() == lower {
                return Ok(Some(loaded_name.clone()));
            }
        }
        if self.path_for(ty, name).exists() {
            return Ok(Some(name.to_string()));
        }
        for existing in self.list(ty)? {
            if existing.to_lowercase() == lower {
                return Ok(Some(existing));
            }
        }
        Ok(None)
    }

    fn load_json<T: for<'de> Deserialize<'de>>(&self, path: &Path) -> Result<T> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Fetch a character by type, loading it into the identity map on
    /// first access. Returns `None` when no such entity exists.
    pub fn character(&mut self, ty: EntityType, name: &str) -> Result<Option<&mut Character>> {
        if !ty.is_character() {
            bail!("{ty} entries are items, not characters");
        }
        let Some(key_name) = self.resolve_key(ty, name)? else {
            return Ok(None);
        };
        let key = (ty, key_name);
        if !self.characters.contains_key(&key) {
            let path = self.path_for(ty, &key.1);
            let loaded: Character = self.load_json(&path)?;
            debug!(%ty, name = %key.1, "loaded character");
            self.characters.insert(key.clone(), loaded);
        }
        Ok(self.characters.get_mut(&key))
    }

    /// Players first, then enemies (both namespaces share a lookup).
    pub fn find_character(&mut self, name: &str) -> Result<Option<(EntityType, String)>> {
        for ty in [EntityType::Player, EntityType::Enemy] {
            if let Some(found) = self.resolve_key(ty, name)? {
                // Force the load so later gets hit the identity map.
                self.character(ty, &found)?;
                return Ok(Some((ty, found)));
            }
        }
        Ok(None)
    }

    pub fn item(&mut self, ty: EntityType, name: &str) -> Result<Option<&Item>> {
        if ty.is_character() {
            bail!("{ty} entries are characters, not items");
        }
        let Some(key_name) = self.resolve_key(ty, name)? else {
            return Ok(None);
        };
        let key = (ty, key_name);
        if !self.items.contains_key(&key) {
            let path = self.path_for(ty, &key.1);
            let loaded: Item = self.load_json(&path)?;
            debug!(%ty, name = %key.1, "loaded item");
            self.items.insert(key.clone(), loaded);
        }
        Ok(self.items.get(&key))
    }

    /// Insert or replace a character and mark it dirty.
    pub fn put_character(&mut self, ty: EntityType, character: Character) -> Result<()> {
        if !ty.is_character() {
            bail!("{ty} entries are items, not characters");
        }
        let key = (ty, character.name.clone());
        self.characters.insert(key.clone(), character);
        self.dirty.insert(key);
        Ok(())
    }

    /// Insert or replace an item and mark it dirty.
    pub fn put_item(&mut self, ty: EntityType, item: Item) -> Result<()> {
        if ty.is_character() {
            bail!("{ty} entries are characters, not items");
        }
        let key = (ty, item.name.clone());
        self.items.insert(key.clone(), item);
        self.dirty.insert(key);
        Ok(())
    }

    /// Record an in-memory mutation so the next commit persists it.
    pub fn mark_dirty(&mut self, ty: EntityType, name: &str) {
        self.dirty.insert((ty, name.to_string()));
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Write every dirty entity to disk. Returns how many files were
    /// written.
    pub fn commit(&mut self) -> Result<usize> {
        let dirty = std::mem::take(&mut self.dirty);
        let mut written = 0usize;
        for key in dirty {
            let path = self.path_for(key.0, &key.1);
            let json = if key.0.is_character() {
                let Some(character) = self.characters.get(&key) else { continue };
                serde_json::to_string_pretty(character)?
            } else {
                let Some(item) = self.items.get(&key) else { continue };
                serde_json::to_string_pretty(item)?
            };
            fs::write(&path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            debug!(ty = %key.0, name = %key.1, "committed");
            written += 1;
        }
        Ok(written)
    }

    /// Names present on disk for one entity type, sorted.
    pub fn list(&self, ty: EntityType) -> Result<Vec<String>> {
        let dir = self.root.join(ty.dir_name());
        let mut names = Vec::new();
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("failed to read store dir: {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json")
                && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
            {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete an entity from disk and from the identity map.
    pub fn remove(&mut self, ty: EntityType, name: &str) -> Result<bool> {
        let Some(key_name) = self.resolve_key(ty, name)? else {
            return Ok(false);
        };
        let key = (ty, key_name);
        let path = self.path_for(ty, &key.1);
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to remove {}", path.display()))?;
        }
        self.characters.shift_remove(&key);
        self.items.shift_remove(&key);
        self.dirty.remove(&key);
        Ok(true)
    }
}
