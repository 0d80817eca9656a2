//! Character Persistence
//!
//! Save, load and delete character revisions by id. Two adapters:
//! an in-process map and a directory of pretty-printed JSON files.
//! Both refuse to overwrite a stored revision with an older one.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::demiurge::persona::Character;
use crate::demiurge::validation;
use crate::error::RepositoryError;

/// Single-writer store of the latest revision per character.
pub trait CharacterRepository: Send + Sync {
    /// Store `character` as the latest revision of its lineage.
    fn save(&self, character: &Character) -> Result<Character, RepositoryError>;

    fn get(&self, id: Uuid) -> Result<Character, RepositoryError>;

    fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    fn list_ids(&self) -> Result<Vec<Uuid>, RepositoryError>;
}

fn check_version(stored: &Character, incoming: &Character) -> Result<(), RepositoryError> {
    if incoming.version() < stored.version() {
        return Err(RepositoryError::StaleVersion {
            id: incoming.id(),
            stored: stored.version(),
            attempted: incoming.version(),
        });
    }
    Ok(())
}

/// Repository backed by a map guarded by a `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    characters: RwLock<HashMap<Uuid, Character>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.characters.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.read().is_empty()
    }
}

impl CharacterRepository for InMemoryRepository {
    fn save(&self, character: &Character) -> Result<Character, RepositoryError> {
        let mut characters = self.characters.write();
        if let Some(stored) = characters.get(&character.id()) {
            check_version(stored, character)?;
        }
        characters.insert(character.id(), character.clone());
        Ok(character.clone())
    }

    fn get(&self, id: Uuid) -> Result<Character, RepositoryError> {
        self.characters
            .read()
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.characters
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(id))
    }

    fn list_ids(&self) -> Result<Vec<Uuid>, RepositoryError> {
        let mut ids: Vec<Uuid> = self.characters.read().keys().copied().collect();
        ids.sort();
        Ok(ids)
    }
}

/// Repository storing one `<id>.json` file per character under `base_path`.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    base_path: PathBuf,
}

impl JsonFileRepository {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Create the data directory and its `.gitignore`.
    pub fn initialize(&self) -> Result<(), RepositoryError> {
        fs::create_dir_all(&self.base_path)?;

        let gitignore_path = self.base_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(&gitignore_path, "# Ziggurat Chronicle character data\n*\n!.gitignore\n")?;
        }
        Ok(())
    }

    fn path_for(&self, id: Uuid) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }

    /// Load and check a stored revision; hand-edited files are rejected here
    /// rather than at the next commit.
    fn read(&self, path: &Path) -> Result<Character, RepositoryError> {
        let file = fs::File::open(path)?;
        let character: Character = serde_json::from_reader(BufReader::new(file))?;
        if let Err(errors) = validation::validate_stored(&character) {
            warn!(path = %path.display(), errors = errors.len(), "rejecting invalid character file");
            return Err(RepositoryError::Invalid {
                path: path.to_path_buf(),
                errors,
            });
        }
        Ok(character)
    }
}

impl CharacterRepository for JsonFileRepository {
    fn save(&self, character: &Character) -> Result<Character, RepositoryError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.path_for(character.id());
        if path.exists() {
            let stored = self.read(&path)?;
            check_version(&stored, character)?;
        }

        // write-then-rename so a crash never leaves a truncated file
        let tmp_path = path.with_extension("json.tmp");
        let json_content = serde_json::to_string_pretty(character)?;
        fs::write(&tmp_path, json_content)?;
        fs::rename(&tmp_path, &path)?;

        debug!(
            character = %character.id(),
            version = character.version(),
            path = %path.display(),
            "saved character"
        );
        Ok(character.clone())
    }

    fn get(&self, id: Uuid) -> Result<Character, RepositoryError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(RepositoryError::NotFound(id));
        }
        self.read(&path)
    }

    fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let path = self.path_for(id);
        if !path.exists() {
            return Err(RepositoryError::NotFound(id));
        }
        fs::remove_file(&path)?;
        debug!(character = %id, "deleted character");
        Ok(())
    }

    fn list_ids(&self) -> Result<Vec<Uuid>, RepositoryError> {
        let mut ids = Vec::new();
        if !self.base_path.exists() {
            return Ok(ids);
        }

        for entry in fs::read_dir(&self.base_path)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    match Uuid::parse_str(stem) {
                        Ok(id) => ids.push(id),
                        Err(_) => warn!(path = %path.display(), "skipping non-character file"),
                    }
                }
            }
        }

        ids.sort();
        Ok(ids)
    }
}
