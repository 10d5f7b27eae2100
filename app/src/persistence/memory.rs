//! An in-process drinks table, pooled through `r2d2` like the postgres one.
//!
//! Rows keep their recipe as serialized JSON text, as the database does, so
//! the same encode/decode path is exercised.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::*;

use infra::ids::Id;

use super::{DrinkStore, StoreError};
use crate::menu::{Drink, DrinkPatch, Ingredient};

// Matches the `VARCHAR(80)` title column.
const MAX_TITLE_CHARS: usize = 80;

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i32, (String, String)>,
    last_id: i32,
    read_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    table: Arc<Mutex<Table>>,
}

/// Hands out handles onto one shared [`MemoryStore`].
#[derive(Debug, Clone, Default)]
pub struct MemoryConnectionManager {
    store: MemoryStore,
}

impl MemoryConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> MemoryStore {
        self.store.clone()
    }
}

impl r2d2::ManageConnection for MemoryConnectionManager {
    type Connection = MemoryStore;
    type Error = StoreError;

    fn connect(&self) -> Result<MemoryStore, StoreError> {
        Ok(self.store.clone())
    }

    fn is_valid(&self, _: &mut MemoryStore) -> Result<(), StoreError> {
        Ok(())
    }

    fn has_broken(&self, _: &mut MemoryStore) -> bool {
        false
    }
}

impl MemoryStore {
    /// While set, every write fails as if the database had refused it.
    pub fn set_read_only(&self, read_only: bool) -> Result<(), StoreError> {
        self.lock()?.read_only = read_only;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<Table>, StoreError> {
        self.table
            .lock()
            .map_err(|_| StoreError::Unavailable("table lock poisoned".into()))
    }

    fn writable(&self) -> Result<MutexGuard<Table>, StoreError> {
        let table = self.lock()?;
        if table.read_only {
            return Err(StoreError::Unavailable("table is read-only".into()));
        }
        Ok(table)
    }
}

impl Table {
    fn title_taken(&self, title: &str, except: Option<i32>) -> bool {
        self.rows
            .iter()
            .any(|(id, (t, _))| t == title && Some(*id) != except)
    }

    fn load(&self, id: i32) -> Result<Option<Drink>, StoreError> {
        self.rows
            .get(&id)
            .map(|(title, recipe)| decode(id, title, recipe))
            .transpose()
    }
}

impl DrinkStore for MemoryStore {
    fn setup(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        let mut table = self.writable()?;
        table.rows.clear();
        table.last_id = 0;
        Ok(())
    }

    fn list_all(&mut self) -> Result<Vec<Drink>, StoreError> {
        let table = self.lock()?;
        table
            .rows
            .iter()
            .map(|(id, (title, recipe))| decode(*id, title, recipe))
            .collect()
    }

    fn get(&mut self, id: Id<Drink>) -> Result<Option<Drink>, StoreError> {
        self.lock()?.load(id.get())
    }

    fn create(&mut self, title: &str, recipe: &[Ingredient]) -> Result<Drink, StoreError> {
        let mut table = self.writable()?;
        check_title_length(title)?;
        if table.title_taken(title, None) {
            warn!("Title {:?} already taken", title);
            return Err(StoreError::Conflict(title.to_string()));
        }
        let recipe = serde_json::to_string(recipe)?;
        table.last_id += 1;
        let id = table.last_id;
        table.rows.insert(id, (title.to_string(), recipe));
        debug!("Inserted row {}", id);
        table
            .load(id)?
            .ok_or_else(|| StoreError::Unavailable("inserted row vanished".into()))
    }

    fn update(&mut self, id: Id<Drink>, patch: &DrinkPatch) -> Result<Drink, StoreError> {
        let mut table = self.writable()?;
        if !table.rows.contains_key(&id.get()) {
            return Err(StoreError::NotFound(id));
        }
        if let Some(title) = patch.title.as_deref() {
            check_title_length(title)?;
            if table.title_taken(title, Some(id.get())) {
                warn!("Title {:?} already taken", title);
                return Err(StoreError::Conflict(title.to_string()));
            }
        }
        let recipe = patch
            .recipe
            .as_ref()
            .map(|r| serde_json::to_string(r))
            .transpose()?;

        if let Some(row) = table.rows.get_mut(&id.get()) {
            if let Some(title) = &patch.title {
                row.0 = title.clone();
            }
            if let Some(recipe) = recipe {
                row.1 = recipe;
            }
        }
        table.load(id.get())?.ok_or(StoreError::NotFound(id))
    }

    fn delete(&mut self, id: Id<Drink>) -> Result<(), StoreError> {
        let mut table = self.writable()?;
        match table.rows.remove(&id.get()) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id)),
        }
    }
}

fn check_title_length(title: &str) -> Result<(), StoreError> {
    let len = title.chars().count();
    if len > MAX_TITLE_CHARS {
        return Err(StoreError::Unavailable(format!(
            "title is {} characters; the limit is {}",
            len, MAX_TITLE_CHARS
        )));
    }
    Ok(())
}

fn decode(id: i32, title: &str, recipe: &str) -> Result<Drink, StoreError> {
    Ok(Drink {
        id: Id::new(id),
        title: title.to_string(),
        recipe: serde_json::from_str(recipe)?,
    })
}
