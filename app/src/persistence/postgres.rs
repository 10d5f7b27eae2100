use log::*;
use postgres::{Client, Row};

use infra::ids::Id;
use infra::pool::is_unique_violation;

use super::{DrinkStore, StoreError};
use crate::menu::{Drink, DrinkPatch, Ingredient};

const SETUP_SQL: &str = include_str!("../persistence.sql");
const DROP_SQL: &str = "DROP TABLE IF EXISTS drinks";
const LIST_SQL: &str = "SELECT id, title, recipe FROM drinks ORDER BY id";
const LOAD_SQL: &str = "SELECT id, title, recipe FROM drinks WHERE id = $1";
const INSERT_SQL: &str = "INSERT INTO drinks (title, recipe) VALUES ($1, $2) \
                          RETURNING id, title, recipe";
const UPDATE_SQL: &str = "UPDATE drinks \
                          SET title = COALESCE($2, title), recipe = COALESCE($3, recipe) \
                          WHERE id = $1 \
                          RETURNING id, title, recipe";
const DELETE_SQL: &str = "DELETE FROM drinks WHERE id = $1";

impl DrinkStore for Client {
    fn setup(&mut self) -> Result<(), StoreError> {
        self.batch_execute(SETUP_SQL)?;
        Ok(())
    }

    fn reset(&mut self) -> Result<(), StoreError> {
        let mut t = self.transaction()?;
        t.batch_execute(DROP_SQL)?;
        t.batch_execute(SETUP_SQL)?;
        t.commit()?;
        Ok(())
    }

    fn list_all(&mut self) -> Result<Vec<Drink>, StoreError> {
        let rows = self.query(LIST_SQL, &[])?;
        debug!("Loaded {} drinks", rows.len());
        rows.iter().map(from_row).collect()
    }

    fn get(&mut self, id: Id<Drink>) -> Result<Option<Drink>, StoreError> {
        let row = self.query_opt(LOAD_SQL, &[&id.get()])?;
        row.as_ref().map(from_row).transpose()
    }

    fn create(&mut self, title: &str, recipe: &[Ingredient]) -> Result<Drink, StoreError> {
        let recipe = serde_json::to_string(recipe)?;
        let row = self
            .query_one(INSERT_SQL, &[&title, &recipe])
            .map_err(|e| classify(e, title))?;
        from_row(&row)
    }

    fn update(&mut self, id: Id<Drink>, patch: &DrinkPatch) -> Result<Drink, StoreError> {
        let title = patch.title.as_deref();
        let recipe = patch
            .recipe
            .as_ref()
            .map(|r| serde_json::to_string(r))
            .transpose()?;
        let row = self
            .query_opt(UPDATE_SQL, &[&id.get(), &title, &recipe])
            .map_err(|e| classify(e, title.unwrap_or_default()))?;
        match row {
            Some(row) => from_row(&row),
            None => Err(StoreError::NotFound(id)),
        }
    }

    fn delete(&mut self, id: Id<Drink>) -> Result<(), StoreError> {
        let nrows = self.execute(DELETE_SQL, &[&id.get()])?;
        debug!("Delete modified {} rows", nrows);
        if nrows == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

fn from_row(row: &Row) -> Result<Drink, StoreError> {
    let id: i32 = row.try_get(0)?;
    let title: String = row.try_get(1)?;
    let recipe: String = row.try_get(2)?;
    let recipe = serde_json::from_str(&recipe)?;
    Ok(Drink {
        id: Id::new(id),
        title,
        recipe,
    })
}

fn classify(err: postgres::Error, title: &str) -> StoreError {
    if is_unique_violation(&err) {
        warn!("Title {:?} already taken", title);
        StoreError::Conflict(title.to_string())
    } else {
        StoreError::Database(err)
    }
}
