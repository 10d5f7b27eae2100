use err_derive::Error;

use infra::ids::Id;

use crate::menu::{Drink, DrinkPatch, Ingredient};

pub mod memory;
pub mod postgres;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(display = "drink {} not found", _0)]
    NotFound(Id<Drink>),
    #[error(display = "drink may already exist: {}", _0)]
    Conflict(String),
    #[error(display = "database error")]
    Database(#[error(source)] #[error(from)] ::postgres::Error),
    #[error(display = "connection pool error")]
    Pool(#[error(source)] #[error(from)] r2d2::Error),
    #[error(display = "malformed stored recipe")]
    Recipe(#[error(source)] #[error(from)] serde_json::Error),
    #[error(display = "storage unavailable: {}", _0)]
    Unavailable(String),
}

/// Row-level operations on the drinks table. Every mutating call is a
/// single statement, and so commits or fails as a whole.
pub trait DrinkStore {
    fn setup(&mut self) -> Result<(), StoreError>;
    /// Drops and recreates the table.
    fn reset(&mut self) -> Result<(), StoreError>;
    fn list_all(&mut self) -> Result<Vec<Drink>, StoreError>;
    fn get(&mut self, id: Id<Drink>) -> Result<Option<Drink>, StoreError>;
    fn create(&mut self, title: &str, recipe: &[Ingredient]) -> Result<Drink, StoreError>;
    fn update(&mut self, id: Id<Drink>, patch: &DrinkPatch) -> Result<Drink, StoreError>;
    fn delete(&mut self, id: Id<Drink>) -> Result<(), StoreError>;
}
