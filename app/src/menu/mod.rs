use log::*;
use r2d2::Pool;

use infra::ids::Id;

use crate::persistence::{DrinkStore, StoreError};
use crate::services::{Commandable, Queryable, Request};

mod models;
mod resources;
pub mod validation;

pub use self::models::{
    Drink, DrinkPatch, Ingredient, LongDrink, NewDrink, Projection, ShortDrink, ShortIngredient,
};

#[derive(Debug)]
pub struct Menu<M: r2d2::ManageConnection> {
    db: Pool<M>,
}

/// Every drink, oldest first.
#[derive(Debug, Clone, Copy)]
pub struct ListDrinks;

#[derive(Debug, Clone, Copy)]
pub struct FindDrink(pub Id<Drink>);

#[derive(Debug, Clone)]
pub struct CreateDrink(pub NewDrink);

#[derive(Debug, Clone)]
pub struct UpdateDrink {
    pub id: Id<Drink>,
    pub patch: DrinkPatch,
}

#[derive(Debug, Clone, Copy)]
pub struct DeleteDrink(pub Id<Drink>);

/// Creates the drinks table if it is missing.
#[derive(Debug, Clone, Copy)]
pub struct Setup;

/// Empties the menu and puts back the house drink.
#[derive(Debug, Clone, Copy)]
pub struct Reset;

impl<M: r2d2::ManageConnection<Connection = D>, D: DrinkStore + Send + 'static> Menu<M> {
    pub fn new(db: Pool<M>) -> Self {
        Menu { db }
    }

    fn house_drink() -> NewDrink {
        NewDrink {
            title: "water".into(),
            recipe: vec![Ingredient::new("water", "blue", 1)],
        }
    }
}

impl<M: r2d2::ManageConnection> Clone for Menu<M> {
    fn clone(&self) -> Self {
        let db = self.db.clone();
        Menu { db }
    }
}

impl Request for ListDrinks {
    type Resp = Vec<Drink>;
}
impl Request for FindDrink {
    type Resp = Option<Drink>;
}
impl Request for CreateDrink {
    type Resp = Drink;
}
impl Request for UpdateDrink {
    type Resp = Drink;
}
impl Request for DeleteDrink {
    type Resp = ();
}
impl Request for Setup {
    type Resp = ();
}
impl Request for Reset {
    type Resp = Drink;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: DrinkStore + Send + 'static>
    Queryable<ListDrinks> for Menu<M>
{
    fn query(&self, _: ListDrinks) -> Result<Vec<Drink>, StoreError> {
        self.db.get()?.list_all()
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: DrinkStore + Send + 'static>
    Queryable<FindDrink> for Menu<M>
{
    fn query(&self, FindDrink(id): FindDrink) -> Result<Option<Drink>, StoreError> {
        let res = self.db.get()?.get(id)?;
        debug!("Load {:?} -> {:?}", id, res);
        Ok(res)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: DrinkStore + Send + 'static>
    Commandable<CreateDrink> for Menu<M>
{
    fn execute(&self, CreateDrink(drink): CreateDrink) -> Result<Drink, StoreError> {
        let created = self.db.get()?.create(&drink.title, &drink.recipe)?;
        info!("Created {:?} ({:?})", created.id, created.title);
        Ok(created)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: DrinkStore + Send + 'static>
    Commandable<UpdateDrink> for Menu<M>
{
    fn execute(&self, UpdateDrink { id, patch }: UpdateDrink) -> Result<Drink, StoreError> {
        if patch.is_empty() {
            debug!("Empty patch for {:?}; drink is left as it was", id);
        }
        let updated = self.db.get()?.update(id, &patch)?;
        info!("Updated {:?}: {:?}", id, patch);
        Ok(updated)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: DrinkStore + Send + 'static>
    Commandable<DeleteDrink> for Menu<M>
{
    fn execute(&self, DeleteDrink(id): DeleteDrink) -> Result<(), StoreError> {
        self.db.get()?.delete(id)?;
        info!("Deleted {:?}", id);
        Ok(())
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: DrinkStore + Send + 'static>
    Commandable<Setup> for Menu<M>
{
    fn execute(&self, _: Setup) -> Result<(), StoreError> {
        debug!("Init schema");
        self.db.get()?.setup()
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: DrinkStore + Send + 'static>
    Commandable<Reset> for Menu<M>
{
    fn execute(&self, _: Reset) -> Result<Drink, StoreError> {
        warn!("Dropping every drink on the menu");
        let mut conn = self.db.get()?;
        conn.reset()?;
        let house = Self::house_drink();
        let drink = conn.create(&house.title, &house.recipe)?;
        info!("Menu reset; seeded {:?}", drink);
        Ok(drink)
    }
}
