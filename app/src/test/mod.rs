//! Guarded with `#[cfg(test)]` from `lib.rs`

use anyhow::Result;

use crate::menu::{
    CreateDrink, DeleteDrink, DrinkPatch, FindDrink, Ingredient, ListDrinks, Menu, NewDrink, Reset,
    Setup, UpdateDrink,
};
use crate::persistence::memory::MemoryConnectionManager;
use crate::persistence::StoreError;
use crate::services::{Commandable, Queryable};


fn menu() -> Result<Menu<MemoryConnectionManager>> {
    let pool = r2d2::Pool::builder()
        .max_size(2)
        .build(MemoryConnectionManager::new())?;
    let menu = Menu::new(pool);
    menu.execute(Setup)?;
    Ok(menu)
}

fn flat_white() -> NewDrink {
    NewDrink {
        title: "flat white".into(),
        recipe: vec![Ingredient::new("espresso", "brown", 2)],
    }
}

#[test]
fn reset_leaves_only_the_house_drink() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let menu = menu()?;
    menu.execute(CreateDrink(flat_white()))?;

    let water = menu.execute(Reset)?;

    assert_eq!(water.title, "water");
    assert_eq!(water.recipe, vec![Ingredient::new("water", "blue", 1)]);
    assert_eq!(menu.query(ListDrinks)?, vec![water]);
    Ok(())
}

#[test]
fn drink_lifecycle_through_the_menu() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let menu = menu()?;

    let created = menu.execute(CreateDrink(flat_white()))?;
    assert_eq!(menu.query(FindDrink(created.id))?, Some(created.clone()));

    let patch = DrinkPatch {
        recipe: Some(vec![
            Ingredient::new("espresso", "brown", 2),
            Ingredient::new("milk", "white", 3),
        ]),
        ..Default::default()
    };
    let updated = menu.execute(UpdateDrink {
        id: created.id,
        patch,
    })?;
    assert_eq!(updated.title, "flat white");
    assert_eq!(updated.recipe.len(), 2);

    menu.execute(DeleteDrink(created.id))?;
    assert_eq!(menu.query(FindDrink(created.id))?, None);
    assert!(menu.query(ListDrinks)?.is_empty());
    Ok(())
}

#[test]
fn listing_is_in_creation_order() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let menu = menu()?;
    let titles = vec!["latte", "cortado", "americano"];
    for title in titles.iter() {
        menu.execute(CreateDrink(NewDrink {
            title: title.to_string(),
            ..flat_white()
        }))?;
    }

    let listed = menu
        .query(ListDrinks)?
        .into_iter()
        .map(|d| d.title)
        .collect::<Vec<_>>();

    assert_eq!(listed, titles);
    Ok(())
}

#[test]
fn deleting_twice_reports_not_found() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let menu = menu()?;
    let created = menu.execute(CreateDrink(flat_white()))?;
    menu.execute(DeleteDrink(created.id))?;

    let err = menu
        .execute(DeleteDrink(created.id))
        .expect_err("second delete");

    assert!(matches!(err, StoreError::NotFound(id) if id == created.id), "{:?}", err);
    Ok(())
}
