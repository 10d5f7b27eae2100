use serde::{Deserialize, Serialize};
use serde_json::Number;

use infra::ids::{Entity, Id};

/// One line of a recipe: how many `parts` of a coloured ingredient go in.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Ingredient {
    pub name: String,
    pub color: String,
    pub parts: Number,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Drink {
    pub id: Id<Drink>,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Validated input for a new drink.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDrink {
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

/// Validated partial update; `None` leaves the stored value alone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DrinkPatch {
    pub title: Option<String>,
    pub recipe: Option<Vec<Ingredient>>,
}

/// What anonymous callers see of an ingredient.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ShortIngredient {
    pub name: String,
    pub color: String,
    pub parts: &'static str,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Projection<I> {
    pub id: Id<Drink>,
    pub title: String,
    pub recipe: Vec<I>,
}

pub type ShortDrink = Projection<ShortIngredient>;
pub type LongDrink = Projection<Ingredient>;

const PENDING: &str = "pending";

impl Drink {
    pub fn short(&self) -> ShortDrink {
        let recipe = self
            .recipe
            .iter()
            .map(|i| ShortIngredient {
                name: i.name.clone(),
                color: i.color.clone(),
                parts: PENDING,
            })
            .collect();
        Projection {
            id: self.id,
            title: self.title.clone(),
            recipe,
        }
    }

    pub fn long(&self) -> LongDrink {
        Projection {
            id: self.id,
            title: self.title.clone(),
            recipe: self.recipe.clone(),
        }
    }
}

impl DrinkPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.recipe.is_none()
    }
}

impl Ingredient {
    pub fn new(name: &str, color: &str, parts: impl Into<Number>) -> Self {
        Ingredient {
            name: name.to_string(),
            color: color.to_string(),
            parts: parts.into(),
        }
    }
}

impl Entity for Drink {
    const PREFIX: &'static str = "drink";
}
