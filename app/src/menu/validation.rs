//! Shape checks for drink request bodies.
//!
//! A field that is present but falsy (`null`, `false`, `0`, `""`, `[]`, `{}`)
//! counts as missing.

use err_derive::Error;
use serde_json::{Map, Value};

use super::models::{DrinkPatch, Ingredient, NewDrink};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(display = "{}", _0)]
pub struct ValidationError(pub String);

const TITLE: &str = "title";
const RECIPE: &str = "recipe";
const INGREDIENT_FIELDS: [&str; 3] = ["name", "color", "parts"];

type Result<T> = std::result::Result<T, ValidationError>;

pub fn validate_new(body: &Value) -> Result<NewDrink> {
    let body = as_object(body)?;

    for field in &[TITLE, RECIPE] {
        if !body.get(*field).map_or(false, is_truthy) {
            return Err(invalid(format!("Missing required field: {}", field)));
        }
    }

    let title = title(&body[TITLE])?;
    let ingredient = match &body[RECIPE] {
        Value::Object(obj) => ingredient(obj)?,
        _ => return Err(invalid("recipe must be a single ingredient object")),
    };

    Ok(NewDrink {
        title,
        recipe: vec![ingredient],
    })
}

pub fn validate_patch(body: &Value) -> Result<DrinkPatch> {
    let body = as_object(body)?;

    for field in &[TITLE, RECIPE] {
        if body.get(*field).map_or(false, |v| !is_truthy(v)) {
            return Err(invalid(format!("A value is required for field: {}", field)));
        }
    }

    let title = body.get(TITLE).map(title).transpose()?;
    let recipe = match body.get(RECIPE) {
        None => None,
        Some(Value::Object(obj)) => Some(vec![ingredient(obj)?]),
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(|item| match item {
                    Value::Object(obj) => ingredient(obj),
                    _ => Err(invalid("recipe entries must be ingredient objects")),
                })
                .collect::<Result<Vec<_>>>()?,
        ),
        Some(_) => {
            return Err(invalid(
                "recipe must be an ingredient object or a list of them",
            ))
        }
    };

    Ok(DrinkPatch { title, recipe })
}

fn as_object(body: &Value) -> Result<&Map<String, Value>> {
    body.as_object()
        .ok_or_else(|| invalid("request body must be a JSON object"))
}

fn title(value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid("title must be a string"))
}

fn ingredient(obj: &Map<String, Value>) -> Result<Ingredient> {
    let missing = INGREDIENT_FIELDS
        .iter()
        .filter(|f| !obj.contains_key(**f))
        .cloned()
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(invalid(format!(
            "Missing required recipe field(s): {}",
            missing.join(", ")
        )));
    }

    for field in INGREDIENT_FIELDS.iter() {
        if !is_truthy(&obj[*field]) {
            return Err(invalid(format!("Missing required recipe field: {}", field)));
        }
    }

    let text = |field: &str| {
        obj[field]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| invalid(format!("recipe field {} must be a string", field)))
    };
    let name = text("name")?;
    let color = text("color")?;
    let parts = match &obj["parts"] {
        Value::Number(n) => n.clone(),
        _ => return Err(invalid("recipe field parts must be a number")),
    };

    Ok(Ingredient { name, color, parts })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn invalid<S: Into<String>>(msg: S) -> ValidationError {
    ValidationError(msg.into())
}
