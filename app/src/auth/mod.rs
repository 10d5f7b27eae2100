//! Bearer-token authentication and per-endpoint scope checks.

mod guard;
mod verifier;

pub use self::guard::{
    authorize, Authorized, DeleteDrinks, GetDrinksDetail, PatchDrinks, Permission, PostDrinks,
};
pub use self::verifier::{bearer_token, AuthError, AuthToken, SigningKeys, TokenVerifier};
