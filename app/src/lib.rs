use actix_web::web;
use log::*;
use r2d2::Pool;

pub mod auth;
pub mod config;
pub mod errors;
pub mod menu;
pub mod persistence;
pub mod services;
#[cfg(test)]
mod test;

pub use crate::config::Config;

use crate::auth::TokenVerifier;
use crate::menu::Menu;
use crate::persistence::DrinkStore;

pub struct CoffeeShop<M: r2d2::ManageConnection> {
    menu: Menu<M>,
    verifier: web::Data<TokenVerifier>,
}

impl<M: r2d2::ManageConnection<Connection = D>, D: DrinkStore + Send + 'static> CoffeeShop<M> {
    pub fn new(db: Pool<M>, verifier: TokenVerifier) -> Self {
        let menu = Menu::new(db);
        let verifier = web::Data::new(verifier);
        CoffeeShop { menu, verifier }
    }

    pub fn menu(&self) -> &Menu<M> {
        &self.menu
    }

    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        info!("Configuring coffee shop routes");
        cfg.app_data(self.verifier.clone())
            .app_data(web::JsonConfig::default().error_handler(errors::json_error))
            .app_data(web::PathConfig::default().error_handler(errors::path_error));
        self.menu.configure(cfg);
    }
}

impl<M: r2d2::ManageConnection> Clone for CoffeeShop<M> {
    fn clone(&self) -> Self {
        CoffeeShop {
            menu: self.menu.clone(),
            verifier: self.verifier.clone(),
        }
    }
}
