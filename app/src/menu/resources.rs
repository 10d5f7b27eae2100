use actix_web::{web, HttpResponse};
use log::*;
use serde::Serialize;
use serde_json::Value;

use infra::ids::Id;

use super::validation::{validate_new, validate_patch};
use super::{CreateDrink, DeleteDrink, Drink, ListDrinks, Menu, UpdateDrink};
use crate::auth::{Authorized, DeleteDrinks, GetDrinksDetail, PatchDrinks, PostDrinks};
use crate::errors::{self, ApiError};
use crate::persistence::{DrinkStore, StoreError};
use crate::services::{Commandable, Queryable};

const DRINKS: &str = "/drinks";
const DRINKS_DETAIL: &str = "/drinks-detail";
const DRINK: &str = "/drinks/{id}";

#[derive(Serialize, Debug)]
struct DrinkList<T> {
    success: bool,
    drinks: Vec<T>,
}

#[derive(Serialize, Debug)]
struct Deleted {
    success: bool,
    delete: Id<Drink>,
}

impl<T: Serialize> DrinkList<T> {
    fn of(drinks: Vec<T>) -> HttpResponse {
        HttpResponse::Ok().json(DrinkList {
            success: true,
            drinks,
        })
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: DrinkStore + Send + 'static> Menu<M> {
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.clone()))
            .service(
                web::resource(DRINKS)
                    .route(web::get().to(Self::index))
                    .route(web::post().to(Self::create))
                    .default_service(web::to(errors::not_found)),
            )
            .service(
                web::resource(DRINKS_DETAIL)
                    .route(web::get().to(Self::detail))
                    .default_service(web::to(errors::not_found)),
            )
            .service(
                web::resource(DRINK)
                    .route(web::patch().to(Self::update))
                    .route(web::delete().to(Self::delete))
                    .default_service(web::to(errors::not_found)),
            );
    }

    async fn index(menu: web::Data<Self>) -> Result<HttpResponse, ApiError> {
        info!("Handle index");
        let drinks = menu.non_empty_menu().await?;
        Ok(DrinkList::of(drinks.iter().map(Drink::short).collect()))
    }

    async fn detail(
        auth: Authorized<GetDrinksDetail>,
        menu: web::Data<Self>,
    ) -> Result<HttpResponse, ApiError> {
        info!("Handle detail for {}", auth.subject);
        let drinks = menu.non_empty_menu().await?;
        Ok(DrinkList::of(drinks.iter().map(Drink::long).collect()))
    }

    async fn create(
        auth: Authorized<PostDrinks>,
        menu: web::Data<Self>,
        body: web::Json<Value>,
    ) -> Result<HttpResponse, ApiError> {
        let drink = validate_new(&body)?;
        debug!("{} submits {:?}", auth.subject, drink);
        let created = menu
            .in_pool(move |menu| menu.execute(CreateDrink(drink)))
            .await?;
        Ok(DrinkList::of(vec![created.long()]))
    }

    async fn update(
        auth: Authorized<PatchDrinks>,
        menu: web::Data<Self>,
        id: web::Path<Id<Drink>>,
        body: web::Json<Value>,
    ) -> Result<HttpResponse, ApiError> {
        let id = id.into_inner();
        let patch = validate_patch(&body)?;
        debug!("{} patches {:?} with {:?}", auth.subject, id, patch);
        let updated = menu
            .in_pool(move |menu| menu.execute(UpdateDrink { id, patch }))
            .await?;
        Ok(DrinkList::of(vec![updated.long()]))
    }

    async fn delete(
        auth: Authorized<DeleteDrinks>,
        menu: web::Data<Self>,
        id: web::Path<Id<Drink>>,
    ) -> Result<HttpResponse, ApiError> {
        let id = id.into_inner();
        debug!("{} deletes {:?}", auth.subject, id);
        menu.in_pool(move |menu| menu.execute(DeleteDrink(id)))
            .await?;
        Ok(HttpResponse::Ok().json(Deleted {
            success: true,
            delete: id,
        }))
    }

    // An empty menu is reported as missing rather than as an empty list.
    async fn non_empty_menu(&self) -> Result<Vec<Drink>, ApiError> {
        let drinks = self.in_pool(|menu| menu.query(ListDrinks)).await?;
        if drinks.is_empty() {
            debug!("No drinks on the menu");
            return Err(ApiError::NotFound);
        }
        Ok(drinks)
    }

    async fn in_pool<R, F>(&self, f: F) -> Result<R, ApiError>
    where
        R: Send + 'static,
        F: FnOnce(&Self) -> Result<R, StoreError> + Send + 'static,
    {
        let me = self.clone();
        let res = web::block(move || f(&me)).await?;
        Ok(res?)
    }
}
