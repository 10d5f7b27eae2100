use std::net::SocketAddr;
use std::path::PathBuf;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::{Context, Result};
use log::*;
use serde::Deserialize;
use structopt::StructOpt;

use coffeeshop::config::{load_toml, EnvLogger, EnvOverrides};
use coffeeshop::errors;
use coffeeshop::menu::{Menu, Reset, Setup};
use coffeeshop::services::Commandable;
use coffeeshop::CoffeeShop;

#[derive(Debug, StructOpt)]
#[structopt(name = "serve", about = "Serve the coffee shop drinks API.")]
struct Opt {
    /// Input file
    #[structopt(parse(from_os_str))]
    config: PathBuf,
}

#[derive(Deserialize, Debug)]
struct Config {
    #[serde(flatten)]
    coffeeshop: coffeeshop::Config,
    listener: Listener,
    #[serde(default)]
    env_logger: EnvLogger,
}

#[derive(Deserialize, Debug)]
struct Listener {
    addr: SocketAddr,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let mut config: Config = load_toml(&opt.config)?;
    config.env_logger.builder().init();
    debug!("Options: {:?}", opt);

    let overrides = EnvOverrides::from_env()?;
    config.coffeeshop.apply(&overrides);
    let addr = overrides.listen_addr.unwrap_or(config.listener.addr);

    let db = config.coffeeshop.postgres.build().context("build pool")?;

    // The synchronous postgres client may not run inside the server's runtime.
    let menu = Menu::new(db.clone());
    if config.coffeeshop.reset_on_start {
        menu.execute(Reset).context("reset menu")?;
    } else {
        menu.execute(Setup).context("setup persistence")?;
    }

    actix_web::rt::System::new().block_on(async move {
        let verifier = config
            .coffeeshop
            .auth
            .load_verifier()
            .await
            .context("load signing keys")?;
        let shop = CoffeeShop::new(db, verifier);

        let srv = HttpServer::new(move || {
            App::new()
                .wrap(middleware::Logger::default())
                .configure(|cfg| shop.configure(cfg))
                .default_service(web::to(errors::not_found))
        })
        .bind(addr)
        .context("bind")?;
        info!("Listening on: {:?}", srv.addrs());
        srv.run().await.context("run server")?;
        Ok::<(), anyhow::Error>(())
    })
}
