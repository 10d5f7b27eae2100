use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;
use structopt::StructOpt;

use infra::ids::Id;
use infra::pool::PostgresConfig;

use coffeeshop::config::{load_toml, EnvLogger, EnvOverrides};
use coffeeshop::menu::{FindDrink, ListDrinks, Menu, Reset, Setup};
use coffeeshop::services::{Commandable, Queryable};

#[derive(Debug, StructOpt)]
#[structopt(name = "cs", about = "Coffee shop admin CLI")]
struct Opt {
    /// Input file
    #[structopt(parse(from_os_str))]
    config: PathBuf,
    #[structopt(subcommand)]
    command: Commands,
}

#[derive(Debug, StructOpt)]
enum Commands {
    #[structopt(name = "setup", about = "Create the drinks table if it is missing")]
    Setup,
    #[structopt(name = "reset", about = "Drop every drink and seed the house drink")]
    Reset,
    #[structopt(name = "show-menu", about = "Show menu")]
    ShowMenu,
    #[structopt(name = "show", about = "Show one drink in full")]
    Show { id: Id<coffeeshop::menu::Drink> },
}

// Only the sections the CLI needs; the rest of a server config is ignored.
#[derive(Deserialize, Debug)]
struct Config {
    postgres: PostgresConfig,
    #[serde(default)]
    env_logger: EnvLogger,
}

fn main() -> Result<()> {
    let opt = Opt::from_args();

    let mut config: Config = load_toml(&opt.config)?;
    config.env_logger.builder().init();

    if let Some(url) = EnvOverrides::from_env()?.postgres_url {
        config.postgres.url = url;
    }

    let menu = Menu::new(config.postgres.build().context("build pool")?);

    match opt.command {
        Commands::Setup => {
            menu.execute(Setup)?;
        }
        Commands::Reset => {
            let seeded = menu.execute(Reset)?;
            println!("{}: {}", seeded.id, seeded.title);
        }
        Commands::ShowMenu => {
            let list = menu.query(ListDrinks)?;
            for drink in list {
                println!("{}: {}", drink.id, drink.title);
            }
        }
        Commands::Show { id } => match menu.query(FindDrink(id))? {
            Some(drink) => println!("{}", serde_json::to_string_pretty(&drink.long())?),
            None => anyhow::bail!("no such drink: {}", id),
        },
    }

    Ok(())
}
