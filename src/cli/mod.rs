pub mod seed;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::database::{PgStore, Store};

#[derive(Parser)]
#[command(name = "seeder")]
#[command(about = "Load or remove DevCamper sample data")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Import users.json, bootcamps.json and courses.json from a directory")]
    Import {
        #[arg(default_value = "data", help = "Directory holding the JSON files")]
        dir: PathBuf,
    },

    #[command(about = "Delete every user, bootcamp and course")]
    Destroy,
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    let store = PgStore::connect(&config.database)
        .await
        .context("seeder needs DATABASE_URL pointing at PostgreSQL")?;
    store.migrate().await?;

    match cli.command {
        Commands::Import { dir } => {
            let summary = seed::import(&store, &dir).await?;
            println!(
                "Imported {} users, {} bootcamps, {} courses",
                summary.users, summary.bootcamps, summary.courses
            );
        }
        Commands::Destroy => {
            store.purge().await?;
            println!("Data destroyed");
        }
    }

    store.close().await;
    Ok(())
}
