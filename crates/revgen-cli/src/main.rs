use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};

#[derive(Debug, Parser)]
#[command(name = "revgen-cli")]
#[command(about = "Review generator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Upsert shops from a YAML config file into the database.
    Seed {
        /// Path to the shops file; defaults to REVGEN_SHOPS_PATH.
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Dry-run product selection for a shop and print the picks.
    Select {
        /// Shop slug.
        shop: String,
        /// How many products to pick.
        #[arg(long, default_value_t = 3)]
        count: usize,
    },
    /// Assign posting slots to a shop's approved, unscheduled reviews.
    Schedule {
        /// Shop slug.
        shop: String,
    },
    /// Print this week's generated and scheduled counts for a shop.
    Stats {
        /// Shop slug.
        shop: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = revgen_core::load_app_config()?;
    let pool = revgen_db::connect_pool(
        &config.database_url,
        revgen_db::PoolConfig::from_app_config(&config),
    )
    .await?;

    match cli.command {
        Commands::Seed { file } => {
            revgen_db::run_migrations(&pool).await?;
            let path = file.unwrap_or_else(|| config.shops_path.clone());
            let shops_file = revgen_core::load_shops(&path)?;
            let count = revgen_db::seed_shops(&pool, &shops_file.shops).await?;
            println!("seeded {count} shops from {}", path.display());
        }
        Commands::Select { shop, count } => {
            let row = revgen_db::get_shop_by_slug(&pool, &shop).await?;
            let mut rng = StdRng::from_os_rng();
            let picks = revgen_engine::select_products(
                &pool,
                row.id,
                count,
                config.selection_days_back,
                &mut rng,
            )
            .await?;

            if picks.is_empty() {
                println!("no eligible products for {shop}");
            }
            for pick in picks {
                println!(
                    "#{}  {:<40}  {:>8.2}  {}",
                    pick.product_id, pick.product_name, pick.score, pick.reason
                );
            }
        }
        Commands::Schedule { shop } => {
            let row = revgen_db::get_shop_by_slug(&pool, &shop).await?;
            let review_ids = revgen_db::list_approved_unscheduled_ids(&pool, row.id).await?;
            let mut rng = StdRng::from_os_rng();
            let outcome = revgen_engine::schedule_reviews_for_shop(
                &pool,
                row.id,
                &review_ids,
                Utc::now(),
                &mut rng,
            )
            .await?;

            for (id, slot) in &outcome.scheduled {
                println!("review {id} -> {slot}");
            }
            if !outcome.unplaced.is_empty() {
                println!("unplaced (no free slot): {:?}", outcome.unplaced);
            }
            if outcome.scheduled.is_empty() && outcome.unplaced.is_empty() {
                println!("nothing to schedule for {shop}");
            }
        }
        Commands::Stats { shop } => {
            let row = revgen_db::get_shop_by_slug(&pool, &shop).await?;
            let now = Utc::now();
            let generated = revgen_engine::generated_count_this_week(&pool, row.id, now).await?;
            let scheduled = revgen_engine::scheduled_count_this_week(&pool, row.id, now).await?;
            println!(
                "{shop}: generated {generated}/{} this week, {scheduled} scheduled",
                row.reviews_per_week
            );
        }
    }

    Ok(())
}
