//! # Seed Data Generator
//!
//! Populates the database with a demo catalogue for development.
//!
//! ## Usage
//! ```bash
//! # 20 movies with 3 copies each (default)
//! cargo run -p cinerent-db --bin seed
//!
//! # Custom amounts
//! cargo run -p cinerent-db --bin seed -- --movies 50 --copies 5
//!
//! # Specify database path
//! cargo run -p cinerent-db --bin seed -- --db ./data/cinerent.db
//! ```
//!
//! ## Generated Data
//! - Movies with prices between $1.99 and $5.99 (every tenth one has no
//!   price, to exercise the configuration error path)
//! - `--copies` available copies per movie
//! - A handful of users with credit between $0.00 and $40.00

use std::env;

use cinerent_core::{CopyState, Money};
use cinerent_db::{CopyPool, Database, DbConfig, Ledger, MovieRepository};
use tracing::info;
use tracing_subscriber::EnvFilter;

const TITLES: &[&str] = &[
    "Metropolis",
    "Nosferatu",
    "Alien",
    "Solaris",
    "Stalker",
    "Vertigo",
    "Rashomon",
    "Persona",
    "Ikiru",
    "Playtime",
    "Brazil",
    "Heat",
    "Ran",
    "Fargo",
    "Paris, Texas",
    "Chinatown",
    "The Thing",
    "La Strada",
    "Amores Perros",
    "Wings of Desire",
];

const USERS: &[(&str, i64)] = &[
    ("ana", 4000),
    ("bruno", 1500),
    ("carla", 599),
    ("diego", 0),
    ("elena", 2500),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut movies: usize = 20;
    let mut copies: i64 = 3;
    let mut db_path = String::from("./cinerent_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--movies" | "-m" => {
                if i + 1 < args.len() {
                    movies = args[i + 1].parse().unwrap_or(movies);
                    i += 1;
                }
            }
            "--copies" | "-c" => {
                if i + 1 < args.len() {
                    copies = args[i + 1].parse().unwrap_or(copies);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Cinerent Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -m, --movies <N>   Number of movies to generate (default: 20)");
                println!("  -c, --copies <N>   Copies per movie (default: 3)");
                println!("  -d, --db <PATH>    Database file path (default: ./cinerent_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    cinerent_core::validation::validate_capacity_target(copies)?;

    println!("🎬 Cinerent Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Movies:   {}", movies);
    println!("Copies:   {} per movie", copies);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
        .fetch_one(db.pool())
        .await?;
    if existing > 0 {
        println!("⚠ Database already has {} movies", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut tx = db.begin().await?;

    for n in 0..movies {
        let base = TITLES[n % TITLES.len()];
        let title = if n < TITLES.len() {
            base.to_string()
        } else {
            format!("{} ({})", base, n / TITLES.len() + 1)
        };
        let price_cents = if n % 10 == 9 {
            None
        } else {
            Some(199 + (n as i64 * 37) % 401)
        };

        let movie = MovieRepository::insert(&mut tx, &title, price_cents).await?;
        CopyPool::insert_copies(&mut tx, &movie.id, copies, CopyState::Available).await?;
    }

    for (name, credit_cents) in USERS {
        let user = Ledger::insert_user(&mut tx, name, Money::from_cents(*credit_cents)).await?;
        println!("  User {:<6} {}  credit {}", name, user.id, user.credit());
    }

    Database::commit(tx).await?;

    info!(movies, copies, users = USERS.len(), "Seed committed");
    println!();
    println!(
        "✓ Generated {} movies, {} copies and {} users in {:?}",
        movies,
        movies as i64 * copies,
        USERS.len(),
        start.elapsed()
    );
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Log level from `RUST_LOG`, INFO by default.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cinerent_db=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
