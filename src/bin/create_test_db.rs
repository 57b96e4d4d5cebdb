use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use time::macros::date;

use finanzas_rs::{PasswordHash, Role, UserID, ValidatedPassword, initialize_db};

/// A utility for creating a seeded database for manual testing of finanzas_rs.
///
/// Creates one admin and three regular users, all with the password
/// "password123", plus a handful of sample transactions owned by the admin.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

const SEED_PASSWORD: &str = "password123";

const SEED_USERS: [(&str, &str, Role); 4] = [
    ("Admin User", "admin@example.com", Role::Admin),
    ("User 1", "user1@example.com", Role::User),
    ("User 2", "user2@example.com", Role::User),
    ("User 3", "user3@example.com", Role::User),
];

const SEED_TRANSACTIONS: [(&str, f64, time::Date); 5] = [
    ("Venta de productos", 1500.50, date!(2024 - 01 - 15)),
    ("Pago de servicios", -350.25, date!(2024 - 01 - 18)),
    ("Consultoría", 2200.00, date!(2024 - 02 - 02)),
    ("Alquiler de oficina", -800.00, date!(2024 - 02 - 05)),
    ("Venta de productos", 980.75, date!(2024 - 02 - 12)),
];

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating test users...");

    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked(SEED_PASSWORD),
        PasswordHash::DEFAULT_COST,
    )?;

    let mut admin_id = None;
    for (name, email, role) in SEED_USERS {
        let user = finanzas_rs::create_user(name, email, role, password_hash.clone(), &conn)?;

        if role == Role::Admin {
            admin_id = Some(user.id);
        }
    }

    let admin_id: UserID = admin_id.expect("seed data contains an admin");

    println!("Creating sample transactions...");

    for (concepto, monto, fecha) in SEED_TRANSACTIONS {
        conn.execute(
            "INSERT INTO \"transaction\" (concepto, monto, fecha, user_id) VALUES (?1, ?2, ?3, ?4)",
            (concepto, monto, fecha, admin_id.as_i64()),
        )?;
    }

    println!("Success! All accounts use the password {SEED_PASSWORD:?}.");

    Ok(())
}
