//! Prints an argon2 hash for an administrator password, plus the SQL to seed it.
//!
//! Usage: `generate-hash <email> <name> <password>`

#[path = "../utils/password.rs"]
mod password;

use std::env;
use std::process;

fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `INSERT` for one active administrator. The email is stored lowercased.
fn seed_sql(email: &str, name: &str, hash: &str) -> String {
    format!(
        "INSERT INTO admin_users (id, email, password_hash, name) \
         VALUES (gen_random_uuid(), {}, {}, {});",
        sql_literal(&email.trim().to_lowercase()),
        sql_literal(hash),
        sql_literal(name.trim())
    )
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let [email, name, secret] = args.as_slice() else {
        eprintln!("usage: generate-hash <email> <name> <password>");
        process::exit(2);
    };
    if secret.is_empty() {
        eprintln!("password cannot be empty");
        process::exit(2);
    }

    let hash = match password::hash_password(secret) {
        Ok(hash) => hash,
        Err(err) => {
            eprintln!("failed to hash password: {}", err);
            process::exit(1);
        }
    };
    if !password::verify_password(secret, &hash) {
        eprintln!("generated hash does not verify");
        process::exit(1);
    }

    println!("{}", hash);
    println!();
    println!("{}", seed_sql(email, name, &hash));
}
