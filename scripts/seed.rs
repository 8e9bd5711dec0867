//! Seed script for the invoice dashboard.
//!
//! Populates the store with placeholder data:
//! - A login user (bcrypt-hashed password)
//! - Customers for the invoice form's selector
//! - A handful of invoices across both statuses
//! Run: cargo run --bin seed

use chrono::NaiveDate;
use invoice_dash::auth::hash_password;
use invoice_dash::models::{Customer, InvoiceStatus, User};
use invoice_dash::storage::{InvoiceStore, Storage};
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://dashboard.db".to_string());
    let storage = Storage::open(&database_url).await?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: "User".to_string(),
        email: "user@nextmail.com".to_string(),
        password: hash_password("123456")?,
    };
    let _ = storage.create_user(&user).await; // Ignore if exists

    let customers = [
        ("Amy Burns", "amy@burns.com"),
        ("Lee Robinson", "lee@robinson.com"),
        ("Delba de Oliveira", "delba@oliveira.com"),
        ("Hector Simpson", "hector@simpson.com"),
    ];
    let mut customer_ids = Vec::new();
    for (name, email) in customers {
        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            email: email.to_string(),
        };
        let _ = storage.create_customer(&customer).await;
        customer_ids.push(customer.id);
    }
    println!("Seeded {} customers and the login user", customer_ids.len());

    // Sample invoices: amounts already in minor units, mixed statuses.
    let mut seeded = 0;
    for (i, customer_id) in customer_ids.iter().enumerate() {
        for (amount, status, date) in [
            (15_795, InvoiceStatus::Pending, "2026-07-06"),
            (8_945, InvoiceStatus::Paid, "2026-08-14"),
        ] {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;
            // Offset dates per customer so the listing order is interesting.
            let date = date - chrono::Duration::days(i as i64);
            storage
                .insert_invoice(customer_id, amount, status, date)
                .await?;
            seeded += 1;
        }
    }
    println!("Seeded {seeded} invoices");
    println!("Login with user@nextmail.com / 123456");

    Ok(())
}
