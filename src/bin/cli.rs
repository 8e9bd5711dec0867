use clap::{Parser, Subcommand};
use reqwest::redirect::Policy;
use reqwest::Client;
use serde::Deserialize;
use std::fs;

#[derive(Parser)]
#[command(name = "dash-cli")]
#[command(about = "CLI for the invoice dashboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,
}

#[derive(Subcommand)]
enum Commands {
    Login {
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    CreateInvoice {
        #[arg(short, long)]
        customer_id: String,
        /// Amount in dollars, e.g. 49.99
        #[arg(short, long)]
        amount: String,
        /// pending or paid
        #[arg(short, long)]
        status: String,
    },
    UpdateInvoice {
        #[arg(short, long)]
        id: String,
        #[arg(short, long)]
        customer_id: String,
        #[arg(short, long)]
        amount: String,
        #[arg(short, long)]
        status: String,
    },
    DeleteInvoice {
        #[arg(short, long)]
        id: String,
    },
    ListInvoices,
    ListCustomers,
    Logout,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

const TOKEN_FILE: &str = ".dash_token";

fn read_token() -> String {
    fs::read_to_string(TOKEN_FILE).unwrap_or_default()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    // The server answers successful mutations with 303; keep the redirect
    // body instead of following it.
    let client = Client::builder().redirect(Policy::none()).build()?;

    match cli.command {
        Commands::Login { email, password } => {
            let res = client
                .post(format!("{}/login", cli.url))
                .form(&[("email", email), ("password", password)])
                .send()
                .await?;
            if res.status().is_redirection() {
                let body: LoginResponse = res.json().await?;
                fs::write(TOKEN_FILE, body.token)?;
                println!("Logged in. Token saved to {TOKEN_FILE}");
            } else {
                println!("Login failed: {}", res.text().await?);
            }
        }
        Commands::CreateInvoice {
            customer_id,
            amount,
            status,
        } => {
            let res = client
                .post(format!("{}/dashboard/invoices", cli.url))
                .header("Authorization", format!("Bearer {}", read_token()))
                .form(&[
                    ("customerId", customer_id),
                    ("amount", amount),
                    ("status", status),
                ])
                .send()
                .await?;
            if res.status().is_redirection() {
                println!("Invoice created.");
            } else {
                println!("Response: {}", res.text().await?);
            }
        }
        Commands::UpdateInvoice {
            id,
            customer_id,
            amount,
            status,
        } => {
            let res = client
                .put(format!("{}/dashboard/invoices/{}", cli.url, id))
                .header("Authorization", format!("Bearer {}", read_token()))
                .form(&[
                    ("customerId", customer_id),
                    ("amount", amount),
                    ("status", status),
                ])
                .send()
                .await?;
            if res.status().is_redirection() {
                println!("Invoice updated.");
            } else {
                println!("Response: {}", res.text().await?);
            }
        }
        Commands::DeleteInvoice { id } => {
            let res = client
                .delete(format!("{}/dashboard/invoices/{}", cli.url, id))
                .header("Authorization", format!("Bearer {}", read_token()))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::ListInvoices => {
            let res = client
                .get(format!("{}/dashboard/invoices", cli.url))
                .header("Authorization", format!("Bearer {}", read_token()))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::ListCustomers => {
            let res = client
                .get(format!("{}/dashboard/customers", cli.url))
                .header("Authorization", format!("Bearer {}", read_token()))
                .send()
                .await?;
            println!("Response: {}", res.text().await?);
        }
        Commands::Logout => {
            let _ = fs::remove_file(TOKEN_FILE);
            println!("Logged out (token removed).");
        }
    }

    Ok(())
}
