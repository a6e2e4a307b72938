use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

use vip_tips::admin::availability_registry::AvailabilityRegistry;
use vip_tips::admin::booking_assembler::{AssemblerState, BookingAssembler};
use vip_tips::api::backend_api::BackendApiClient;
use vip_tips::api::payment_api::{PaymentApiClient, PaymentReceipt, PaymentVerifier};
use vip_tips::api::sms_api::SmsApiClient;
use vip_tips::models::bundle::Category;
use vip_tips::models::game::MatchStatus;
use vip_tips::utils::data::{load_from_cache, save_slips_to_csv, save_to_cache};

#[derive(Parser)]
#[command(name = "tips-admin", about = "Admin console for the tips site")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a batch of games for a category by booking code
    Load { category: String, code: String },
    /// Set the package price for a category
    Price { category: String, price: String },
    /// Attach the share code and the alternate-platform code to a batch
    Codes {
        category: String,
        primary: String,
        secondary: String,
    },
    /// Set the upload deadline (RFC 3339) for a batch
    Deadline { category: String, when: String },
    /// Remove one game from a batch
    Remove { category: String, game_id: String },
    /// Upload a category's batch to the backend
    Upload { category: String },
    /// Show in-progress batches
    Status,
    /// Record a result (won/lost/pending) for an uploaded game
    Result { game_id: String, result: String },
    /// List active slips
    Slips,
    /// Archive a slip by its key
    Archive { key: i64 },
    /// Export active slips to CSV
    Export { path: PathBuf },
    /// Clear every batch, price and the history
    ClearAll,
    /// Show package availability
    Plans,
    /// Flip a package between Available and Sold Out
    Toggle { plan: String },
    /// Broadcast an SMS to subscribers
    Sms {
        message: String,
        recipients: Vec<String>,
    },
    /// Verify a payment reference against the backend
    Verify {
        reference: String,
        email: String,
        booking_id: String,
    },
}

fn load_state(path: &Path) -> AssemblerState {
    if path.exists() {
        match load_from_cache(path) {
            Ok(state) => return state,
            Err(err) => eprintln!("Could not read {}: {}", path.display(), err),
        }
    }
    AssemblerState::default()
}

async fn save_state(assembler: &BookingAssembler<BackendApiClient>, path: &Path) -> Result<()> {
    save_to_cache(&assembler.state_snapshot().await, path)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let base_url =
        std::env::var("TIPS_BACKEND_URL").context("TIPS_BACKEND_URL not set in .env file")?;
    let cache_dir =
        PathBuf::from(std::env::var("TIPS_CACHE_DIR").unwrap_or_else(|_| "cache".to_string()));
    let state_file = cache_dir.join("admin_state.json");
    let availability_cache = cache_dir.join("availability_cache.json");

    let backend = BackendApiClient::new(&base_url)?;

    match cli.command {
        Command::Load { category, code } => {
            let category: Category = category.parse()?;
            let assembler = BookingAssembler::with_state(backend, load_state(&state_file));
            let games = assembler.load_by_code(category, &code).await?;
            println!("Loaded {} games for {}:\n", games.len(), category);
            for (i, game) in games.iter().enumerate() {
                println!("{}. {} [{}]", i + 1, game.format(), game.id);
            }
            save_state(&assembler, &state_file).await?;
        }
        Command::Price { category, price } => {
            let category: Category = category.parse()?;
            let assembler = BookingAssembler::with_state(backend, load_state(&state_file));
            let value = assembler.set_price(category, &price).await?;
            println!("{} price set to {:.2}", category, value);
            save_state(&assembler, &state_file).await?;
        }
        Command::Codes {
            category,
            primary,
            secondary,
        } => {
            let category: Category = category.parse()?;
            let assembler = BookingAssembler::with_state(backend, load_state(&state_file));
            assembler.attach_codes(category, &primary, &secondary).await?;
            println!("Codes attached to the {} batch", category);
            save_state(&assembler, &state_file).await?;
        }
        Command::Deadline { category, when } => {
            let category: Category = category.parse()?;
            let deadline = DateTime::parse_from_rfc3339(&when)
                .with_context(|| format!("'{}' is not an RFC 3339 timestamp", when))?
                .with_timezone(&Utc);
            let assembler = BookingAssembler::with_state(backend, load_state(&state_file));
            assembler.set_deadline(category, deadline).await?;
            println!("{} deadline set to {}", category, deadline);
            save_state(&assembler, &state_file).await?;
        }
        Command::Remove { category, game_id } => {
            let category: Category = category.parse()?;
            let assembler = BookingAssembler::with_state(backend, load_state(&state_file));
            assembler.remove_game(category, &game_id).await?;
            println!("Removed {} from the {} batch", game_id, category);
            save_state(&assembler, &state_file).await?;
        }
        Command::Upload { category } => {
            let category: Category = category.parse()?;
            let assembler = BookingAssembler::with_state(backend, load_state(&state_file));
            let count = assembler.upload(category).await?;
            println!("Uploaded {} games for {}", count, category);
            save_state(&assembler, &state_file).await?;
        }
        Command::Status => {
            let assembler = BookingAssembler::with_state(backend, load_state(&state_file));
            let drafts = assembler.drafts().await;
            if drafts.is_empty() {
                println!("No batches in progress.");
            }
            for (category, draft) in drafts {
                let price = assembler.price_of(category).await;
                println!(
                    "{} [{}]: {} games, price {}",
                    category,
                    draft.booking_code,
                    draft.games.len(),
                    price.map(|p| format!("{:.2}", p)).unwrap_or_else(|| "unset".to_string())
                );
                for game in &draft.games {
                    println!("   {} [{}]", game.format(), game.id);
                }
            }
        }
        Command::Result { game_id, result } => {
            let result: MatchStatus = result.parse()?;
            let assembler = BookingAssembler::with_state(backend, load_state(&state_file));
            assembler.update_game_result(&game_id, result).await?;
            println!("{} marked {}", game_id, result);
            save_state(&assembler, &state_file).await?;
        }
        Command::Slips => {
            let assembler = BookingAssembler::with_state(backend, load_state(&state_file));
            let slips = assembler.active_slips().await;
            if slips.is_empty() {
                println!("No active slips.");
            }
            for (i, slip) in slips.iter().enumerate() {
                println!("{}. {} (key {})", i + 1, slip.format(), slip.key());
                for game in &slip.games {
                    println!("   {} [{}]", game.format(), game.id);
                }
            }
        }
        Command::Archive { key } => {
            let assembler = BookingAssembler::with_state(backend, load_state(&state_file));
            assembler.archive_slip(key).await?;
            println!("Archived slip {}", key);
            save_state(&assembler, &state_file).await?;
        }
        Command::Export { path } => {
            let assembler = BookingAssembler::with_state(backend, load_state(&state_file));
            let slips = assembler.active_slips().await;
            save_slips_to_csv(&slips, &path)?;
            println!("Saved {} slips to {}", slips.len(), path.display());
        }
        Command::ClearAll => {
            let assembler = BookingAssembler::with_state(backend, load_state(&state_file));
            assembler.clear_all().await;
            println!("Cleared all batches and history.");
            save_state(&assembler, &state_file).await?;
        }
        Command::Plans => {
            let registry = AvailabilityRegistry::new(backend, Some(availability_cache));
            registry.refresh().await;
            let plans = registry.snapshot().await;
            if plans.is_empty() {
                println!("No plans known (backend unreachable and no cache).");
            }
            for plan in plans {
                println!(
                    "{}. {} - {}",
                    plan.id,
                    plan.name,
                    if plan.available { "Available" } else { "Sold Out" }
                );
            }
        }
        Command::Toggle { plan } => {
            let registry = AvailabilityRegistry::new(backend, Some(availability_cache));
            registry.refresh().await;
            let now_available = registry.toggle(&plan).await?;
            println!(
                "{} is now {}",
                plan,
                if now_available { "Available" } else { "Sold Out" }
            );
        }
        Command::Sms {
            message,
            recipients,
        } => {
            let sms = SmsApiClient::new(&base_url)?;
            let count = sms.broadcast(&message, &recipients).await?;
            println!("Broadcast queued for {} recipients", count);
        }
        Command::Verify {
            reference,
            email,
            booking_id,
        } => {
            let verify_url = std::env::var("PAYMENT_VERIFY_URL")
                .unwrap_or_else(|_| format!("{}/payment/verify", base_url));
            let payment = PaymentApiClient::new(verify_url)?;
            let receipt = PaymentReceipt {
                reference,
                email,
                booking_id,
            };
            payment.verify(&receipt).await?;
            println!("Payment {} verified", receipt.reference);
        }
    }

    Ok(())
}
