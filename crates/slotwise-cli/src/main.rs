//! `slotwise` CLI — query availability and check bookings against a provider
//! schedule file.
//!
//! ## Usage
//!
//! ```sh
//! # Open slots on a single date
//! slotwise slots -s schedule.json -d 2025-03-03
//!
//! # Calendar view over a date range
//! slotwise range -s schedule.json --from 2025-03-03 --to 2025-03-09
//!
//! # Would this booking be admitted right now?
//! slotwise check -s schedule.json --start 2025-03-03T15:00:00Z --end 2025-03-03T16:00:00Z
//!
//! # Machine-readable output
//! slotwise slots -s schedule.json -d 2025-03-03 --json
//! ```
//!
//! The schedule file carries one provider plus its blackout rules and known
//! bookings, in the same JSON shapes the engine exposes at its API boundary.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use slotwise::{
    AvailabilityQueryService, BlackoutRule, Booking, BookingConflictGuard, MemoryStore, Provider,
    ProviderId, ResolvedSlot,
};
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "slotwise",
    version,
    about = "Provider availability and booking-conflict engine CLI"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show open slots for a single date
    Slots {
        /// Schedule file (JSON: provider, rules, bookings)
        #[arg(short, long)]
        schedule: String,
        /// Date to query (YYYY-MM-DD, provider-local)
        #[arg(short, long)]
        date: NaiveDate,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show open slots for every date in a range
    Range {
        /// Schedule file (JSON: provider, rules, bookings)
        #[arg(short, long)]
        schedule: String,
        /// First date of the range (inclusive)
        #[arg(long)]
        from: NaiveDate,
        /// Last date of the range (inclusive)
        #[arg(long)]
        to: NaiveDate,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Check whether a booking interval would be admitted right now
    Check {
        /// Schedule file (JSON: provider, rules, bookings)
        #[arg(short, long)]
        schedule: String,
        /// Requested start (RFC 3339 UTC, e.g. 2025-03-03T15:00:00Z)
        #[arg(long)]
        start: DateTime<Utc>,
        /// Requested end (RFC 3339 UTC)
        #[arg(long)]
        end: DateTime<Utc>,
    },
}

/// On-disk schedule: one provider with its rules and known bookings.
#[derive(Deserialize)]
struct ScheduleFile {
    provider: Provider,
    #[serde(default)]
    rules: Vec<BlackoutRule>,
    #[serde(default)]
    bookings: Vec<Booking>,
}

fn main() -> Result<()> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Slots {
            schedule,
            date,
            json,
        } => {
            let (store, provider_id) = load_schedule(&schedule)?;
            let service = AvailabilityQueryService::new(store);
            let slots = service
                .get_slots(&provider_id, date)
                .context("Failed to resolve availability")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&slots)?);
            } else {
                print_day(date, &slots);
            }
        }
        Commands::Range {
            schedule,
            from,
            to,
            json,
        } => {
            let (store, provider_id) = load_schedule(&schedule)?;
            let service = AvailabilityQueryService::new(store);
            let by_date = service
                .get_slots_range(&provider_id, from, to)
                .context("Failed to resolve availability")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&by_date)?);
            } else {
                for (date, slots) in &by_date {
                    print_day(*date, slots);
                }
            }
        }
        Commands::Check {
            schedule,
            start,
            end,
        } => {
            let (store, provider_id) = load_schedule(&schedule)?;
            let guard = BookingConflictGuard::new(store);
            match guard.reserve(&provider_id, start, end) {
                Ok(booking) => {
                    println!("available: booking {} would be confirmed", booking.id);
                }
                Err(err) => bail!("not bookable: {}", err),
            }
        }
    }

    Ok(())
}

fn load_schedule(path: &str) -> Result<(Arc<MemoryStore>, ProviderId)> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read schedule file: {}", path))?;
    let schedule: ScheduleFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse schedule file: {}", path))?;

    let provider_id = schedule.provider.id.clone();
    let store = Arc::new(MemoryStore::new());
    store.upsert_provider(schedule.provider)?;
    for rule in schedule.rules {
        store.seed_rule(&provider_id, rule)?;
    }
    for booking in schedule.bookings {
        if booking.provider_id != provider_id {
            bail!(
                "booking {} belongs to provider {}, not {}",
                booking.id,
                booking.provider_id,
                provider_id
            );
        }
        store.seed_booking(booking)?;
    }
    log::debug!("loaded schedule for provider {}", provider_id);
    Ok((store, provider_id))
}

fn print_day(date: NaiveDate, slots: &[ResolvedSlot]) {
    if slots.is_empty() {
        println!("{}  (no open slots)", date);
        return;
    }
    for slot in slots {
        println!(
            "{}  {}-{}  ({} min)",
            date,
            slot.start_time.format("%H:%M"),
            slot.end_time.format("%H:%M"),
            slot.duration_minutes
        );
    }
}
