//! Meridian seed CLI
//!
//! Creates the reference tables and fills them with generated countries,
//! states and cities, going through the same service calls an application
//! would use.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fake::faker::address::en::{CityName, CountryCode, CountryName, StateAbbr, StateName};
use fake::Fake;
use meridian::models::{
    all_schemas, AdminUserInput, AdminUserModel, ApiLogModel, CityInput, CityModel, CountryInput, CountryModel, StateInput,
    StateModel,
};
use meridian::query::{get_records, ListParams, PageWindow, RecordError};
use meridian::schema::{create_all, Entity};
use meridian::service::{admin_users, cities, countries, states};
use meridian::{connect, AppConfig, AuthConfig, MayPostgresExecutor, Transaction};
use std::process;

#[derive(Parser)]
#[command(name = "meridian-seed")]
#[command(about = "Schema setup and sample data for Meridian")]
#[command(version = "0.1.0")]
struct Cli {
    /// Database connection URL
    #[arg(long)]
    database_url: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet output (errors only)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the reference, admin and audit tables if missing
    Init,

    /// Insert generated reference data
    Seed {
        #[arg(long, default_value = "5")]
        countries: usize,

        #[arg(long, default_value = "3")]
        states_per_country: usize,

        #[arg(long, default_value = "4")]
        cities_per_state: usize,
    },

    /// Register an admin account
    CreateAdmin {
        #[arg(long)]
        email: String,

        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        /// Falls back to MERIDIAN_ADMIN_PASSWORD
        #[arg(long, env = "MERIDIAN_ADMIN_PASSWORD")]
        password: String,
    },

    /// Show live row counts per table
    Status,
}

fn main() {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(cli) {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            process::exit(1);
        }
    }
}

fn database_url(cli_url: Option<String>) -> Result<String> {
    if let Some(url) = cli_url {
        return Ok(url);
    }
    if std::env::var("MERIDIAN__DATABASE__URL").is_err() {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            return Ok(url);
        }
    }
    let config = AppConfig::load().context("loading configuration")?;
    Ok(config.database.url)
}

fn run(cli: Cli) -> Result<()> {
    let auth = AppConfig::load().map(|config| config.auth).unwrap_or_default();
    let url = database_url(cli.database_url)?;
    let client = connect(&url).context("connecting to database")?;
    let executor = MayPostgresExecutor::new(client);

    match cli.command {
        Commands::Init => handle_init(&executor),
        Commands::Seed {
            countries,
            states_per_country,
            cities_per_state,
        } => handle_seed(&executor, countries, states_per_country, cities_per_state),
        Commands::CreateAdmin {
            email,
            first_name,
            last_name,
            password,
        } => {
            let input = AdminUserInput {
                first_name,
                last_name,
                email,
                phone: None,
                password,
            };
            handle_create_admin(&executor, &auth, &input)
        }
        Commands::Status => handle_status(&executor),
    }
}

fn handle_init(executor: &MayPostgresExecutor) -> Result<()> {
    create_all(executor, &all_schemas()).context("creating tables")?;
    println!("✅ Tables ready");
    Ok(())
}

fn handle_create_admin(executor: &MayPostgresExecutor, auth: &AuthConfig, input: &AdminUserInput) -> Result<()> {
    let admin = admin_users::create_admin_user(executor, auth, input).context("creating admin")?;
    println!("✅ Admin {} created ({})", admin.email, admin.id);
    Ok(())
}

// Generated names collide now and then; a duplicate code is skipped, not fatal.
fn skip_conflict<T>(result: Result<T, RecordError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(RecordError::Conflict(msg)) => {
            log::warn!("skipped: {msg}");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

struct Seeded {
    states: usize,
    cities: usize,
}

fn seed_country(
    tx: &Transaction,
    index: usize,
    states_per_country: usize,
    cities_per_state: usize,
) -> Result<Option<Seeded>> {
    let input = CountryInput {
        name: CountryName().fake::<String>(),
        code: format!("{}{index}", CountryCode().fake::<String>()),
    };
    let Some(country) = skip_conflict(countries::create_country(tx, &input))? else {
        return Ok(None);
    };

    let mut seeded = Seeded { states: 0, cities: 0 };
    for j in 0..states_per_country {
        let input = StateInput {
            name: StateName().fake::<String>(),
            code: format!("{}{j}", StateAbbr().fake::<String>()),
            country_id: country.id.clone(),
        };
        let state = states::create_state(tx, &input)
            .with_context(|| format!("creating state in {}", country.name))?;
        seeded.states += 1;

        for _ in 0..cities_per_state {
            let input = CityInput {
                name: CityName().fake::<String>(),
                state_id: state.id.clone(),
            };
            cities::create_city(tx, &input)
                .with_context(|| format!("creating city in {}", state.name))?;
            seeded.cities += 1;
        }
    }
    log::debug!("seeded {}", country.name);
    Ok(Some(seeded))
}

// Each country lands with all of its states and cities or not at all.
fn handle_seed(
    executor: &MayPostgresExecutor,
    country_count: usize,
    states_per_country: usize,
    cities_per_state: usize,
) -> Result<()> {
    let (mut n_countries, mut n_states, mut n_cities) = (0usize, 0usize, 0usize);

    for i in 0..country_count {
        let tx = executor.begin().context("starting transaction")?;
        match seed_country(&tx, i, states_per_country, cities_per_state) {
            Ok(Some(seeded)) => {
                tx.commit().context("committing country")?;
                n_countries += 1;
                n_states += seeded.states;
                n_cities += seeded.cities;
            }
            Ok(None) => tx.rollback().context("rolling back skipped country")?,
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    log::error!("rollback failed: {rollback}");
                }
                return Err(e);
            }
        }
    }

    println!("✅ Seeded {n_countries} countries, {n_states} states, {n_cities} cities");
    Ok(())
}

fn live_count<E: Entity>(executor: &MayPostgresExecutor) -> Result<u64> {
    let window = PageWindow::new(0, 1)?;
    Ok(get_records::<E, _>(executor, window, &ListParams::new())?.count)
}

fn handle_status(executor: &MayPostgresExecutor) -> Result<()> {
    if !executor.check_health().context("checking connection")? {
        bail!("database did not answer the health check");
    }
    println!("\n📊 Reference data\n");
    println!("  countries: {}", live_count::<CountryModel>(executor)?);
    println!("  states:    {}", live_count::<StateModel>(executor)?);
    println!("  cities:    {}", live_count::<CityModel>(executor)?);
    println!("  admins:    {}", live_count::<AdminUserModel>(executor)?);
    println!("  api logs:  {}", live_count::<ApiLogModel>(executor)?);
    Ok(())
}
