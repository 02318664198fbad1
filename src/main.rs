use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use funnel::api::{CheckoutClient, SessionProbe};
use funnel::config::Config;
use funnel::flow::{
    store, FlowState, FlowStep, FlowStore, OnboardingStep, RegistrationStep,
};
use funnel::logging::init_logging;
use funnel::poll::{PaymentMonitor, PollOutcome, PollProgress};
use funnel::types::CreateCheckoutRequest;

#[derive(Parser)]
#[command(name = "funnel")]
#[command(about = "Checkout and onboarding funnel engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a starter project config
    Init {
        /// Checkout backend base URL
        #[arg(long)]
        api_base_url: String,

        /// Public anon key sent as a bearer token
        #[arg(long)]
        anon_key: Option<String>,
    },

    /// Show persisted funnel progress
    Status,

    /// Reset persisted flows
    Reset {
        /// Keep promotional pricing across the reset
        #[arg(long)]
        keep_promo: bool,
    },

    /// Open a checkout session for a selected plan
    Checkout {
        /// Backend plan identifier
        #[arg(long)]
        plan: String,

        /// Contact email
        #[arg(long)]
        email: String,

        /// Promotional entry code (optional)
        #[arg(long)]
        promo_code: Option<String>,
    },

    /// Poll the checkout backend until a payment settles
    AwaitPayment {
        /// Checkout session to watch
        session: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let _logging = init_logging(&config, cli.debug)?;

    match cli.command {
        Commands::Init {
            api_base_url,
            anon_key,
        } => cmd_init(api_base_url, anon_key),
        Commands::Status => cmd_status(&config),
        Commands::Reset { keep_promo } => cmd_reset(&config, keep_promo),
        Commands::Checkout {
            plan,
            email,
            promo_code,
        } => cmd_checkout(&config, plan, email, promo_code).await,
        Commands::AwaitPayment { session } => cmd_await_payment(&config, &session).await,
    }
}

fn cmd_init(api_base_url: String, anon_key: Option<String>) -> Result<()> {
    let mut config = Config::default();
    config.checkout.api_base_url = api_base_url;
    config.checkout.anon_key = anon_key;
    config.save()?;
    println!(
        "Config written to {}",
        Config::project_config_path().display()
    );
    Ok(())
}

fn cmd_status(config: &Config) -> Result<()> {
    let flow_store = FlowStore::open(config.state_path())?;
    print_flow_status::<RegistrationStep>(store::REGISTRATION, &flow_store)?;
    print_flow_status::<OnboardingStep>(store::ONBOARDING, &flow_store)?;
    Ok(())
}

fn print_flow_status<S: FlowStep>(name: &str, flow_store: &FlowStore) -> Result<()> {
    match flow_store.load(name)? {
        None => println!("{name}: no saved progress"),
        Some(snapshot) => {
            let state: FlowState<S> = FlowState::from_snapshot(&snapshot);
            let promo = if state.promo_pricing() {
                ", promo pricing"
            } else {
                ""
            };
            println!(
                "{name}: at {} ({}/{} steps completed{promo})",
                state.current_step().key(),
                state.completed_steps().len(),
                S::all().len(),
            );
        }
    }
    Ok(())
}

fn cmd_reset(config: &Config, keep_promo: bool) -> Result<()> {
    let flow_store = FlowStore::open(config.state_path())?;

    // Promo pricing is the one flag a registration reset may carry over
    let promo = flow_store
        .load(store::REGISTRATION)?
        .map(|snapshot| snapshot.promo_pricing)
        .unwrap_or(false);

    flow_store.clear(store::REGISTRATION)?;
    flow_store.clear(store::ONBOARDING)?;

    if keep_promo && promo {
        let mut state: FlowState<RegistrationStep> = FlowState::new();
        state.set_promo_pricing(true);
        flow_store.save(store::REGISTRATION, &state.snapshot())?;
        println!("Flows reset (promo pricing kept)");
    } else {
        println!("Flows reset");
    }
    Ok(())
}

async fn cmd_checkout(
    config: &Config,
    plan: String,
    email: String,
    promo_code: Option<String>,
) -> Result<()> {
    let client = CheckoutClient::new(&config.checkout)?;
    let request = CreateCheckoutRequest::new(plan, email, promo_code);
    let session = client.create_checkout_session(&request).await?;

    // Seed the registration flow from the session: promo entry points fix
    // plan data in advance, so those slots arrive pre-filled.
    let mut state: FlowState<RegistrationStep> = FlowState::new();
    state.set_promo_pricing(session.promo_applied);
    for (key, payload) in &session.prefill {
        if let Some(step) = RegistrationStep::from_key(key) {
            state.set_payload(step, payload.clone());
        }
    }

    let flow_store = FlowStore::open(config.state_path())?;
    flow_store.save(store::REGISTRATION, &state.snapshot())?;

    println!("Checkout session {} opened", session.session_id);
    println!("Pay at: {}", session.checkout_url);
    println!(
        "Then run: funnel await-payment {}",
        session.session_id
    );
    Ok(())
}

async fn cmd_await_payment(config: &Config, session: &str) -> Result<()> {
    let client = Arc::new(CheckoutClient::new(&config.checkout)?);
    let probe = Arc::new(SessionProbe::new(client, session));

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<PollProgress>();
    tokio::spawn(async move {
        while let Some(progress) = progress_rx.recv().await {
            println!(
                "Still processing payment ({}/{})",
                progress.attempt, progress.max_attempts
            );
        }
    });

    // Ctrl-C tears the loop down without surfacing a result
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    let mut monitor = PaymentMonitor::new(probe, config.checkout.backoff())
        .with_progress(progress_tx)
        .with_shutdown(shutdown_rx);

    match monitor.run().await {
        PollOutcome::Success(payload) => {
            let flow_store = FlowStore::open(config.state_path())?;

            // Enter onboarding with the credentials payload and jump past
            // the payment-success screen; registration is finished.
            let mut onboarding: FlowState<OnboardingStep> = FlowState::new();
            onboarding.set_payload(OnboardingStep::PaymentSuccess, payload);
            onboarding.try_navigate_to(OnboardingStep::TrainingType);
            flow_store.save(store::ONBOARDING, &onboarding.snapshot())?;
            flow_store.clear(store::REGISTRATION)?;

            println!("Payment confirmed. Onboarding started.");
        }
        PollOutcome::Failure(payload) => {
            let reason = payload
                .get("reason")
                .and_then(|r| r.as_str())
                .unwrap_or("unknown");
            println!("Payment failed ({reason}). Return to checkout to try again.");
        }
        PollOutcome::Exhausted => {
            println!(
                "Payment is still processing. Run `funnel await-payment {session}` again in a moment."
            );
        }
        PollOutcome::Cancelled => {
            println!("Cancelled.");
        }
    }
    Ok(())
}
