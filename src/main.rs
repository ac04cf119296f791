//! booking-rpc - flight/hotel pricing servers and the booking client.

use std::env;
use std::process::ExitCode;
use std::sync::Arc;

use tokio::signal;
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use booking_rpc::booking::{BookingClient, BookingOrder};
use booking_rpc::config::{ServiceConfig, Settings};
use booking_rpc::error::RpcError;
use booking_rpc::pricing::{FlightTariff, HotelTariff, Tariff};
use booking_rpc::socket::PricingListener;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return ExitCode::SUCCESS;
    }

    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{} {}", NAME, VERSION);
        return ExitCode::SUCCESS;
    }

    let Some(command) = args.get(1).map(String::as_str) else {
        print_help();
        return ExitCode::FAILURE;
    };

    let settings = match get_option(&args, "--config", Some("-c")) {
        Some(path) => match Settings::load(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Error loading configuration: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Settings::default(),
    };

    if let Err(e) = init_logging(&settings) {
        eprintln!("Error initializing logging: {}", e);
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!(error = %e, "Failed to create Tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    let result = match command {
        "flight-server" => {
            let tariff = FlightTariff::new(settings.flight.rate);
            runtime.block_on(run_server(&settings.flight, tariff, &settings))
        }
        "hotel-server" => {
            let tariff = HotelTariff::new(settings.hotel.rate);
            runtime.block_on(run_server(&settings.hotel, tariff, &settings))
        }
        "book" => match parse_order(&args) {
            Ok(order) => runtime.block_on(run_booking(order, &settings)),
            Err(message) => {
                eprintln!("{}", message);
                return ExitCode::FAILURE;
            }
        },
        other => {
            eprintln!("Unknown command '{}'. Run with --help for usage.", other);
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "{} {} failed", NAME, command);
            ExitCode::FAILURE
        }
    }
}

/// Bind one pricing service and serve until shutdown or the exchange limit.
async fn run_server<T: Tariff>(
    config: &ServiceConfig,
    tariff: T,
    settings: &Settings,
) -> Result<(), RpcError> {
    info!("Starting {} v{}", NAME, VERSION);

    let listener = PricingListener::bind(config, tariff, settings.limits.clone()).await?;

    let shutdown = Arc::new(Notify::new());

    tokio::select! {
        result = listener.run(Arc::clone(&shutdown)) => {
            result?;
        }
        _ = shutdown_signal() => {
            info!("Shutdown signal received, initiating graceful shutdown...");
            shutdown.notify_waiters();
            listener.wait_for_drain().await;
        }
    }

    let metrics = listener.metrics();
    info!(
        service = %listener.kind(),
        exchanges = metrics.total_exchanges(),
        failed = metrics.failed_exchanges(),
        "Pricing service stopped"
    );
    Ok(())
}

/// Build one booking and print it.
async fn run_booking(order: BookingOrder, settings: &Settings) -> Result<(), RpcError> {
    let client = BookingClient::from_settings(settings);
    let booking = client.build_order(order).await?;
    println!("{}", booking);
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print help message.
fn print_help() {
    println!(
        r#"{} {}
Flight and hotel pricing services and a composite booking client.

USAGE:
    {} <COMMAND> [OPTIONS]

COMMANDS:
    flight-server          Serve flight pricing (default 127.0.0.1:8001)
    hotel-server           Serve hotel pricing (default 127.0.0.1:8002)
    book                   Price a trip against both services and print it

OPTIONS:
    -c, --config <PATH>    Path to a TOML configuration file
        --client-id <N>    Booking client id            [default: 1]
        --origin <TEXT>    Trip origin                  [default: Araguari]
        --destination <T>  Trip destination             [default: Uberlandia]
        --distance <N>     Flight distance              [default: 50]
        --nights <N>       Hotel nights                 [default: 5]
    -h, --help             Print help information
    -V, --version          Print version information
"#,
        NAME, VERSION, NAME
    );
}

/// Get an option value given as `--name value`, `-s value` or `--name=value`.
fn get_option(args: &[String], long: &str, short: Option<&str>) -> Option<String> {
    for (i, arg) in args.iter().enumerate() {
        if (arg == long || Some(arg.as_str()) == short) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        if let Some(value) = arg.strip_prefix(long).and_then(|rest| rest.strip_prefix('=')) {
            return Some(value.to_string());
        }
    }
    None
}

fn parse_number<N: std::str::FromStr>(args: &[String], long: &str, default: N) -> Result<N, String> {
    match get_option(args, long, None) {
        Some(raw) => raw
            .parse()
            .map_err(|_| format!("Invalid value '{}' for {}", raw, long)),
        None => Ok(default),
    }
}

/// Build the booking order from `book` options.
fn parse_order(args: &[String]) -> Result<BookingOrder, String> {
    Ok(BookingOrder::new(
        parse_number(args, "--client-id", 1u64)?,
        get_option(args, "--origin", None).unwrap_or_else(|| "Araguari".to_string()),
        get_option(args, "--destination", None).unwrap_or_else(|| "Uberlandia".to_string()),
        parse_number(args, "--distance", 50i32)?,
        parse_number(args, "--nights", 5i32)?,
    ))
}

/// Initialize logging based on settings.
fn init_logging(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));

    match settings.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init()?;
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}
