use clap::Parser;
use tracing_subscriber::EnvFilter;

use atm_ledger::{Atm, Bank, SessionEngine};

/// Replays ATM sessions and prints the resulting account balances
#[derive(Debug, Parser)]
#[clap(version)]
struct Args {
    /// The path to the session CSV file
    filename: std::path::PathBuf,
    /// The log level used when `RUST_LOG` is not set
    #[clap(long, default_value = "warn")]
    log_level: String,
    /// The name of the bank holding the accounts
    #[clap(long, default_value = "Example Bank")]
    bank_name: String,
    /// The code of the bank holding the accounts
    #[clap(long, default_value = "EB123")]
    bank_code: String,
    /// Where the ATM is located
    #[clap(long, default_value = "Downtown")]
    atm_location: String,
    /// The identifier of the ATM
    #[clap(long, default_value = "ATM001")]
    atm_id: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&args.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(&args.filename)?;
    let mut engine = SessionEngine::new(
        Bank::new(args.bank_name, args.bank_code),
        Atm::new(args.atm_location, args.atm_id),
    );

    for operation in reader.deserialize() {
        let operation: atm_ledger::Operation = operation?;
        let operation_type = operation.operation_type();
        // failed operations are logged and skipped
        if let Err(error) = engine.handle_operation(operation) {
            tracing::warn!(?operation_type, %error, "operation failed");
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(std::io::stdout());

    for account in engine.bank().accounts() {
        writer.serialize(account)?;
    }
    writer.flush()?;

    Ok(())
}
