use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use otpkey_lib::{
    Aes128Cipher, Alphabet, JsonStore, Otp, TokenConfig, TokenGenerator, TokenState, TokenStore,
};

/// Software rendition of a one-time-password hardware token.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the token state file.
    #[arg(short, long, default_value = "token.json")]
    store: PathBuf,
    #[command(flatten)]
    verbose: Verbosity<InfoLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a token state file with freshly drawn key and identities.
    Provision,
    /// Boot the token and emit one or more OTPs.
    Generate {
        /// Number of OTPs to emit.
        #[arg(short, long, default_value_t = 1)]
        count: u32,
        #[arg(long, default_value = "arduhex", value_parser = parse_alphabet)]
        alphabet: Alphabet,
        /// Dump the plaintext record before each encryption (trace level).
        #[arg(long)]
        debug_record: bool,
    },
    /// Boot the token and emit an OTP for every line read on stdin,
    /// with the session timestamp ticking in the background.
    Watch {
        #[arg(long, default_value = "arduhex", value_parser = parse_alphabet)]
        alphabet: Alphabet,
        /// Timestamp tick period in milliseconds.
        #[arg(long, default_value_t = 10)]
        tick_ms: u64,
        /// Log emitted OTPs instead of printing them as bare lines.
        #[arg(long)]
        no_keystrokes: bool,
    },
    /// Decode an OTP with the stored key and print the record fields.
    Inspect {
        otp: String,
        #[arg(long, default_value = "arduhex", value_parser = parse_alphabet)]
        alphabet: Alphabet,
    },
}

fn parse_alphabet(s: &str) -> Result<Alphabet, String> {
    match s {
        "hex" => Ok(Alphabet::Hex),
        "arduhex" => Ok(Alphabet::ArduHex),
        _ => Err(format!("unknown alphabet '{s}' (expected 'hex' or 'arduhex')")),
    }
}

fn setup_logging(verbosity: &Verbosity<InfoLevel>) {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity.tracing_level_filter().into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.verbose);

    match cli.command {
        Command::Provision => provision(&cli.store),
        Command::Generate {
            count,
            alphabet,
            debug_record,
        } => generate(&cli.store, count, alphabet, debug_record),
        Command::Watch {
            alphabet,
            tick_ms,
            no_keystrokes,
        } => watch(&cli.store, alphabet, tick_ms, no_keystrokes).await,
        Command::Inspect { otp, alphabet } => inspect(&cli.store, &otp, alphabet),
    }
}

fn provision(path: &PathBuf) -> Result<()> {
    if path.exists() {
        bail!("refusing to overwrite existing token state at {:?}", path);
    }
    let state = TokenState::random();
    let store = JsonStore::create(path, state)
        .with_context(|| format!("failed to write token state to {:?}", path))?;
    println!("Provisioned new token at {:?}", path);
    println!("  Public ID: {}", store.state().public_id);
    println!("  Counter:   {}", store.state().counter);
    Ok(())
}

fn generate(path: &PathBuf, count: u32, alphabet: Alphabet, debug_record: bool) -> Result<()> {
    let store = JsonStore::load(path)
        .with_context(|| format!("failed to load token state from {:?}", path))?;
    let config = TokenConfig {
        debug: debug_record,
        emit_keystrokes: true,
        alphabet,
    };
    let mut generator: TokenGenerator<JsonStore, Aes128Cipher> =
        TokenGenerator::boot(store, config)?;

    for _ in 0..count {
        let otp = generator.generate()?;
        println!("{otp}");
    }
    Ok(())
}

async fn watch(path: &PathBuf, alphabet: Alphabet, tick_ms: u64, no_keystrokes: bool) -> Result<()> {
    let store = JsonStore::load(path)
        .with_context(|| format!("failed to load token state from {:?}", path))?;
    let config = TokenConfig {
        debug: false,
        emit_keystrokes: !no_keystrokes,
        alphabet,
    };
    let mut generator: TokenGenerator<JsonStore, Aes128Cipher> =
        TokenGenerator::boot(store, config)?;

    let ticker = generator.timer().spawn_ticker(Duration::from_millis(tick_ms));
    info!("press Enter to trigger an OTP, Ctrl-D to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while lines.next_line().await?.is_some() {
        match generator.generate() {
            Ok(otp) => {
                if generator.config().emit_keystrokes {
                    println!("{otp}");
                } else {
                    info!(%otp, "otp emitted");
                }
            }
            // no output for this trigger; the next trigger retries
            Err(err) => tracing::warn!(%err, "generation failed"),
        }
    }

    ticker.abort();
    Ok(())
}

fn inspect(path: &PathBuf, otp_text: &str, alphabet: Alphabet) -> Result<()> {
    let store = JsonStore::load(path)
        .with_context(|| format!("failed to load token state from {:?}", path))?;
    let key = store.aes_key()?;

    let otp = Otp::parse(otp_text, alphabet)?;
    let record = otp.open(&key)?;

    println!("OTP fields:");
    println!("  Public ID:       {}", hex::encode(otp.public_id));
    println!("  Secret ID:       {}", hex::encode(record.secret_id));
    println!("  Counter:         {}", record.counter);
    println!("  Timestamp:       {:#08x}", record.timestamp);
    println!("  Session counter: {}", record.session_counter);
    println!("  Random:          {:#06x}", record.random);
    println!("  CRC:             {:#06x} (valid)", record.crc);
    Ok(())
}
