use clap::Parser;
use qrshort_core::base36;

/// Converts between decimal identifiers and base-36 short codes.
#[derive(Debug, Parser)]
#[command(name = "to36")]
struct Args {
    /// Decimal identifier, or a short code with `--decode`.
    value: String,

    /// Print the decimal identifier of a short code instead.
    #[arg(long, short)]
    decode: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.decode {
        println!("{}", base36::decode(&args.value)?);
    } else {
        let id: u64 = args
            .value
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid base 10 value '{}': {e}", args.value))?;
        println!("{}", base36::encode(id));
    }

    Ok(())
}
