use clap::{Parser, Subcommand};
use spineml_client::{Client, ClientError, Role};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "spineml-cli")]
#[command(about = "Send or receive analog batches on a SpineML stream server", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "127.0.0.1:50091")]
    addr: String,

    /// Stream name negotiated with the server.
    #[arg(short, long)]
    name: String,

    /// Values per batch.
    #[arg(short, long, default_value_t = 1)]
    size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Act as a source: send VALUES in batches of --size
    Send {
        /// Values to send. The count must be a multiple of --size.
        #[arg(required = true, allow_negative_numbers = true)]
        values: Vec<f64>,
    },
    /// Act as a target: print each received batch as a JSON array
    Recv {
        /// Stop after this many batches (default: until the server closes).
        #[arg(short, long)]
        count: Option<usize>,

        /// Give up after this many seconds without a batch.
        #[arg(short, long)]
        timeout_secs: Option<u64>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Send { values } => {
            if cli.size == 0 || values.len() % cli.size != 0 {
                return Err(format!(
                    "{} values cannot be split into batches of {}",
                    values.len(),
                    cli.size
                )
                .into());
            }
            let mut client = Client::connect(cli.addr.as_str(), Role::Source, cli.size, &cli.name)?;
            for batch in values.chunks(cli.size) {
                client.send_batch(batch)?;
            }
            eprintln!("Sent {} batches", values.len() / cli.size);
            client.close()?;
        }
        Commands::Recv {
            count,
            timeout_secs,
        } => {
            let mut client = Client::connect(cli.addr.as_str(), Role::Target, cli.size, &cli.name)?;
            client.set_read_timeout(timeout_secs.map(Duration::from_secs))?;
            let mut received = 0;
            while count.map_or(true, |limit| received < limit) {
                match client.recv_batch() {
                    Ok(batch) => {
                        println!("{}", serde_json::to_string(&batch)?);
                        received += 1;
                    }
                    Err(ClientError::Closed) => break,
                    Err(e) => return Err(e.into()),
                }
            }
            eprintln!("Received {} batches", received);
        }
    }

    Ok(())
}
