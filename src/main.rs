use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use truststore::common::TrustStoreResult;
use truststore::jks;
use truststore::resource::ResourceData;

#[derive(Parser)]
#[command(name = "truststore-cli")]
#[command(about = "Reproducible JKS trust stores from PEM certificate chains")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or refresh a trust store resource
    Apply {
        /// PEM file holding one or more certificates, repeatable
        #[arg(short, long = "certificate", required = true)]
        certificates: Vec<PathBuf>,

        /// Password sealing the trust store
        #[arg(short, long, default_value = "")]
        password: String,

        /// Resource state file
        #[arg(short, long)]
        state: PathBuf,
    },

    /// Write the trust store of a resource to a JKS file
    Export {
        /// Resource state file
        #[arg(short, long)]
        state: PathBuf,

        /// Output JKS file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List the entries of a JKS file
    Inspect {
        /// JKS file
        #[arg(long)]
        store: PathBuf,

        /// Password to verify the seal with
        #[arg(short, long, default_value = "")]
        password: String,
    },

    /// Forget the identifier of a resource
    Destroy {
        /// Resource state file
        #[arg(short, long)]
        state: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:?}", e);
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> TrustStoreResult<()> {
    match command {
        Commands::Apply {
            certificates,
            password,
            state,
        } => apply(&certificates, &password, &state),
        Commands::Export { state, output } => {
            let bytes = ResourceData::load(&state)?.jks_bytes()?;
            fs::write(&output, bytes)?;
            Ok(())
        }
        Commands::Inspect { store, password } => {
            let bytes = fs::read(&store)?;
            let trust_store = jks::decode(&bytes, &password)?;
            println!("{} entries", trust_store.len());
            for entry in trust_store.entries() {
                let subject = entry.certificate.subject_common_name();
                println!(
                    "{}\t{}\t{}\t{}",
                    entry.alias,
                    entry.created_at.to_rfc3339(),
                    entry.certificate.fingerprint(),
                    subject.as_deref().unwrap_or("-")
                );
            }
            Ok(())
        }
        Commands::Destroy { state } => {
            let mut resource = ResourceData::load(&state)?;
            resource.delete();
            resource.save(&state)
        }
    }
}

fn apply(certificate_files: &[PathBuf], password: &str, state: &Path) -> TrustStoreResult<()> {
    let certificates = certificate_files
        .iter()
        .map(fs::read_to_string)
        .collect::<Result<Vec<_>, _>>()?;
    let mut resource = if state.exists() {
        ResourceData::load(state)?.replace(certificates, password)
    } else {
        ResourceData::new(certificates, password)
    };
    let id = resource.create()?.to_string();
    resource.save(state)?;
    println!("{id}");
    Ok(())
}
