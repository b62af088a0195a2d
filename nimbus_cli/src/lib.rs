use ::std::{fs::File, io::BufReader, io::Write, path::Path, path::PathBuf};

use ::clap::{Parser, Subcommand, ValueEnum};
use ::nimbus_client::session::SessionKind;
use ::nimbus_common::{
    config::load_config,
    error::{NimbusError, Result},
    serde_json,
};
use ::serde::de::DeserializeOwned;

pub mod cluster_command;
pub mod config;
pub mod session_command;

use config::CliConfig;

#[derive(Parser, Debug)]
#[command(name = "nimbus", version, about, long_about = None)]
/// Provision Spark-style clusters on OpenStack and keep track of them.
pub struct Cli {
    /// path to the config file
    #[arg(long, default_value = "nimbus.json")]
    pub config_path: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// helper function for exporting the `clap::Parser::parse` function
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage the cluster registry and the clusters' servers
    #[command(subcommand)]
    Cluster(ClusterCommand),
    /// Open sessions on the remote session service
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Subcommand, Debug)]
pub enum ClusterCommand {
    /// Store a cluster description, replacing any cluster with the same name
    Store { request: PathBuf },
    /// Store a cluster description, failing if the name is taken
    Add { request: PathBuf },
    /// Print a stored cluster
    Show { name: String },
    /// Print the names of all stored clusters
    List,
    /// Remove a cluster from the registry
    Delete { name: String },
    /// Empty the registry
    Reset,
    /// Create the servers of a cluster and store it
    Provision {
        spec: PathBuf,
        /// do not record the new cluster in the registry
        #[arg(long)]
        no_store: bool,
    },
    /// Delete the servers of a stored cluster and remove it from the registry
    Teardown { name: String },
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Create a session
    Create {
        #[arg(long, value_enum, default_value_t = KindArg::Spark)]
        kind: KindArg,
        /// wait until the session is idle
        #[arg(long)]
        wait: bool,
    },
    /// Print the current state of a session
    Status {
        /// location returned when the session was created
        location: String,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Spark,
    Pyspark,
    Sparkr,
    Sql,
}

impl From<KindArg> for SessionKind {
    fn from(value: KindArg) -> Self {
        match value {
            KindArg::Spark => SessionKind::Spark,
            KindArg::Pyspark => SessionKind::Pyspark,
            KindArg::Sparkr => SessionKind::Sparkr,
            KindArg::Sql => SessionKind::Sql,
        }
    }
}

/// Load the config file and execute the command, writing its output to `out`.
pub async fn run<W: Write>(cli: Cli, out: &mut W) -> Result<()> {
    let config: CliConfig = load_config(&cli.config_path)?;
    match cli.command {
        Command::Cluster(command) => cluster_command::run(&config, command, out).await,
        Command::Session(command) => session_command::run(&config, command, out).await,
    }
}

/// Read a JSON input file given on the command line.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(NimbusError::io_error)?;
    let value = serde_json::from_reader(BufReader::new(file))?;
    Ok(value)
}
