use ::nimbus_cli::{run, Cli};
use ::nimbus_common::{
    error::Result,
    tokio,
    tracing::debug,
    tracing_subscriber::{self, EnvFilter},
};

#[tokio::main]
/// Run one Nimbus command
async fn main() -> Result<()> {
    // setup tracing, logs go to stderr so that stdout only carries command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();
    debug!("Run {:?}", cli);
    run(cli, &mut std::io::stdout()).await
}
