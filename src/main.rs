use std::sync::Arc;
use std::time::Duration;

use authflow::config::AuthConfig;
use authflow::form::{FormError, validate};
use authflow::provider::{IdentityToolkitClient, ProviderError};
use authflow::route::LogNavigator;
use authflow::services::persistence::FileSessionStore;
use authflow::{AuthContext, AuthMode, AuthState, SettleError};
use clap::{Args, Parser, Subcommand};

/// Restoring only reads local storage.
const RESTORE_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] authflow::config::ConfigError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("invalid credentials: {0}")]
    Form(#[from] FormError),
    #[error(transparent)]
    Settle(#[from] SettleError),
}

#[derive(Parser, Debug)]
#[command(name = "authflow", about = "Sign in, sign up and inspect the persisted session")]
struct Cli {
    /// Seconds to wait for a sign-in/sign-up outcome.
    #[arg(long, env = "AUTH_WAIT_SECS", default_value_t = 30)]
    wait_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authenticate an existing account.
    SignIn(CredentialArgs),
    /// Create an account.
    SignUp(CredentialArgs),
    /// Restore the persisted session and print the auth state.
    Status,
    /// End the persisted session.
    Logout,
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long, env = "AUTH_EMAIL")]
    email: String,
    #[arg(long, env = "AUTH_PASSWORD", hide_env_values = true)]
    password: String,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(state) => print_state(&state),
        Err(e) => {
            tracing::error!(error = %e, "authflow failed");
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> Result<Arc<AuthState>, CliError> {
    let config = AuthConfig::from_env()?;
    let provider = IdentityToolkitClient::new(&config.provider)?;
    let sessions = FileSessionStore::new(&config.session_dir, &config.session_key);
    tracing::info!(path = %sessions.path().display(), "session storage");

    let ctx = AuthContext::start(Arc::new(provider), Arc::new(sessions), Arc::new(LogNavigator));

    // Every run starts like a page load: restore whatever was persisted.
    ctx.restore(RESTORE_WAIT).await?;

    let limit = Duration::from_secs(cli.wait_secs);
    match cli.command {
        Command::Status => {}
        Command::Logout => ctx.logout_settled(limit).await?,
        Command::SignIn(args) => authenticate(&ctx, AuthMode::SignIn, &args, limit).await?,
        Command::SignUp(args) => authenticate(&ctx, AuthMode::SignUp, &args, limit).await?,
    }

    Ok(ctx.state())
}

async fn authenticate(ctx: &AuthContext, mode: AuthMode, args: &CredentialArgs, limit: Duration) -> Result<(), CliError> {
    let credentials = validate(&args.email, &args.password)?;
    let outcome = ctx.authenticate(mode, credentials, limit).await?;
    tracing::info!(?outcome, "authentication settled");
    Ok(())
}

fn print_state(state: &AuthState) {
    match (&state.user, &state.auth_error) {
        (Some(user), _) => {
            println!("signed in as {} ({})", user.email, user.id);
            println!("token expires {}", user.token_expiration);
        }
        (None, Some(error)) => println!("not signed in: {error}"),
        (None, None) => println!("not signed in"),
    }
}
