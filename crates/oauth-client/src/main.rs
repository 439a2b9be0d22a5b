use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oauth_client::{ClientConfig, OAuthClient, generate_state};

#[derive(Parser, Debug)]
#[command(name = "oauth-client")]
#[command(about = "Demo client for the OAuth2 authorization code flow")]
struct Cli {
    /// Authorization server base URL
    #[arg(long, default_value = "http://localhost:8080", env = "OAUTH_SERVER_URL")]
    server_url: String,

    #[arg(long, default_value = "demo", env = "OAUTH_CLIENT_ID")]
    client_id: String,

    #[arg(long, default_value = "demo-secret", env = "OAUTH_CLIENT_SECRET")]
    client_secret: String,

    /// Must be registered for the client
    #[arg(long, default_value = "https://app/cb", env = "OAUTH_REDIRECT_URI")]
    redirect_uri: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the URL to open in a browser to start the flow
    AuthorizeUrl {
        /// Space-delimited scopes (defaults to everything the client may request)
        #[arg(long)]
        scope: Option<String>,

        /// State value to echo back (random if omitted)
        #[arg(long)]
        state: Option<String>,
    },

    /// Exchange an authorization code for tokens
    Exchange {
        /// The `code` query parameter from the redirect
        code: String,
    },

    /// Get a new access token with a refresh token
    Refresh {
        refresh_token: String,

        /// Narrower scope for the new access token
        #[arg(long)]
        scope: Option<String>,
    },

    /// Decode and verify an access token at /oauth/check_token
    Introspect { token: String },

    /// Revoke a refresh token
    Revoke { token: String },

    /// Call a resource server endpoint with a bearer token
    Call {
        /// Resource URL, e.g. http://localhost:8081/v1/protected
        url: String,

        #[arg(long, env = "OAUTH_ACCESS_TOKEN")]
        token: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "oauth_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let client = OAuthClient::new(ClientConfig {
        server_url: cli.server_url,
        client_id: cli.client_id,
        client_secret: cli.client_secret,
        redirect_uri: cli.redirect_uri,
    });

    match cli.command {
        Commands::AuthorizeUrl { scope, state } => {
            let state = state.unwrap_or_else(generate_state);
            let url = client.authorize_url(scope.as_deref(), &state)?;
            tracing::info!("Expect state={} on the redirect to {}", state, client.config().redirect_uri);
            println!("{url}");
        }
        Commands::Exchange { code } => {
            let tokens = client.exchange_code(&code).await?;
            println!("{}", serde_json::to_string_pretty(&tokens)?);
        }
        Commands::Refresh { refresh_token, scope } => {
            let tokens = client.refresh(&refresh_token, scope.as_deref()).await?;
            println!("{}", serde_json::to_string_pretty(&tokens)?);
        }
        Commands::Introspect { token } => {
            let claims = client.introspect(&token).await?;
            println!("{}", serde_json::to_string_pretty(&claims)?);
        }
        Commands::Revoke { token } => {
            client.revoke(&token).await?;
        }
        Commands::Call { url, token } => {
            let response = client.call(&url, &token).await?;
            println!("{}", response.body);
            if !response.status.is_success() {
                bail!("Resource server responded with {}", response.status);
            }
        }
    }

    Ok(())
}
