use std::{sync::Arc, time::Duration};

use clap::Parser;
use gsuite_sso::{
    BridgeConfig, GoogleWorkspaceSso, GoogleWorkspaceSsoPlugin, Plugin, PluginOptions,
    admin::{AdminApp, BearerClientFactory, DomainToken, OAuthToken, RequestContext},
    observability::init_tracing,
    saml::{IdentityProvider, SamlIdp},
    sso::registrar::TEMPLATE_ID,
};

/// CLI arguments for the Google Workspace SSO bridge
#[derive(Parser, Debug)]
#[command(version, about = "Google Workspace SSO bridge", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to config file
    #[arg(
        short,
        long,
        global = true,
        env = "GSUITE_SSO_CONFIG",
        default_value = "gsuite-sso.toml"
    )]
    config: String,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Push the identity provider's SSO settings to a domain
    Sync {
        /// Google Workspace domain to configure
        #[arg(short, long)]
        domain: String,
        /// Environment variable holding the domain admin's OAuth access token
        #[arg(long, default_value = "GSUITE_ADMIN_TOKEN")]
        token_env: String,
        /// Site name used in log output
        #[arg(long, default_value = "default")]
        site: String,
    },
    /// Print the service provider metadata for a domain
    Metadata {
        /// Google Workspace domain
        #[arg(short, long)]
        domain: String,
    },
}

/// Collaborators assembled from the config file.
struct Bridge {
    saml_idp: Arc<SamlIdp>,
    admin_app: Arc<AdminApp>,
    sso: Arc<GoogleWorkspaceSso>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match BridgeConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config {}: {e}", args.config);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_tracing(&config.observability) {
        eprintln!("Failed to initialize tracing: {e}");
        std::process::exit(1);
    }

    let bridge = match assemble(&config) {
        Ok(bridge) => bridge,
        Err(e) => {
            tracing::error!(error = %e, "Failed to assemble SSO bridge");
            std::process::exit(1);
        }
    };

    match args.command {
        Command::Sync {
            domain,
            token_env,
            site,
        } => run_sync(&bridge, domain, &token_env, site).await,
        Command::Metadata { domain } => run_metadata(&bridge, &domain),
    }
}

fn assemble(config: &BridgeConfig) -> Result<Bridge, Box<dyn std::error::Error>> {
    let identity_provider = IdentityProvider::from_config(&config.identity_provider)?;
    let saml_idp = Arc::new(SamlIdp::new(identity_provider));
    let admin_app = Arc::new(AdminApp::new(Arc::new(BearerClientFactory::new(
        Duration::from_secs(config.admin.timeout_secs),
    ))));

    let keys = &config.plugin;
    let mut options = PluginOptions::new();
    options.set(keys.saml_idp_key.clone(), saml_idp.clone())?;
    options.set(keys.admin_app_key.clone(), admin_app.clone())?;

    GoogleWorkspaceSsoPlugin::new(keys.clone(), config.admin.clone()).assemble(&mut options)?;
    let sso = options.get::<GoogleWorkspaceSso>(&keys.sso_key)?;

    Ok(Bridge {
        saml_idp,
        admin_app,
        sso,
    })
}

async fn run_sync(bridge: &Bridge, domain: String, token_env: &str, site: String) {
    let Ok(access_token) = std::env::var(token_env) else {
        eprintln!("Environment variable {token_env} is not set");
        std::process::exit(1);
    };

    let ctx = RequestContext::new(site);
    let token = DomainToken::new(domain.clone(), OAuthToken::bearer(access_token));

    match bridge.admin_app.complete_authorization(token, &ctx).await {
        Ok(()) => {
            tracing::info!(
                domain = %domain,
                request_id = %ctx.request_id,
                rotate_signing_key = bridge.sso.synchronizer().config().rotate_signing_key,
                "SSO settings synchronized"
            );
        }
        Err(e) => {
            eprintln!("Synchronization failed: {e}");
            std::process::exit(1);
        }
    }
}

fn run_metadata(bridge: &Bridge, domain: &str) {
    match bridge.saml_idp.create_service_provider(TEMPLATE_ID, domain) {
        Ok(sp) => println!("{}", sp.metadata_xml),
        Err(e) => {
            eprintln!("Failed to render metadata for {domain}: {e}");
            std::process::exit(1);
        }
    }
}
