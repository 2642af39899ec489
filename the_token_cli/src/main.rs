use std::path::PathBuf;

use clap::Parser;
use the_token::{
    config::{HostConfig, TokenConfig},
    jwa,
    principal::PrincipalDirectory,
    provision::provision_with,
    store::FileDirectory,
    TokenSigner, TokenStatus, Username,
};

#[derive(Debug, Parser)]
#[command(version, about)]
struct Opts {
    /// A host configuration document holding a `the_token` section
    #[arg(short, long, env = "THE_TOKEN_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// The local file holding accounts and their credentials
    #[arg(
        short,
        long,
        env = "THE_TOKEN_STORE",
        value_name = "FILE",
        default_value = ".the_token.json"
    )]
    store: PathBuf,

    /// The account to provision for, overriding the configuration
    #[arg(short, long, env = "THE_TOKEN_USERNAME")]
    username: Option<Username>,

    /// Registers an account in the store before provisioning
    #[arg(long = "add-user", value_name = "NAME")]
    add_users: Vec<Username>,

    /// The HMAC algorithm bearer tokens are signed with
    #[arg(long, env = "THE_TOKEN_ALGORITHM", default_value_t = jwa::Algorithm::HS256)]
    algorithm: jwa::Algorithm,

    /// Also print the bearer token on standard output
    #[arg(long)]
    stdout: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing::Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let opts = Opts::parse();

    let mut config = match &opts.config {
        Some(path) => HostConfig::load(path).await?.the_token,
        None => TokenConfig::default(),
    };
    if let Some(username) = opts.username {
        config.username = Some(username);
    }
    config.validate()?;

    let mut directory = FileDirectory::load(&opts.store).await?;

    let mut added = false;
    for user in opts.add_users {
        if directory.add_account(user.clone()) {
            tracing::info!(%user, "registered account");
            added = true;
        }
    }
    if added {
        directory.persist().await?;
    }

    let signer = TokenSigner::new().with_algorithm(opts.algorithm);
    let provisioned = provision_with(&mut directory, &config, &signer).await?;
    let issued = provisioned.token();

    tracing::info!(
        user = %provisioned.username(),
        credential_id = %provisioned.credential_id(),
        resolution = %provisioned.resolution(),
        "credential ready"
    );

    tracing::info!(
        token = format_args!("{:#}", issued.token()),
        "access token"
    );

    match issued.token_status() {
        TokenStatus::Valid => {
            tracing::debug!(expiry = issued.expiry().0, "access token is valid")
        }
        status => tracing::warn!(
            ?status,
            issued = issued.issued().0,
            expiry = issued.expiry().0,
            "access token is not currently valid"
        ),
    }

    if opts.stdout {
        println!("{:#}", issued.token());
    }

    Ok(())
}
