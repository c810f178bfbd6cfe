/// Wiki CMS server
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wiki_cms::{admin::AdminStatus, metrics, server, AppContext, ServerConfig, WikiResult};

#[tokio::main]
async fn main() -> WikiResult<()> {
    dotenv::dotenv().ok();

    // LOG_FORMAT=json switches to structured output
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wiki_cms=debug,tower_http=debug".into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    print_banner();
    metrics::init();

    let config = ServerConfig::from_env()?;
    let ctx = AppContext::new(config).await?;

    match ctx.admin.ensure_admin_exists().await? {
        AdminStatus::Existing { admins } => {
            tracing::info!("✓ {} admin account(s) present", admins.len())
        }
        AdminStatus::Promoted { username } => {
            tracing::warn!("Promoted '{}' to admin", username)
        }
        AdminStatus::Created {
            username,
            credentials_file,
        } => match credentials_file {
            Some(path) => tracing::warn!(
                "Created admin '{}'; temporary credentials in {}",
                username,
                path.display()
            ),
            None => tracing::info!("Created admin '{}'", username),
        },
    }

    server::serve(ctx).await
}

fn print_banner() {
    println!(
        r#"
 _      __ _  __    _    _____ __  ___ ____
| | /| / /(_)/ /__ (_)  / ___//  |/  // __/
| |/ |/ // //  '_// /  / /__ / /|_/ /_\ \
|__/|__//_//_/\_\/_/   \___//_/  /_//___/

        Wiki CMS v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
