use anyhow::Context;
use clap::Parser;
use deal_search_core::llm::error::UpstreamStatusError;
use deal_search_core::llm::gemini::GeminiClient;
use deal_search_core::search::{search_deals, validate_query, MIN_QUERY_CHARS};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "deal_search_cli")]
struct Args {
    /// Search query, e.g. "smart tv 55 pollici".
    #[arg(long, short)]
    query: String,

    /// Pretty-print the response JSON.
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = deal_search_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let query = validate_query(Some(&args.query)).with_context(|| {
        format!("query must have at least {MIN_QUERY_CHARS} characters after trimming")
    })?;

    let llm = GeminiClient::from_settings(&settings)?;

    let res = match search_deals(&llm, &query).await {
        Ok(res) => res,
        Err(err) => {
            if let Some(upstream) = err.downcast_ref::<UpstreamStatusError>() {
                tracing::error!(
                    status = upstream.status,
                    details = %upstream.details,
                    "Gemini rejected the request"
                );
            } else {
                sentry_anyhow::capture_anyhow(&err);
            }
            return Err(err);
        }
    };

    let out = if args.pretty {
        serde_json::to_string_pretty(&res)?
    } else {
        serde_json::to_string(&res)?
    };
    println!("{out}");
    Ok(())
}

fn init_sentry(settings: &deal_search_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
