use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use cmdb_topo::{
    Fixture, HostService, ListHostsWithNoBizParameter, Page, RequestContext, TopoConfig, Upgrader,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cmdb-topo")]
#[command(about = "Host topology queries and schema upgrades over a JSON fixture")]
struct Cli {
    /// Per-call store timeout in seconds (0 disables it)
    #[arg(long, global = true, default_value_t = 30)]
    timeout_secs: u64,

    /// Batch size for paged scans and migrations
    #[arg(long, global = true, default_value_t = cmdb_topo::config::DEFAULT_PAGE_STEP)]
    page_step: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the set/module topology of a business's hosts
    Topo {
        #[arg(long)]
        fixture: PathBuf,
        #[arg(long)]
        biz: i64,
        #[arg(long, default_value_t = 0)]
        start: usize,
        #[arg(long, default_value_t = cmdb_topo::config::DEFAULT_MAX_PAGE_LIMIT)]
        limit: usize,
    },
    /// Run the built-in upgrade steps
    Migrate {
        #[arg(long)]
        fixture: PathBuf,
        /// Save the upgraded fixture back in place
        #[arg(long)]
        write: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = TopoConfig::default().page_step(cli.page_step);
    config = if cli.timeout_secs == 0 {
        config.no_fetch_timeout()
    } else {
        config.fetch_timeout(Duration::from_secs(cli.timeout_secs))
    };

    match cli.command {
        Command::Topo {
            fixture,
            biz,
            start,
            limit,
        } => topo(&fixture, config, biz, Page::new(start, limit)).await,
        Command::Migrate { fixture, write } => migrate(&fixture, config, write).await,
    }
}

async fn load(path: &Path) -> Result<cmdb_topo::InMemoryStore> {
    let fixture = Fixture::read(path)
        .with_context(|| format!("Failed to read fixture '{}'", path.display()))?;
    Ok(fixture.into_store().await?)
}

async fn topo(path: &Path, config: TopoConfig, biz_id: i64, page: Page) -> Result<()> {
    let store = load(path).await?;
    let service = HostService::new(Arc::new(store), config);
    let ctx = RequestContext::new();

    let param = ListHostsWithNoBizParameter {
        page,
        ..Default::default()
    };
    let result = service
        .list_biz_hosts_topo(&ctx, biz_id, param)
        .await
        .with_context(|| format!("Topology query for business {} failed (rid {})", biz_id, ctx.rid()))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

async fn migrate(path: &Path, config: TopoConfig, write: bool) -> Result<()> {
    let store = load(path).await?;
    let ctx = RequestContext::new();
    let upgrader = Upgrader::with_builtin_steps(config);

    let outcomes = upgrader
        .run_all(&store, &ctx)
        .await
        .map_err(|err| anyhow!("Upgrade failed (rid {}): {}", ctx.rid(), err))?;

    for outcome in &outcomes {
        let report = &outcome.report;
        println!(
            "{} {}: indexes created={} existing={}, records={} pages={}",
            outcome.version,
            outcome.name,
            report.indexes_created,
            report.indexes_existing,
            report.records,
            report.pages
        );
    }

    if write {
        Fixture::from_store(&store)
            .await
            .write(path)
            .with_context(|| format!("Failed to write fixture '{}'", path.display()))?;
        println!("Saved upgraded fixture: {}", path.display());
    }
    Ok(())
}
