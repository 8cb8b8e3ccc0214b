//! Walks the list, mutation, and detail controllers through a typical
//! session against an in-memory children collection.
//!
//! ```text
//! RUST_LOG=rollcall_sync=debug cargo run --bin rollcall-demo -- --latency-ms 80
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use rollcall_core::entities::{Child, ChildDraft, Gender};
use rollcall_core::{Entity, EntityId, Scalar};
use rollcall_sync::{
    DetailFetcher, InMemoryRemote, ListSynchronizer, MutationCoordinator, Reconcile,
    SyncConfig, SynchronizerState,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rollcall-demo")]
#[command(about = "Drive the rollcall controllers against an in-memory collection")]
struct Args {
    /// Quiet period before a list query is fetched.
    #[arg(long, env = "ROLLCALL_DEBOUNCE_MS", default_value_t = 300)]
    debounce_ms: u64,

    /// Rows per page when the list mounts.
    #[arg(long, env = "ROLLCALL_PAGE_SIZE", default_value_t = 12)]
    page_size: u32,

    /// Simulated round-trip latency of the in-memory remote.
    #[arg(long, env = "ROLLCALL_LATENCY_MS", default_value_t = 50)]
    latency_ms: u64,

    /// Number of children seeded into the collection.
    #[arg(long, env = "ROLLCALL_SEED_ROWS", default_value_t = 40)]
    seed_rows: usize,

    /// Emit logs as JSON lines.
    #[arg(long, env = "ROLLCALL_JSON_LOGS")]
    json_logs: bool,
}

type Children = ListSynchronizer<Child, InMemoryRemote<Child>>;

const FIRST_NAMES: &[&str] = &[
    "Ana", "Bruno", "Carla", "Davi", "Elisa", "Felipe", "Gabriela", "Heitor", "Isabela", "João",
];
const LAST_NAMES: &[&str] = &["Silva", "Souza", "Lima", "Costa", "Almeida"];

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn seed(count: usize) -> Vec<Child> {
    (0..count)
        .map(|i| {
            let first = FIRST_NAMES[i % FIRST_NAMES.len()];
            let last = LAST_NAMES[(i / FIRST_NAMES.len()) % LAST_NAMES.len()];
            let club = i64::try_from(i % 4).unwrap_or(0) + 1;
            Child::from_draft(
                EntityId::from(format!("c-{i:03}")),
                &ChildDraft {
                    name: Some(format!("{first} {last}")),
                    gender: Some(if i % 2 == 0 { Gender::F } else { Gender::M }),
                    birth_date: Some(format!("201{}-0{}-1{}", i % 10, 1 + i % 9, i % 10)),
                    guardian_name: Some(format!("Responsável {last}")),
                    guardian_phone: Some(format!("81 9{:04}-{:04}", i * 7, i * 13)),
                    club_number: Some(club),
                    is_active: Some(i % 5 != 0),
                    joined_at: Some("2024-02-01".into()),
                },
            )
        })
        .collect()
}

/// Waits until the list has no fetch in flight.
async fn settle(list: &Children) -> anyhow::Result<SynchronizerState<Child>> {
    let mut rx = list.subscribe();
    let state = rx
        .wait_for(|state| !state.loading)
        .await
        .context("list state channel closed")?;
    Ok(state.clone())
}

fn report(label: &str, state: &SynchronizerState<Child>) {
    let names: Vec<&str> = state.rows.iter().map(|c| c.name.as_str()).collect();
    info!(
        step = label,
        phase = ?state.phase,
        total = state.total,
        rows = state.rows.len(),
        error = state.error.as_deref().unwrap_or("-"),
        "{}",
        names.join(", ")
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = SyncConfig {
        debounce: Duration::from_millis(args.debounce_ms),
        default_page_size: args.page_size,
        ..SyncConfig::default()
    };
    config.validate().context("invalid settings")?;

    let remote = Arc::new(
        InMemoryRemote::<Child>::new()
            .with_latency(Duration::from_millis(args.latency_ms))
            .with_rows(seed(args.seed_rows)),
    );
    info!(rows = remote.len(), resource = Child::RESOURCE, "collection seeded");

    let list = ListSynchronizer::new(Arc::clone(&remote), &config);
    let detail = DetailFetcher::new(Arc::clone(&remote));
    let mutations = MutationCoordinator::new(
        &list,
        Reconcile::Patch {
            background_refresh: true,
        },
    )
    .with_detail(&detail);

    list.start();
    report("mount", &settle(&list).await?);

    // Typing into the search box: one fetch for the whole burst.
    for text in ["a", "an", "ana"] {
        list.set_filters(|filters| {
            filters.insert("search".into(), Some(Scalar::from(text)));
        });
        tokio::time::sleep(config.debounce / 3).await;
    }
    tokio::time::sleep(config.debounce).await;
    report("search", &settle(&list).await?);

    list.set_filters(|filters| {
        filters.insert("search".into(), None);
        filters.insert("active".into(), Some(Scalar::Bool(true)));
    });
    list.set_page_size(args.page_size.saturating_mul(2));
    tokio::time::sleep(config.debounce).await;
    report("active, larger pages", &settle(&list).await?);

    let created = mutations
        .create(&ChildDraft {
            name: Some("Aurora Nunes".into()),
            gender: Some(Gender::F),
            birth_date: Some("2016-05-04".into()),
            is_active: Some(true),
            ..ChildDraft::default()
        })
        .await
        .context("create failed")?;
    let Some(child) = created.entity().cloned() else {
        bail!("create returned no record");
    };
    report("after create", &list.state());

    if detail.fetch(&child.id).await.is_none() {
        bail!("detail fetch of {} failed", child.id);
    }

    mutations
        .update(
            &child.id,
            &ChildDraft {
                name: Some("Aurora Nunes Lima".into()),
                ..ChildDraft::default()
            },
        )
        .await
        .context("update failed")?;
    info!(
        viewing = detail.state().entity.map(|c| c.name).as_deref().unwrap_or("-"),
        "detail after update"
    );

    if let Err(error) = mutations.create(&ChildDraft::default()).await {
        info!(
            %error,
            shown = mutations.state().error.as_deref().unwrap_or("-"),
            "rejected create"
        );
    }

    mutations.delete(&child.id).await.context("delete failed")?;
    report("after delete", &list.state());

    list.dispose();
    detail.dispose();

    let calls = remote.calls();
    info!(
        list = calls.list,
        get = calls.get,
        create = calls.create,
        update = calls.update,
        delete = calls.delete,
        "remote calls"
    );
    Ok(())
}
