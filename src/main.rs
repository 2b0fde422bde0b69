use std::sync::Arc;

use anyhow::{Context, Result};
use scopedcrud::query::{Condition, Direction, Query};
use scopedcrud::transport::http::serve;
use scopedcrud::validate::{Validate, ValidationErrors, Validator};
use scopedcrud::{EntityDescriptor, GatewayConfig, MemoryStore, NamedFilter, Record, Registry};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Note {
    id: i64,
    title: String,
    body: String,
    priority: i32,
    archived: bool,
}

impl Validate for Note {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("title", &self.title)
            .max_len("title", &self.title, 120)
            .min("priority", self.priority, 0)
            .max("priority", self.priority, 5)
            .finish()
    }
}

impl Record for Note {}

fn notes() -> EntityDescriptor<Note> {
    EntityDescriptor::new("notes")
        .with_filter(NamedFilter::new("min_priority", |params| {
            let min = params.get("priority").cloned();
            move |query: Query| match &min {
                Some(min) => query.filter(Condition::gte("priority", min.clone())),
                None => query,
            }
        }))
        .with_filter(NamedFilter::new("title_like", |params| {
            let pattern = params.get("pattern").cloned();
            move |query: Query| match &pattern {
                Some(pattern) => query.filter(Condition::ilike("title", pattern.clone())),
                None => query,
            }
        }))
        .with_filter(NamedFilter::new("active", |_| {
            |query: Query| query.filter(Condition::eq("archived", false))
        }))
        .with_filter(NamedFilter::new("urgent_first", |_| {
            |query: Query| query.order_by("priority", Direction::Desc)
        }))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = GatewayConfig::from_env().context("failed to load configuration")?;

    let engine = Arc::new(MemoryStore::new());
    let mut registry = Registry::from_config(&config);
    registry.register(engine, notes());

    serve(&config, registry).await
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scopedcrud=debug,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
