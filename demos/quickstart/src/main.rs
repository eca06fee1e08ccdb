use chrono::{DateTime, Utc};
use scopekit_sqlx::prelude::*;

#[derive(Debug, Clone, Default, sqlx::FromRow)]
struct Task {
    id: i64,
    title: String,
    priority: i64,
    done: bool,
    #[sqlx(default)]
    created_at: DateTime<Utc>,
    #[sqlx(default)]
    deleted_at: Option<DateTime<Utc>>,
}

impl Task {
    fn new(title: &str, priority: i64) -> Self {
        Self {
            title: title.into(),
            priority,
            ..Self::default()
        }
    }
}

impl Entity for Task {
    type Id = i64;

    fn table_name() -> &'static str {
        "tasks"
    }

    fn columns() -> &'static [&'static str] {
        &["id", "title", "priority", "done", "created_at", "deleted_at"]
    }

    fn id(&self) -> &i64 {
        &self.id
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.id.into(),
            self.title.clone().into(),
            self.priority.into(),
            self.done.into(),
            self.created_at.into(),
            self.deleted_at.into(),
        ]
    }

    fn soft_delete_column() -> Option<&'static str> {
        Some("deleted_at")
    }

    fn created_at_column() -> Option<&'static str> {
        Some("created_at")
    }
}

fn urgent() -> Scope {
    scope::filter("priority >= ?", args![3])
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,scopekit_sqlx=debug".into()),
        )
        .init();

    let mut config = DataSourceConfig::load("application.yaml")?;
    if config.url.is_empty() {
        config.url = "sqlite::memory:".into();
    }
    let pool = config.connect().await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            priority INTEGER NOT NULL,
            done BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TEXT NOT NULL,
            deleted_at TEXT
        )",
    )
    .execute(&pool)
    .await?;

    let tasks = Repository::<Task>::new(pool)?;

    let mut backlog: Vec<Task> = (1..=12)
        .map(|i| Task::new(&format!("task #{i}"), i % 5))
        .collect();
    tasks.batch_insert(None, &mut backlog, Some(5)).await?;
    tracing::info!(inserted = backlog.len(), "backlog seeded");

    let page = tasks
        .page(1, 4, &[urgent(), scope::order("priority DESC, id")])
        .await?;
    tracing::info!(
        total = page.total,
        pages = page.total_pages(),
        has_next = page.has_next,
        "urgent tasks"
    );
    for task in &page.items {
        tracing::info!(id = task.id, title = %task.title, priority = task.priority);
    }

    // Close the most urgent task and drop the rest of its priority level atomically.
    let closed = tasks
        .transact(|tx| {
            let tasks = tasks.clone();
            Box::pin(async move {
                let mut top = tasks
                    .first_for_update(Some(&mut *tx), &[urgent(), scope::order("priority DESC, id")])
                    .await?;
                top.done = true;
                tasks.update(Some(&mut *tx), &mut top).await?;
                let dropped = tasks
                    .delete(
                        Some(tx),
                        &[scope::where_eq([
                            ("priority", Value::from(top.priority)),
                            ("done", Value::from(false)),
                        ])],
                    )
                    .await?;
                Ok((top, dropped))
            })
        })
        .await?;
    tracing::info!(id = closed.0.id, dropped = closed.1, "closed top task");

    let remaining = tasks.count(&[]).await?;
    let deleted = tasks.count(&[scope::only_deleted()]).await?;
    tracing::info!(remaining, deleted, "done");

    match tasks.delete(None, &[]).await {
        Err(err) if err.is_dangerous() => tracing::info!(%err, "unconditional delete refused"),
        other => tracing::warn!(?other, "unexpected delete outcome"),
    }
    Ok(())
}
