//! One command per loading scenario

use anyhow::Context;
use chrono::{Duration, Utc};
use navload_orm::{Filterable, LoadStrategy, RelationshipPath, RootQuery};

use crate::render::{self, Output, ScenarioReport};
use crate::App;

/// Lazy loading: the blogs, then one round trip per blog whose posts are read
pub async fn n_plus_one(app: &App) -> anyhow::Result<()> {
    let outcome = app
        .loader
        .load(RootQuery::all("Blog"), LoadStrategy::Lazy, &[])
        .await?;
    let (mut blogs, session) = outcome.into_parts();

    for blog in blogs.iter_mut() {
        let key = blog.key();
        let posts = session.related(blog, "Posts").await?;
        tracing::debug!(blog = key, posts = posts.len(), "Touched Posts");
    }

    let report = ScenarioReport::new("N+1 access", LoadStrategy::Lazy, &blogs, session.log());
    render::report(app.output, &report, &blogs)?;
    if app.output == Output::Text {
        render::note(&format!("1 query for {} blogs plus 1 per blog.", blogs.len()));
    }
    Ok(())
}

pub async fn eager(app: &App) -> anyhow::Result<()> {
    include(app, "Eager Posts", LoadStrategy::Eager, &["Posts"]).await
}

pub async fn nested(app: &App) -> anyhow::Result<()> {
    include(app, "Eager Posts.Comments", LoadStrategy::Eager, &["Posts.Comments"]).await
}

pub async fn split(app: &App) -> anyhow::Result<()> {
    include(app, "Posts and Tags", LoadStrategy::Eager, &["Posts", "Tags"]).await
}

pub async fn batch(app: &App) -> anyhow::Result<()> {
    include(app, "Batch Posts.Comments", LoadStrategy::Batch, &["Posts.Comments"]).await
}

/// Eager loading restricted to posts newer than `days`
pub async fn filtered(app: &App, days: i64) -> anyhow::Result<()> {
    let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339();
    let path = RelationshipPath::new("Posts").where_gt("PublishedDate", cutoff);

    let outcome = app
        .loader
        .load(RootQuery::all("Blog"), LoadStrategy::Eager, &[path])
        .await?;
    let report = ScenarioReport::new(
        &format!("Posts of the last {} days", days),
        outcome.strategy,
        &outcome.roots,
        outcome.log(),
    );
    render::report(app.output, &report, &outcome.roots)
}

/// Explicit loading twice: per blog, then for the whole set at once
pub async fn explicit(app: &App) -> anyhow::Result<()> {
    let posts = RelationshipPath::new("Posts");

    let outcome = app
        .loader
        .load(RootQuery::all("Blog"), LoadStrategy::Explicit, &[])
        .await?;
    let (mut blogs, session) = outcome.into_parts();
    for blog in blogs.iter_mut() {
        session.load_entry(blog, &posts).await?;
    }
    let per_entity = ScenarioReport::new("Explicit per blog", LoadStrategy::Explicit, &blogs, session.log());
    render::report(app.output, &per_entity, &blogs)?;

    let mut outcome = app
        .loader
        .load(RootQuery::all("Blog"), LoadStrategy::Explicit, &[])
        .await?;
    outcome.session.load_collection(&mut outcome.roots, &posts).await?;
    let as_set = ScenarioReport::new(
        "Explicit for the set",
        LoadStrategy::Explicit,
        &outcome.roots,
        outcome.log(),
    );
    render::report(app.output, &as_set, &outcome.roots)
}

/// Free-form load from the command line
pub async fn load(
    app: &App,
    entity: &str,
    strategy: &str,
    includes: &[String],
    key: Option<i64>,
) -> anyhow::Result<()> {
    let strategy: LoadStrategy = strategy.parse()?;
    let root = match key {
        Some(key) => RootQuery::by_key(entity, key),
        None => RootQuery::all(entity),
    };
    let paths = includes
        .iter()
        .map(|p| p.parse::<RelationshipPath>().with_context(|| format!("bad include '{}'", p)))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let outcome = app.loader.load(root, strategy, &paths).await?;
    let report = ScenarioReport::new(entity, strategy, &outcome.roots, outcome.log());
    render::report(app.output, &report, &outcome.roots)
}

async fn include(app: &App, scenario: &str, strategy: LoadStrategy, paths: &[&str]) -> anyhow::Result<()> {
    let outcome = app.loader.load_str(RootQuery::all("Blog"), strategy, paths).await?;
    let report = ScenarioReport::new(scenario, strategy, &outcome.roots, outcome.log());
    render::report(app.output, &report, &outcome.roots)
}
