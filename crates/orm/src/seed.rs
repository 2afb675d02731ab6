//! Demonstration data
//!
//! Seeding goes through the [`DataSink`] capability and only runs against an
//! empty Blog table, so calling it twice inserts once.

use chrono::{Duration, Utc};

use crate::backends::DataSink;
use crate::error::{SourceError, SourceResult};
use crate::models::{Blog, Comment, Entity, Post, Tag};
use crate::record::{Key, Record};

const BLOG_TAGS: &str = "BlogTags";

/// What a seeding run inserted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SeedReport {
    pub blogs: usize,
    pub tags: usize,
    pub posts: usize,
    pub comments: usize,
    pub links: usize,
}

impl SeedReport {
    pub fn is_empty(&self) -> bool {
        *self == SeedReport::default()
    }
}

/// Insert the three demo blogs with their posts, comments and tags.
/// Returns `false` without writing anything if blogs already exist.
pub async fn seed_demo_data(sink: &dyn DataSink) -> SourceResult<bool> {
    if !sink.is_empty("Blog").await? {
        tracing::info!("Blogs already present, skipping demo seed");
        return Ok(false);
    }

    let now = Utc::now();
    let days_ago = |days: i64| now - Duration::days(days);

    let blogs = [
        (1, "Tech Blog", "Technology articles", 100),
        (2, "Cooking Blog", "Delicious recipes", 80),
        (3, "Travel Blog", "Adventure stories", 60),
    ]
    .map(|(id, title, description, age)| Blog {
        id,
        title: title.to_string(),
        description: description.to_string(),
        created_date: days_ago(age),
    });

    let tags = [(1, "Programming"), (2, "C#"), (3, "Food"), (4, "Travel")].map(|(id, name)| Tag {
        id,
        name: name.to_string(),
    });

    let posts = [
        (1, "EF Core Basics", "Introduction to EF Core", 10, 1),
        (2, "Advanced EF Core", "Advanced EF Core techniques", 5, 1),
        (3, "Chocolate Cake Recipe", "How to make chocolate cake", 15, 2),
        (4, "Pasta Recipe", "Italian pasta recipe", 8, 2),
        (5, "Paris Trip", "My trip to Paris", 20, 3),
        (6, "Tokyo Adventure", "Adventures in Tokyo", 12, 3),
    ]
    .map(|(id, title, content, age, blog_id)| Post {
        id,
        title: title.to_string(),
        content: content.to_string(),
        published_date: days_ago(age),
        blog_id,
    });

    let comments = [
        (1, "John", "Great article!", 9, 1),
        (2, "Jane", "Very helpful", 8, 1),
        (3, "Bob", "Thanks for sharing", 4, 2),
        (4, "Alice", "Delicious!", 14, 3),
        (5, "Charlie", "I tried this recipe", 7, 4),
        (6, "Diana", "Amazing photos!", 19, 5),
    ]
    .map(|(id, author, content, age, post_id)| Comment {
        id,
        author: author.to_string(),
        content: content.to_string(),
        created_date: days_ago(age),
        post_id,
    });

    let links: [(Key, Key); 4] = [(1, 1), (1, 2), (2, 3), (3, 4)];

    insert_all(sink, &blogs[..]).await?;
    insert_all(sink, &tags[..]).await?;
    insert_all(sink, &posts[..]).await?;
    insert_all(sink, &comments[..]).await?;
    for (blog, tag) in links {
        sink.link(BLOG_TAGS, blog, tag).await?;
    }

    tracing::info!(
        blogs = blogs.len(),
        posts = posts.len(),
        comments = comments.len(),
        tags = tags.len(),
        "Seeded demo data"
    );
    Ok(true)
}

/// Generate a larger data set for scaling demonstrations. Each blog gets
/// `posts_per_blog` posts, each post `comments_per_post` comments, and one
/// of four tags. Does nothing if blogs already exist.
pub async fn seed_generated(
    sink: &dyn DataSink,
    blogs: usize,
    posts_per_blog: usize,
    comments_per_post: usize,
) -> SourceResult<SeedReport> {
    let total = blogs
        .checked_mul(posts_per_blog)
        .and_then(|posts| posts.checked_mul(comments_per_post.max(1)))
        .filter(|total| Key::try_from(*total).is_ok());
    if total.is_none() {
        return Err(SourceError::Constraint(format!(
            "cannot generate {} blogs x {} posts x {} comments",
            blogs, posts_per_blog, comments_per_post
        )));
    }

    if !sink.is_empty("Blog").await? {
        tracing::info!("Blogs already present, skipping generated seed");
        return Ok(SeedReport::default());
    }

    let now = Utc::now();
    let tag_names = ["Programming", "C#", "Food", "Travel"];
    let mut report = SeedReport::default();

    let tags: Vec<Record> = tag_names
        .iter()
        .zip(1..)
        .map(|(name, id)| Record::new("Tag", id).with("Name", *name))
        .collect();
    report.tags = sink.insert_many(tags).await?;

    let mut blog_records = Vec::new();
    let mut post_records = Vec::new();
    let mut comment_records = Vec::new();
    let mut post_id: Key = 0;
    let mut comment_id: Key = 0;

    for b in 0..blogs {
        let blog_id = b as Key + 1;
        blog_records.push(
            Blog {
                id: blog_id,
                title: format!("Blog {}", blog_id),
                description: format!("Generated blog number {}", blog_id),
                created_date: now - Duration::days(100 + b as i64 % 365),
            }
            .to_record()?,
        );

        for p in 0..posts_per_blog {
            post_id += 1;
            post_records.push(
                Post {
                    id: post_id,
                    title: format!("Post {} of blog {}", p + 1, blog_id),
                    content: format!("Generated content for post {}", post_id),
                    published_date: now - Duration::days(1 + post_id % 30),
                    blog_id,
                }
                .to_record()?,
            );

            for c in 0..comments_per_post {
                comment_id += 1;
                comment_records.push(
                    Comment {
                        id: comment_id,
                        author: format!("Reader {}", c + 1),
                        content: format!("Comment {} on post {}", c + 1, post_id),
                        created_date: now - Duration::days(comment_id % 30),
                        post_id,
                    }
                    .to_record()?,
                );
            }
        }
    }

    report.blogs = sink.insert_many(blog_records).await?;
    report.posts = sink.insert_many(post_records).await?;
    report.comments = sink.insert_many(comment_records).await?;

    for b in 0..blogs {
        let blog_id = b as Key + 1;
        let tag_id = (b % tag_names.len()) as Key + 1;
        sink.link(BLOG_TAGS, blog_id, tag_id).await?;
        report.links += 1;
    }

    tracing::info!(?report, "Seeded generated data");
    Ok(report)
}

async fn insert_all<E: Entity>(sink: &dyn DataSink, entities: &[E]) -> SourceResult<usize> {
    let records = entities
        .iter()
        .map(Entity::to_record)
        .collect::<SourceResult<Vec<_>>>()?;
    sink.insert_many(records).await
}
