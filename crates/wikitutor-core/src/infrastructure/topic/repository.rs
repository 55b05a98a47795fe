//! SQLite implementation of the TopicStore
//!
//! Each upsert runs in its own transaction. A failed statement drops the
//! transaction, which rolls it back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};

use crate::domain::topic::{
    Article, LearningPath, LinkSet, Summaries, SummarySet, TopicStore, TopicStoreStats,
};
use crate::error::Result;

/// SQLite implementation of the topic store
#[derive(Debug, Clone)]
pub struct SqliteTopicStore {
    pool: SqlitePool,
}

impl SqliteTopicStore {
    /// Create a new SQLite topic store
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn count(&self, table: &str) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }
}

#[async_trait]
impl TopicStore for SqliteTopicStore {
    // ========== Canonical mappings ==========

    async fn get_canonical(&self, user_input: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT canonical_title FROM canonical_topics WHERE user_input = ?")
                .bind(user_input)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(title,)| title))
    }

    async fn save_canonical(&self, user_input: &str, canonical_title: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO canonical_topics (user_input, canonical_title)
            VALUES (?, ?)
            ON CONFLICT(user_input) DO UPDATE SET
                canonical_title = excluded.canonical_title
            "#,
        )
        .bind(user_input)
        .bind(canonical_title)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(user_input = %user_input, canonical = %canonical_title, "Canonical topic stored");
        Ok(())
    }

    // ========== Articles ==========

    async fn get_article(&self, topic: &str) -> Result<Option<Article>> {
        let row: Option<ArticleRow> =
            sqlx::query_as("SELECT topic, full_text, retrieved_at FROM articles WHERE topic = ?")
                .bind(topic)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(ArticleRow::into_article))
    }

    async fn save_article(&self, topic: &str, full_text: &str) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO articles (topic, full_text, retrieved_at)
            VALUES (?, ?, ?)
            ON CONFLICT(topic) DO UPDATE SET
                full_text = excluded.full_text,
                retrieved_at = excluded.retrieved_at
            "#,
        )
        .bind(topic)
        .bind(full_text)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(topic = %topic, chars = full_text.len(), "Article stored");
        Ok(())
    }

    // ========== Link sets ==========

    async fn get_links(&self, topic: &str) -> Result<Option<LinkSet>> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT topic, linked_topics FROM links WHERE topic = ?")
                .bind(topic)
                .fetch_optional(&self.pool)
                .await?;

        let Some((topic, linked_topics)) = row else {
            return Ok(None);
        };

        let links = decode_titles(&topic, "links", &linked_topics);
        Ok(Some(LinkSet { topic, links }))
    }

    async fn save_links(&self, topic: &str, links: &[String]) -> Result<()> {
        let links_json = serde_json::to_string(links)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO links (topic, linked_topics)
            VALUES (?, ?)
            ON CONFLICT(topic) DO UPDATE SET
                linked_topics = excluded.linked_topics
            "#,
        )
        .bind(topic)
        .bind(&links_json)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(topic = %topic, count = links.len(), "Links stored");
        Ok(())
    }

    // ========== Summaries ==========

    async fn get_summaries(&self, topic: &str) -> Result<Option<SummarySet>> {
        let row: Option<SummaryRow> = sqlx::query_as(
            r#"
            SELECT topic, basic_summary, intermediate_summary, advanced_summary, generated_at
            FROM summaries WHERE topic = ?
            "#,
        )
        .bind(topic)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SummaryRow::into_summary_set))
    }

    async fn save_summaries(&self, topic: &str, summaries: &Summaries) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO summaries (
                topic, basic_summary, intermediate_summary, advanced_summary, generated_at
            ) VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(topic) DO UPDATE SET
                basic_summary = excluded.basic_summary,
                intermediate_summary = excluded.intermediate_summary,
                advanced_summary = excluded.advanced_summary,
                generated_at = excluded.generated_at
            "#,
        )
        .bind(topic)
        .bind(&summaries.basic)
        .bind(&summaries.intermediate)
        .bind(&summaries.advanced)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(topic = %topic, "Summaries stored");
        Ok(())
    }

    // ========== Learning paths ==========

    async fn get_learning_path(&self, topic: &str) -> Result<Option<LearningPath>> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            "SELECT topic, ranked_links, last_updated FROM learning_paths WHERE topic = ?",
        )
        .bind(topic)
        .fetch_optional(&self.pool)
        .await?;

        let Some((topic, ranked_links, last_updated)) = row else {
            debug!(topic = %topic, "No learning path in store");
            return Ok(None);
        };

        let links = decode_titles(&topic, "learning_paths", &ranked_links);
        Ok(Some(LearningPath {
            topic,
            links,
            last_updated: parse_timestamp(&last_updated),
        }))
    }

    async fn save_learning_path(&self, topic: &str, links: &[String]) -> Result<()> {
        let links_json = serde_json::to_string(links)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO learning_paths (topic, ranked_links, last_updated)
            VALUES (?, ?, ?)
            ON CONFLICT(topic) DO UPDATE SET
                ranked_links = excluded.ranked_links,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(topic)
        .bind(&links_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(topic = %topic, count = links.len(), "Learning path stored");
        Ok(())
    }

    // ========== Administration ==========

    async fn clear_all(&self) -> Result<()> {
        warn!("Clearing all topic records");
        let mut tx = self.pool.begin().await?;

        for table in [
            "learning_paths",
            "summaries",
            "links",
            "articles",
            "canonical_topics",
        ] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        info!("Topic store cleared");
        Ok(())
    }

    async fn stats(&self) -> Result<TopicStoreStats> {
        Ok(TopicStoreStats {
            canonical_mappings: self.count("canonical_topics").await?,
            articles: self.count("articles").await?,
            link_sets: self.count("links").await?,
            summary_sets: self.count("summaries").await?,
            learning_paths: self.count("learning_paths").await?,
        })
    }
}

// ========== Row types ==========

#[derive(Debug, FromRow)]
struct ArticleRow {
    topic: String,
    full_text: String,
    retrieved_at: String,
}

impl ArticleRow {
    fn into_article(self) -> Article {
        Article {
            topic: self.topic,
            full_text: self.full_text,
            retrieved_at: parse_timestamp(&self.retrieved_at),
        }
    }
}

#[derive(Debug, FromRow)]
struct SummaryRow {
    topic: String,
    basic_summary: String,
    intermediate_summary: String,
    advanced_summary: String,
    generated_at: String,
}

impl SummaryRow {
    fn into_summary_set(self) -> SummarySet {
        SummarySet {
            topic: self.topic,
            summaries: Summaries {
                basic: self.basic_summary,
                intermediate: self.intermediate_summary,
                advanced: self.advanced_summary,
            },
            generated_at: parse_timestamp(&self.generated_at),
        }
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

/// Undecodable JSON is reported and read as an empty list, which callers
/// treat as a miss.
fn decode_titles(topic: &str, table: &str, json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_else(|e| {
        warn!(topic = %topic, table = %table, error = %e, "Corrupted title list in store");
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    async fn setup_store() -> SqliteTopicStore {
        let db = Database::in_memory()
            .await
            .expect("Failed to create in-memory database");
        SqliteTopicStore::new(db.pool().clone())
    }

    fn titles(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_canonical_upsert_overwrites() {
        let store = setup_store().await;

        assert!(store.get_canonical("einstein").await.unwrap().is_none());

        store.save_canonical("einstein", "Einstein (disambiguation)").await.unwrap();
        store.save_canonical("einstein", "Albert Einstein").await.unwrap();

        assert_eq!(
            store.get_canonical("einstein").await.unwrap().as_deref(),
            Some("Albert Einstein")
        );
        assert_eq!(store.stats().await.unwrap().canonical_mappings, 1);
    }

    #[tokio::test]
    async fn test_article_round_trip() {
        let store = setup_store().await;

        store.save_article("Albert Einstein", "German-born physicist.").await.unwrap();
        let article = store.get_article("Albert Einstein").await.unwrap().unwrap();

        assert_eq!(article.topic, "Albert Einstein");
        assert_eq!(article.full_text, "German-born physicist.");
        assert!(store.get_article("albert einstein").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_links_preserve_order() {
        let store = setup_store().await;
        let links = titles(&["Physics", "Relativity", "Nobel Prize"]);

        store.save_links("Albert Einstein", &links).await.unwrap();
        let stored = store.get_links("Albert Einstein").await.unwrap().unwrap();

        assert_eq!(stored.links, links);
    }

    #[tokio::test]
    async fn test_summaries_written_together() {
        let store = setup_store().await;
        let summaries = Summaries::new("simple", "medium", "deep");

        store.save_summaries("Photosynthesis", &summaries).await.unwrap();
        let set = store.get_summaries("Photosynthesis").await.unwrap().unwrap();
        assert_eq!(set.summaries, summaries);

        let regenerated = Summaries::new("simple 2", "medium 2", "deep 2");
        store.save_summaries("Photosynthesis", &regenerated).await.unwrap();
        let set = store.get_summaries("Photosynthesis").await.unwrap().unwrap();
        assert_eq!(set.summaries, regenerated);
        assert_eq!(store.stats().await.unwrap().summary_sets, 1);
    }

    #[tokio::test]
    async fn test_learning_path_overwrite() {
        let store = setup_store().await;

        store
            .save_learning_path("Rust (programming language)", &titles(&["Ownership", "Traits"]))
            .await
            .unwrap();
        store
            .save_learning_path("Rust (programming language)", &titles(&["Cargo"]))
            .await
            .unwrap();

        let path = store
            .get_learning_path("Rust (programming language)")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(path.links, titles(&["Cargo"]));
    }

    #[tokio::test]
    async fn test_corrupted_link_json_reads_as_empty() {
        let store = setup_store().await;

        sqlx::query("INSERT INTO links (topic, linked_topics) VALUES (?, ?)")
            .bind("Broken")
            .bind("[not json")
            .execute(&store.pool)
            .await
            .unwrap();

        let set = store.get_links("Broken").await.unwrap().unwrap();
        assert!(set.links.is_empty());
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = setup_store().await;

        store.save_canonical("dna", "DNA").await.unwrap();
        store.save_article("DNA", "Molecule.").await.unwrap();
        store.save_links("DNA", &titles(&["Gene"])).await.unwrap();
        store
            .save_summaries("DNA", &Summaries::new("a", "b", "c"))
            .await
            .unwrap();
        store.save_learning_path("DNA", &titles(&["Gene"])).await.unwrap();

        store.clear_all().await.unwrap();

        assert_eq!(store.stats().await.unwrap(), TopicStoreStats::default());
    }
}
