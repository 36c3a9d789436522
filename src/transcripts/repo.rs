use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{NewTranscript, Transcript};

const TRANSCRIPT_COLUMNS: &str = "id, user_id, video_url, video_title, introduction, summary, \
                                  main_points, full_content, created_at";

/// Persistence for transcripts. Every read is scoped to an owner.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Transcript>>;
    async fn get_for_user(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Transcript>>;
    async fn create(&self, new: NewTranscript) -> anyhow::Result<Transcript>;
}

#[derive(Clone)]
pub struct PgTranscriptStore {
    db: PgPool,
}

impl PgTranscriptStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TranscriptStore for PgTranscriptStore {
    async fn list_for_user(&self, user_id: Uuid) -> anyhow::Result<Vec<Transcript>> {
        let sql = format!(
            "SELECT {TRANSCRIPT_COLUMNS} FROM transcripts \
             WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, Transcript>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await
            .context("list transcripts")?;
        Ok(rows)
    }

    async fn get_for_user(&self, user_id: Uuid, id: Uuid) -> anyhow::Result<Option<Transcript>> {
        let sql =
            format!("SELECT {TRANSCRIPT_COLUMNS} FROM transcripts WHERE id = $1 AND user_id = $2");
        let row = sqlx::query_as::<_, Transcript>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
            .context("get transcript")?;
        Ok(row)
    }

    async fn create(&self, new: NewTranscript) -> anyhow::Result<Transcript> {
        let sql = format!(
            r#"
            INSERT INTO transcripts
                (id, user_id, video_url, video_title, introduction, summary, main_points, full_content)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TRANSCRIPT_COLUMNS}
            "#
        );
        let row = sqlx::query_as::<_, Transcript>(&sql)
            .bind(Uuid::new_v4())
            .bind(new.user_id)
            .bind(&new.video_url)
            .bind(&new.video_title)
            .bind(&new.introduction)
            .bind(&new.summary)
            .bind(&new.main_points)
            .bind(&new.full_content)
            .fetch_one(&self.db)
            .await
            .context("insert transcript")?;
        Ok(row)
    }
}

#[cfg(all(test, feature = "postgres-tests"))]
mod pg_tests {
    use super::*;
    use crate::auth::{
        repo::{PgUserStore, UserStore},
        repo_types::NewUser,
    };

    async fn owner(pool: &PgPool, name: &str) -> Uuid {
        PgUserStore::new(pool.clone())
            .create(NewUser {
                username: name.into(),
                email: format!("{name}@example.com"),
                password_hash: "hash".into(),
            })
            .await
            .unwrap()
            .id
    }

    fn new_transcript(user_id: Uuid, title: &str) -> NewTranscript {
        NewTranscript {
            user_id,
            video_url: "https://youtu.be/dQw4w9WgXcQ".into(),
            video_title: Some(title.into()),
            introduction: None,
            summary: Some("S".into()),
            main_points: None,
            full_content: None,
        }
    }

    #[sqlx::test]
    async fn lists_newest_first_and_scopes_by_owner(pool: PgPool) {
        let alice = owner(&pool, "alice").await;
        let bob = owner(&pool, "bob").await;
        let store = PgTranscriptStore::new(pool.clone());

        let older = store.create(new_transcript(alice, "older")).await.unwrap();
        sqlx::query("UPDATE transcripts SET created_at = now() - interval '1 day' WHERE id = $1")
            .bind(older.id)
            .execute(&pool)
            .await
            .unwrap();
        let newer = store.create(new_transcript(alice, "newer")).await.unwrap();
        store.create(new_transcript(bob, "bob's")).await.unwrap();

        let ids: Vec<Uuid> = store
            .list_for_user(alice)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![newer.id, older.id]);

        assert!(store.get_for_user(alice, newer.id).await.unwrap().is_some());
        assert!(store.get_for_user(bob, newer.id).await.unwrap().is_none());
    }
}
