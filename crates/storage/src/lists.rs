use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use shared::{
    domain::{CampaignId, ListId, SubscriberId},
    protocol::{Campaign, ListDeletion, Subscriber, SubscriberList},
};

use crate::{campaigns::campaign_from_row, Storage};

impl Storage {
    pub async fn create_list(&self, name: &str) -> Result<SubscriberList> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO lists (name, created_at, updated_at) VALUES (?, ?, ?)
             RETURNING id, name, created_at, updated_at",
        )
        .bind(name.trim())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert list")?;
        Ok(list_from_row(&row))
    }

    pub async fn list_by_id(&self, list_id: ListId) -> Result<Option<SubscriberList>> {
        let row = sqlx::query("SELECT id, name, created_at, updated_at FROM lists WHERE id = ?")
            .bind(list_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(list_from_row))
    }

    pub async fn list_lists(&self) -> Result<Vec<SubscriberList>> {
        let rows = sqlx::query("SELECT id, name, created_at, updated_at FROM lists ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(list_from_row).collect())
    }

    /// Links a campaign to a list. Returns `false` when the pair was already
    /// linked.
    pub async fn attach_campaign_to_list(
        &self,
        campaign_id: CampaignId,
        list_id: ListId,
    ) -> Result<bool> {
        let inserted = sqlx::query(
            "INSERT INTO campaign_lists (campaign_id, list_id) VALUES (?, ?)
             ON CONFLICT(campaign_id, list_id) DO NOTHING",
        )
        .bind(campaign_id.0)
        .bind(list_id.0)
        .execute(&self.pool)
        .await
        .context("failed to attach campaign to list")?
        .rows_affected();
        Ok(inserted > 0)
    }

    pub async fn lists_for_campaign(&self, campaign_id: CampaignId) -> Result<Vec<SubscriberList>> {
        let rows = sqlx::query(
            "SELECT l.id, l.name, l.created_at, l.updated_at
             FROM lists l
             INNER JOIN campaign_lists cl ON cl.list_id = l.id
             WHERE cl.campaign_id = ?
             ORDER BY l.id ASC",
        )
        .bind(campaign_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(list_from_row).collect())
    }

    pub async fn campaigns_for_list(&self, list_id: ListId) -> Result<Vec<Campaign>> {
        let rows = sqlx::query(
            "SELECT c.id, c.name, c.template_name, c.created_at, c.updated_at
             FROM campaigns c
             INNER JOIN campaign_lists cl ON cl.campaign_id = c.id
             WHERE cl.list_id = ?
             ORDER BY c.id ASC",
        )
        .bind(list_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(campaign_from_row).collect())
    }

    /// Deletes a list and every association row that references it in one
    /// transaction. Returns `None` if the list does not exist.
    pub async fn delete_list(&self, list_id: ListId) -> Result<Option<ListDeletion>> {
        let mut tx = self.pool.begin().await?;

        let (campaign_links, subscriber_links) = detach_all(&mut *tx, list_id).await?;

        let deleted = sqlx::query("DELETE FROM lists WHERE id = ?")
            .bind(list_id.0)
            .execute(&mut *tx)
            .await
            .context("failed to delete list")?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(ListDeletion {
            list_id,
            campaign_links,
            subscriber_links,
        }))
    }

    /// Inserts a subscriber. Returns `None` when the email is already taken.
    pub async fn create_subscriber(&self, name: &str, email: &str) -> Result<Option<Subscriber>> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO subscribers (name, email, created_at, updated_at) VALUES (?, ?, ?, ?)
             ON CONFLICT(email) DO NOTHING
             RETURNING id, name, email, created_at, updated_at",
        )
        .bind(name.trim())
        .bind(email.trim())
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .context("failed to insert subscriber")?;
        Ok(row.as_ref().map(subscriber_from_row))
    }

    pub async fn subscriber_by_id(&self, subscriber_id: SubscriberId) -> Result<Option<Subscriber>> {
        let row = sqlx::query(
            "SELECT id, name, email, created_at, updated_at FROM subscribers WHERE id = ?",
        )
        .bind(subscriber_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(subscriber_from_row))
    }

    pub async fn subscribe_to_list(
        &self,
        subscriber_id: SubscriberId,
        list_id: ListId,
    ) -> Result<bool> {
        let inserted = sqlx::query(
            "INSERT INTO subscribers_lists (subscriber_id, list_id) VALUES (?, ?)
             ON CONFLICT(subscriber_id, list_id) DO NOTHING",
        )
        .bind(subscriber_id.0)
        .bind(list_id.0)
        .execute(&self.pool)
        .await
        .context("failed to subscribe to list")?
        .rows_affected();
        Ok(inserted > 0)
    }

    pub async fn subscribers_for_list(&self, list_id: ListId) -> Result<Vec<Subscriber>> {
        let rows = sqlx::query(
            "SELECT s.id, s.name, s.email, s.created_at, s.updated_at
             FROM subscribers s
             INNER JOIN subscribers_lists sl ON sl.subscriber_id = s.id
             WHERE sl.list_id = ?
             ORDER BY s.id ASC",
        )
        .bind(list_id.0)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(subscriber_from_row).collect())
    }

    pub async fn count_list_associations(&self, list_id: ListId) -> Result<(u64, u64)> {
        let row = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM campaign_lists WHERE list_id = ?),
                (SELECT COUNT(*) FROM subscribers_lists WHERE list_id = ?)",
        )
        .bind(list_id.0)
        .bind(list_id.0)
        .fetch_one(&self.pool)
        .await?;
        Ok((
            u64::try_from(row.get::<i64, _>(0)).unwrap_or_default(),
            u64::try_from(row.get::<i64, _>(1)).unwrap_or_default(),
        ))
    }
}

/// Removes every campaign and subscriber association of `list_id` on the
/// caller's connection, which must be inside the list-deletion transaction.
async fn detach_all(conn: &mut SqliteConnection, list_id: ListId) -> Result<(u64, u64)> {
    let campaign_links = sqlx::query("DELETE FROM campaign_lists WHERE list_id = ?")
        .bind(list_id.0)
        .execute(&mut *conn)
        .await
        .context("failed to detach campaigns from list")?
        .rows_affected();

    let subscriber_links = sqlx::query("DELETE FROM subscribers_lists WHERE list_id = ?")
        .bind(list_id.0)
        .execute(&mut *conn)
        .await
        .context("failed to detach subscribers from list")?
        .rows_affected();

    Ok((campaign_links, subscriber_links))
}

fn list_from_row(r: &SqliteRow) -> SubscriberList {
    SubscriberList {
        id: ListId(r.get::<i64, _>(0)),
        name: r.get::<String, _>(1),
        created_at: r.get::<DateTime<Utc>, _>(2),
        updated_at: r.get::<DateTime<Utc>, _>(3),
    }
}

fn subscriber_from_row(r: &SqliteRow) -> Subscriber {
    Subscriber {
        id: SubscriberId(r.get::<i64, _>(0)),
        name: r.get::<String, _>(1),
        email: r.get::<String, _>(2),
        created_at: r.get::<DateTime<Utc>, _>(3),
        updated_at: r.get::<DateTime<Utc>, _>(4),
    }
}
