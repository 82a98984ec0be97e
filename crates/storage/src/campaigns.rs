use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};

use shared::{domain::CampaignId, protocol::Campaign};

use crate::Storage;

impl Storage {
    /// Inserts a campaign bound to an existing template. The template lookup is
    /// part of the insert, so `None` means no template named `template_name`
    /// existed at write time and nothing was written.
    pub async fn insert_campaign(&self, name: &str, template_name: &str) -> Result<Option<Campaign>> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO campaigns (name, template_name, created_at, updated_at)
             SELECT ?, t.name, ?, ? FROM templates t WHERE t.name = ?
             RETURNING id, name, template_name, created_at, updated_at",
        )
        .bind(name)
        .bind(now)
        .bind(now)
        .bind(template_name)
        .fetch_optional(&self.pool)
        .await
        .context("failed to insert campaign")?;
        Ok(row.as_ref().map(campaign_from_row))
    }

    pub async fn campaign_by_id(&self, campaign_id: CampaignId) -> Result<Option<Campaign>> {
        let row = sqlx::query(
            "SELECT id, name, template_name, created_at, updated_at FROM campaigns WHERE id = ?",
        )
        .bind(campaign_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(campaign_from_row))
    }

    /// Campaigns ordered by id, starting strictly after `after_id`.
    pub async fn list_campaigns_after(
        &self,
        after_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<Campaign>> {
        let rows = sqlx::query(
            "SELECT id, name, template_name, created_at, updated_at
             FROM campaigns
             WHERE id > ?
             ORDER BY id ASC
             LIMIT ?",
        )
        .bind(after_id.unwrap_or(0))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(campaign_from_row).collect())
    }

    pub async fn list_all_campaigns(&self) -> Result<Vec<Campaign>> {
        let rows = sqlx::query(
            "SELECT id, name, template_name, created_at, updated_at FROM campaigns ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(campaign_from_row).collect())
    }

    /// Removes a campaign together with its own list associations. Returns
    /// `false` when no such campaign exists; the transaction is rolled back on
    /// every failure.
    pub async fn delete_campaign(&self, campaign_id: CampaignId) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM campaign_lists WHERE campaign_id = ?")
            .bind(campaign_id.0)
            .execute(&mut *tx)
            .await
            .context("failed to detach campaign from lists")?;

        let deleted = sqlx::query("DELETE FROM campaigns WHERE id = ?")
            .bind(campaign_id.0)
            .execute(&mut *tx)
            .await
            .context("failed to delete campaign")?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}

pub(crate) fn campaign_from_row(r: &SqliteRow) -> Campaign {
    Campaign {
        id: CampaignId(r.get::<i64, _>(0)),
        name: r.get::<String, _>(1),
        template_name: r.get::<String, _>(2),
        created_at: r.get::<DateTime<Utc>, _>(3),
        updated_at: r.get::<DateTime<Utc>, _>(4),
    }
}
