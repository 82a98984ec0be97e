use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection};

use shared::{
    domain::TemplateId,
    protocol::{NewTemplate, Template},
};

use crate::Storage;

/// Outcome of a guarded template deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateDeletion {
    Deleted,
    NotFound,
    Referenced { campaigns: u64 },
}

/// Outcome of a template update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateUpdate {
    Updated(Template),
    NotFound,
    /// Another template already has the requested name.
    NameTaken,
    /// The rename was refused because campaigns still point at the old name.
    Referenced { campaigns: u64 },
}

impl Storage {
    /// Inserts a template. Returns `None` when the name is already taken.
    pub async fn create_template(&self, template: &NewTemplate) -> Result<Option<Template>> {
        let now = Utc::now();
        let row = sqlx::query(
            "INSERT INTO templates (name, subject, html_part, text_part, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(name) DO NOTHING
             RETURNING id, name, subject, html_part, text_part, created_at, updated_at",
        )
        .bind(template.name.trim())
        .bind(&template.subject)
        .bind(&template.html_part)
        .bind(&template.text_part)
        .bind(now)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .context("failed to insert template")?;
        Ok(row.as_ref().map(template_from_row))
    }

    pub async fn template_by_id(&self, template_id: TemplateId) -> Result<Option<Template>> {
        let row = sqlx::query(
            "SELECT id, name, subject, html_part, text_part, created_at, updated_at
             FROM templates WHERE id = ?",
        )
        .bind(template_id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(template_from_row))
    }

    pub async fn template_by_name(&self, name: &str) -> Result<Option<Template>> {
        let row = sqlx::query(
            "SELECT id, name, subject, html_part, text_part, created_at, updated_at
             FROM templates WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(template_from_row))
    }

    /// Templates ordered by name, starting strictly after `after_name`.
    pub async fn list_templates_after(
        &self,
        after_name: Option<&str>,
        limit: u32,
    ) -> Result<Vec<Template>> {
        let rows = if let Some(after_name) = after_name {
            sqlx::query(
                "SELECT id, name, subject, html_part, text_part, created_at, updated_at
                 FROM templates
                 WHERE name > ?
                 ORDER BY name ASC
                 LIMIT ?",
            )
            .bind(after_name)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(
                "SELECT id, name, subject, html_part, text_part, created_at, updated_at
                 FROM templates
                 ORDER BY name ASC
                 LIMIT ?",
            )
            .bind(limit)
            .fetch_all(&self.pool)
            .await?
        };
        Ok(rows.iter().map(template_from_row).collect())
    }

    pub async fn list_all_templates(&self) -> Result<Vec<Template>> {
        let rows = sqlx::query(
            "SELECT id, name, subject, html_part, text_part, created_at, updated_at
             FROM templates
             ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(template_from_row).collect())
    }

    /// Rewrites a template. Keeping the current name always succeeds; a new
    /// name is refused while campaigns reference the old one, since campaigns
    /// bind to templates by name.
    pub async fn update_template(
        &self,
        template_id: TemplateId,
        template: &NewTemplate,
    ) -> Result<TemplateUpdate> {
        let name = template.name.trim();
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            "UPDATE templates
             SET name = ?, subject = ?, html_part = ?, text_part = ?, updated_at = ?
             WHERE id = ?
               AND (name = ?
                    OR NOT EXISTS (SELECT 1 FROM campaigns WHERE template_name = templates.name))
             RETURNING id, name, subject, html_part, text_part, created_at, updated_at",
        )
        .bind(name)
        .bind(&template.subject)
        .bind(&template.html_part)
        .bind(&template.text_part)
        .bind(Utc::now())
        .bind(template_id.0)
        .bind(name)
        .fetch_optional(&mut *tx)
        .await;

        let row = match updated {
            Ok(row) => row,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                tx.rollback().await?;
                return Ok(TemplateUpdate::NameTaken);
            }
            Err(err) => return Err(err).context("failed to update template"),
        };

        if let Some(row) = row {
            tx.commit().await?;
            return Ok(TemplateUpdate::Updated(template_from_row(&row)));
        }

        let references = template_references(&mut *tx, template_id).await?;
        tx.rollback().await?;

        Ok(match references {
            None => TemplateUpdate::NotFound,
            Some(campaigns) => TemplateUpdate::Referenced { campaigns },
        })
    }

    /// Deletes a template unless a campaign references it by name. The
    /// reference check and the delete are one statement, so a campaign created
    /// concurrently either blocks the delete or fails its own guarded insert.
    pub async fn delete_template_if_unreferenced(
        &self,
        template_id: TemplateId,
    ) -> Result<TemplateDeletion> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query(
            "DELETE FROM templates
             WHERE id = ?
               AND NOT EXISTS (SELECT 1 FROM campaigns WHERE template_name = templates.name)",
        )
        .bind(template_id.0)
        .execute(&mut *tx)
        .await
        .context("failed to delete template")?
        .rows_affected();

        if deleted > 0 {
            tx.commit().await?;
            return Ok(TemplateDeletion::Deleted);
        }

        let references = template_references(&mut *tx, template_id).await?;
        tx.rollback().await?;

        Ok(match references {
            None => TemplateDeletion::NotFound,
            Some(campaigns) => TemplateDeletion::Referenced { campaigns },
        })
    }
}

/// Number of campaigns naming the template, or `None` if it does not exist.
async fn template_references(
    conn: &mut SqliteConnection,
    template_id: TemplateId,
) -> Result<Option<u64>> {
    let count: Option<i64> = sqlx::query_scalar(
        "SELECT COUNT(c.id)
         FROM templates t
         LEFT JOIN campaigns c ON c.template_name = t.name
         WHERE t.id = ?
         GROUP BY t.id",
    )
    .bind(template_id.0)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(count.map(|count| u64::try_from(count).unwrap_or_default()))
}

fn template_from_row(r: &SqliteRow) -> Template {
    Template {
        id: TemplateId(r.get::<i64, _>(0)),
        name: r.get::<String, _>(1),
        subject: r.get::<String, _>(2),
        html_part: r.get::<String, _>(3),
        text_part: r.get::<String, _>(4),
        created_at: r.get::<DateTime<Utc>, _>(5),
        updated_at: r.get::<DateTime<Utc>, _>(6),
    }
}
