use sqlx::{
    query::Query,
    sqlite::{Sqlite, SqliteArguments},
    SqlitePool,
};

use crate::error::{AppError, Result};

use super::models::{Details, NewProject, ProjectRecord, ProjectSummary, ProjectUpdate};

/// `details` columns in the order `bind_details` binds them.
const DETAIL_COLUMNS: [&str; 23] = [
    "resin_brand",
    "resin_type",
    "amount",
    "unit",
    "colors",
    "color_amts",
    "color_types",
    "glitters",
    "glitter_types",
    "glitter_amts",
    "time_to_pour_hrs",
    "time_to_pour_mins",
    "pouring_time_hrs",
    "pouring_time_mins",
    "time_to_demold_hrs",
    "time_to_demold_mins",
    "result_scale",
    "start_temp",
    "start_temp_unit",
    "end_temp",
    "end_temp_unit",
    "demold_temp",
    "demold_temp_unit",
];

fn bind_details<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    details: &'q Details,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    query
        .bind(&details.resin_brand)
        .bind(&details.resin_type)
        .bind(details.amount)
        .bind(&details.unit)
        .bind(details.colors.to_string())
        .bind(details.color_amts.to_string())
        .bind(details.color_types.to_string())
        .bind(details.glitters.to_string())
        .bind(details.glitter_types.to_string())
        .bind(details.glitter_amts.to_string())
        .bind(details.time_to_pour_hrs)
        .bind(details.time_to_pour_mins)
        .bind(details.pouring_time_hrs)
        .bind(details.pouring_time_mins)
        .bind(details.time_to_demold_hrs)
        .bind(details.time_to_demold_mins)
        .bind(details.result_scale)
        .bind(details.start_temp)
        .bind(&details.start_temp_unit)
        .bind(details.end_temp)
        .bind(&details.end_temp_unit)
        .bind(details.demold_temp)
        .bind(&details.demold_temp_unit)
}

fn record_select() -> String {
    let details = DETAIL_COLUMNS
        .iter()
        .map(|c| format!("d.{c}"))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"
        SELECT p.id, p.name, p.user_id, p.notes,
               p.mold_img, p.mold_img_type, p.result_img, p.result_img_type,
               {details}
        FROM projects p
        JOIN details d ON d.project_id = p.id
        "#
    )
}

/// Project store over the `projects` and `details` tables.
///
/// Every write touches both tables inside one transaction. Dropping a
/// `sqlx::Transaction` without committing rolls it back, so any `?` that
/// leaves a method early undoes the partial write.
pub struct ProjectStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProjectStore<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn name_in_use(&self, name: &str, user_id: i64) -> Result<bool> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM projects WHERE name = ? AND user_id = ?",
        )
        .bind(name)
        .bind(user_id)
        .fetch_one(self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Insert a project and its details; returns the new project id.
    pub async fn create(&self, user_id: i64, project: &NewProject) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let project_id = sqlx::query(
            r#"
            INSERT INTO projects (name, mold_img, mold_img_type, result_img, result_img_type, notes, user_id)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&project.name)
        .bind(project.mold_img.as_ref().map(|img| img.data.as_str()))
        .bind(project.mold_img.as_ref().map(|img| img.mime_subtype.as_str()))
        .bind(project.result_img.as_ref().map(|img| img.data.as_str()))
        .bind(project.result_img.as_ref().map(|img| img.mime_subtype.as_str()))
        .bind(&project.notes)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let placeholders = vec!["?"; DETAIL_COLUMNS.len()].join(", ");
        let sql = format!(
            "INSERT INTO details (project_id, {}) VALUES (?, {placeholders})",
            DETAIL_COLUMNS.join(", ")
        );
        bind_details(sqlx::query(&sql).bind(project_id), &project.details)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(project_id, user_id, "project created");
        Ok(project_id)
    }

    /// Newest projects first, at most `limit` rows.
    pub async fn list_recent(&self, user_id: i64, limit: i64) -> Result<Vec<ProjectSummary>> {
        let rows = sqlx::query_as::<_, ProjectSummary>(
            r#"
            SELECT p.id, p.name, d.resin_brand, d.resin_type, d.amount, d.unit,
                   d.colors, d.glitters, d.result_scale
            FROM projects p
            JOIN details d ON d.project_id = p.id
            WHERE p.user_id = ?
            ORDER BY p.id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn list_all(&self, user_id: i64) -> Result<Vec<ProjectRecord>> {
        let sql = format!("{} WHERE p.user_id = ? ORDER BY p.id ASC", record_select());
        let rows = sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await?;

        Ok(rows)
    }

    pub async fn get_one(&self, project_id: i64) -> Result<ProjectRecord> {
        let sql = format!("{} WHERE p.id = ?", record_select());
        sqlx::query_as::<_, ProjectRecord>(&sql)
            .bind(project_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
    }

    /// Overwrite the mutable fields of a project. Name, owner and id are left alone.
    pub async fn update(&self, project_id: i64, update: &ProjectUpdate) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let assignments = DETAIL_COLUMNS
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("UPDATE details SET {assignments} WHERE project_id = ?");
        let result = bind_details(sqlx::query(&sql), &update.details)
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Project not found".to_string()));
        }

        sqlx::query(
            r#"
            UPDATE projects SET
                notes = ?,
                mold_img = COALESCE(?, mold_img),
                mold_img_type = COALESCE(?, mold_img_type),
                result_img = COALESCE(?, result_img),
                result_img_type = COALESCE(?, result_img_type)
            WHERE id = ?
            "#,
        )
        .bind(&update.notes)
        .bind(update.mold_img.as_ref().map(|img| img.data.as_str()))
        .bind(update.mold_img.as_ref().map(|img| img.mime_subtype.as_str()))
        .bind(update.result_img.as_ref().map(|img| img.data.as_str()))
        .bind(update.result_img.as_ref().map(|img| img.mime_subtype.as_str()))
        .bind(project_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove the caller's project called `name`, details first.
    ///
    /// The id lookup filters on `user_id`, so a name belonging to another
    /// account resolves to nothing.
    pub async fn delete(&self, name: &str, user_id: i64) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let project_id =
            sqlx::query_scalar::<_, i64>("SELECT id FROM projects WHERE name = ? AND user_id = ?")
                .bind(name)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;

        sqlx::query("DELETE FROM details WHERE project_id = ?")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(project_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(project_id, user_id, "project deleted");
        Ok(())
    }
}
