//! User Repository

use super::{RepoError, RepoResult};
use shared::models::{User, UserCreate};
use sqlx::{SqliteConnection, SqliteExecutor, SqlitePool};

const USER_SELECT: &str =
    "SELECT id, name, email, role, total_orders, total_spent, created_at, updated_at FROM app_user";

pub async fn find_by_id<'e>(executor: impl SqliteExecutor<'e>, id: i64) -> RepoResult<Option<User>> {
    let sql = format!("{USER_SELECT} WHERE id = ?");
    let row = sqlx::query_as::<_, User>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;
    Ok(row)
}

pub async fn create(pool: &SqlitePool, data: UserCreate) -> RepoResult<User> {
    let now = shared::util::now_millis();
    let id = shared::util::snowflake_id();
    let role = data.role.unwrap_or_else(|| "customer".to_string());
    sqlx::query(
        "INSERT INTO app_user (id, name, email, role, total_orders, total_spent, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 0, 0, ?5, ?5)",
    )
    .bind(id)
    .bind(&data.name)
    .bind(&data.email)
    .bind(&role)
    .bind(now)
    .execute(pool)
    .await?;
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to create user".into()))
}

/// Atomically bump the order aggregates for a newly placed order
///
/// Returns `false` when the user does not exist.
pub async fn increment_order_stats(
    conn: &mut SqliteConnection,
    user_id: i64,
    amount: f64,
) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE app_user SET total_orders = total_orders + 1, total_spent = ROUND(total_spent + ?1, 2), updated_at = ?2 WHERE id = ?3",
    )
    .bind(amount)
    .bind(now)
    .bind(user_id)
    .execute(&mut *conn)
    .await?;
    Ok(rows.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    #[tokio::test]
    async fn test_increment_order_stats() {
        let db = DbService::in_memory().await.unwrap();
        let user = create(
            &db.pool,
            UserCreate {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                role: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(user.role, "customer");

        let mut conn = db.pool.acquire().await.unwrap();
        assert!(increment_order_stats(&mut conn, user.id, 19.99).await.unwrap());
        assert!(increment_order_stats(&mut conn, user.id, 0.01).await.unwrap());
        assert!(!increment_order_stats(&mut conn, 42, 1.0).await.unwrap());
        drop(conn);

        let user = find_by_id(&db.pool, user.id).await.unwrap().unwrap();
        assert_eq!(user.total_orders, 2);
        assert_eq!(user.total_spent, 20.0);
    }
}
