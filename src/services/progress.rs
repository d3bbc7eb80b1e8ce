use sqlx::PgConnection;
use uuid::Uuid;

use crate::database::manager::DatabaseError;

/// Progress roll-up. Runs inside the caller's scope transaction so the
/// child write and both parent updates land atomically.
///
/// Initiative progress is the share of its activities that are done;
/// objective progress is the rounded mean of its initiatives.

/// Recompute an initiative's progress from its activities, then its parent
/// objective. Call after any activity insert/update/delete.
pub async fn recompute_for_initiative(
    conn: &mut PgConnection,
    initiative_id: Uuid,
) -> Result<(), DatabaseError> {
    let (total, done): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE status = 'done') \
         FROM activities WHERE initiative_id = $1",
    )
    .bind(initiative_id)
    .fetch_one(&mut *conn)
    .await?;

    let progress = percent_done(done, total);

    let objective_id: (Uuid,) = sqlx::query_as(
        "UPDATE initiatives SET progress = $2, updated_at = now() \
         WHERE id = $1 RETURNING objective_id",
    )
    .bind(initiative_id)
    .bind(progress)
    .fetch_one(&mut *conn)
    .await?;

    recompute_for_objective(conn, objective_id.0).await
}

/// Recompute an objective's progress as the mean of its initiatives. Call
/// after any initiative insert/update/delete.
pub async fn recompute_for_objective(
    conn: &mut PgConnection,
    objective_id: Uuid,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "UPDATE objectives SET progress = COALESCE(\
           (SELECT CAST(ROUND(AVG(progress)) AS INTEGER) \
            FROM initiatives WHERE objective_id = $1), 0), \
         updated_at = now() \
         WHERE id = $1",
    )
    .bind(objective_id)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn percent_done(done: i64, total: i64) -> i32 {
    if total <= 0 {
        return 0;
    }
    ((done * 100) / total) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_done_handles_empty_and_full() {
        assert_eq!(percent_done(0, 0), 0);
        assert_eq!(percent_done(0, 4), 0);
        assert_eq!(percent_done(4, 4), 100);
    }

    #[test]
    fn percent_done_floors_partial_progress() {
        assert_eq!(percent_done(1, 3), 33);
        assert_eq!(percent_done(2, 3), 66);
        assert_eq!(percent_done(1, 2), 50);
    }
}
