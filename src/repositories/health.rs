use sqlx::PgPool;

/// Round trip to the database; also proves the pool can hand out a connection.
pub(crate) async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    let one: i32 = sqlx::query_scalar("SELECT 1").fetch_one(pool).await?;
    debug_assert_eq!(one, 1);
    Ok(())
}
