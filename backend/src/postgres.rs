use std::collections::HashMap;
use sqlx::{PgConnection, PgPool};
use shared::models::*;
use shared::participation::check_open_for_ballot;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;
use crate::store::{StoreError, VoteStore};

const VOTE_COLUMNS: &str =
    "id, title, description, creator_id, status, permission, share_token, created_at, published_at, closed_at";

#[derive(Debug, sqlx::FromRow)]
struct VoteRow {
    id: Uuid,
    title: String,
    description: String,
    creator_id: String,
    status: VoteStatus,
    permission: VotePermission,
    share_token: String,
    created_at: OffsetDateTime,
    published_at: Option<OffsetDateTime>,
    closed_at: Option<OffsetDateTime>,
}

#[derive(Debug, sqlx::FromRow)]
struct OptionRow {
    id: Uuid,
    vote_id: Uuid,
    text: String,
    vote_count: i64,
}

impl OptionRow {
    fn into_option(self) -> Result<VoteOption, StoreError> {
        Ok(VoteOption {
            id: self.id,
            vote_id: self.vote_id,
            text: self.text,
            vote_count: u64::try_from(self.vote_count)
                .map_err(|_| StoreError::Database(format!("negative vote count on option {}", self.id)))?,
        })
    }
}

impl VoteRow {
    fn into_vote(self, options: Vec<VoteOption>) -> Vote {
        Vote {
            id: self.id,
            title: self.title,
            description: self.description,
            creator_id: UserId::new(self.creator_id),
            options,
            status: self.status,
            permission: self.permission,
            share_token: self.share_token,
            created_at: self.created_at,
            published_at: self.published_at,
            closed_at: self.closed_at,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RowLock {
    None,
    /// Blocks status changes, lets other ballots through.
    Share,
}

async fn load_vote(conn: &mut PgConnection, id: Uuid, lock: RowLock) -> Result<Option<Vote>, StoreError> {
    let sql = match lock {
        RowLock::None => format!("SELECT {VOTE_COLUMNS} FROM votes WHERE id = $1"),
        RowLock::Share => format!("SELECT {VOTE_COLUMNS} FROM votes WHERE id = $1 FOR SHARE"),
    };
    let Some(row) = sqlx::query_as::<_, VoteRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let options = sqlx::query_as::<_, OptionRow>(
        "SELECT id, vote_id, text, vote_count FROM vote_options WHERE vote_id = $1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(OptionRow::into_option)
    .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(row.into_vote(options)))
}

/// Attaches options to a batch of vote rows with a single query.
async fn attach_options(pool: &PgPool, rows: Vec<VoteRow>) -> Result<Vec<Vote>, StoreError> {
    let ids: Vec<Uuid> = rows.iter().map(|row| row.id).collect();
    let mut by_vote: HashMap<Uuid, Vec<VoteOption>> = HashMap::with_capacity(ids.len());

    let options = sqlx::query_as::<_, OptionRow>(
        "SELECT id, vote_id, text, vote_count FROM vote_options
         WHERE vote_id = ANY($1) ORDER BY vote_id, position",
    )
    .bind(&ids)
    .fetch_all(pool)
    .await?;

    for option in options {
        let option = option.into_option()?;
        by_vote.entry(option.vote_id).or_default().push(option);
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let options = by_vote.remove(&row.id).unwrap_or_default();
            row.into_vote(options)
        })
        .collect())
}

async fn insert_options(conn: &mut PgConnection, vote: &Vote) -> Result<(), StoreError> {
    for (position, option) in vote.options.iter().enumerate() {
        let position = i32::try_from(position)
            .map_err(|_| StoreError::Database("too many options".into()))?;
        sqlx::query(
            "INSERT INTO vote_options (id, vote_id, position, text, vote_count)
             VALUES ($1, $2, $3, $4, 0)",
        )
        .bind(option.id)
        .bind(vote.id)
        .bind(position)
        .bind(&option.text)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Tells a conditional update that matched nothing apart from a missing row.
async fn stale_or_missing(conn: &mut PgConnection, id: Uuid) -> Result<StoreError, StoreError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM votes WHERE id = $1)")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(if exists { StoreError::StaleState } else { StoreError::NotFound })
}

fn ballot_insert_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() && db_err.constraint() == Some("unique_vote_voter") {
            return StoreError::DuplicateBallot;
        }
    }
    StoreError::from(e)
}

/// Postgres-backed store. Exactly-once ballots rest on the `unique_vote_voter` constraint.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[rocket::async_trait]
impl VoteStore for PgStore {
    async fn insert_vote(&self, vote: &Vote) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO votes
             (id, title, description, creator_id, status, permission, share_token, created_at, published_at, closed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(vote.id)
        .bind(&vote.title)
        .bind(&vote.description)
        .bind(vote.creator_id.as_str())
        .bind(vote.status)
        .bind(vote.permission)
        .bind(&vote.share_token)
        .bind(vote.created_at)
        .bind(vote.published_at)
        .bind(vote.closed_at)
        .execute(&mut *tx)
        .await?;

        insert_options(&mut tx, vote).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_vote(&self, id: Uuid) -> Result<Option<Vote>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        load_vote(&mut conn, id, RowLock::None).await
    }

    async fn find_by_share_token(&self, token: &str) -> Result<Option<Vote>, StoreError> {
        let id: Option<Uuid> = sqlx::query_scalar("SELECT id FROM votes WHERE share_token = $1")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        match id {
            Some(id) => self.find_vote(id).await,
            None => Ok(None),
        }
    }

    async fn list_votes(&self, status: Option<VoteStatus>) -> Result<Vec<Vote>, StoreError> {
        let sql = format!(
            "SELECT {VOTE_COLUMNS} FROM votes
             WHERE $1::vote_status IS NULL OR status = $1
             ORDER BY created_at DESC, id"
        );
        let rows = sqlx::query_as::<_, VoteRow>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        attach_options(&self.pool, rows).await
    }

    async fn save_state(&self, vote: &Vote, expected: VoteStatus) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            "UPDATE votes SET status = $2, published_at = $3, closed_at = $4
             WHERE id = $1 AND status = $5",
        )
        .bind(vote.id)
        .bind(vote.status)
        .bind(vote.published_at)
        .bind(vote.closed_at)
        .bind(expected)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(stale_or_missing(&mut conn, vote.id).await?);
        }
        debug!(vote_id = %vote.id, from = %expected, to = %vote.status, "Vote state saved");
        Ok(())
    }

    async fn save_permission(&self, vote: &Vote) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = sqlx::query(
            "UPDATE votes SET permission = $2 WHERE id = $1 AND status <> 'deleted'",
        )
        .bind(vote.id)
        .bind(vote.permission)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(stale_or_missing(&mut conn, vote.id).await?);
        }
        debug!(vote_id = %vote.id, permission = %vote.permission, "Vote permission saved");
        Ok(())
    }

    async fn replace_draft(&self, vote: &Vote) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE votes SET title = $2, description = $3, permission = $4
             WHERE id = $1 AND status = 'draft'",
        )
        .bind(vote.id)
        .bind(&vote.title)
        .bind(&vote.description)
        .bind(vote.permission)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(stale_or_missing(&mut tx, vote.id).await?);
        }

        sqlx::query("DELETE FROM vote_options WHERE vote_id = $1")
            .bind(vote.id)
            .execute(&mut *tx)
            .await?;
        insert_options(&mut tx, vote).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn record_ballot(&self, ballot: &VoteResponse) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let vote = load_vote(&mut tx, ballot.vote_id, RowLock::Share)
            .await?
            .ok_or(StoreError::NotFound)?;
        check_open_for_ballot(&vote, ballot.option_id).map_err(StoreError::BallotRejected)?;

        sqlx::query(
            "INSERT INTO vote_responses (id, vote_id, user_id, option_id, cast_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(ballot.id)
        .bind(ballot.vote_id)
        .bind(ballot.user_id.as_ref().map(UserId::as_str))
        .bind(ballot.option_id)
        .bind(ballot.cast_at)
        .execute(&mut *tx)
        .await
        .map_err(ballot_insert_error)?;

        sqlx::query("UPDATE vote_options SET vote_count = vote_count + 1 WHERE id = $1 AND vote_id = $2")
            .bind(ballot.option_id)
            .bind(ballot.vote_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn has_voted(&self, vote_id: Uuid, user: &UserId) -> Result<bool, StoreError> {
        let voted = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM vote_responses WHERE vote_id = $1 AND user_id = $2)",
        )
        .bind(vote_id)
        .bind(user.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(voted)
    }
}
