// Repository pattern - all forum persistence lives here
use std::collections::HashMap;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::db::models::{Comment, Post};
use crate::db::{now_timestamp, write_transaction};
use crate::forum::{
    clean_text, Author, Cursor, Page, PostDetail, SortKey, MAX_BODY_CHARS, MAX_TITLE_CHARS,
};
use crate::state::DbPool;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    Invalid(String),
}

/// Feed operations. Vote and comment writes are atomic with their counters.
#[async_trait]
pub trait ForumRepository: Send + Sync {
    async fn create_post(&self, author: &Author, title: &str, body: &str) -> Result<Post, RepositoryError>;

    /// One page under `sort`, strictly after `cursor` when given.
    async fn list_posts(&self, sort: SortKey, cursor: Option<&str>) -> Result<Page<Post>, RepositoryError>;

    /// Post with comments oldest first and the per-user vote map.
    async fn get_post(&self, post_id: &str) -> Result<PostDetail, RepositoryError>;

    async fn add_comment(&self, post_id: &str, author: &Author, body: &str) -> Result<Comment, RepositoryError>;

    /// No-op if the user already upvoted.
    async fn upvote(&self, post_id: &str, user_id: &str) -> Result<Post, RepositoryError>;

    /// No-op if the user has no upvote.
    async fn remove_upvote(&self, post_id: &str, user_id: &str) -> Result<Post, RepositoryError>;

    async fn user_vote(&self, post_id: &str, user_id: &str) -> Result<bool, RepositoryError>;

    /// Soft delete; comments are left alone.
    async fn delete_post(&self, post_id: &str) -> Result<(), RepositoryError>;

    /// Case-insensitive match over the most recent posts only.
    async fn search_posts(&self, term: &str) -> Result<Vec<Post>, RepositoryError>;
}

/// Flip the user's vote based on the stored flag. Returns the post and the new flag.
pub async fn toggle_vote<R: ForumRepository + ?Sized>(
    repo: &R,
    post_id: &str,
    user_id: &str,
) -> Result<(Post, bool), RepositoryError> {
    if repo.user_vote(post_id, user_id).await? {
        Ok((repo.remove_upvote(post_id, user_id).await?, false))
    } else {
        Ok((repo.upvote(post_id, user_id).await?, true))
    }
}

const POST_COLUMNS: &str = "id, author_id, author_name, author_streak, title, body, \
     vote_count, comment_count, deleted, created_at, updated_at";

fn row_to_post(row: &Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_name: row.get(2)?,
        author_streak: row.get(3)?,
        title: row.get(4)?,
        body: row.get(5)?,
        vote_count: row.get(6)?,
        comment_count: row.get(7)?,
        deleted: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn row_to_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        author_streak: row.get(4)?,
        body: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Live (not soft-deleted) post, or NotFound.
fn load_live_post(conn: &Connection, post_id: &str) -> Result<Post, RepositoryError> {
    conn.query_row(
        &format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ?1 AND deleted = 0"),
        params![post_id],
        row_to_post,
    )
    .optional()?
    .ok_or_else(|| RepositoryError::NotFound(format!("post {post_id}")))
}

/// SQLite implementation
pub struct SqliteForumRepository {
    pool: DbPool,
    page_size: usize,
    search_window: usize,
}

impl SqliteForumRepository {
    pub fn new(pool: DbPool, page_size: usize, search_window: usize) -> Self {
        Self {
            pool,
            page_size: page_size.max(1),
            search_window,
        }
    }

    fn set_vote(&self, post_id: &str, user_id: &str, voted: bool) -> Result<Post, RepositoryError> {
        let conn = self.pool.get()?;
        let tx = write_transaction(&conn)?;

        load_live_post(&tx, post_id)?;
        let current: bool = tx
            .query_row(
                "SELECT voted FROM post_votes WHERE post_id = ?1 AND user_id = ?2",
                params![post_id, user_id],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(false);

        if current != voted {
            tx.execute(
                "INSERT INTO post_votes (post_id, user_id, voted) VALUES (?1, ?2, ?3)
                 ON CONFLICT(post_id, user_id) DO UPDATE SET voted = excluded.voted",
                params![post_id, user_id, voted],
            )?;
            let delta: i64 = if voted { 1 } else { -1 };
            tx.execute(
                "UPDATE posts SET vote_count = vote_count + ?2 WHERE id = ?1",
                params![post_id, delta],
            )?;
        } else {
            tracing::debug!(post = post_id, user = user_id, voted, "Vote unchanged");
        }

        let post = load_live_post(&tx, post_id)?;
        tx.commit()?;
        Ok(post)
    }
}

#[async_trait]
impl ForumRepository for SqliteForumRepository {
    async fn create_post(&self, author: &Author, title: &str, body: &str) -> Result<Post, RepositoryError> {
        let title = clean_text("Title", title, MAX_TITLE_CHARS)?;
        let body = clean_text("Body", body, MAX_BODY_CHARS)?;
        let now = now_timestamp();

        let post = Post {
            id: uuid::Uuid::now_v7().to_string(),
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            author_streak: author.streak.max(0),
            title,
            body,
            vote_count: 0,
            comment_count: 0,
            deleted: false,
            created_at: now.clone(),
            updated_at: now,
        };

        let conn = self.pool.get()?;
        conn.execute(
            &format!("INSERT INTO posts ({POST_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
            params![
                post.id,
                post.author_id,
                post.author_name,
                post.author_streak,
                post.title,
                post.body,
                post.vote_count,
                post.comment_count,
                post.deleted,
                post.created_at,
                post.updated_at
            ],
        )?;

        tracing::info!(post = %post.id, author = %post.author_id, "Post created");
        Ok(post)
    }

    async fn list_posts(&self, sort: SortKey, cursor: Option<&str>) -> Result<Page<Post>, RepositoryError> {
        let cursor = cursor.map(Cursor::decode).transpose()?;
        if let Some(ref c) = cursor {
            if c.sort != sort {
                return Err(RepositoryError::Invalid(
                    "Cursor belongs to a different sort order".into(),
                ));
            }
        }

        // One extra row tells us whether another page exists.
        let fetch = (self.page_size + 1) as i64;
        let conn = self.pool.get()?;

        let mut posts = match (sort, &cursor) {
            (SortKey::New, None) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE deleted = 0
                     ORDER BY created_at DESC, id DESC LIMIT ?1"
                ))?;
                let rows = stmt.query_map(params![fetch], row_to_post)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            (SortKey::New, Some(c)) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE deleted = 0
                       AND (created_at < ?1 OR (created_at = ?1 AND id < ?2))
                     ORDER BY created_at DESC, id DESC LIMIT ?3"
                ))?;
                let rows = stmt.query_map(params![c.created_at, c.id, fetch], row_to_post)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            (SortKey::Top, None) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE deleted = 0
                     ORDER BY vote_count DESC, created_at DESC, id DESC LIMIT ?1"
                ))?;
                let rows = stmt.query_map(params![fetch], row_to_post)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            (SortKey::Top, Some(c)) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {POST_COLUMNS} FROM posts WHERE deleted = 0
                       AND (vote_count < ?1
                            OR (vote_count = ?1 AND created_at < ?2)
                            OR (vote_count = ?1 AND created_at = ?2 AND id < ?3))
                     ORDER BY vote_count DESC, created_at DESC, id DESC LIMIT ?4"
                ))?;
                let rows = stmt.query_map(
                    params![c.vote_count, c.created_at, c.id, fetch],
                    row_to_post,
                )?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        let has_more = posts.len() > self.page_size;
        posts.truncate(self.page_size);
        let next_cursor = if has_more {
            posts.last().map(|last| Cursor::after(last, sort).encode())
        } else {
            None
        };

        Ok(Page {
            items: posts,
            next_cursor,
            has_more,
        })
    }

    async fn get_post(&self, post_id: &str) -> Result<PostDetail, RepositoryError> {
        let conn = self.pool.get()?;
        let post = load_live_post(&conn, post_id)?;

        let mut stmt = conn.prepare(
            "SELECT id, post_id, author_id, author_name, author_streak, body, created_at
             FROM comments WHERE post_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let comments = stmt
            .query_map(params![post_id], row_to_comment)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare("SELECT user_id, voted FROM post_votes WHERE post_id = ?1")?;
        let votes = stmt
            .query_map(params![post_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<HashMap<String, bool>, _>>()?;

        Ok(PostDetail {
            post,
            comments,
            votes,
        })
    }

    async fn add_comment(&self, post_id: &str, author: &Author, body: &str) -> Result<Comment, RepositoryError> {
        let body = clean_text("Comment", body, MAX_BODY_CHARS)?;

        let conn = self.pool.get()?;
        let tx = write_transaction(&conn)?;
        load_live_post(&tx, post_id)?;

        let comment = Comment {
            id: uuid::Uuid::now_v7().to_string(),
            post_id: post_id.to_string(),
            author_id: author.id.clone(),
            author_name: author.name.clone(),
            author_streak: author.streak.max(0),
            body,
            created_at: now_timestamp(),
        };

        tx.execute(
            "INSERT INTO comments (id, post_id, author_id, author_name, author_streak, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                comment.id,
                comment.post_id,
                comment.author_id,
                comment.author_name,
                comment.author_streak,
                comment.body,
                comment.created_at
            ],
        )?;
        tx.execute(
            "UPDATE posts SET comment_count = comment_count + 1 WHERE id = ?1",
            params![post_id],
        )?;
        tx.commit()?;

        tracing::info!(post = post_id, comment = %comment.id, "Comment added");
        Ok(comment)
    }

    async fn upvote(&self, post_id: &str, user_id: &str) -> Result<Post, RepositoryError> {
        self.set_vote(post_id, user_id, true)
    }

    async fn remove_upvote(&self, post_id: &str, user_id: &str) -> Result<Post, RepositoryError> {
        self.set_vote(post_id, user_id, false)
    }

    async fn user_vote(&self, post_id: &str, user_id: &str) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;
        load_live_post(&conn, post_id)?;
        let voted = conn
            .query_row(
                "SELECT voted FROM post_votes WHERE post_id = ?1 AND user_id = ?2",
                params![post_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(voted.unwrap_or(false))
    }

    async fn delete_post(&self, post_id: &str) -> Result<(), RepositoryError> {
        let conn = self.pool.get()?;
        let rows = conn.execute(
            "UPDATE posts SET deleted = 1, updated_at = ?2 WHERE id = ?1 AND deleted = 0",
            params![post_id, now_timestamp()],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound(format!("post {post_id}")));
        }
        tracing::info!(post = post_id, "Post soft-deleted");
        Ok(())
    }

    async fn search_posts(&self, term: &str) -> Result<Vec<Post>, RepositoryError> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Err(RepositoryError::Invalid("Search term cannot be empty".into()));
        }

        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE deleted = 0
             ORDER BY created_at DESC, id DESC LIMIT ?1"
        ))?;
        let recent = stmt
            .query_map(params![self.search_window as i64], row_to_post)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(recent
            .into_iter()
            .filter(|post| {
                post.title.to_lowercase().contains(&needle)
                    || post.body.to_lowercase().contains(&needle)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn setup(page_size: usize) -> (DbPool, SqliteForumRepository) {
        let pool = db::test_pool();
        {
            let conn = pool.get().unwrap();
            for id in ["ada", "bob", "cy"] {
                conn.execute(
                    "INSERT INTO users (id, email, display_name, created_at) VALUES (?1, ?2, ?1, 'now')",
                    params![id, format!("{id}@example.com")],
                )
                .unwrap();
            }
        }
        let repo = SqliteForumRepository::new(pool.clone(), page_size, 20);
        (pool, repo)
    }

    fn author(id: &str) -> Author {
        Author {
            id: id.to_string(),
            name: id.to_string(),
            streak: 3,
        }
    }

    fn set_created_at(pool: &DbPool, post_id: &str, at: &str) {
        pool.get()
            .unwrap()
            .execute(
                "UPDATE posts SET created_at = ?2 WHERE id = ?1",
                params![post_id, at],
            )
            .unwrap();
    }

    fn stamp(n: usize) -> String {
        format!("2000-01-01T00:{:02}:{:02}.000000Z", n / 60, n % 60)
    }

    async fn seed(pool: &DbPool, repo: &SqliteForumRepository, count: usize) -> Vec<Post> {
        let mut posts = Vec::new();
        for n in 0..count {
            let post = repo
                .create_post(&author("ada"), &format!("Post {n}"), "body")
                .await
                .unwrap();
            set_created_at(pool, &post.id, &stamp(n));
            posts.push(post);
        }
        posts
    }

    async fn walk(repo: &SqliteForumRepository, sort: SortKey) -> Vec<Post> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = repo.list_posts(sort, cursor.as_deref()).await.unwrap();
            all.extend(page.items);
            if !page.has_more {
                assert!(page.next_cursor.is_none());
                return all;
            }
            cursor = page.next_cursor;
        }
    }

    #[tokio::test]
    async fn create_post_starts_with_zero_counters() {
        let (_pool, repo) = setup(10);
        let post = repo
            .create_post(&author("ada"), "  Hello  ", " First! ")
            .await
            .unwrap();
        assert_eq!(post.title, "Hello");
        assert_eq!(post.body, "First!");
        assert_eq!(post.vote_count, 0);
        assert_eq!(post.comment_count, 0);
        assert_eq!(post.author_streak, 3);
        assert!(!post.deleted);

        assert!(matches!(
            repo.create_post(&author("ada"), " ", "body").await,
            Err(RepositoryError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn new_sort_pages_are_exhaustive_and_disjoint() {
        let (pool, repo) = setup(10);
        seed(&pool, &repo, 23).await;

        let first = repo.list_posts(SortKey::New, None).await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert!(first.has_more);
        assert_eq!(first.items[0].title, "Post 22");

        let all = walk(&repo, SortKey::New).await;
        assert_eq!(all.len(), 23);
        let mut ids: Vec<_> = all.iter().map(|p| p.id.clone()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 23);
        assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn exact_multiple_of_page_size_has_no_phantom_page() {
        let (pool, repo) = setup(5);
        seed(&pool, &repo, 10).await;

        let first = repo.list_posts(SortKey::New, None).await.unwrap();
        assert!(first.has_more);
        let second = repo
            .list_posts(SortKey::New, first.next_cursor.as_deref())
            .await
            .unwrap();
        assert_eq!(second.items.len(), 5);
        assert!(!second.has_more);
        assert!(second.next_cursor.is_none());
    }

    #[tokio::test]
    async fn top_sort_orders_by_votes_then_recency() {
        let (pool, repo) = setup(3);
        let posts = seed(&pool, &repo, 7).await;
        for (index, voters) in [(1, 2), (3, 1), (5, 2), (6, 0)] {
            for voter in ["ada", "bob", "cy"].iter().take(voters) {
                repo.upvote(&posts[index].id, voter).await.unwrap();
            }
        }

        let all = walk(&repo, SortKey::Top).await;
        assert_eq!(all.len(), 7);
        assert!(all.windows(2).all(|w| {
            w[0].vote_count > w[1].vote_count
                || (w[0].vote_count == w[1].vote_count && w[0].created_at >= w[1].created_at)
        }));
        let titles: Vec<_> = all.iter().take(3).map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Post 5", "Post 1", "Post 3"]);
    }

    #[tokio::test]
    async fn equal_votes_put_the_later_post_first() {
        let (pool, repo) = setup(10);
        let posts = seed(&pool, &repo, 2).await;
        pool.get()
            .unwrap()
            .execute("UPDATE posts SET vote_count = 5", [])
            .unwrap();

        let page = repo.list_posts(SortKey::Top, None).await.unwrap();
        assert_eq!(page.items[0].id, posts[1].id);
        assert_eq!(page.items[1].id, posts[0].id);
    }

    #[tokio::test]
    async fn cursor_from_other_sort_is_rejected() {
        let (pool, repo) = setup(2);
        seed(&pool, &repo, 3).await;
        let page = repo.list_posts(SortKey::New, None).await.unwrap();
        let result = repo
            .list_posts(SortKey::Top, page.next_cursor.as_deref())
            .await;
        assert!(matches!(result, Err(RepositoryError::Invalid(_))));
        assert!(repo.list_posts(SortKey::New, Some("nothex")).await.is_err());
    }

    #[tokio::test]
    async fn upvote_then_remove_restores_count_and_flag() {
        let (_pool, repo) = setup(10);
        let post = repo.create_post(&author("ada"), "t", "b").await.unwrap();

        let voted = repo.upvote(&post.id, "bob").await.unwrap();
        assert_eq!(voted.vote_count, 1);
        let detail = repo.get_post(&post.id).await.unwrap();
        assert_eq!(detail.post.vote_count, 1);
        assert!(detail.has_voted("bob"));
        assert_eq!(detail.votes.get("bob"), Some(&true));

        let removed = repo.remove_upvote(&post.id, "bob").await.unwrap();
        assert_eq!(removed.vote_count, 0);
        assert!(!repo.user_vote(&post.id, "bob").await.unwrap());
        assert_eq!(repo.get_post(&post.id).await.unwrap().votes.get("bob"), Some(&false));
    }

    #[tokio::test]
    async fn repeated_votes_do_not_double_count() {
        let (_pool, repo) = setup(10);
        let post = repo.create_post(&author("ada"), "t", "b").await.unwrap();

        repo.upvote(&post.id, "bob").await.unwrap();
        let again = repo.upvote(&post.id, "bob").await.unwrap();
        assert_eq!(again.vote_count, 1);

        let removed = repo.remove_upvote(&post.id, "cy").await.unwrap();
        assert_eq!(removed.vote_count, 1);
    }

    #[tokio::test]
    async fn toggle_vote_reads_the_stored_flag() {
        let (_pool, repo) = setup(10);
        let post = repo.create_post(&author("ada"), "t", "b").await.unwrap();

        let (post_after, voted) = toggle_vote(&repo, &post.id, "bob").await.unwrap();
        assert!(voted);
        assert_eq!(post_after.vote_count, 1);
        let (post_after, voted) = toggle_vote(&repo, &post.id, "bob").await.unwrap();
        assert!(!voted);
        assert_eq!(post_after.vote_count, 0);
    }

    #[tokio::test]
    async fn comments_bump_count_and_keep_order() {
        let (_pool, repo) = setup(10);
        let post = repo.create_post(&author("ada"), "t", "b").await.unwrap();

        let first = repo.add_comment(&post.id, &author("bob"), "first").await.unwrap();
        let second = repo.add_comment(&post.id, &author("cy"), "second").await.unwrap();

        let detail = repo.get_post(&post.id).await.unwrap();
        assert_eq!(detail.post.comment_count, 2);
        let ids: Vec<_> = detail.comments.iter().map(|c| c.id.clone()).collect();
        assert_eq!(ids, vec![first.id, second.id]);

        assert!(matches!(
            repo.add_comment("missing", &author("bob"), "hi").await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.add_comment(&post.id, &author("bob"), "   ").await,
            Err(RepositoryError::Invalid(_))
        ));
        assert_eq!(repo.get_post(&post.id).await.unwrap().post.comment_count, 2);
    }

    #[tokio::test]
    async fn failed_comment_insert_leaves_count_untouched() {
        let (_pool, repo) = setup(10);
        let post = repo.create_post(&author("ada"), "t", "b").await.unwrap();

        // Unknown author violates the comments foreign key after the post check passes.
        let result = repo.add_comment(&post.id, &author("ghost"), "boo").await;
        assert!(matches!(result, Err(RepositoryError::Sql(_))));
        let detail = repo.get_post(&post.id).await.unwrap();
        assert_eq!(detail.post.comment_count, 0);
        assert!(detail.comments.is_empty());
    }

    #[tokio::test]
    async fn soft_deleted_posts_disappear_everywhere() {
        let (pool, repo) = setup(10);
        let posts = seed(&pool, &repo, 3).await;
        let gone = &posts[1];
        repo.add_comment(&gone.id, &author("bob"), "kept").await.unwrap();

        repo.delete_post(&gone.id).await.unwrap();

        let listed = walk(&repo, SortKey::New).await;
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|p| p.id != gone.id));
        assert!(repo.search_posts("post").await.unwrap().iter().all(|p| p.id != gone.id));
        assert!(matches!(
            repo.get_post(&gone.id).await,
            Err(RepositoryError::NotFound(_))
        ));
        assert!(matches!(
            repo.delete_post(&gone.id).await,
            Err(RepositoryError::NotFound(_))
        ));

        let conn = pool.get().unwrap();
        let (deleted, comments): (bool, i64) = conn
            .query_row(
                "SELECT p.deleted, (SELECT COUNT(*) FROM comments WHERE post_id = p.id)
                 FROM posts p WHERE p.id = ?1",
                params![gone.id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert!(deleted);
        assert_eq!(comments, 1);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_and_windowed() {
        let (pool, repo) = setup(10);
        let posts = seed(&pool, &repo, 25).await;
        repo.create_post(&author("bob"), "Deep WORK tips", "focus").await.unwrap();
        // Oldest post: outside the 20 most recent.
        pool.get()
            .unwrap()
            .execute(
                "UPDATE posts SET body = 'deep work forever' WHERE id = ?1",
                params![posts[0].id],
            )
            .unwrap();

        let hits = repo.search_posts("deep work").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Deep WORK tips");
        assert!(repo.search_posts("  ").await.is_err());
    }
}
