use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;

use crate::db::models::Post;
use crate::forum::repository::{toggle_vote, ForumRepository, RepositoryError};
use crate::forum::{Author, PostDetail, SortKey};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("You must be signed in")]
    Unauthenticated,

    #[error("Only the author can do that")]
    Forbidden,

    #[error("No post is open")]
    NoOpenPost,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// The detail view, with the viewer's vote as stored on the server.
#[derive(Debug, Clone)]
pub struct OpenPost {
    pub detail: PostDetail,
    pub voted: bool,
}

impl OpenPost {
    /// Take the viewer's vote flag from the server's vote map.
    pub fn hydrate(detail: PostDetail, viewer_id: Option<&str>) -> Self {
        let voted = viewer_id.map(|id| detail.has_voted(id)).unwrap_or(false);
        Self { detail, voted }
    }

    pub fn can_delete(&self, viewer_id: Option<&str>) -> bool {
        viewer_id == Some(self.detail.post.author_id.as_str())
    }
}

/// One viewer's feed: sort tab, pagination, rendered posts and the open post.
///
/// Actions take `&mut self`, so a second "load more" or vote cannot start
/// while one is in flight.
pub struct FeedController<R: ForumRepository + ?Sized> {
    repo: Arc<R>,
    viewer: Option<Author>,
    sort: SortKey,
    cursor: Option<String>,
    has_more: bool,
    posts: Vec<Post>,
    seen: HashSet<String>,
    open: Option<OpenPost>,
}

impl<R: ForumRepository + ?Sized> FeedController<R> {
    pub fn new(repo: Arc<R>, viewer: Option<Author>) -> Self {
        Self {
            repo,
            viewer,
            sort: SortKey::New,
            cursor: None,
            has_more: false,
            posts: Vec::new(),
            seen: HashSet::new(),
            open: None,
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn open_post(&self) -> Option<&OpenPost> {
        self.open.as_ref()
    }

    pub fn viewer(&self) -> Option<&Author> {
        self.viewer.as_ref()
    }

    /// Sign-in state changed: reload the feed and re-read the open post's vote.
    pub async fn session_changed(&mut self, viewer: Option<Author>) -> Result<(), FeedError> {
        self.viewer = viewer;
        self.load_feed().await?;
        if let Some(id) = self.open.as_ref().map(|open| open.detail.post.id.clone()) {
            self.open_post_by_id(&id).await?;
        }
        Ok(())
    }

    /// First page for the current sort; replaces whatever was rendered.
    pub async fn load_feed(&mut self) -> Result<(), FeedError> {
        let page = self.repo.list_posts(self.sort, None).await?;
        self.seen = page.items.iter().map(|p| p.id.clone()).collect();
        self.posts = page.items;
        self.cursor = page.next_cursor;
        self.has_more = page.has_more;
        Ok(())
    }

    pub async fn switch_sort(&mut self, sort: SortKey) -> Result<(), FeedError> {
        self.sort = sort;
        self.cursor = None;
        self.load_feed().await
    }

    /// Appends the next page, skipping posts already shown. Returns how many were added.
    pub async fn load_more(&mut self) -> Result<usize, FeedError> {
        if !self.has_more {
            return Ok(0);
        }
        let page = self
            .repo
            .list_posts(self.sort, self.cursor.as_deref())
            .await?;

        let before = self.posts.len();
        for post in page.items {
            if self.seen.insert(post.id.clone()) {
                self.posts.push(post);
            }
        }
        self.cursor = page.next_cursor;
        self.has_more = page.has_more;
        Ok(self.posts.len() - before)
    }

    pub async fn open_post_by_id(&mut self, post_id: &str) -> Result<&OpenPost, FeedError> {
        let detail = self.repo.get_post(post_id).await?;
        self.sync_card(&detail.post);
        let viewer_id = self.viewer.as_ref().map(|v| v.id.as_str());
        let hydrated = OpenPost::hydrate(detail, viewer_id);
        let open = self.open.insert(hydrated);
        Ok(&*open)
    }

    pub fn close_post(&mut self) {
        self.open = None;
    }

    /// Flip the viewer's upvote on the open post. Returns the new vote state.
    pub async fn toggle_vote(&mut self) -> Result<bool, FeedError> {
        let viewer_id = self.require_viewer()?.id.clone();
        let post_id = self.open_id()?;

        let (post, voted) = toggle_vote(self.repo.as_ref(), &post_id, &viewer_id).await?;
        self.sync_card(&post);
        if let Some(open) = self.open.as_mut() {
            open.detail.post = post;
            open.detail.votes.insert(viewer_id, voted);
            open.voted = voted;
        }
        Ok(voted)
    }

    pub async fn submit_comment(&mut self, body: &str) -> Result<(), FeedError> {
        let author = self.require_viewer()?.clone();
        let post_id = self.open_id()?;

        self.repo.add_comment(&post_id, &author, body).await?;
        self.open_post_by_id(&post_id).await?;
        Ok(())
    }

    pub async fn submit_post(&mut self, title: &str, body: &str) -> Result<Post, FeedError> {
        let author = self.require_viewer()?.clone();
        let post = self.repo.create_post(&author, title, body).await?;
        self.load_feed().await?;
        Ok(post)
    }

    /// Soft-delete the open post. Only its author may.
    pub async fn delete_open_post(&mut self) -> Result<(), FeedError> {
        let viewer_id = self.require_viewer()?.id.clone();
        let open = self.open.as_ref().ok_or(FeedError::NoOpenPost)?;
        if !open.can_delete(Some(viewer_id.as_str())) {
            return Err(FeedError::Forbidden);
        }
        let post_id = open.detail.post.id.clone();

        self.repo.delete_post(&post_id).await?;
        self.open = None;
        self.posts.retain(|p| p.id != post_id);
        Ok(())
    }

    fn require_viewer(&self) -> Result<&Author, FeedError> {
        self.viewer.as_ref().ok_or(FeedError::Unauthenticated)
    }

    fn open_id(&self) -> Result<String, FeedError> {
        self.open
            .as_ref()
            .map(|open| open.detail.post.id.clone())
            .ok_or(FeedError::NoOpenPost)
    }

    /// Keep the rendered card in step with fresher server data.
    fn sync_card(&mut self, fresh: &Post) {
        if let Some(card) = self.posts.iter_mut().find(|p| p.id == fresh.id) {
            *card = fresh.clone();
        }
    }
}
