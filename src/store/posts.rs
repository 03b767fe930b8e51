//! Ordered post collection, newest first.
//!
//! Posts live in a `Vec` that is re-sorted after every insert. The sort is
//! stable, so posts sharing a timestamp keep their relative insertion order.
//! At personal-blog scale the full re-sort is cheap; an ordered index would
//! only pay off with thousands of posts.

use std::sync::Arc;

use parking_lot::RwLock;

/// An entry that can be kept in a [`PostCollection`].
pub trait Timestamped {
    /// Unique key.
    fn slug(&self) -> &str;

    /// Unix seconds used for ordering.
    fn published_at(&self) -> i64;
}

#[derive(Debug)]
pub struct PostCollection<P> {
    posts: RwLock<Vec<Arc<P>>>,
}

impl<P> Default for PostCollection<P> {
    fn default() -> Self {
        Self {
            posts: RwLock::new(Vec::new()),
        }
    }
}

impl<P: Timestamped> PostCollection<P> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from an initial batch, sorted.
    pub fn from_posts(posts: impl IntoIterator<Item = P>) -> Self {
        let mut posts: Vec<_> = posts.into_iter().map(Arc::new).collect();
        sort_newest_first(&mut posts);
        Self {
            posts: RwLock::new(posts),
        }
    }

    /// Replace the post with the same slug in place, or append, then re-sort.
    pub fn upsert_post(&self, post: P) {
        let post = Arc::new(post);
        let mut posts = self.posts.write();

        match posts.iter_mut().find(|p| p.slug() == post.slug()) {
            Some(existing) => *existing = post,
            None => posts.push(post),
        }
        sort_newest_first(&mut posts);
    }

    /// Remove the first post with `slug`. Absence is not an error.
    pub fn remove_post(&self, slug: &str) -> bool {
        let mut posts = self.posts.write();
        match posts.iter().position(|p| p.slug() == slug) {
            Some(index) => {
                posts.remove(index);
                true
            }
            None => false,
        }
    }

    /// Snapshot of every post, newest first.
    pub fn list(&self) -> Vec<Arc<P>> {
        self.posts.read().clone()
    }

    pub fn get(&self, slug: &str) -> Option<Arc<P>> {
        self.posts.read().iter().find(|p| p.slug() == slug).cloned()
    }

    #[cfg(test)]
    pub fn slugs(&self) -> Vec<String> {
        self.posts.read().iter().map(|p| p.slug().to_owned()).collect()
    }

    pub fn len(&self) -> usize {
        self.posts.read().len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.posts.read().is_empty()
    }
}

fn sort_newest_first<P: Timestamped>(posts: &mut [Arc<P>]) {
    // `sort_by_key` is stable
    posts.sort_by_key(|p| std::cmp::Reverse(p.published_at()));
}
