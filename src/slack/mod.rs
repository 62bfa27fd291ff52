//! Slack Web API access.
//!
//! `Directory` is the seam between the sweep and Slack: the real
//! `SlackClient` talks HTTP, tests swap in an in-memory directory.
//! Listings are cursor-paginated; the helpers here turn them into streams.

pub mod client;
#[cfg(test)]
pub mod mock;
pub mod types;

pub use client::SlackClient;
pub use types::{Channel, DirectoryUser, MessageMatch, Page, Profile};

use std::future::Future;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};

use crate::error::SlackError;

/// Result type for Slack operations.
pub type SlackResult<T> = Result<T, SlackError>;

/// The directory and membership operations the sweep needs.
#[async_trait]
pub trait Directory: Send + Sync {
    /// One page of workspace members (`users.list`).
    async fn list_users(
        &self,
        cursor: Option<&str>,
        limit: u32,
    ) -> SlackResult<Page<DirectoryUser>>;

    /// One page of member ids of a channel (`conversations.members`).
    async fn channel_members(
        &self,
        channel: &str,
        cursor: Option<&str>,
    ) -> SlackResult<Page<String>>;

    /// One page of public, non-archived channels a user belongs to
    /// (`users.conversations`).
    async fn user_channels(&self, user: &str, cursor: Option<&str>) -> SlackResult<Page<Channel>>;

    /// Add a user to a channel (`conversations.invite`).
    async fn invite(&self, channel: &str, user: &str) -> SlackResult<()>;

    /// Remove a user from a channel (`conversations.kick`).
    async fn kick(&self, channel: &str, user: &str) -> SlackResult<()>;

    /// Most recent message authored by `user_name`, if any (`search.messages`).
    async fn latest_message_by(&self, user_name: &str) -> SlackResult<Option<MessageMatch>>;
}

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Turn a page fetcher into a stream of page contents, following
/// `next_cursor` until Slack stops returning one.
pub fn paginate<'a, T, F, Fut>(fetch: F) -> BoxStream<'a, SlackResult<Vec<T>>>
where
    T: Send + 'a,
    F: FnMut(Option<String>) -> Fut + Send + 'a,
    Fut: Future<Output = SlackResult<Page<T>>> + Send + 'a,
{
    stream::try_unfold((fetch, Cursor::Start), |(mut fetch, cursor)| async move {
        let cursor = match cursor {
            Cursor::Start => None,
            Cursor::Next(c) => Some(c),
            Cursor::Done => return Ok(None),
        };
        let page = fetch(cursor).await?;
        let next = match (page.has_more(), page.next_cursor) {
            (true, Some(c)) => Cursor::Next(c),
            _ => Cursor::Done,
        };
        Ok(Some((page.items, (fetch, next))))
    })
    .boxed()
}

/// Stream the whole member directory, one page at a time.
pub fn users(
    directory: &dyn Directory,
    limit: u32,
) -> BoxStream<'_, SlackResult<Vec<DirectoryUser>>> {
    paginate(move |cursor: Option<String>| async move {
        directory.list_users(cursor.as_deref(), limit).await
    })
}

/// Every member id of `channel`.
pub async fn all_channel_members(
    directory: &dyn Directory,
    channel: &str,
) -> SlackResult<Vec<String>> {
    paginate(move |cursor: Option<String>| async move {
        directory.channel_members(channel, cursor.as_deref()).await
    })
    .try_concat()
    .await
}

/// Every public, non-archived channel `user` belongs to.
pub async fn all_user_channels(
    directory: &dyn Directory,
    user: &str,
) -> SlackResult<Vec<Channel>> {
    paginate(move |cursor: Option<String>| async move {
        directory.user_channels(user, cursor.as_deref()).await
    })
    .try_concat()
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[tokio::test]
    async fn paginate_follows_cursors_until_empty() {
        let requested = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&requested);
        let pages: Vec<Vec<u32>> = paginate(move |cursor: Option<String>| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push(cursor.clone());
                let page = match cursor.as_deref() {
                    None => Page {
                        items: vec![1, 2],
                        next_cursor: Some("b".into()),
                    },
                    Some("b") => Page {
                        items: vec![3],
                        next_cursor: Some("c".into()),
                    },
                    _ => Page {
                        items: vec![4],
                        next_cursor: Some(String::new()),
                    },
                };
                Ok(page)
            }
        })
        .try_collect()
        .await
        .unwrap();

        assert_eq!(pages, vec![vec![1, 2], vec![3], vec![4]]);
        assert_eq!(
            *requested.lock().unwrap(),
            vec![None, Some("b".to_string()), Some("c".to_string())]
        );
    }

    #[tokio::test]
    async fn paginate_stops_on_error() {
        let mut stream = paginate(|cursor: Option<String>| async move {
            match cursor {
                None => Ok(Page {
                    items: vec!["a"],
                    next_cursor: Some("next".into()),
                }),
                Some(_) => Err(SlackError::Http {
                    method: "users.list".into(),
                    reason: "boom".into(),
                }),
            }
        });

        assert_eq!(stream.try_next().await.unwrap(), Some(vec!["a"]));
        assert!(stream.try_next().await.is_err());
    }

    #[tokio::test]
    async fn paginate_single_page() {
        let items: Vec<&str> = paginate(|_cursor: Option<String>| async {
            Ok(Page::last(vec!["only"]))
        })
        .try_concat()
        .await
        .unwrap();
        assert_eq!(items, vec!["only"]);
    }
}
