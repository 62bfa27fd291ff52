//! In-memory directory for exercising the sweep without a network.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{Channel, Directory, DirectoryUser, MessageMatch, Page, SlackResult};
use crate::error::SlackError;

/// A mutating call the sweep made against the directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Invite { channel: String, user: String },
    Kick { channel: String, user: String },
}

#[derive(Debug, Clone)]
struct MockChannel {
    name: String,
    archived: bool,
    members: Vec<String>,
}

#[derive(Default)]
struct MockState {
    users: Vec<DirectoryUser>,
    channels: BTreeMap<String, MockChannel>,
    messages: HashMap<String, MessageMatch>,
    failing_invites: HashSet<String>,
    failing_kicks: HashSet<(String, String)>,
    search_error: Option<String>,
    mutations: Vec<Mutation>,
    searches: Vec<String>,
    user_pages_served: usize,
}

/// Mock Slack directory. Pages every listing by `page_size`.
#[derive(Clone)]
pub struct MockDirectory {
    state: Arc<Mutex<MockState>>,
    page_size: usize,
}

impl MockDirectory {
    pub fn new(page_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            page_size: page_size.max(1),
        }
    }

    pub fn add_user(&self, user: DirectoryUser) {
        self.state.lock().unwrap().users.push(user);
    }

    pub fn add_channel(&self, id: &str, name: &str, members: &[&str]) {
        self.state.lock().unwrap().channels.insert(
            id.to_string(),
            MockChannel {
                name: name.to_string(),
                archived: false,
                members: members.iter().map(|m| m.to_string()).collect(),
            },
        );
    }

    pub fn archive_channel(&self, id: &str) {
        if let Some(channel) = self.state.lock().unwrap().channels.get_mut(id) {
            channel.archived = true;
        }
    }

    pub fn add_message(&self, user_name: &str, text: &str, ts: &str) {
        self.state.lock().unwrap().messages.insert(
            user_name.to_string(),
            MessageMatch {
                username: user_name.to_string(),
                text: text.to_string(),
                ts: ts.to_string(),
            },
        );
    }

    pub fn fail_invite(&self, user: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_invites
            .insert(user.to_string());
    }

    pub fn fail_kick(&self, channel: &str, user: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_kicks
            .insert((channel.to_string(), user.to_string()));
    }

    pub fn fail_search(&self, error: &str) {
        self.state.lock().unwrap().search_error = Some(error.to_string());
    }

    pub fn mutations(&self) -> Vec<Mutation> {
        self.state.lock().unwrap().mutations.clone()
    }

    pub fn invited(&self) -> Vec<String> {
        self.mutations()
            .into_iter()
            .filter_map(|m| match m {
                Mutation::Invite { user, .. } => Some(user),
                Mutation::Kick { .. } => None,
            })
            .collect()
    }

    pub fn searches(&self) -> Vec<String> {
        self.state.lock().unwrap().searches.clone()
    }

    pub fn user_pages_served(&self) -> usize {
        self.state.lock().unwrap().user_pages_served
    }

    pub fn members_of(&self, channel: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .channels
            .get(channel)
            .map(|c| c.members.clone())
            .unwrap_or_default()
    }

    fn page<T: Clone>(&self, items: &[T], cursor: Option<&str>) -> Page<T> {
        let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(items.len());
        let next_cursor = (end < items.len()).then(|| end.to_string());
        Page {
            items: items.get(start..end).map(<[T]>::to_vec).unwrap_or_default(),
            next_cursor,
        }
    }
}

fn platform(method: &str, error: &str) -> SlackError {
    SlackError::Platform {
        method: method.into(),
        error: error.into(),
        response: serde_json::json!({ "ok": false, "error": error }),
    }
}

#[async_trait]
impl Directory for MockDirectory {
    async fn list_users(
        &self,
        cursor: Option<&str>,
        _limit: u32,
    ) -> SlackResult<Page<DirectoryUser>> {
        let users = {
            let mut state = self.state.lock().unwrap();
            state.user_pages_served += 1;
            state.users.clone()
        };
        Ok(self.page(&users, cursor))
    }

    async fn channel_members(
        &self,
        channel: &str,
        cursor: Option<&str>,
    ) -> SlackResult<Page<String>> {
        let members = self
            .state
            .lock()
            .unwrap()
            .channels
            .get(channel)
            .map(|c| c.members.clone())
            .ok_or_else(|| platform("conversations.members", "channel_not_found"))?;
        Ok(self.page(&members, cursor))
    }

    async fn user_channels(&self, user: &str, cursor: Option<&str>) -> SlackResult<Page<Channel>> {
        let channels: Vec<Channel> = self
            .state
            .lock()
            .unwrap()
            .channels
            .iter()
            .filter(|(_, c)| !c.archived && c.members.iter().any(|m| m == user))
            .map(|(id, c)| Channel::new(id.clone(), c.name.clone()))
            .collect();
        Ok(self.page(&channels, cursor))
    }

    async fn invite(&self, channel: &str, user: &str) -> SlackResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_invites.contains(user) {
            return Err(platform("conversations.invite", "user_is_restricted"));
        }
        let Some(target) = state.channels.get_mut(channel) else {
            return Err(platform("conversations.invite", "channel_not_found"));
        };
        if target.members.iter().any(|m| m == user) {
            return Err(platform("conversations.invite", "already_in_channel"));
        }
        target.members.push(user.to_string());
        state.mutations.push(Mutation::Invite {
            channel: channel.to_string(),
            user: user.to_string(),
        });
        Ok(())
    }

    async fn kick(&self, channel: &str, user: &str) -> SlackResult<()> {
        let mut state = self.state.lock().unwrap();
        if state
            .failing_kicks
            .contains(&(channel.to_string(), user.to_string()))
        {
            return Err(platform("conversations.kick", "restricted_action"));
        }
        let Some(target) = state.channels.get_mut(channel) else {
            return Err(platform("conversations.kick", "channel_not_found"));
        };
        target.members.retain(|m| m != user);
        state.mutations.push(Mutation::Kick {
            channel: channel.to_string(),
            user: user.to_string(),
        });
        Ok(())
    }

    async fn latest_message_by(&self, user_name: &str) -> SlackResult<Option<MessageMatch>> {
        let mut state = self.state.lock().unwrap();
        state.searches.push(user_name.to_string());
        if let Some(error) = state.search_error.clone() {
            return Err(platform("search.messages", &error));
        }
        Ok(state.messages.get(user_name).cloned())
    }
}
