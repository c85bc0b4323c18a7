// src/poll.rs
use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::PollError;
use crate::models::{Poll, PollOption, PollResults, User, MAX_VOTES};

/// Builds a new poll from form input. Blank option texts are discarded and
/// the rest get sequential ids starting at "0".
pub fn build_poll(
    owner: Option<&User>,
    title: &str,
    description: &str,
    option_texts: &[String],
) -> Result<Poll, PollError> {
    let owner = owner.ok_or(PollError::AuthRequired)?;
    if title.trim().is_empty() {
        return Err(PollError::invalid("title", "Title is required"));
    }

    let options: Vec<PollOption> = option_texts
        .iter()
        .filter(|text| !text.trim().is_empty())
        .enumerate()
        .map(|(i, text)| PollOption::new(i.to_string(), text.as_str()))
        .collect();
    if options.len() < 2 {
        return Err(PollError::invalid(
            "options",
            "Please enter a title and at least two options.",
        ));
    }

    Ok(Poll {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        description: description.to_string(),
        options,
        owner_id: Some(owner.id.clone()),
        created_at: Utc::now(),
    })
}

/// Checks an edit against the stored poll and returns the poll that should
/// replace it. Title, description and options come from `updated`; id,
/// owner and creation time stay as stored.
pub fn apply_update(
    stored: &Poll,
    editor: Option<&User>,
    updated: Poll,
) -> Result<Poll, PollError> {
    let editor = editor.ok_or(PollError::AuthRequired)?;
    if !stored.is_owned_by(editor) {
        return Err(PollError::Forbidden);
    }
    if updated.title.trim().is_empty() {
        return Err(PollError::invalid("title", "Title is required"));
    }

    let options = settle_pending(updated.options);
    let mut seen = HashSet::new();
    for (idx, opt) in options.iter().enumerate() {
        if !seen.insert(opt.id.as_str()) {
            return Err(PollError::invalid(
                "options",
                format!("duplicate option id: {}", opt.id),
            ));
        }
        if opt.votes > MAX_VOTES {
            return Err(PollError::invalid(
                &format!("options[{idx}]"),
                format!("Vote count must be at most {MAX_VOTES}"),
            ));
        }
    }

    Ok(Poll {
        id: stored.id.clone(),
        title: updated.title,
        description: updated.description,
        options,
        owner_id: stored.owner_id.clone(),
        created_at: stored.created_at,
    })
}

/// Gives options added during an edit a real id and a zero tally.
fn settle_pending(mut options: Vec<PollOption>) -> Vec<PollOption> {
    let mut taken: HashSet<String> = options
        .iter()
        .filter(|opt| !opt.is_pending())
        .map(|opt| opt.id.clone())
        .collect();
    let mut next = 0usize;

    for opt in options.iter_mut().filter(|opt| opt.is_pending()) {
        while taken.contains(&next.to_string()) {
            next += 1;
        }
        opt.id = next.to_string();
        opt.votes = 0;
        taken.insert(opt.id.clone());
    }
    options
}

/// In-memory owner of all poll data, kept in insertion order.
#[derive(Debug, Default)]
pub struct PollStore {
    polls: Vec<Poll>,
}

impl PollStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_polls(polls: Vec<Poll>) -> Self {
        Self { polls }
    }

    /// Store preloaded with the demo polls.
    pub fn seeded() -> Self {
        Self::with_polls(demo_polls())
    }

    pub fn list_polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn get_poll(&self, id: &str) -> Result<&Poll, PollError> {
        self.polls
            .iter()
            .find(|poll| poll.id == id)
            .ok_or_else(|| PollError::poll_not_found(id))
    }

    fn get_poll_mut(&mut self, id: &str) -> Result<&mut Poll, PollError> {
        self.polls
            .iter_mut()
            .find(|poll| poll.id == id)
            .ok_or_else(|| PollError::poll_not_found(id))
    }

    pub fn create_poll(
        &mut self,
        owner: Option<&User>,
        title: &str,
        description: &str,
        option_texts: &[String],
    ) -> Result<&Poll, PollError> {
        let poll = build_poll(owner, title, description, option_texts)?;
        info!(poll_id = %poll.id, options = poll.options.len(), "poll created");
        self.polls.push(poll);
        Ok(&self.polls[self.polls.len() - 1])
    }

    /// Adds one vote. Repeat calls keep counting; nothing limits a caller to
    /// a single vote.
    pub fn vote(&mut self, poll_id: &str, option_id: &str) -> Result<&Poll, PollError> {
        let poll = self.get_poll_mut(poll_id)?;
        let option = poll
            .option_mut(option_id)
            .ok_or_else(|| PollError::option_not_found(option_id))?;
        option.votes = option
            .votes
            .checked_add(1)
            .filter(|votes| *votes <= MAX_VOTES)
            .ok_or_else(PollError::vote_limit_reached)?;
        debug!(poll_id, option_id, votes = option.votes, "vote recorded");
        Ok(poll)
    }

    pub fn update_poll(&mut self, editor: Option<&User>, updated: Poll) -> Result<&Poll, PollError> {
        let stored = self.get_poll_mut(&updated.id)?;
        let replacement = apply_update(stored, editor, updated)?;
        *stored = replacement;
        info!(poll_id = %stored.id, "poll updated");
        Ok(stored)
    }

    pub fn results(&self, poll_id: &str) -> Result<PollResults, PollError> {
        Ok(self.get_poll(poll_id)?.results())
    }
}

pub fn demo_polls() -> Vec<Poll> {
    let poll = |id: &str, title: &str, description: &str, options: [(&str, &str, u64); 3]| Poll {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        options: options
            .iter()
            .map(|(id, text, votes)| PollOption {
                id: id.to_string(),
                text: text.to_string(),
                votes: *votes,
            })
            .collect(),
        owner_id: None,
        created_at: Utc::now(),
    };

    vec![
        poll(
            "1",
            "Favorite Programming Language?",
            "Vote for your favorite language!",
            [("a", "JavaScript", 2), ("b", "Python", 3), ("c", "TypeScript", 1)],
        ),
        poll(
            "2",
            "Best Frontend Framework?",
            "Choose the best!",
            [("a", "React", 4), ("b", "Vue", 2), ("c", "Angular", 1)],
        ),
    ]
}
