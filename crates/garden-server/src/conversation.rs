//! Command-driven chat front-end.
//!
//! Each message is handled against the session's [`ConversationState`]:
//! slash commands always start a fresh exchange, plain text answers the
//! pending question (an origin, a refinement, or a duplicate override).

use garden_core::{
    Author, Garden, GardenError, GardenOverview, GardenResult, Idea, IdeaId, PlantOptions,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const HELP: &str = "Idea Garden commands:\n\n\
/garden - View your garden\n\
/plant <title> - Capture a new idea\n\
/water <title> - Add a thought to an idea\n\
/harvest <title> - Finalize a mature idea\n\
/compost <title> - Discard an idea\n\
/cancel - Abandon the current question\n\
/help - This message";

/// What the chat is waiting for from the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConversationState {
    #[default]
    Idle,
    /// `/plant` was sent; the next message is the idea's origin.
    AwaitingOrigin { title: String },
    /// `/water` was sent; the next message is the new thought.
    AwaitingRefinement { idea_id: IdeaId, title: String },
    /// Capture was blocked by a near-duplicate; waiting for yes/no.
    AwaitingDuplicateResolution { title: String, origin: String },
}

/// Text to send back and the state to keep for the next message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub next: ConversationState,
}

impl Reply {
    fn idle(text: impl Into<String>) -> Self {
        Self::then(text, ConversationState::Idle)
    }

    fn then(text: impl Into<String>, next: ConversationState) -> Self {
        Self {
            text: text.into(),
            next,
        }
    }
}

/// Handle one chat message.
///
/// Rejections the user can act on (validation, missing ideas, lifecycle
/// state) become replies. Storage failures propagate.
pub fn respond(
    garden: &Garden,
    user_id: &str,
    state: ConversationState,
    input: &str,
) -> GardenResult<Reply> {
    let input = input.trim();
    debug!(user_id, ?state, "Handling chat message");

    let result = match input.strip_prefix('/') {
        Some(command) => run_command(garden, user_id, command),
        None => answer(garden, user_id, state, input),
    };

    match result {
        Err(
            err @ (GardenError::Validation { .. }
            | GardenError::NotFound { .. }
            | GardenError::InvalidState { .. }),
        ) => Ok(Reply::idle(err.to_string())),
        other => other,
    }
}

fn run_command(garden: &Garden, user_id: &str, command: &str) -> GardenResult<Reply> {
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (command, ""),
    };

    match name.to_lowercase().as_str() {
        "start" | "help" => Ok(Reply::idle(HELP)),
        "cancel" => Ok(Reply::idle("Cancelled.")),
        "garden" | "g" => {
            let overview = garden.overview(user_id)?;
            Ok(Reply::idle(render_overview(
                &overview,
                garden.config().lifecycle.maturity_threshold,
            )))
        }
        "plant" if arg.is_empty() => Ok(Reply::idle("Usage: /plant <title>")),
        "plant" => Ok(Reply::then(
            format!("What sparked \"{}\"?", arg),
            ConversationState::AwaitingOrigin {
                title: arg.to_string(),
            },
        )),
        "water" | "harvest" | "compost" if arg.is_empty() => {
            Ok(Reply::idle(format!("Usage: /{} <title>", name)))
        }
        "water" => with_active_idea(garden, user_id, arg, |idea| {
            Ok(Reply::then(
                format!("What's your new thought on \"{}\"?", idea.title),
                ConversationState::AwaitingRefinement {
                    idea_id: idea.id,
                    title: idea.title,
                },
            ))
        }),
        "harvest" => with_active_idea(garden, user_id, arg, |idea| {
            let outcome = garden.finalize_idea(user_id, idea.id, Author::Human)?;
            Ok(Reply::idle(with_unlocks(
                format!("Harvested: {}", outcome.idea.title),
                &outcome.unlocked,
            )))
        }),
        "compost" => with_active_idea(garden, user_id, arg, |idea| {
            let outcome = garden.discard_idea(user_id, idea.id, None, Author::Human)?;
            Ok(Reply::idle(format!("Composted: {}", outcome.idea.title)))
        }),
        _ => Ok(Reply::idle("Unknown command. Send /help for the list.")),
    }
}

fn answer(
    garden: &Garden,
    user_id: &str,
    state: ConversationState,
    input: &str,
) -> GardenResult<Reply> {
    match state {
        ConversationState::Idle => Ok(Reply::idle(
            "Send /plant <title> to capture an idea, or /help for all commands.",
        )),
        ConversationState::AwaitingOrigin { title } => {
            plant(garden, user_id, title, input.to_string(), false)
        }
        ConversationState::AwaitingRefinement { idea_id, title } => {
            let outcome = garden.refine_idea(user_id, idea_id, input, Author::Human)?;
            let threshold = garden.config().lifecycle.maturity_threshold;
            let mut text = format!(
                "Watered \"{}\" {}",
                title,
                progress_bar(outcome.idea.refinements, threshold)
            );
            if let Some(section) = outcome.new_section {
                text.push_str(&format!(
                    "\nIt grew into {}.",
                    section.to_string().to_lowercase()
                ));
            }
            Ok(Reply::idle(with_unlocks(text, &outcome.unlocked)))
        }
        ConversationState::AwaitingDuplicateResolution { title, origin } => {
            match input.to_lowercase().as_str() {
                "yes" | "y" => plant(garden, user_id, title, origin, true),
                "no" | "n" => Ok(Reply::idle("Okay, nothing planted.")),
                _ => Ok(Reply::then(
                    "Please answer yes or no.",
                    ConversationState::AwaitingDuplicateResolution { title, origin },
                )),
            }
        }
    }
}

fn plant(
    garden: &Garden,
    user_id: &str,
    title: String,
    origin: String,
    force: bool,
) -> GardenResult<Reply> {
    let options = PlantOptions {
        force,
        ..Default::default()
    };
    let outcome = garden.create_idea(user_id, &title, &origin, options)?;

    match outcome.idea {
        Some(idea) => Ok(Reply::idle(with_unlocks(
            format!("Planted: {}", idea.title),
            &outcome.unlocked,
        ))),
        None => {
            let closest = outcome
                .similar_matches
                .first()
                .map(|m| format!("{} ({:.0}% similar)", m.idea.title, m.score * 100.0))
                .unwrap_or_default();
            Ok(Reply::then(
                format!(
                    "A similar idea already exists: {}. Plant anyway? (yes/no)",
                    closest
                ),
                ConversationState::AwaitingDuplicateResolution { title, origin },
            ))
        }
    }
}

/// Resolve `identifier` to one of the user's active ideas.
fn with_active_idea<F>(garden: &Garden, user_id: &str, identifier: &str, f: F) -> GardenResult<Reply>
where
    F: FnOnce(Idea) -> GardenResult<Reply>,
{
    match garden.idea_detail(user_id, identifier)? {
        Some(detail) if detail.idea.is_active() => f(detail.idea),
        _ => Ok(Reply::idle(format!(
            "No active idea called \"{}\".",
            identifier
        ))),
    }
}

fn with_unlocks(mut text: String, unlocked: &[String]) -> String {
    for name in unlocked {
        text.push_str(&format!("\nAchievement unlocked: {}", name));
    }
    text
}

fn progress_bar(refinements: u32, threshold: u32) -> String {
    let filled = refinements.min(threshold) as usize;
    let empty = threshold.saturating_sub(refinements) as usize;
    format!("{}{}", "●".repeat(filled), "○".repeat(empty))
}

/// Plain-text garden view, ripest ideas first.
pub fn render_overview(overview: &GardenOverview, maturity_threshold: u32) -> String {
    let mut message = String::from("Your Garden\n\n");

    for (heading, ideas) in [
        ("Ready to Harvest", &overview.mature),
        ("Refining", &overview.refining),
        ("Captured", &overview.captured),
    ] {
        if ideas.is_empty() {
            continue;
        }
        message.push_str(&format!("{} ({})\n", heading, ideas.len()));
        for idea in ideas {
            message.push_str(&format!(
                "  • {} {}\n",
                idea.title,
                progress_bar(idea.refinements, maturity_threshold)
            ));
        }
        message.push('\n');
    }

    if overview.active().next().is_none() {
        message.push_str("Your garden is empty! Plant your first idea with:\n/plant My first idea");
    }

    message
}
