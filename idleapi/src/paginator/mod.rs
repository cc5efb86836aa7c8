//! Reaction-driven pagination of pre-rendered pages.
//!
//! A [`PaginationSession`] is a small state machine: the viewer's reactions move
//! it between pages or close it, and an idle deadline expires it. [`paginate`]
//! drives one session over a [`DiscordConnector`].

use crate::config::InteractionConfig;
use crate::connectors::discord::{DiscordConnector, Error, MessageId, ReactionEvent};
use futures::StreamExt;
use log::debug;
use std::time::Duration;
use tokio::time::{Instant, timeout_at};

pub mod prompt;

pub use prompt::{Choice, confirm, dismissable};

pub const BLURPLE: u32 = 0x5865F2;
pub const GREEN: u32 = 0x00FF00;
pub const RED: u32 = 0xFF0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// One embed-sized unit of a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub description: Option<String>,
    pub fields: Vec<PageField>,
    pub color: Option<u32>,
    pub footer: Option<String>,
}

impl Page {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(PageField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }
}

/// Reactions a viewer can use on a multi-page message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    First,
    Previous,
    Next,
    Last,
    Close,
}

impl Control {
    pub const ALL: [Control; 5] = [
        Control::First,
        Control::Previous,
        Control::Next,
        Control::Last,
        Control::Close,
    ];

    pub fn emoji(&self) -> &'static str {
        match self {
            Control::First => "⏮",
            Control::Previous => "◀",
            Control::Next => "▶",
            Control::Last => "⏭",
            Control::Close => "🗑",
        }
    }

    pub fn from_emoji(emoji: &str) -> Option<Control> {
        let emoji = bare_emoji(emoji);
        Control::ALL.into_iter().find(|c| c.emoji() == emoji)
    }
}

/// Drops the variation selector some clients append to an emoji.
pub(crate) fn bare_emoji(emoji: &str) -> &str {
    emoji.trim_end_matches('\u{fe0f}')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Not from the viewer, not on this message, or not a control.
    Ignored,
    /// A valid control that left the index where it was.
    Stay,
    Moved(usize),
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Active(usize),
    Closed,
}

#[derive(Debug, Clone)]
pub struct PaginationSession {
    pages: Vec<Page>,
    state: State,
    message_id: MessageId,
    viewer: u64,
    idle: Duration,
    deadline: Instant,
}

impl PaginationSession {
    /// `None` when there is nothing to show.
    pub fn new(pages: Vec<Page>, message_id: MessageId, viewer: u64, idle: Duration) -> Option<Self> {
        if pages.is_empty() {
            return None;
        }
        Some(Self {
            pages,
            state: State::Active(0),
            message_id,
            viewer,
            idle,
            deadline: Instant::now() + idle,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn index(&self) -> usize {
        match self.state {
            State::Active(index) => index,
            State::Closed => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_interactive(&self) -> bool {
        self.pages.len() > 1
    }

    pub fn message_id(&self) -> MessageId {
        self.message_id
    }

    pub fn bind(&mut self, message_id: MessageId) {
        self.message_id = message_id;
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// The current page, with a "Page i/n" footer when there is more than one.
    pub fn render(&self) -> Page {
        render_page(&self.pages, self.index())
    }

    pub fn handle(&mut self, input: &ReactionEvent, now: Instant) -> Transition {
        let State::Active(index) = self.state else {
            return Transition::Ignored;
        };
        if !self.is_interactive() || input.message_id != self.message_id || input.user_id != self.viewer
        {
            return Transition::Ignored;
        }
        let Some(control) = Control::from_emoji(&input.emoji) else {
            return Transition::Ignored;
        };
        self.deadline = now + self.idle;

        let last = self.pages.len() - 1;
        let target = match control {
            Control::Close => {
                self.state = State::Closed;
                return Transition::Closed;
            }
            Control::First => 0,
            Control::Previous => index.saturating_sub(1),
            Control::Next => (index + 1).min(last),
            Control::Last => last,
        };
        if target == index {
            return Transition::Stay;
        }
        self.state = State::Active(target);
        Transition::Moved(target)
    }

    pub fn expire(&mut self) {
        self.state = State::Closed;
    }
}

fn render_page(pages: &[Page], index: usize) -> Page {
    let mut page = pages[index].clone();
    if pages.len() > 1 {
        let marker = format!("Page {}/{}", index + 1, pages.len());
        page.footer = Some(match page.footer {
            Some(footer) => format!("{footer} • {marker}"),
            None => marker,
        });
    }
    page
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub navigation: Duration,
    pub confirmation: Duration,
    pub dismissal: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from(&InteractionConfig::default())
    }
}

impl From<&InteractionConfig> for Timeouts {
    fn from(config: &InteractionConfig) -> Self {
        Self {
            navigation: Duration::from_secs(config.navigation_timeout_secs),
            confirmation: Duration::from_secs(config.confirmation_timeout_secs),
            dismissal: Duration::from_secs(config.dismissal_timeout_secs),
        }
    }
}

/// Shows `pages` in one message that `viewer` can page through until they
/// close it or stay idle for `idle`.
pub async fn paginate<C: DiscordConnector + ?Sized>(
    connector: &C,
    pages: Vec<Page>,
    viewer: u64,
    idle: Duration,
) -> Result<(), Error> {
    let Some(mut session) = PaginationSession::new(pages, 0, viewer, idle) else {
        return Ok(());
    };
    let message_id = connector.send_page(&session.render(), None).await?;
    session.bind(message_id);
    if !session.is_interactive() {
        return Ok(());
    }

    let mut reactions = connector.watch_reactions(message_id);
    for control in Control::ALL {
        connector.add_reaction(message_id, control.emoji()).await?;
    }

    loop {
        let event = match timeout_at(session.deadline(), reactions.next()).await {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(_) => {
                debug!("Pagination of message {} timed out", message_id);
                break;
            }
        };
        match session.handle(&event, Instant::now()) {
            Transition::Ignored => {}
            Transition::Stay => unreact(connector, &event).await,
            Transition::Moved(index) => {
                debug!("Message {} moved to page {}", message_id, index + 1);
                if let Err(e) = connector.edit_page(message_id, &session.render()).await {
                    debug!("Could not edit message {}, ending pagination: {}", message_id, e);
                    session.expire();
                    return Ok(());
                }
                unreact(connector, &event).await;
            }
            Transition::Closed => {
                if let Err(e) = connector.delete_message(message_id).await {
                    debug!("Could not delete closed message {}: {}", message_id, e);
                }
                return Ok(());
            }
        }
    }

    session.expire();
    release_controls(connector, message_id, &Control::ALL.map(|c| c.emoji())).await;
    Ok(())
}

// Lets the viewer press the same control again.
async fn unreact<C: DiscordConnector + ?Sized>(connector: &C, event: &ReactionEvent) {
    if let Err(e) = connector
        .remove_reaction(event.message_id, event.user_id, &event.emoji)
        .await
    {
        debug!("Could not remove reaction from {}: {}", event.message_id, e);
    }
}

/// Best-effort removal of every control, falling back to the bot's own reactions.
pub(crate) async fn release_controls<C: DiscordConnector + ?Sized>(
    connector: &C,
    message_id: MessageId,
    emojis: &[&str],
) {
    if connector.clear_reactions(message_id).await.is_ok() {
        return;
    }
    for emoji in emojis {
        if let Err(e) = connector.remove_own_reaction(message_id, emoji).await {
            debug!("Could not remove {} from {}: {}", emoji, message_id, e);
            return;
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Call, FakeConnector};
    use super::*;

    const VIEWER: u64 = 42;
    const IDLE: Duration = Duration::from_secs(60);

    fn pages(n: usize) -> Vec<Page> {
        (1..=n).map(|i| Page::new(format!("page {i}"))).collect()
    }

    fn input(user_id: u64, control: Control) -> ReactionEvent {
        ReactionEvent {
            message_id: 7,
            user_id,
            emoji: control.emoji().to_string(),
        }
    }

    fn session(n: usize) -> PaginationSession {
        PaginationSession::new(pages(n), 7, VIEWER, IDLE).unwrap()
    }

    mod session_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn next_walks_to_the_end_and_stays() {
            // Arrange
            let mut session = session(4);
            let now = Instant::now();

            // Act
            let moves: Vec<Transition> = (0..3)
                .map(|_| session.handle(&input(VIEWER, Control::Next), now))
                .collect();
            let extra = session.handle(&input(VIEWER, Control::Next), now);

            // Assert
            assert_eq!(
                moves,
                vec![
                    Transition::Moved(1),
                    Transition::Moved(2),
                    Transition::Moved(3)
                ]
            );
            assert_eq!(extra, Transition::Stay);
            assert_eq!(session.index(), 3);
        }

        #[tokio::test(start_paused = true)]
        async fn previous_walks_to_the_start_and_stays() {
            // Arrange
            let mut session = session(4);
            let now = Instant::now();
            session.handle(&input(VIEWER, Control::Last), now);

            // Act
            for expected in [2, 1, 0] {
                assert_eq!(
                    session.handle(&input(VIEWER, Control::Previous), now),
                    Transition::Moved(expected)
                );
            }
            let extra = session.handle(&input(VIEWER, Control::Previous), now);

            // Assert
            assert_eq!(extra, Transition::Stay);
            assert_eq!(session.index(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn first_and_last_jump_to_the_ends() {
            let mut session = session(5);
            let now = Instant::now();
            assert_eq!(
                session.handle(&input(VIEWER, Control::Last), now),
                Transition::Moved(4)
            );
            assert_eq!(
                session.handle(&input(VIEWER, Control::First), now),
                Transition::Moved(0)
            );
            assert_eq!(
                session.handle(&input(VIEWER, Control::First), now),
                Transition::Stay
            );
        }

        #[tokio::test(start_paused = true)]
        async fn other_users_never_move_the_index_or_the_deadline() {
            // Arrange
            let mut session = session(3);
            let deadline = session.deadline();
            let later = Instant::now() + Duration::from_secs(30);

            // Act
            let results: Vec<Transition> = Control::ALL
                .into_iter()
                .map(|control| session.handle(&input(99, control), later))
                .collect();

            // Assert
            assert!(results.iter().all(|t| *t == Transition::Ignored));
            assert_eq!(session.index(), 0);
            assert_eq!(session.state(), State::Active(0));
            assert_eq!(session.deadline(), deadline);
        }

        #[tokio::test(start_paused = true)]
        async fn reactions_on_other_messages_are_ignored() {
            let mut session = session(3);
            let event = ReactionEvent {
                message_id: 8,
                user_id: VIEWER,
                emoji: Control::Next.emoji().to_string(),
            };
            assert_eq!(session.handle(&event, Instant::now()), Transition::Ignored);
            assert_eq!(session.index(), 0);
        }

        #[tokio::test(start_paused = true)]
        async fn viewer_input_extends_the_deadline() {
            let mut session = session(3);
            let later = Instant::now() + Duration::from_secs(45);
            session.handle(&input(VIEWER, Control::Next), later);
            assert_eq!(session.deadline(), later + IDLE);
        }

        #[tokio::test(start_paused = true)]
        async fn single_page_ignores_all_input() {
            // Arrange
            let mut session = session(1);

            // Act
            let results: Vec<Transition> = Control::ALL
                .into_iter()
                .map(|control| session.handle(&input(VIEWER, control), Instant::now()))
                .collect();

            // Assert
            assert!(!session.is_interactive());
            assert!(results.iter().all(|t| *t == Transition::Ignored));
            assert_eq!(session.render().footer, None);
        }

        #[tokio::test(start_paused = true)]
        async fn close_ends_the_session() {
            let mut session = session(2);
            assert_eq!(
                session.handle(&input(VIEWER, Control::Close), Instant::now()),
                Transition::Closed
            );
            assert_eq!(session.state(), State::Closed);
            assert_eq!(
                session.handle(&input(VIEWER, Control::Next), Instant::now()),
                Transition::Ignored
            );
        }

        #[test]
        fn empty_pages_make_no_session() {
            assert!(PaginationSession::new(Vec::new(), 1, VIEWER, IDLE).is_none());
        }

        #[test]
        fn render_appends_page_marker() {
            let pages = vec![Page::new("a").footer("IdleRPG"), Page::new("b")];
            assert_eq!(
                render_page(&pages, 0).footer.as_deref(),
                Some("IdleRPG • Page 1/2")
            );
            assert_eq!(render_page(&pages, 1).footer.as_deref(), Some("Page 2/2"));
        }

        #[test]
        fn controls_accept_variation_selectors() {
            assert_eq!(Control::from_emoji("▶\u{fe0f}"), Some(Control::Next));
            assert_eq!(Control::from_emoji("👍"), None);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn paginate_single_page_sends_without_controls() {
        // Arrange
        let connector = FakeConnector::new(VIEWER).react(VIEWER, Control::Next.emoji());

        // Act
        paginate(&connector, pages(1), VIEWER, IDLE).await.unwrap();

        // Assert
        assert_eq!(connector.calls(), vec![Call::Page(Page::new("page 1"))]);
    }

    #[tokio::test(start_paused = true)]
    async fn paginate_moves_on_viewer_input_and_releases_controls_on_timeout() {
        // Arrange
        let connector = FakeConnector::new(VIEWER)
            .react(VIEWER, Control::Next.emoji())
            .react(99, Control::Next.emoji())
            .react(VIEWER, Control::Next.emoji())
            .react(VIEWER, Control::Next.emoji());

        // Act
        paginate(&connector, pages(3), VIEWER, IDLE).await.unwrap();

        // Assert
        let footers: Vec<Option<String>> =
            connector.edits().into_iter().map(|p| p.footer).collect();
        assert_eq!(
            footers,
            vec![Some("Page 2/3".to_string()), Some("Page 3/3".to_string())]
        );
        let calls = connector.calls();
        assert_eq!(calls.last(), Some(&Call::Clear(500)));
        assert!(!calls.contains(&Call::Unreact(500, 99, "▶".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn paginate_keeps_reactions_that_arrive_during_an_edit() {
        // Arrange
        let connector = FakeConnector::new(VIEWER)
            .react(VIEWER, Control::Next.emoji())
            .react_during_edit(VIEWER, Control::Next.emoji());

        // Act
        paginate(&connector, pages(3), VIEWER, IDLE).await.unwrap();

        // Assert
        let footers: Vec<Option<String>> =
            connector.edits().into_iter().map(|p| p.footer).collect();
        assert_eq!(
            footers,
            vec![Some("Page 2/3".to_string()), Some("Page 3/3".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn paginate_ends_quietly_when_the_message_is_gone() {
        // Arrange
        let mut connector = FakeConnector::new(VIEWER)
            .react(VIEWER, Control::Next.emoji())
            .react(VIEWER, Control::Next.emoji());
        connector.can_edit = false;
        let start = Instant::now();

        // Act
        let result = paginate(&connector, pages(3), VIEWER, IDLE).await;

        // Assert
        assert!(result.is_ok());
        assert!(Instant::now() - start < IDLE);
        let calls = connector.calls();
        assert!(!calls.iter().any(|c| matches!(c, Call::Unreact(..) | Call::Clear(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn paginate_close_deletes_the_message() {
        // Arrange
        let connector = FakeConnector::new(VIEWER).react(VIEWER, Control::Close.emoji());

        // Act
        paginate(&connector, pages(2), VIEWER, IDLE).await.unwrap();

        // Assert
        assert_eq!(connector.calls().last(), Some(&Call::Delete(500)));
        assert!(!connector.calls().contains(&Call::Clear(500)));
    }

    #[tokio::test(start_paused = true)]
    async fn paginate_falls_back_to_own_reactions_without_permission() {
        // Arrange
        let mut connector = FakeConnector::new(VIEWER);
        connector.can_clear = false;

        // Act
        paginate(&connector, pages(2), VIEWER, IDLE).await.unwrap();

        // Assert
        let own: Vec<Call> = connector
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::UnreactOwn(..)))
            .collect();
        assert_eq!(own.len(), Control::ALL.len());
    }

    #[tokio::test(start_paused = true)]
    async fn paginate_times_out_after_idle_window() {
        // Arrange
        let connector = FakeConnector::new(VIEWER);
        let start = Instant::now();

        // Act
        paginate(&connector, pages(2), VIEWER, IDLE).await.unwrap();

        // Assert
        assert!(Instant::now() - start >= IDLE);
    }
}
