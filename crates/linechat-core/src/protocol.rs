//! Wire protocol for the linechat relay
//!
//! The protocol is newline-delimited UTF-8 text, one logical message per
//! line. Control tokens are bare uppercase words; user commands start with
//! `!`; every other line is a chat payload routed by the sender's current
//! mode. This module owns the token constants, the inbound-request parser,
//! and the formatting of delivered chat lines.

use crate::clock::Clock;

// ----------------------------------------------------------------------------
// Protocol Tokens
// ----------------------------------------------------------------------------

/// Control tokens exchanged between client and server.
pub mod tokens {
    /// Registration proposal accepted.
    pub const NAME_ACCEPTED: &str = "NAME_ACCEPTED";
    /// Registration proposal collided with an active name.
    pub const NAME_TAKEN: &str = "NAME_TAKEN";
    /// Client readiness acknowledgment, entering normal traffic.
    pub const READY: &str = "READY";
    /// The receiving session now holds the coordinator role.
    pub const NEW_COORDINATOR: &str = "NEW_COORDINATOR";
    /// Start of a roster push to the coordinator.
    pub const NAMES_BEGIN: &str = "NAMES_BEGIN";
    /// End of a roster push.
    pub const NAMES_END: &str = "NAMES_END";
    /// Start of a heartbeat round: target names follow.
    pub const PING_START: &str = "PING_START";
    /// End of a heartbeat round's target list.
    pub const PING_END: &str = "PING_END";
    /// Individual liveness probe and its response.
    pub const PING: &str = "PING";
    /// Graceful quit acknowledged, connection will close.
    pub const QUIT_SUCCESS: &str = "QUIT_SUCCESS";
}

/// Inline reply when a `!private` target is not registered.
pub const TARGET_NOT_FOUND: &str = "Username not found in active users!";
/// Inline reply to an unrecognized `!` command.
pub const INVALID_COMMAND: &str = "Invalid command!";
/// Inline notice for a private message sent with no recipient selected.
pub const NO_RECIPIENT: &str = "No private recipient selected! Use !private [USERNAME] first.";

/// Help block reprinted on `!help` / `!commands` and on joining.
pub const COMMAND_HELP: &[&str] = &[
    "",
    "======= CUSTOM COMMANDS =======",
    "!commands / !help -> View this message again",
    "!coordinator -> Views the current coordinator",
    "!online -> Views details of current users",
    "!quit -> Quits the chat",
    "!broadcast -> Switch to broadcast mode",
    "!private [USERNAME] -> Switch to private message mode to specified user",
    "",
];

// ----------------------------------------------------------------------------
// Inbound Request Parsing
// ----------------------------------------------------------------------------

/// A `!`-prefixed user command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// `!help` / `!commands`: reprint the command list.
    Help,
    /// `!coordinator`: show the current coordinator.
    Coordinator,
    /// `!online`: list active sessions.
    Online,
    /// `!broadcast`: switch routing mode to broadcast.
    Broadcast,
    /// `!private <name>`: switch routing mode to private, targeting `name`.
    Private { target: String },
    /// `!quit`: graceful disconnect.
    Quit,
    /// Any other `!`-prefixed line.
    Unknown,
}

/// One decoded line from an active client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientRequest {
    /// A user command.
    Command(ChatCommand),
    /// The coordinator opened a heartbeat round; target names follow.
    PingRoundStart,
    /// A chat payload, routed per the sender's current mode.
    Chat(String),
}

impl ClientRequest {
    /// Classify one inbound line from a session in the active state.
    pub fn parse(line: &str) -> Self {
        if line.starts_with('!') {
            ClientRequest::Command(ChatCommand::parse(line))
        } else if line == tokens::PING_START {
            ClientRequest::PingRoundStart
        } else {
            ClientRequest::Chat(line.to_string())
        }
    }
}

impl ChatCommand {
    fn parse(line: &str) -> Self {
        match line {
            "!help" | "!commands" => ChatCommand::Help,
            "!coordinator" => ChatCommand::Coordinator,
            "!online" => ChatCommand::Online,
            "!broadcast" => ChatCommand::Broadcast,
            "!quit" => ChatCommand::Quit,
            _ => match line.strip_prefix("!private ") {
                Some(target) if !target.is_empty() => ChatCommand::Private {
                    target: target.to_string(),
                },
                _ => ChatCommand::Unknown,
            },
        }
    }
}

// ----------------------------------------------------------------------------
// Chat Line Formatting
// ----------------------------------------------------------------------------

/// Timestamp prefix applied to every delivered chat message.
pub fn timestamp_prefix(clock: &dyn Clock) -> String {
    format!("[{}] ", clock.now().format("%H:%M:%S"))
}

/// Render a broadcast chat line: `[HH:MM:SS] <name>: <text>`.
pub fn format_broadcast(clock: &dyn Clock, sender: &str, text: &str) -> String {
    format!("{}{}: {}", timestamp_prefix(clock), sender, text)
}

/// Render a private chat line: `[HH:MM:SS] <name> (PRIVATE): <text>`.
pub fn format_private(clock: &dyn Clock, sender: &str, text: &str) -> String {
    format!("{}{} (PRIVATE): {}", timestamp_prefix(clock), sender, text)
}

/// Join notice broadcast to the other active sessions.
pub fn joined_notice(name: &str) -> String {
    format!("{} has joined the chat!", name)
}

/// Departure notice broadcast after a session is removed.
pub fn left_notice(name: &str) -> String {
    format!("{} has left the chat!", name)
}

/// Notice broadcast after a coordinator re-election.
pub fn coordinator_changed_notice(name: &str) -> String {
    format!("Coordinator changed. The new coordinator is {}", name)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;

    #[test]
    fn parses_every_command() {
        assert_eq!(
            ClientRequest::parse("!help"),
            ClientRequest::Command(ChatCommand::Help)
        );
        assert_eq!(
            ClientRequest::parse("!commands"),
            ClientRequest::Command(ChatCommand::Help)
        );
        assert_eq!(
            ClientRequest::parse("!coordinator"),
            ClientRequest::Command(ChatCommand::Coordinator)
        );
        assert_eq!(
            ClientRequest::parse("!online"),
            ClientRequest::Command(ChatCommand::Online)
        );
        assert_eq!(
            ClientRequest::parse("!broadcast"),
            ClientRequest::Command(ChatCommand::Broadcast)
        );
        assert_eq!(
            ClientRequest::parse("!quit"),
            ClientRequest::Command(ChatCommand::Quit)
        );
    }

    #[test]
    fn parses_private_with_target() {
        assert_eq!(
            ClientRequest::parse("!private Carol"),
            ClientRequest::Command(ChatCommand::Private {
                target: "Carol".to_string()
            })
        );
        // Names may contain spaces; everything after the command is the target.
        assert_eq!(
            ClientRequest::parse("!private Mary Ann"),
            ClientRequest::Command(ChatCommand::Private {
                target: "Mary Ann".to_string()
            })
        );
    }

    #[test]
    fn private_without_target_is_unknown() {
        assert_eq!(
            ClientRequest::parse("!private"),
            ClientRequest::Command(ChatCommand::Unknown)
        );
        assert_eq!(
            ClientRequest::parse("!private "),
            ClientRequest::Command(ChatCommand::Unknown)
        );
    }

    #[test]
    fn unknown_bang_lines_are_commands_not_chat() {
        assert_eq!(
            ClientRequest::parse("!frobnicate"),
            ClientRequest::Command(ChatCommand::Unknown)
        );
    }

    #[test]
    fn ping_start_is_not_chat() {
        assert_eq!(ClientRequest::parse("PING_START"), ClientRequest::PingRoundStart);
    }

    #[test]
    fn plain_lines_are_chat() {
        assert_eq!(
            ClientRequest::parse("hello there"),
            ClientRequest::Chat("hello there".to_string())
        );
        // An empty line is still a (degenerate) chat payload.
        assert_eq!(ClientRequest::parse(""), ClientRequest::Chat(String::new()));
    }

    #[test]
    fn chat_lines_carry_timestamp_and_sender() {
        let clock = FixedClock::at(14, 3, 59);
        assert_eq!(
            format_broadcast(&clock, "Alice", "hi"),
            "[14:03:59] Alice: hi"
        );
        assert_eq!(
            format_private(&clock, "Bob", "psst"),
            "[14:03:59] Bob (PRIVATE): psst"
        );
    }
}
