//! The command table — single source of truth for bang commands.
//!
//! Detection, help text, and message cleaning all read from the same
//! ordered registry, so adding a command is a one-line change.

use regex::Regex;

/// Help-text grouping. `Hidden` entries never appear in `!help`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Interaction,
    Search,
    Audio,
    Image,
    Reminder,
    Utility,
    Hidden,
}

impl Category {
    fn heading(self) -> &'static str {
        match self {
            Self::Interaction => "💬 *INTERACTION*",
            Self::Search => "🔍 *SEARCH & INFO*",
            Self::Audio => "🎙️ *AUDIO*",
            Self::Image => "🖼️ *IMAGES & STICKERS*",
            Self::Reminder => "⏰ *REMINDERS*",
            Self::Utility => "📝 *UTILITIES*",
            Self::Hidden => "",
        }
    }
}

#[derive(Debug, Clone)]
struct CommandSpec {
    token: String,
    description: &'static str,
    category: Category,
}

/// Ordered registry of every token the bot understands.
pub struct CommandTable {
    commands: Vec<CommandSpec>,
    mention_pattern: Regex,
}

impl CommandTable {
    pub fn new(bot_name: &str) -> Self {
        let spec = |token: String, description: &'static str, category| CommandSpec {
            token,
            description,
            category,
        };
        let bang = |token: &str, description: &'static str, category| {
            spec(token.to_string(), description, category)
        };

        let commands = vec![
            spec(
                format!("@{bot_name}"),
                "Generic interaction. _[Mention only required in groups]_",
                Category::Interaction,
            ),
            bang(
                "!help",
                "Shows the available commands. _[Ignores the rest of the message]_",
                Category::Utility,
            ),
            bang(
                "!audio",
                "Replies with a voice message. _[Add !english for the English voice]_",
                Category::Audio,
            ),
            bang(
                "!resume",
                "Summarizes the last 30 messages. _[Ignores the rest of the message]_",
                Category::Utility,
            ),
            bang(
                "!search",
                "Searches the internet and returns a summary.",
                Category::Search,
            ),
            bang("!model", "Shows the models in use.", Category::Search),
            bang(
                "!sticker",
                "Creates a sticker from an image and optional text. _[Use | as the top/bottom separator]_",
                Category::Image,
            ),
            bang("!english", "", Category::Hidden),
            bang(
                "!remember",
                "Creates a reminder for the requested day, time and topic.",
                Category::Reminder,
            ),
            bang(
                "!transcribe",
                "Transcribes a quoted audio. _[Ignores the rest of the message]_",
                Category::Audio,
            ),
            bang(
                "!image",
                "Generates or modifies a mentioned image.",
                Category::Image,
            ),
            bang("!describe", "Describes a mentioned image.", Category::Image),
            bang(
                "!consumption",
                "Usage report for the current chat.",
                Category::Search,
            ),
            bang(
                "!gallery",
                "Lists or searches saved images. _[Optional search term]_",
                Category::Image,
            ),
            bang(
                "!favorite",
                "Marks a quoted image as favorite. _[:list and :remove also available]_",
                Category::Image,
            ),
            bang(":list", "", Category::Hidden),
            bang(":remove", "", Category::Hidden),
        ];

        // WhatsApp renders mentions as @<numeric jid>.
        let mention_pattern =
            Regex::new(r"@\d{6,15}").unwrap_or_else(|_| Regex::new("$^").unwrap());

        Self {
            commands,
            mention_pattern,
        }
    }

    /// True when the message carries any `!`-prefixed token. Pure; the
    /// router decides afterwards which command wins.
    pub fn has_explicit_command(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.commands
            .iter()
            .filter(|c| c.token.starts_with('!'))
            .any(|c| lower.contains(&c.token))
    }

    /// Strip every known token and numeric mentions, leaving the free text
    /// handlers actually consume. Pipes and other user content survive.
    pub fn clean_text(&self, text: &str) -> String {
        let mut cleaned = text.trim().to_string();
        for command in &self.commands {
            cleaned = remove_token_case_insensitive(&cleaned, &command.token);
        }
        cleaned = self.mention_pattern.replace_all(&cleaned, "").to_string();
        cleaned.trim().to_string()
    }

    /// Help message grouped by category, hidden tokens excluded.
    pub fn help_text(&self, bot_name: &str) -> String {
        let order = [
            Category::Interaction,
            Category::Search,
            Category::Audio,
            Category::Image,
            Category::Reminder,
            Category::Utility,
        ];

        let mut out = format!(
            "🤖 *{} COMMANDS*\n━━━━━━━━━━━━━━━━━━━━━━━━━━\n",
            bot_name.to_uppercase()
        );
        for category in order {
            let entries: Vec<&CommandSpec> = self
                .commands
                .iter()
                .filter(|c| c.category == category && !c.description.is_empty())
                .collect();
            if entries.is_empty() {
                continue;
            }
            out.push('\n');
            out.push_str(category.heading());
            out.push('\n');
            for entry in entries {
                out.push_str(&format!("*{}* - {}\n", entry.token, entry.description));
            }
        }
        out.push_str(
            "\n━━━━━━━━━━━━━━━━━━━━━━━━━━\n\
             💡 You can also just talk naturally; commands are optional but faster.",
        );
        out
    }
}

/// ASCII case-insensitive token removal. Tokens are ASCII, message text
/// may not be, so matching runs byte-wise on char boundaries.
fn remove_token_case_insensitive(text: &str, token: &str) -> String {
    if token.is_empty() {
        return text.to_string();
    }
    let bytes = text.as_bytes();
    let token_bytes = token.as_bytes();
    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;
    while cursor < bytes.len() {
        let is_match = text.is_char_boundary(cursor)
            && cursor + token_bytes.len() <= bytes.len()
            && bytes[cursor..cursor + token_bytes.len()].eq_ignore_ascii_case(token_bytes);
        if is_match {
            cursor += token_bytes.len();
        } else {
            // Advance one full character.
            let mut next = cursor + 1;
            while next < bytes.len() && !text.is_char_boundary(next) {
                next += 1;
            }
            result.push_str(&text[cursor..next.min(bytes.len())]);
            cursor = next;
        }
    }
    result
}
