//! User-facing texts and the escaping rules of the outbound formatting
//! dialects.

use crate::core::Applicant;
use crate::outcome::AuditNotice;

/// Label of the keyboard button that shares the user's phone number.
pub const VERIFY_BUTTON: &str = "I am not a bot";

/// Characters that must be backslash-escaped anywhere in MarkdownV2 text.
const MARKDOWN_V2_SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

/// Escape free text for MarkdownV2.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape text placed inside a MarkdownV2 `code` span, where only the
/// backtick and backslash are special.
pub fn escape_markdown_v2_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '`' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape free text for HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn profile_link(user: &Applicant) -> String {
    format!("tg://user?id={}", user.id)
}

/// HTML. Sent with the contact keyboard.
pub fn prompt_text(group_title: &str) -> String {
    format!(
        "Welcome! To complete your request to join '{}' and verify you are not a bot, \
         please tap the button below to share your phone number.\n\n\
         This helps us ensure a real person is joining. Your phone number \
         will only be used for verification purposes. Telegram will ask for your confirmation.",
        escape_html(group_title)
    )
}

pub fn approved_text(group_title: &str) -> String {
    format!(
        "Thank you for verifying! Your request to join '{group_title}' has been approved. \
         You are all set! You can now access the group."
    )
}

pub fn approval_failed_text(group_title: &str) -> String {
    format!(
        "Verification successful, but I encountered an issue approving your request to join \
         '{group_title}'. Please contact a group administrator. Apologies for the inconvenience."
    )
}

pub fn no_pending_text() -> &'static str {
    "Thanks for sharing your contact! It seems you're not currently awaiting verification \
     for a group join request through this bot. If you were trying to join a group, \
     please try sending the join request again to the group."
}

pub fn invalid_contact_text() -> String {
    format!(
        "It seems like the contact shared was not valid or not your own. \
         Please tap the '{VERIFY_BUTTON}' button again if it's still there."
    )
}

pub fn reminder_text() -> String {
    format!(
        "Please complete the verification by tapping the '{VERIFY_BUTTON}' button. \
         If you don't see it, it might have disappeared; you can type /start or \
         re-send your group join request to receive the button again."
    )
}

pub fn help_text() -> &'static str {
    "Hello! I'm here to help with group join requests. How can I assist you?"
}

/// HTML, with a mention of the user.
pub fn welcome_html(user: &Applicant) -> String {
    format!(
        "Hi <a href=\"{}\">{}</a>! I manage group join requests. \
         If you're trying to join a group, I'll send you a verification message here first.",
        profile_link(user),
        escape_html(&user.full_name())
    )
}

pub fn declined_text(group_title: &str) -> String {
    format!("Your request to join '{group_title}' has been withdrawn.")
}

pub fn decline_failed_text(group_title: &str) -> String {
    format!(
        "I stopped waiting for your verification for '{group_title}', but could not withdraw \
         the request itself. A group administrator can dismiss it."
    )
}

/// MarkdownV2 audit message for the admin chat.
pub fn audit_markdown(notice: &AuditNotice) -> String {
    let username = match &notice.user.username {
        Some(name) => format!("@{name}"),
        None => "N/A".to_string(),
    };
    format!(
        "✅ *New User Verified and Joined\\!*\n\
         *Group:* {}\n\
         *User ID:* `{}`\n\
         *Name:* {}\n\
         *Username:* {}\n\
         *Phone:* `{}`\n\
         [View User Profile]({})",
        escape_markdown_v2(&notice.group_title),
        notice.user.id,
        escape_markdown_v2(&notice.user.full_name()),
        escape_markdown_v2(&username),
        escape_markdown_v2_code(&notice.phone_number),
        profile_link(&notice.user),
    )
}
