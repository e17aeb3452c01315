//! Outbound message templates
//!
//! Every user-facing text lives here so the conversation logic stays free of
//! copy. Formatting is plain text with the transport's lightweight `*bold*`
//! and `_italic_` markers.

use crate::config::{status_label, Category};
use crate::ticketing::{Followup, TicketDetail, TicketId, TicketSummary};
use chrono::NaiveDateTime;

pub fn main_menu(display_name: &str) -> String {
    format!(
        "Hi {display_name}! I'm the helpdesk assistant.\n\n\
         How can I help?\n\n\
         *1.* Open a ticket\n\
         *2.* IT procedures site\n\
         *3.* View/reply to a ticket\n\
         *4.* Close a ticket\n\n\
         _(Send *'0'* at any time to leave)_"
    )
}

pub fn invalid_menu_option() -> String {
    "Invalid option. Please send *1*, *2*, *3* or *4*.".to_string()
}

pub fn kb_link(url: &str) -> String {
    format!(
        "Here is the link to our IT procedures site:\n{url}\n\n\
         Done. If you need anything else, just send a message!"
    )
}

pub fn category_list(categories: &[Category]) -> String {
    let mut message = String::from("Ok, let's open a ticket.\n\nFirst, pick a *category*:\n\n");
    for (index, category) in categories.iter().enumerate() {
        message.push_str(&format!("*{}.* {}\n", index + 1, category.label));
    }
    message.push_str("\n_(Send *'0'* to leave)_");
    message
}

pub fn invalid_category(count: usize) -> String {
    format!("Invalid option. Pick a number from *1* to *{count}*.")
}

pub fn title_prompt(title_max: usize) -> String {
    format!(
        "Category selected. Now send a *title* for your ticket \
         (max {title_max} characters).\n\n_(Send *'0'* to leave)_"
    )
}

pub fn title_empty() -> String {
    "The title cannot be empty. Please send a title for your ticket.".to_string()
}

pub fn title_too_long(title_max: usize, actual: usize) -> String {
    format!(
        "Title too long! It must have at most {title_max} characters \
         (yours has {actual}).\n\nPlease send a shorter title, or '0' to leave."
    )
}

pub fn description_prompt(description_min: usize) -> String {
    format!(
        "Great! Now send a *description* of the problem with at least \
         {description_min} characters.\n\n_(Send *'0'* to leave)_"
    )
}

pub fn description_too_short(description_min: usize, actual: usize) -> String {
    format!(
        "Description too short! It must have at least {description_min} characters \
         so we can understand the problem (yours has {actual}).\n\n\
         Please add more detail, or send '0' to leave."
    )
}

pub fn email_confirm(address: &str) -> String {
    format!(
        "I found this e-mail linked to your number: *{address}*\n\n\
         Is it correct?\n\n*1.* Yes\n*2.* No\n\n_(Send *'0'* to leave)_"
    )
}

pub fn email_prompt() -> String {
    "To continue, send your registered *e-mail* address.\n\n_(Send *'0'* to leave)_".to_string()
}

pub fn email_prompt_for_flow(action: &str) -> String {
    format!("To {action} your tickets, please send your registered *e-mail* address.")
}

pub fn email_invalid() -> String {
    "That doesn't look like a valid e-mail address. \
     Please send it as *name@domain.com*."
        .to_string()
}

pub fn yes_or_no() -> String {
    "Invalid option. Send *1* for yes or *2* for no.".to_string()
}

pub fn attachment_prompt() -> String {
    "Would you like to add an attachment (*image* or *document*)?\n\n\
     *1.* Yes\n*2.* No\n\n_(You can also just send the file)_\n\n\
     _(Send *'0'* to leave)_"
        .to_string()
}

pub fn attachment_received() -> String {
    "*Attachment received!* Add another?\n\n\
     *1.* Yes (or send the file)\n*2.* No (continue)\n\n_(Send *'0'* to leave)_"
        .to_string()
}

pub fn attachment_go_ahead() -> String {
    "Ok, send the file.".to_string()
}

pub fn attachment_invalid() -> String {
    "Invalid option or attachment not recognized. \
     Send the file, or *1* to add one, or *2* to continue."
        .to_string()
}

pub fn ticket_summary(category: &str, title: &str, description: &str) -> String {
    format!(
        "*Ticket summary*\n\n\
         *Category:* {category}\n\
         *Title:* {title}\n\
         *Description:* {description}\n\n\
         Confirm and create the ticket?\n\n\
         *1.* Yes\n*2.* No, discard everything\n\n_(Send *'0'* to leave)_"
    )
}

pub fn creating_ticket() -> String {
    "Creating your ticket...".to_string()
}

pub fn ticket_created(id: TicketId) -> String {
    format!(
        "Ticket *#{id}* opened successfully!\n\n\
         Send a new message whenever you want to open another one."
    )
}

pub fn creation_discarded() -> String {
    "Ok, the ticket was discarded. If you need anything else, just start again.".to_string()
}

pub fn searching_tickets(address: &str) -> String {
    format!("Looking up tickets for *{address}*...")
}

pub fn requester_unknown(address: &str) -> String {
    format!("No user found for the e-mail *{address}*.")
}

pub fn requester_unmatched_warning(address: &str) -> String {
    format!(
        "*Note:* I couldn't find a backend user with the e-mail *'{address}'*. \
         The ticket will be opened without linking it to your account."
    )
}

pub fn no_open_tickets() -> String {
    "You have no open tickets at the moment.".to_string()
}

pub fn ticket_list(tickets: &[TicketSummary], action: &str) -> String {
    let mut message = format!(
        "I found *{}* open ticket(s). Which one do you want to {action}?\n\n",
        tickets.len()
    );
    for (index, ticket) in tickets.iter().enumerate() {
        message.push_str(&format!("*{}.* #{} - {}\n", index + 1, ticket.id, ticket.title));
    }
    message.push_str("\n_(Send *'0'* to leave)_");
    message
}

pub fn invalid_selection(count: usize) -> String {
    format!("Invalid option. Pick a number from 1 to {count}.\n\n_(Send *'0'* to leave)_")
}

pub fn fetching_detail(id: TicketId) -> String {
    format!("Fetching details for ticket *#{id}*...")
}

pub fn ticket_detail(
    ticket: &TicketSummary,
    detail: &TicketDetail,
    description: &str,
    followups: &[(String, String)],
) -> String {
    let mut message = format!(
        "*Ticket details*\n\
         *Ticket:* #{}\n\
         *Title:* {}\n\
         *Status:* {}\n\
         *Opened:* {}\n\
         *Last update:* {}\n",
        ticket.id,
        ticket.title,
        status_label(detail.status),
        format_timestamp(&detail.created_at),
        format_timestamp(&detail.updated_at),
    );

    message.push_str("\n*Update history:*\n\n");
    if !description.is_empty() {
        message.push_str(&format!(
            "*{}:*\n{}\n\n",
            format_timestamp(&detail.created_at),
            description
        ));
    }
    for (date, text) in followups {
        message.push_str(&format!("*{}:*\n{}\n\n", format_timestamp(date), text));
    }
    message
}

pub fn followup_decision() -> String {
    "Would you like to add a reply to this ticket?\n\n\
     *1.* Yes\n*2.* No\n\n_(Send *'0'* to leave)_"
        .to_string()
}

pub fn followup_text_prompt() -> String {
    "Ok, please type your reply.\n\n_(Send *'0'* to leave)_".to_string()
}

pub fn followup_attachment_prompt() -> String {
    "Would you like to attach a file to your reply?\n\n\
     *1.* Yes\n*2.* No\n\n_(You can also just send the file)_\n\n\
     _(Send *'0'* to leave)_"
        .to_string()
}

pub fn followup_attachment_received() -> String {
    "*Attachment received!* Add another?\n\n\
     *1.* Yes (or send the file)\n*2.* No (send reply)\n\n_(Send *'0'* to leave)_"
        .to_string()
}

pub fn sending_followup(id: TicketId) -> String {
    format!("Sending your reply to ticket *#{id}*...")
}

pub fn followup_posted(id: TicketId) -> String {
    format!("Your reply was added to ticket *#{id}* successfully!")
}

pub fn consultation_done() -> String {
    "Done. If you need anything else, just send a message!".to_string()
}

pub fn closing_ticket(id: TicketId) -> String {
    format!("Closing ticket *#{id}*...")
}

pub fn ticket_closed(id: TicketId) -> String {
    format!("Ticket *#{id}* closed successfully!")
}

pub fn cancelled() -> String {
    "All right, cancelled. I'll be here if you need me!".to_string()
}

pub fn session_expired() -> String {
    "Your session was ended due to *inactivity*. \
     To start again, send any message."
        .to_string()
}

pub fn backend_failure() -> String {
    "Something went wrong talking to the helpdesk system. \
     Please try again later."
        .to_string()
}

pub fn update_notification(id: TicketId, title: &str) -> String {
    format!(
        "*New update on your ticket*\n\n\
         *Ticket:* #{id}\n\
         *Title:* {title}\n\n\
         _To see the details, send a message and pick option 3._"
    )
}

/// Render a backend `YYYY-MM-DD HH:MM:SS` timestamp as `DD/MM/YYYY - HH:MM`,
/// falling back to the raw value when it does not parse.
fn format_timestamp(raw: &str) -> String {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.format("%d/%m/%Y - %H:%M").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

/// The verb shown in list prompts for each lookup flow.
pub fn action_verb(cancel: bool) -> &'static str {
    if cancel {
        "close"
    } else {
        "view"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_rejection_quotes_both_lengths() {
        let message = title_too_long(70, 83);
        assert!(message.contains("70"));
        assert!(message.contains("83"));
    }

    #[test]
    fn description_rejection_quotes_both_lengths() {
        let message = description_too_short(20, 7);
        assert!(message.contains("20"));
        assert!(message.contains("7"));
    }

    #[test]
    fn timestamps_render_day_first() {
        let ticket = TicketSummary {
            id: 42,
            title: "Broken printer".to_string(),
        };
        let detail = TicketDetail {
            status: 2,
            content: String::new(),
            created_at: "2026-03-01 09:30:00".to_string(),
            updated_at: "2026-03-02 10:00:00".to_string(),
        };
        let message = ticket_detail(&ticket, &detail, "it broke", &[]);
        assert!(message.contains("01/03/2026 - 09:30"));
        assert!(message.contains("In progress (assigned)"));
    }
}
