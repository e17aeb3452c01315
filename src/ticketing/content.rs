//! HTML body composition for tickets and followups
//!
//! The backend stores ticket bodies as HTML. Image attachments are embedded
//! inline as base64 `img` elements; other attachments are uploaded as
//! documents after the ticket or followup is created.

use crate::chat::AttachmentBlob;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Compose the HTML body of a new ticket.
pub fn compose_ticket_content(
    requester_name: &str,
    contact_address: Option<&str>,
    chat_identity: &str,
    description: &str,
    attachments: &[AttachmentBlob],
) -> String {
    let mut content = format!(
        "<p><b>Name:</b> {requester_name}</p>\
         <p><b>E-mail:</b> {}</p>\
         <p><b>Chat identity:</b> {chat_identity}</p><hr>\
         <p><b>Description:</b></p><p>{}</p>",
        contact_address.unwrap_or("N/A"),
        description.replace('\n', "<br>"),
    );
    content.push_str(&inline_images(attachments));
    content
}

/// Compose the HTML body of a followup.
pub fn compose_followup_content(text: &str, attachments: &[AttachmentBlob]) -> String {
    let mut content = format!("<p>{}</p>", text.replace('\n', "<br>"));
    content.push_str(&inline_images(attachments));
    content
}

fn inline_images(attachments: &[AttachmentBlob]) -> String {
    let images: String = attachments
        .iter()
        .filter(|a| a.is_image())
        .map(|a| {
            format!(
                "<p><img src=\"data:{};base64,{}\" /></p>",
                a.mime,
                BASE64.encode(&a.bytes)
            )
        })
        .collect();

    if images.is_empty() {
        String::new()
    } else {
        format!("<hr><p><b>Attached images:</b></p>{images}")
    }
}

/// File extension for an uploaded document, derived from its MIME type.
pub fn file_extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => ".jpeg",
        "image/png" => ".png",
        "image/gif" => ".gif",
        "application/pdf" => ".pdf",
        _ => "",
    }
}
