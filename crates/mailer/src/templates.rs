use chrono::{DateTime, NaiveDate, Utc};
use hook_core::{TaskRequest, TicketRequest};
use html_escape::encode_text;

pub const TASK_SUBJECT: &str = "A Support Ticket is Created";
pub const CARD_SUBJECT: &str = "A Trello Card is Created";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
    pub text: String,
}

pub fn render_task_email(task_id: &str, task: &TaskRequest) -> RenderedEmail {
    let mut details = vec![("Title", task.title.clone())];
    if !task.description.is_empty() {
        details.push(("Description", task.description.clone()));
    }
    details.push(("Priority", task.priority.to_string()));
    if let Some(due) = task.due_date {
        details.push(("Due Date", format_date(&due)));
    }

    render(Layout {
        subject: TASK_SUBJECT,
        heading: "Support Ticket Created",
        intro: "A new support ticket has been created in the system.",
        details_heading: "Ticket Details:",
        id_label: "Ticket ID",
        id: task_id,
        details,
    })
}

pub fn render_card_email(card_id: &str, ticket: &TicketRequest) -> RenderedEmail {
    let mut details = vec![("Name", ticket.name.clone())];
    if let Some(desc) = ticket.desc.as_deref().filter(|value| !value.is_empty()) {
        details.push(("Description", desc.to_string()));
    }
    if let Some(due) = ticket.due_date.as_deref().filter(|value| !value.is_empty()) {
        details.push(("Due Date", format_date_str(due)));
    }

    render(Layout {
        subject: CARD_SUBJECT,
        heading: "Trello Card Created",
        intro: "A new Trello card has been created in the system.",
        details_heading: "Card Details:",
        id_label: "Card ID",
        id: card_id,
        details,
    })
}

struct Layout<'a> {
    subject: &'a str,
    heading: &'a str,
    intro: &'a str,
    details_heading: &'a str,
    id_label: &'a str,
    id: &'a str,
    details: Vec<(&'static str, String)>,
}

fn render(layout: Layout<'_>) -> RenderedEmail {
    let html_details: String = layout
        .details
        .iter()
        .map(|(label, value)| {
            format!(
                "\n            <p><strong>{label}:</strong> {}</p>",
                encode_text(value)
            )
        })
        .collect();

    let html = format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
          <h2 style="color: #333;">{heading}</h2>
          <p>Hello,</p>
          <p>{intro}</p>

          <div style="background-color: #f5f5f5; padding: 15px; border-radius: 5px; margin: 20px 0;">
            <h3 style="margin-top: 0; color: #555;">{details_heading}</h3>{html_details}
          </div>

          <p style="margin-top: 30px;"><strong>{id_label}:</strong> <span style="color: #0066cc; font-size: 18px;">{id}</span></p>

          <p style="margin-top: 30px; color: #666;">Thank you for using our support system.</p>
        </div>"#,
        heading = layout.heading,
        intro = layout.intro,
        details_heading = layout.details_heading,
        id_label = layout.id_label,
        id = encode_text(layout.id),
    );

    let text_details: String = layout
        .details
        .iter()
        .map(|(label, value)| format!("{label}: {value}\n"))
        .collect();

    let text = format!(
        "{heading}\n\nHello,\n\n{intro}\n\n{details_heading}\n{text_details}\n{id_label}: {id}\n\nThank you for using our support system.\n",
        heading = layout.heading,
        intro = layout.intro,
        details_heading = layout.details_heading,
        id_label = layout.id_label,
        id = layout.id,
    );

    RenderedEmail {
        subject: layout.subject.to_string(),
        html,
        text,
    }
}

/// US short date, e.g. `11/1/2026`.
fn format_date(value: &DateTime<Utc>) -> String {
    value.format("%-m/%-d/%Y").to_string()
}

fn format_date_str(raw: &str) -> String {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return format_date(&parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%-m/%-d/%Y").to_string();
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hook_core::Priority;

    #[test]
    fn task_email_lists_present_fields_only() {
        let task = TaskRequest {
            title: "Fix login".into(),
            description: String::new(),
            priority: Priority::High,
            due_date: Some(Utc.with_ymd_and_hms(2026, 11, 1, 0, 0, 0).unwrap()),
        };
        let email = render_task_email("task-42", &task);

        assert_eq!(email.subject, "A Support Ticket is Created");
        assert!(email.text.contains("Title: Fix login\n"));
        assert!(email.text.contains("Priority: high\n"));
        assert!(email.text.contains("Due Date: 11/1/2026\n"));
        assert!(email.text.contains("Ticket ID: task-42"));
        assert!(!email.text.contains("Description:"));
        assert!(email.html.contains("task-42"));
    }

    #[test]
    fn card_email_formats_due_date_and_escapes_html() {
        let ticket = TicketRequest {
            name: "<script>alert(1)</script>".into(),
            desc: Some("Check logs".into()),
            due_date: Some("2026-03-09".into()),
        };
        let email = render_card_email("card-7", &ticket);

        assert_eq!(email.subject, "A Trello Card is Created");
        assert!(email.html.contains("&lt;script&gt;"));
        assert!(!email.html.contains("<script>"));
        assert!(email.text.contains("Description: Check logs\n"));
        assert!(email.text.contains("Due Date: 3/9/2026\n"));
        assert!(email.text.contains("Card ID: card-7"));
    }

    #[test]
    fn unparseable_card_due_date_is_shown_verbatim() {
        assert_eq!(format_date_str("next friday"), "next friday");
        assert_eq!(format_date_str("2026-11-01T15:30:00Z"), "11/1/2026");
    }
}
