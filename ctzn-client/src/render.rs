//! Plain-text rendering of a projected thread for the terminal.

use chrono::{DateTime, TimeZone};
use std::fmt;

use crate::thread::Projection;
use crate::time::{format_timestamp_in, relative_date_at};

const INDENT: usize = 2;
const MIN_BODY_WIDTH: usize = 20;

/// Render every group in pre-order. The subject is marked with `>` and
/// carries its absolute timestamp in `now`'s zone.
pub fn render_thread<Tz: TimeZone>(groups: Projection<'_>, now: &DateTime<Tz>, width: usize) -> Vec<String>
where
    Tz::Offset: fmt::Display,
{
    let mut lines = Vec::new();
    for group in groups.walk() {
        let pad = " ".repeat(group.depth * INDENT);
        let marker = if group.is_highlighted { ">" } else { " " };
        let post = group.post;

        let mut header = format!(
            "{}{} {} ({}) · {}",
            pad,
            marker,
            post.author.display_name,
            post.author.user_id,
            relative_date_at(post.value.created_at, now)
        );
        if group.is_highlighted {
            header.push_str(" · ");
            header.push_str(&format_timestamp_in(&post.value.created_at, &now.timezone()));
        }
        let replies = post.reply_count();
        if replies > 0 {
            header.push_str(&format!(
                " · {} {}",
                replies,
                if replies == 1 { "reply" } else { "replies" }
            ));
        }
        lines.push(header);

        let body_pad = format!("{}  ", pad);
        let body_width = width.saturating_sub(body_pad.len()).max(MIN_BODY_WIDTH);
        let mut text = post.value.text.clone();
        if group.is_highlighted {
            if let Some(extended) = &post.value.extended_text {
                text.push_str("\n\n");
                text.push_str(extended);
            }
        }
        for line in text.lines() {
            if line.is_empty() {
                lines.push(String::new());
                continue;
            }
            for wrapped in textwrap::wrap(line, body_width) {
                lines.push(format!("{}{}", body_pad, wrapped));
            }
        }
    }
    lines
}
