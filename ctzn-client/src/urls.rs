//! Endpoint and permalink helpers.

use ctzn_types::Post;

/// Local development domains and the ports their servers listen on
pub const DEBUG_ENDPOINTS: [(&str, &str); 4] = [
    ("dev1.localhost", "localhost:15001"),
    ("dev2.localhost", "localhost:15002"),
    ("dev3.localhost", "localhost:15003"),
    ("dev4.localhost", "localhost:15004"),
];

/// A user id split into its parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedUserId<'a> {
    pub username: &'a str,
    pub domain: &'a str,
}

/// Split `name@domain`. An id without `@` has an empty domain.
pub fn parse_user_id(user_id: &str) -> ParsedUserId<'_> {
    match user_id.split_once('@') {
        Some((username, domain)) => ParsedUserId { username, domain },
        None => ParsedUserId {
            username: user_id,
            domain: "",
        },
    }
}

/// Join path segments with single slashes
pub fn join_path(parts: &[&str]) -> String {
    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        let part = if i == 0 {
            part.trim_end_matches('/')
        } else {
            part.trim_matches('/')
        };
        if part.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('/');
        }
        out.push_str(part);
    }
    out
}

pub fn http_endpoint(domain: &str) -> String {
    match DEBUG_ENDPOINTS.iter().find(|(d, _)| *d == domain) {
        Some((_, host)) => format!("http://{}", host),
        None => format!("https://{}", domain),
    }
}

pub fn avatar_url(user_id: &str) -> String {
    let parsed = parse_user_id(user_id);
    join_path(&[&http_endpoint(parsed.domain), "ctzn/avatar", parsed.username])
}

/// Site-relative permalink of a post
pub fn post_url(post: &Post) -> String {
    format!(
        "/{}",
        join_path(&[&post.author.user_id, "ctzn.network/post", &post.key])
    )
}
