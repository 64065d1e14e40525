//! M3U playlist parsing.
//!
//! Providers serve extended M3U:
//!
//! ```text
//! #EXTM3U
//! #EXTINF:-1 tvg-id="bbc1.uk" tvg-logo="http://logo/bbc1.png" group-title="UK | News",BBC One
//! http://provider/live/user/pass/1.ts
//! ```
//!
//! Each `#EXTINF` line describes the next non-comment line, which is the
//! stream URL. Parsing never fails: malformed entries degrade to
//! `"Unknown"` names and groups instead of being dropped.

use std::collections::HashMap;

use iptv_core::{Channel, ChannelCategory, Credentials};
use tracing::debug;

const EXTINF: &str = "#EXTINF";
const UNKNOWN: &str = "Unknown";
const BLANK_URL: &str = "about:blank";

/// Attribute keys consulted, in order, for a channel's group title.
const GROUP_KEYS: [&str; 5] = ["group-title", "group", "category", "type", "tvg-group"];

/// Builds the provider playlist URL for a set of credentials.
///
/// ```
/// use iptv_core::Credentials;
/// use iptv_protocol::build_m3u_url;
///
/// let creds = Credentials::new("https://tv.example:8080/", "alice", "s3cret");
/// assert_eq!(build_m3u_url(&creds), "http://tv.example:8080/playlist/alice/s3cret/m3u");
/// ```
pub fn build_m3u_url(credentials: &Credentials) -> String {
    format!(
        "http://{}/playlist/{}/{}/m3u",
        credentials.normalized_host(),
        credentials.username,
        credentials.password
    )
}

/// Parses a playlist into channels, in playlist order.
///
/// - A URL line without a preceding `#EXTINF` becomes an `"Unknown"` channel
///   in the `other` category.
/// - A trailing `#EXTINF` with no URL gets `about:blank`.
/// - Other `#` lines (`#EXTM3U`, `#EXTGRP`, ...) are skipped.
pub fn parse_m3u(playlist: &str) -> Vec<Channel> {
    let mut channels = Vec::new();
    let mut pending: Option<Channel> = None;

    for line in playlist.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with(EXTINF) {
            if let Some(unfinished) = pending.take() {
                debug!(name = %unfinished.name, "EXTINF entry without URL replaced by next entry");
            }
            pending = Some(parse_extinf(line));
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        match pending.take() {
            Some(mut channel) => {
                channel.url = line.to_string();
                channels.push(channel);
            }
            None => channels.push(Channel {
                category: ChannelCategory::Other,
                ..Channel::new(UNKNOWN, UNKNOWN, line)
            }),
        }
    }

    if let Some(mut channel) = pending {
        channel.url = BLANK_URL.to_string();
        channels.push(channel);
    }

    channels
}

/// Builds a channel (without URL) from an `#EXTINF` line.
fn parse_extinf(line: &str) -> Channel {
    let (header, name_part) = split_display_name(line);
    let attrs = parse_attributes(header);

    let name = non_blank(Some(name_part))
        .or_else(|| non_blank(attrs.get("tvg-name").map(String::as_str)))
        .or_else(|| non_blank(attrs.get("tvg-id").map(String::as_str)))
        .unwrap_or(UNKNOWN);

    let group = GROUP_KEYS
        .iter()
        .find_map(|key| non_blank(attrs.get(*key).map(String::as_str)))
        .unwrap_or(UNKNOWN);

    let attr = |key: &str| non_blank(attrs.get(key).map(String::as_str)).map(str::to_string);

    Channel {
        tvg_id: attr("tvg-id"),
        tvg_name: attr("tvg-name"),
        tvg_logo: attr("tvg-logo"),
        tvg_chno: attr("tvg-chno"),
        ..Channel::new(name, group, "")
    }
}

/// Splits `#EXTINF:<attrs>,<name>` at the first comma outside quotes.
fn split_display_name(line: &str) -> (&str, &str) {
    let mut in_quotes = false;
    for (idx, ch) in line.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                let header = line.get(..idx).unwrap_or(line);
                let name = line.get(idx + 1..).unwrap_or("");
                return (header, name);
            }
            _ => {}
        }
    }
    (line, "")
}

/// Extracts `key="value"` pairs where key is `[A-Za-z0-9_-]+`.
fn parse_attributes(header: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    let mut rest = header;

    while let Some(eq) = rest.find("=\"") {
        let key_start = rest
            .get(..eq)
            .and_then(|before| {
                before
                    .char_indices()
                    .rev()
                    .take_while(|(_, c)| is_key_char(*c))
                    .last()
                    .map(|(i, _)| i)
            })
            .unwrap_or(eq);
        let key = rest.get(key_start..eq).unwrap_or("");

        let value_start = eq + 2;
        let Some(value_len) = rest.get(value_start..).and_then(|v| v.find('"')) else {
            break;
        };
        let value = rest.get(value_start..value_start + value_len).unwrap_or("");

        if !key.is_empty() {
            attrs.insert(key.to_string(), value.to_string());
        }
        rest = rest.get(value_start + value_len + 1..).unwrap_or("");
    }

    attrs
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
