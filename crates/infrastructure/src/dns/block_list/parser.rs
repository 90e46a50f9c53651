//! Block list line syntax.

/// One parsed list line. Domains are lowercase without a trailing dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEntry {
    /// `ads.com`, `0.0.0.0 ads.com`: that exact name
    Exact(String),
    /// `*.ads.com`: every subdomain of ads.com, not ads.com itself
    Wildcard(String),
    /// `||ads.com^`: ads.com and every subdomain
    Domain(String),
}

/// Parse one line from a block or allow list.
///
/// Supported formats:
/// - `# comment`, `! comment` or blank -> None
/// - `0.0.0.0 domain`, `127.0.0.1 domain`, `:: domain` -> Exact
/// - `*.domain` -> Wildcard
/// - `||domain^` -> Domain
/// - `domain` -> Exact (single token containing a dot)
pub fn parse_list_line(line: &str) -> Option<ListEntry> {
    let line = line.trim();

    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
        return None;
    }

    if let Some(rest) = line.strip_prefix("||") {
        let domain = rest.split(|c: char| c == '^' || c == '$').next().unwrap_or_default();
        return clean_domain(domain).map(ListEntry::Domain);
    }

    if let Some(rest) = line.strip_prefix("*.") {
        return clean_domain(rest).map(ListEntry::Wildcard);
    }

    let parts: Vec<&str> = line.split_whitespace().collect();

    // hosts file format: "addr domain [comment...]"
    if parts.len() >= 2 {
        let is_hosts_addr = matches!(parts[0], "0.0.0.0" | "127.0.0.1" | "::" | "::1");
        if !is_hosts_addr {
            return None;
        }
        if matches!(
            parts[1],
            "localhost" | "0.0.0.0" | "broadcasthost" | "ip6-localhost" | "ip6-loopback"
        ) {
            return None;
        }
        return clean_domain(parts[1]).map(ListEntry::Exact);
    }

    clean_domain(parts[0]).map(ListEntry::Exact)
}

pub fn parse_list_text(text: &str) -> Vec<ListEntry> {
    text.lines().filter_map(parse_list_line).collect()
}

/// Lowercase, drop a trailing dot, require at least one inner dot.
fn clean_domain(raw: &str) -> Option<String> {
    let domain = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    if domain.is_empty() || !domain.contains('.') || domain.starts_with('.') {
        return None;
    }
    if domain
        .chars()
        .any(|c| !(c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_'))
    {
        return None;
    }
    Some(domain)
}
