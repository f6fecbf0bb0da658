//! URL and domain helpers shared across the recruitment pipeline.

use url::Url;

fn normalize_host(hostname: &str) -> String {
    let cleaned = hostname.trim().to_ascii_lowercase();
    cleaned
        .strip_prefix("www.")
        .map(str::to_string)
        .unwrap_or(cleaned)
}

/// Normalized domain of a URL (or bare host string).
///
/// Tolerates inputs without a scheme; never fails, because opt-out checks
/// must work on whatever operators or responses hand us.
pub fn domain_from_url(input: &str) -> String {
    if let Ok(parsed) = Url::parse(input) {
        if let Some(host) = parsed.host_str() {
            return normalize_host(host);
        }
    }

    let stripped = input
        .trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    let host = stripped.split('/').next().unwrap_or(stripped);
    normalize_host(host)
}

/// Domain variants an opt-out entry could have been filed under:
/// the exact host plus the registrable two-label suffix.
pub fn domain_opt_out_candidates(input: &str) -> Vec<String> {
    let domain = domain_from_url(input);
    let mut candidates = vec![domain.clone()];

    let labels: Vec<&str> = domain.split('.').filter(|p| !p.is_empty()).collect();
    if labels.len() > 2 {
        let apex = labels[labels.len() - 2..].join(".");
        if !candidates.contains(&apex) {
            candidates.push(apex);
        }
    }

    candidates
}

/// Politeness key for the domain cooldown check.
///
/// Repository hosting is shared infrastructure: two repos on github.com
/// are different parties, so the key there is `host/owner/repo` rather
/// than the bare host.
pub fn domain_politeness_key(input: &str) -> String {
    if let Ok(parsed) = Url::parse(input) {
        if let Some(host) = parsed.host_str() {
            let host = normalize_host(host);
            if host == "github.com" {
                let mut segments = parsed.path_segments().into_iter().flatten().filter(|s| !s.is_empty());
                if let (Some(owner), Some(repo)) = (segments.next(), segments.next()) {
                    return format!("{host}/{owner}/{repo}").to_ascii_lowercase();
                }
            }
            return host;
        }
    }
    domain_from_url(input)
}

/// Owner/repo pair parsed from a GitHub repository URL.
pub fn parse_github_repo(input: &str) -> Option<(String, String)> {
    let parsed = Url::parse(input).ok()?;
    if normalize_host(parsed.host_str()?) != "github.com" {
        return None;
    }

    let mut segments = parsed.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}

/// Origin (`scheme://host[:port]`) of a URL, if parsable.
pub fn url_origin(input: &str) -> Option<String> {
    let parsed = Url::parse(input).ok()?;
    let host = parsed.host_str()?;
    let origin = match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    };
    Some(origin)
}

/// Lossy string form of a JSON value for keyword scanning.
pub fn stringify_json(value: &serde_json::Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_strips_www_and_scheme() {
        assert_eq!(domain_from_url("https://www.Example.com/path"), "example.com");
        assert_eq!(domain_from_url("example.com/path"), "example.com");
    }

    #[test]
    fn opt_out_candidates_include_apex() {
        let candidates = domain_opt_out_candidates("https://api.bots.example.com/x");
        assert!(candidates.contains(&"api.bots.example.com".to_string()));
        assert!(candidates.contains(&"example.com".to_string()));
    }

    #[test]
    fn politeness_key_is_per_repo_on_github() {
        assert_eq!(
            domain_politeness_key("https://github.com/Acme/Helper-Bot"),
            "github.com/acme/helper-bot"
        );
        assert_eq!(
            domain_politeness_key("https://bots.example.com/agent"),
            "bots.example.com"
        );
    }

    #[test]
    fn github_repo_parse() {
        assert_eq!(
            parse_github_repo("https://github.com/acme/helper-bot.git"),
            Some(("acme".to_string(), "helper-bot".to_string()))
        );
        assert_eq!(parse_github_repo("https://gitlab.com/acme/x"), None);
        assert_eq!(parse_github_repo("https://github.com/acme"), None);
    }

    #[test]
    fn origin_drops_path() {
        assert_eq!(
            url_origin("https://bots.example.com/api/v1"),
            Some("https://bots.example.com".to_string())
        );
        assert_eq!(url_origin("not a url"), None);
    }
}
