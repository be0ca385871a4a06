//! Remote phishing list registry.
//!
//! Each resource type (domains, links) maps to one or more remote list
//! descriptors. A descriptor carries the three endpoints the sync actor needs
//! (full list, checksum, "new today" delta) and the matcher used to compare a
//! candidate URL against a stored entry.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

/// Kind of remote list being mirrored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
  /// Bare hostnames, matched on host equality.
  #[default]
  Domains,
  /// Scheme-less URLs, matched on path-boundary prefixes.
  Links,
}

impl ResourceType {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResourceType::Domains => "domains",
      ResourceType::Links => "links",
    }
  }

  /// Comparison semantics for entries of this type
  pub fn matcher(&self) -> Matcher {
    match self {
      ResourceType::Domains => Matcher::Domain,
      ResourceType::Links => Matcher::Link,
    }
  }

  /// Name of the store table holding this resource's entries
  pub fn table_name(&self) -> String {
    format!("{}_entries", self.as_str())
  }
}

impl std::fmt::Display for ResourceType {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

impl std::str::FromStr for ResourceType {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "domains" | "domain" => Ok(ResourceType::Domains),
      "links" | "link" => Ok(ResourceType::Links),
      other => Err(format!("unknown resource type: {}", other)),
    }
  }
}

/// Entry comparison semantics for a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
  /// Exact hostname equality, or exact/`/`-prefixed path equality when the
  /// entry itself carries a path.
  Domain,
  /// Exact scheme-stripped href, or a prefix followed by `/`, `?` or `#`.
  Link,
}

impl Matcher {
  /// Test a candidate URL against one stored entry.
  pub fn matches(&self, candidate: &str, entry: &str) -> bool {
    match self {
      Matcher::Domain => domain_matches(candidate, entry),
      Matcher::Link => link_matches(candidate, entry),
    }
  }

  /// Canonical stored form of a raw list entry, or `None` if nothing is left
  /// after normalization.
  ///
  /// `matches(candidate, entry)` depends on `entry` only through this key, so
  /// stores and working sets hold keys rather than raw lines.
  pub fn entry_key(&self, raw: &str) -> Option<String> {
    let key = match self {
      Matcher::Domain => normalize(raw),
      Matcher::Link => normalize(&unescape(raw)),
    };
    (!key.is_empty()).then_some(key)
  }

  /// Keys whose presence in a set of [`Matcher::entry_key`]s is equivalent
  /// to [`Matcher::matches`] succeeding for some entry in that set.
  ///
  /// Returns `None` when the matcher's semantics can't be reduced to set
  /// membership and callers have to iterate entries instead.
  pub fn membership_keys(&self, candidate: &str) -> Option<Vec<String>> {
    match self {
      Matcher::Domain => {
        let candidate = NormalizedUrl::parse(candidate);
        let mut keys = Vec::new();
        if let Some(host) = candidate.host {
          keys.push(host);
        }
        // Every '/'-boundary prefix of the scheme-less href, longest first
        let href = candidate.href;
        let mut end = href.len();
        while let Some(idx) = href[..end].rfind('/') {
          keys.push(href[..end].to_string());
          end = idx;
        }
        if end > 0 {
          keys.push(href[..end].to_string());
        }
        let mut seen = HashSet::new();
        keys.retain(|k| seen.insert(k.clone()));
        Some(keys)
      }
      Matcher::Link => None,
    }
  }

  /// Single key used for direct point lookups (exact-match mode).
  pub fn exact_key(&self, candidate: &str) -> Option<String> {
    match self {
      Matcher::Domain => NormalizedUrl::parse(candidate).host,
      Matcher::Link => {
        let href = NormalizedUrl::parse(&unescape(candidate)).href;
        (!href.is_empty()).then_some(href)
      }
    }
  }
}

/// A remote list descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
  pub resource_type: ResourceType,
  pub name: String,
  /// Complete list, newline-delimited (tens of megabytes)
  pub full_url: String,
  /// Short opaque token that changes whenever the full list does
  pub checksum_url: String,
  /// Entries added since the last full list generation
  pub delta_url: String,
  pub matcher: Matcher,
}

impl ResourceDescriptor {
  pub fn matches(&self, candidate: &str, entry: &str) -> bool {
    self.matcher.matches(candidate, entry)
  }

  /// Replace endpoints with explicit overrides (mirrors, test servers).
  pub fn with_overrides(mut self, full: Option<&str>, checksum: Option<&str>, delta: Option<&str>) -> Self {
    if let Some(full) = full {
      self.full_url = full.to_string();
    }
    if let Some(checksum) = checksum {
      self.checksum_url = checksum.to_string();
    }
    if let Some(delta) = delta {
      self.delta_url = delta.to_string();
    }
    self
  }
}

struct StaticResource {
  resource_type: ResourceType,
  name: &'static str,
  full_url: &'static str,
  checksum_url: &'static str,
  delta_url: &'static str,
}

const RESOURCES: &[StaticResource] = &[
  StaticResource {
    resource_type: ResourceType::Domains,
    name: "Phishing.Database Domains",
    full_url: "https://raw.githubusercontent.com/Phishing-Database/Phishing.Database/master/phishing-domains-ACTIVE.txt",
    checksum_url: "https://raw.githubusercontent.com/Phishing-Database/checksums/refs/heads/master/phishing-domains-ACTIVE.txt.md5",
    delta_url: "https://raw.githubusercontent.com/Phishing-Database/Phishing.Database/refs/heads/master/phishing-domains-NEW-today.txt",
  },
  StaticResource {
    resource_type: ResourceType::Links,
    name: "Phishing.Database Links",
    full_url: "https://raw.githubusercontent.com/Phishing-Database/Phishing.Database/master/phishing-links-ACTIVE.txt",
    checksum_url: "https://raw.githubusercontent.com/Phishing-Database/checksums/refs/heads/master/phishing-links-ACTIVE.txt.md5",
    delta_url: "https://raw.githubusercontent.com/Phishing-Database/Phishing.Database/refs/heads/master/phishing-links-NEW-today.txt",
  },
];

/// Look up the `index`-th descriptor registered for a resource type.
pub fn lookup(resource_type: ResourceType, index: usize) -> Option<ResourceDescriptor> {
  RESOURCES
    .iter()
    .filter(|r| r.resource_type == resource_type)
    .nth(index)
    .map(|r| ResourceDescriptor {
      resource_type: r.resource_type,
      name: r.name.to_string(),
      full_url: r.full_url.to_string(),
      checksum_url: r.checksum_url.to_string(),
      delta_url: r.delta_url.to_string(),
      matcher: r.resource_type.matcher(),
    })
}

// ============================================================================
// Normalization
// ============================================================================

/// Candidate URL reduced to the forms the matchers compare against.
struct NormalizedUrl {
  /// Lowercased hostname, if one could be determined
  host: Option<String>,
  /// Lowercased href with scheme and trailing slash removed
  href: String,
}

impl NormalizedUrl {
  fn parse(candidate: &str) -> Self {
    let trimmed = candidate.trim();
    match Url::parse(trimmed) {
      Ok(url) if url.host_str().is_some() => Self {
        host: url.host_str().map(|h| h.to_lowercase()),
        href: normalize(url.as_str()),
      },
      // Scheme-less input ("phish.com/login"): treat the text up to the first
      // path/query/fragment delimiter as the host
      _ => {
        let href = normalize(trimmed);
        let host = href
          .split(['/', '?', '#'])
          .next()
          .filter(|h| !h.is_empty())
          .map(str::to_string);
        Self { host, href }
      }
    }
  }
}

/// Lowercase, strip scheme, strip trailing slash.
fn normalize(value: &str) -> String {
  let lower = value.trim().to_lowercase();
  let without_scheme = match lower.find("://") {
    Some(idx) if lower[..idx].chars().all(|c| c.is_ascii_alphanumeric() || "+-.".contains(c)) => {
      &lower[idx + 3..]
    }
    _ => lower.as_str(),
  };
  without_scheme.trim_end_matches('/').to_string()
}

fn unescape(value: &str) -> String {
  value.replace("&amp;", "&")
}

fn domain_matches(candidate: &str, entry: &str) -> bool {
  let Some(entry) = Matcher::Domain.entry_key(entry) else {
    return false;
  };

  let candidate = NormalizedUrl::parse(candidate);
  if entry.contains('/') {
    return candidate.href == entry
      || candidate
        .href
        .strip_prefix(entry.as_str())
        .is_some_and(|rest| rest.starts_with('/'));
  }

  candidate.host.as_deref() == Some(entry.as_str())
}

fn link_matches(candidate: &str, entry: &str) -> bool {
  let Some(entry) = Matcher::Link.entry_key(entry) else {
    return false;
  };

  let href = NormalizedUrl::parse(&unescape(candidate)).href;
  if href == entry {
    return true;
  }

  href
    .strip_prefix(entry.as_str())
    .and_then(|rest| rest.chars().next())
    .is_some_and(|c| matches!(c, '/' | '?' | '#'))
}
