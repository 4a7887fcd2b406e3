use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LocationParts {
    pub(crate) scheme: String,
    pub(crate) has_authority: bool,
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) hostname: String,
    pub(crate) port: String,
    pub(crate) pathname: String,
    pub(crate) opaque_path: String,
    pub(crate) search: String,
    pub(crate) hash: String,
}

impl LocationParts {
    pub(crate) fn protocol(&self) -> String {
        format!("{}:", self.scheme)
    }

    pub(crate) fn host(&self) -> String {
        if self.port.is_empty() || Some(self.port.as_str()) == default_port(&self.scheme) {
            self.hostname.clone()
        } else {
            format!("{}:{}", self.hostname, self.port)
        }
    }

    pub(crate) fn origin(&self) -> String {
        if self.has_authority && !self.hostname.is_empty() {
            format!("{}//{}", self.protocol(), self.host())
        } else {
            "null".to_string()
        }
    }

    pub(crate) fn href(&self) -> String {
        if self.has_authority {
            let path = if self.pathname.is_empty() {
                "/".to_string()
            } else {
                self.pathname.clone()
            };
            let credentials = if self.username.is_empty() && self.password.is_empty() {
                String::new()
            } else if self.password.is_empty() {
                format!("{}@", self.username)
            } else {
                format!("{}:{}@", self.username, self.password)
            };
            format!(
                "{}//{}{}{}{}{}",
                self.protocol(),
                credentials,
                self.host(),
                path,
                self.search,
                self.hash
            )
        } else {
            format!(
                "{}{}{}{}",
                self.protocol(),
                self.opaque_path,
                self.search,
                self.hash
            )
        }
    }

    /// The href with any `#fragment` dropped.
    pub(crate) fn document_href(&self) -> String {
        let mut without_hash = self.clone();
        without_hash.hash.clear();
        without_hash.href()
    }

    pub(crate) fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let scheme_end = trimmed.find(':')?;
        let scheme = trimmed[..scheme_end].to_ascii_lowercase();
        if !is_valid_url_scheme(&scheme) {
            return None;
        }
        let rest = &trimmed[scheme_end + 1..];
        if let Some(without_slashes) = rest.strip_prefix("//") {
            let authority_end = without_slashes
                .find(|ch| ['/', '?', '#'].contains(&ch))
                .unwrap_or(without_slashes.len());
            let authority = &without_slashes[..authority_end];
            let tail = &without_slashes[authority_end..];
            let (username, password, hostname, port) = split_authority_components(authority);
            let (pathname, search, hash) = split_path_search_hash(tail);
            let pathname = if pathname.is_empty() {
                "/".to_string()
            } else {
                normalize_pathname(&pathname)
            };
            Some(Self {
                scheme,
                has_authority: true,
                username,
                password,
                hostname: hostname.to_ascii_lowercase(),
                port,
                pathname,
                opaque_path: String::new(),
                search,
                hash,
            })
        } else {
            let (opaque_path, search, hash) = split_path_search_hash(rest);
            Some(Self {
                scheme,
                has_authority: false,
                username: String::new(),
                password: String::new(),
                hostname: String::new(),
                port: String::new(),
                pathname: String::new(),
                opaque_path,
                search,
                hash,
            })
        }
    }

    pub(crate) fn resolve(&self, input: &str) -> String {
        let input = input.trim();
        if input.is_empty() {
            return self.document_href();
        }

        if let Some(parts) = Self::parse(input) {
            return parts.href();
        }

        if input.starts_with("//") {
            return Self::parse(&format!("{}{}", self.protocol(), input))
                .map(|parts| parts.href())
                .unwrap_or_else(|| input.to_string());
        }

        let mut next = self.clone();
        if input.starts_with('#') {
            next.hash = ensure_hash_prefix(input);
            return next.href();
        }

        if input.starts_with('?') {
            next.search = ensure_search_prefix(input);
            next.hash.clear();
            return next.href();
        }

        let mut relative = input;
        let mut next_search = String::new();
        let mut next_hash = String::new();
        if let Some(hash_pos) = relative.find('#') {
            next_hash = ensure_hash_prefix(&relative[hash_pos + 1..]);
            relative = &relative[..hash_pos];
        }
        if let Some(search_pos) = relative.find('?') {
            next_search = ensure_search_prefix(&relative[search_pos + 1..]);
            relative = &relative[..search_pos];
        }

        if relative.starts_with('/') {
            if next.has_authority {
                next.pathname = normalize_pathname(relative);
            } else {
                next.opaque_path = relative.to_string();
            }
        } else if next.has_authority {
            let base_dir = if let Some((prefix, _)) = next.pathname.rsplit_once('/') {
                if prefix.is_empty() {
                    "/".to_string()
                } else {
                    format!("{prefix}/")
                }
            } else {
                "/".to_string()
            };
            next.pathname = normalize_pathname(&format!("{base_dir}{relative}"));
        } else {
            next.opaque_path = relative.to_string();
        }
        next.search = next_search;
        next.hash = next_hash;
        next.href()
    }
}

fn default_port(scheme: &str) -> Option<&'static str> {
    match scheme {
        "http" | "ws" => Some("80"),
        "https" | "wss" => Some("443"),
        _ => None,
    }
}

fn is_valid_url_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !first.is_ascii_alphabetic() {
        return false;
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
}

fn split_hostname_and_port(authority: &str) -> (String, String) {
    if authority.is_empty() {
        return (String::new(), String::new());
    }

    if let Some(rest) = authority.strip_prefix('[') {
        if let Some(end_idx) = rest.find(']') {
            let hostname = authority[..end_idx + 2].to_string();
            let suffix = &authority[end_idx + 2..];
            if let Some(port) = suffix.strip_prefix(':') {
                return (hostname, port.to_string());
            }
            return (hostname, String::new());
        }
    }

    if let Some((hostname, port)) = authority.rsplit_once(':') {
        if !hostname.contains(':') {
            return (hostname.to_string(), port.to_string());
        }
    }
    (authority.to_string(), String::new())
}

fn split_authority_components(authority: &str) -> (String, String, String, String) {
    if authority.is_empty() {
        return (String::new(), String::new(), String::new(), String::new());
    }

    let (userinfo, hostport) = match authority.rsplit_once('@') {
        Some((userinfo, hostport)) => (userinfo, hostport),
        None => ("", authority),
    };

    let (username, password) = if userinfo.is_empty() {
        (String::new(), String::new())
    } else if let Some((username, password)) = userinfo.split_once(':') {
        (username.to_string(), password.to_string())
    } else {
        (userinfo.to_string(), String::new())
    };

    let (hostname, port) = split_hostname_and_port(hostport);
    (username, password, hostname, port)
}

fn split_path_search_hash(tail: &str) -> (String, String, String) {
    let mut pathname = tail;
    let mut search = "";
    let mut hash = "";

    if let Some(hash_pos) = tail.find('#') {
        pathname = &tail[..hash_pos];
        hash = &tail[hash_pos..];
    }

    if let Some(search_pos) = pathname.find('?') {
        search = &pathname[search_pos..];
        pathname = &pathname[..search_pos];
    }

    (pathname.to_string(), search.to_string(), hash.to_string())
}

fn normalize_pathname(pathname: &str) -> String {
    let starts_with_slash = pathname.starts_with('/');
    let ends_with_slash = pathname.len() > 1
        && (pathname.ends_with('/') || pathname.ends_with("/.") || pathname.ends_with("/.."));
    let mut parts = Vec::new();
    for segment in pathname.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        if segment == ".." {
            parts.pop();
            continue;
        }
        parts.push(segment);
    }
    let mut out = if starts_with_slash {
        format!("/{}", parts.join("/"))
    } else {
        parts.join("/")
    };
    if out.is_empty() {
        out.push('/');
    }
    if ends_with_slash && !out.ends_with('/') {
        out.push('/');
    }
    out
}

fn ensure_search_prefix(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else if value.starts_with('?') {
        value.to_string()
    } else {
        format!("?{value}")
    }
}

fn ensure_hash_prefix(value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else if value.starts_with('#') {
        value.to_string()
    } else {
        format!("#{value}")
    }
}

/// Resolves `input` against the absolute `base` URL and returns the
/// serialized absolute URL.
pub fn resolve_url(input: &str, base: &str) -> Result<String> {
    let base_parts =
        LocationParts::parse(base).ok_or_else(|| Error::InvalidUrl(base.to_string()))?;
    Ok(base_parts.resolve(input))
}

/// Scheme/host/port triple of an absolute URL, or `"null"` for opaque URLs.
pub fn origin_of(url: &str) -> Result<String> {
    LocationParts::parse(url)
        .map(|parts| parts.origin())
        .ok_or_else(|| Error::InvalidUrl(url.to_string()))
}

pub fn is_javascript_scheme(value: &str) -> bool {
    let mut normalized = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_whitespace() || ch.is_ascii_control() {
            continue;
        }
        normalized.push(ch.to_ascii_lowercase());
    }
    normalized.starts_with("javascript:")
}

/// True when `href` only names a fragment of the current document.
pub fn is_fragment_only(href: &str) -> bool {
    href.trim().starts_with('#')
}

/// True when `to` differs from `from` by its fragment only, so following it
/// keeps the current document.
pub(crate) fn is_same_document(from: &str, to: &str) -> bool {
    let (Some(from_parts), Some(to_parts)) = (LocationParts::parse(from), LocationParts::parse(to))
    else {
        return false;
    };
    from_parts.document_href() == to_parts.document_href() && to_parts.href().contains('#')
}
