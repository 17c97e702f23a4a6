//! Static prefix table mapping request paths to logical services

use crate::config::RouteConfig;

/// A matched route and the path to forward downstream
#[derive(Debug, PartialEq, Eq)]
pub struct RouteMatch<'a> {
    pub service_name: &'a str,
    pub downstream_path: String,
}

/// Prefix routes, longest prefix first
pub struct RouteTable {
    routes: Vec<RouteConfig>,
}

impl RouteTable {
    pub fn new(mut routes: Vec<RouteConfig>) -> Self {
        for route in &mut routes {
            route.upstream_prefix = normalize(&route.upstream_prefix);
            route.downstream_prefix = normalize(&route.downstream_prefix);
        }
        routes.sort_by(|a, b| b.upstream_prefix.len().cmp(&a.upstream_prefix.len()));
        Self { routes }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Match `path_and_query` against the table
    pub fn match_path<'a>(&'a self, path_and_query: &str) -> Option<RouteMatch<'a>> {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };

        self.routes.iter().find_map(|route| {
            let rest = strip_prefix(path, &route.upstream_prefix)?;
            let mut downstream_path = format!("{}{}", route.downstream_prefix, rest);
            if downstream_path.is_empty() {
                downstream_path.push('/');
            }
            if let Some(query) = query {
                downstream_path.push('?');
                downstream_path.push_str(query);
            }
            Some(RouteMatch {
                service_name: &route.service_name,
                downstream_path,
            })
        })
    }
}

/// Strip `/`-terminated segments of `prefix` from `path`
fn strip_prefix<'p>(path: &'p str, prefix: &str) -> Option<&'p str> {
    if prefix.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

/// Leading slash, no trailing slash; the root prefix becomes empty
fn normalize(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
