//! Subdomain resolution
//!
//! Maps the leftmost label of the Host header to a project and derives
//! the artifact root the request is forwarded to. The root is a pure
//! function of the project id, so the proxy needs no per-deployment
//! state.

use sqlx::PgPool;
use uuid::Uuid;

/// The project a subdomain resolves to
#[derive(Debug, Clone)]
pub struct ResolvedProject {
    pub id: Uuid,
    pub subdomain: String,
}

/// Extracts the subdomain from a Host header value, ignoring any port
///
/// Returns `None` for an empty host.
pub fn subdomain_from_host(host: &str) -> Option<&str> {
    let host = host.split(':').next().unwrap_or(host);
    let label = host.split('.').next().unwrap_or(host);

    if label.is_empty() { None } else { Some(label) }
}

/// Looks up the project owning `subdomain`
pub async fn project_for_subdomain(
    pool: &PgPool,
    subdomain: &str,
) -> Result<Option<ResolvedProject>, sqlx::Error> {
    let row: Option<(Uuid, String)> = sqlx::query_as(
        r#"
        SELECT id, subdomain
        FROM projects
        WHERE subdomain = $1
        "#,
    )
    .bind(subdomain)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(id, subdomain)| ResolvedProject { id, subdomain }))
}

/// Artifact root of a project under the configured origin
pub fn artifact_root(origin: &str, project_id: Uuid) -> String {
    format!("{}/{}", origin.trim_end_matches('/'), project_id)
}

/// Full upstream URL for a request path
///
/// A bare root path is rewritten to the index resource; everything else
/// is forwarded untouched, query string included.
pub fn target_url(root: &str, path: &str, query: Option<&str>) -> String {
    let path = if path == "/" { "/index.html" } else { path };

    match query {
        Some(q) => format!("{}{}?{}", root, path, q),
        None => format!("{}{}", root, path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subdomain_extraction() {
        assert_eq!(
            subdomain_from_host("happy-azure-otter.example.com"),
            Some("happy-azure-otter")
        );
        assert_eq!(
            subdomain_from_host("happy-azure-otter.localhost:8000"),
            Some("happy-azure-otter")
        );
        assert_eq!(subdomain_from_host("localhost"), Some("localhost"));
        assert_eq!(subdomain_from_host(""), None);
    }

    #[test]
    fn test_artifact_root_derivation() {
        let id = Uuid::new_v4();

        assert_eq!(
            artifact_root("http://artifacts.internal/__outputs", id),
            format!("http://artifacts.internal/__outputs/{}", id)
        );

        // Trailing slash on the origin does not double up
        assert_eq!(
            artifact_root("http://artifacts.internal/__outputs/", id),
            format!("http://artifacts.internal/__outputs/{}", id)
        );
    }

    #[test]
    fn test_root_path_rewritten_to_index() {
        assert_eq!(
            target_url("http://a/p", "/", None),
            "http://a/p/index.html"
        );
    }

    #[test]
    fn test_non_root_paths_forwarded_untouched() {
        assert_eq!(
            target_url("http://a/p", "/assets/app.js", None),
            "http://a/p/assets/app.js"
        );
        assert_eq!(
            target_url("http://a/p", "/search", Some("q=1")),
            "http://a/p/search?q=1"
        );
    }
}
