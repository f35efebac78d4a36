use uuid::Uuid;

const ANONYMOUS_PREFIX: &str = "@anonymous/";

/// Scope key used when the project's identity cannot be established.
pub fn anonymous_scope_key(slug: &str, host_id: Uuid) -> String {
    format!("{ANONYMOUS_PREFIX}{slug}-{host_id}")
}

pub fn is_anonymous_scope_key(scope_key: &str) -> bool {
    scope_key.starts_with(ANONYMOUS_PREFIX)
}
