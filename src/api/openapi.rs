use super::handlers::{admin_auth, admins, health, user_auth, users, version};
use utoipa::openapi::{
    security::{Http, HttpAuthScheme, SecurityScheme},
    Components, Contact, InfoBuilder, License, OpenApiBuilder, Tag,
};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` spec. Handlers sharing a path go in
/// the same `routes!` call.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(version::version))
        .routes(routes!(user_auth::register))
        .routes(routes!(user_auth::login))
        .routes(routes!(user_auth::refresh))
        .routes(routes!(user_auth::logout))
        .routes(routes!(user_auth::confirm_registration))
        .routes(routes!(user_auth::resend_confirmation_code))
        .routes(routes!(user_auth::change_password))
        .routes(routes!(user_auth::forgot_password))
        .routes(routes!(user_auth::confirm_forgot_password))
        .routes(routes!(users::change_status))
        .routes(routes!(admin_auth::register))
        .routes(routes!(admin_auth::login))
        .routes(routes!(admin_auth::logout))
        .routes(routes!(admin_auth::refresh))
        .routes(routes!(admins::change_status))
        .routes(routes!(users::index, users::store))
        .routes(routes!(users::show, users::update, users::destroy))
        .routes(routes!(admins::index, admins::store))
        .routes(routes!(admins::show, admins::update, admins::destroy));

    let openapi = router.get_openapi_mut();
    openapi.tags = Some(vec![
        tag("auth", "Sign-up, login and confirmation"),
        tag("users", "Provider-backed user accounts"),
        tag("admins", "Local admin accounts"),
        tag("health", "Service health"),
        tag("system", "Service metadata"),
    ]);

    let components = openapi.components.get_or_insert_with(Components::default);
    components.add_security_scheme("bearer", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));

    router
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let spec = openapi();
        assert_eq!(spec.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(spec.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            spec.info.description.as_deref(),
            Some(env!("CARGO_PKG_DESCRIPTION"))
        );

        let contact = spec.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team Roster"));
            assert_eq!(contact.email.as_deref(), Some("team@roster.dev"));
        }

        let license = spec.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.name, "BSD-3-Clause");
        }
    }

    #[test]
    fn openapi_tags_and_paths() {
        let spec = openapi();
        let tags = spec.tags.clone().unwrap_or_default();
        for name in ["auth", "users", "admins", "health", "system"] {
            assert!(tags.iter().any(|tag| tag.name == name), "missing tag {name}");
        }
        for path in [
            "/auth/user/register",
            "/auth/user/confirm-registration",
            "/auth/user/{id}/status",
            "/auth/admin/{id}/status",
            "/users/{id}",
            "/admins",
            "/version",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing path {path}");
        }
    }

    #[test]
    fn parse_author_variants() {
        assert_eq!(
            parse_author("Team Roster <team@roster.dev>"),
            (Some("Team Roster"), Some("team@roster.dev"))
        );
        assert_eq!(parse_author("Solo"), (Some("Solo"), None));
        assert_eq!(parse_author("<only@mail.dev>"), (None, Some("only@mail.dev")));
    }
}
