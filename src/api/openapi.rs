use super::{
    error::ErrorResponse,
    handlers::{health, session},
};
use axum::response::Json;
use utoipa::{
    openapi::{Contact, License},
    OpenApi,
};

#[derive(OpenApi)]
#[openapi(
    paths(health::health, session::login, session::logout, session::check),
    components(schemas(
        health::Health,
        session::LoginRequest,
        session::LoginResponse,
        session::CheckResponse,
        ErrorResponse
    )),
    tags(
        (name = "health", description = "Liveness and build information"),
        (name = "auth", description = "Sessions and credential checks")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.info.title = env!("CARGO_PKG_NAME").to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc.info.description = optional_str(env!("CARGO_PKG_DESCRIPTION")).map(str::to_string);
    doc.info.contact = cargo_contact();
    doc.info.license = cargo_license();
    doc
}

pub(crate) async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(openapi())
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

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, rest)) => {
            let email = rest.split_once('>').map(|(email, _)| email.trim());
            (optional_str(name.trim()), email.and_then(optional_str))
        }
        None => (optional_str(author), None),
    }
}

fn optional_str(value: &str) -> Option<&str> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_documents_every_route() {
        let doc = openapi();
        for path in ["/health", "/auth/login", "/auth/logout", "/auth/check"] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
    }

    #[test]
    fn parse_author_splits_name_and_email() {
        assert_eq!(
            parse_author("Team Warden <team@warden.dev>"),
            (Some("Team Warden"), Some("team@warden.dev"))
        );
        assert_eq!(parse_author("solo"), (Some("solo"), None));
        assert_eq!(parse_author("<a@b.c>"), (None, Some("a@b.c")));
    }
}
