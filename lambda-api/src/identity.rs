//! Resolves the tenant a request belongs to from its `Authorization` header.
//!
//! Signed requests carry a credential scope of the form
//! `<identity>/<date>/<region>/<service>/<terminator>`:
//!
//! ```text
//! AWS4-HMAC-SHA256 Credential=123/20240101/us-east-1/lambda/aws4_request, SignedHeaders=host, Signature=...
//! ```
//!
//! Only the identity and region are used. Nothing is verified: this is a
//! stand-in for the real service, not an authenticator.

use registry::TenantKey;
use regex::Regex;
use std::sync::LazyLock;

static CREDENTIAL_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Credential=([^,]*),").expect("credential pattern is valid"));

/// The segments of a credential scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialScope<'a> {
    pub identity: &'a str,
    pub date: &'a str,
    pub region: &'a str,
    pub service: &'a str,
    pub terminator: &'a str,
}

impl CredentialScope<'_> {
    pub fn tenant(&self) -> TenantKey {
        TenantKey::new(self.identity, self.region)
    }
}

/// Why a header did not yield a tenant.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("no authorization header")]
    Missing,

    #[error("authorization header is not valid UTF-8")]
    NotUtf8,

    #[error("authorization header has no Credential fragment")]
    NoCredential,

    #[error("malformed credential scope: {0:?}")]
    MalformedScope(String),
}

/// Parses the credential scope out of an `Authorization` header value.
pub fn parse_credential_scope(header: &str) -> Result<CredentialScope<'_>, CredentialError> {
    let scope = CREDENTIAL_FRAGMENT
        .captures(header)
        .and_then(|captures| captures.get(1))
        .ok_or(CredentialError::NoCredential)?
        .as_str()
        .trim();

    let segments: Vec<&str> = scope.split('/').collect();
    let &[identity, date, region, service, terminator] = segments.as_slice() else {
        return Err(CredentialError::MalformedScope(scope.to_string()));
    };

    if identity.is_empty() || region.is_empty() {
        return Err(CredentialError::MalformedScope(scope.to_string()));
    }

    Ok(CredentialScope {
        identity,
        date,
        region,
        service,
        terminator,
    })
}

/// Like [`resolve`], but reports why the default tenant would be used.
pub fn try_resolve(header: Option<&[u8]>) -> Result<TenantKey, CredentialError> {
    let header = header.ok_or(CredentialError::Missing)?;
    let header = std::str::from_utf8(header).map_err(|_| CredentialError::NotUtf8)?;
    parse_credential_scope(header).map(|scope| scope.tenant())
}

/// Returns the tenant named by the header, or the default tenant when the
/// header is absent or unusable.
pub fn resolve(header: Option<&[u8]>) -> TenantKey {
    match try_resolve(header) {
        Ok(tenant) => tenant,
        Err(reason) => {
            tracing::debug!(%reason, "Using default tenant");
            TenantKey::default_tenant()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNED: &str = "AWS4-HMAC-SHA256 Credential=123/20240101/us-east-1/lambda/aws4_request, SignedHeaders=host;x-amz-date, Signature=0123abcd";

    #[test]
    fn test_parse_signed_header() {
        let scope = parse_credential_scope(SIGNED).unwrap();
        assert_eq!(
            scope,
            CredentialScope {
                identity: "123",
                date: "20240101",
                region: "us-east-1",
                service: "lambda",
                terminator: "aws4_request",
            }
        );
        assert_eq!(scope.tenant(), TenantKey::new("123", "us-east-1"));
    }

    #[test]
    fn test_unvalidated_segments() {
        // Date, service and terminator are not checked
        let scope = parse_credential_scope("Foo Credential=abc/not-a-date/mars-1/s3/x,").unwrap();
        assert_eq!(scope.tenant(), TenantKey::new("abc", "mars-1"));
        assert_eq!(scope.service, "s3");
    }

    #[test]
    fn test_parse_failures() {
        assert_eq!(
            parse_credential_scope("Bearer abc"),
            Err(CredentialError::NoCredential)
        );
        // The fragment must be terminated by a comma
        assert_eq!(
            parse_credential_scope("AWS4-HMAC-SHA256 Credential=123/20240101/us-east-1/lambda/aws4_request"),
            Err(CredentialError::NoCredential)
        );
        assert_eq!(
            parse_credential_scope("AWS4-HMAC-SHA256 Credential=123/us-east-1, Signature=x"),
            Err(CredentialError::MalformedScope("123/us-east-1".into()))
        );
        assert_eq!(
            parse_credential_scope("AWS4-HMAC-SHA256 Credential=/20240101/us-east-1/lambda/aws4_request, Signature=x"),
            Err(CredentialError::MalformedScope("/20240101/us-east-1/lambda/aws4_request".into()))
        );
        assert_eq!(
            parse_credential_scope("AWS4-HMAC-SHA256 Credential=123/20240101//lambda/aws4_request, Signature=x"),
            Err(CredentialError::MalformedScope("123/20240101//lambda/aws4_request".into()))
        );
    }

    #[test]
    fn test_resolve() {
        assert_eq!(
            resolve(Some(SIGNED.as_bytes())),
            TenantKey::new("123", "us-east-1")
        );
        assert_eq!(resolve(None), TenantKey::default_tenant());
        assert_eq!(resolve(Some(b"garbage")), TenantKey::default_tenant());
        assert_eq!(resolve(Some(b"\xff\xfe")), TenantKey::default_tenant());
        assert_eq!(try_resolve(None), Err(CredentialError::Missing));
        assert_eq!(try_resolve(Some(b"\xff")), Err(CredentialError::NotUtf8));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let first = resolve(Some(SIGNED.as_bytes()));
        for _ in 0..10 {
            assert_eq!(resolve(Some(SIGNED.as_bytes())), first);
        }
    }
}
