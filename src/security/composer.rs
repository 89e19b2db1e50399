use super::request::{Principal, SecurityRequest};
use super::schemes::{AuthOutcome, Authenticator};
use crate::errors::ApiError;
use crate::spec::{Operation, SecurityAlternative};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Scheme name -> authenticator, built at startup and read-only after.
#[derive(Clone, Default)]
pub struct Authenticators {
    by_scheme: HashMap<String, Arc<dyn Authenticator>>,
}

impl fmt::Debug for Authenticators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.by_scheme.keys().collect();
        names.sort();
        f.debug_struct("Authenticators")
            .field("schemes", &names)
            .finish()
    }
}

impl Authenticators {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, scheme: impl Into<String>, authenticator: impl Authenticator + 'static) {
        self.by_scheme.insert(scheme.into(), Arc::new(authenticator));
    }

    #[must_use]
    pub fn get(&self, scheme: &str) -> Option<&Arc<dyn Authenticator>> {
        self.by_scheme.get(scheme)
    }

    #[must_use]
    pub fn contains(&self, scheme: &str) -> bool {
        self.by_scheme.contains_key(scheme)
    }

    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.by_scheme.keys().map(String::as_str)
    }
}

/// Outcome of evaluating an operation's security alternatives for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthDecision {
    /// Whether any alternative recognised credential material.
    pub applies: bool,
    /// `None` on anonymous access or failure.
    pub principal: Option<Principal>,
    /// `None` on success.
    pub error: Option<ApiError>,
    /// Index of the alternative that decided the outcome.
    pub alternative: Option<usize>,
}

impl AuthDecision {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Success with the principal (if any), or the failure.
    pub fn result(&self) -> Result<Option<&Principal>, ApiError> {
        match &self.error {
            Some(err) => Err(err.clone()),
            None => Ok(self.principal.as_ref()),
        }
    }

    fn unsecured() -> Self {
        Self {
            applies: false,
            principal: None,
            error: None,
            alternative: None,
        }
    }
}

/// Evaluate `alternatives` in declaration order.
///
/// An alternative whose schemes all succeed grants access with the last
/// scheme's principal. The first alternative where a scheme applies but
/// fails ends evaluation with that failure. An alternative with a
/// non-applicable scheme is abandoned. If nothing applied, an anonymous
/// alternative grants access without a principal, otherwise the result is
/// `Unauthenticated` naming every referenced scheme. An empty list needs no
/// authentication.
#[must_use]
pub fn compose(
    alternatives: &[SecurityAlternative],
    authenticators: &Authenticators,
    req: &SecurityRequest<'_>,
) -> AuthDecision {
    if alternatives.is_empty() {
        return AuthDecision::unsecured();
    }

    let mut anonymous: Option<usize> = None;
    'alternatives: for (idx, alternative) in alternatives.iter().enumerate() {
        if alternative.is_anonymous() {
            anonymous.get_or_insert(idx);
            continue;
        }

        let mut principal = None;
        for requirement in alternative.requirements() {
            let Some(authenticator) = authenticators.get(&requirement.scheme) else {
                error!(scheme = %requirement.scheme, "no authenticator registered");
                return AuthDecision {
                    applies: true,
                    principal: None,
                    error: Some(ApiError::internal(format!(
                        "no authenticator registered for {}",
                        requirement.scheme
                    ))),
                    alternative: Some(idx),
                };
            };
            match authenticator.authenticate(&requirement.scopes, req) {
                AuthOutcome::NotApplicable => {
                    debug!(scheme = %requirement.scheme, alternative = idx, "scheme not applicable");
                    continue 'alternatives;
                }
                AuthOutcome::Rejected(err) => {
                    debug!(
                        scheme = %requirement.scheme,
                        alternative = idx,
                        error = %err,
                        "scheme rejected credentials"
                    );
                    return AuthDecision {
                        applies: true,
                        principal: None,
                        error: Some(err),
                        alternative: Some(idx),
                    };
                }
                AuthOutcome::Authenticated(p) => {
                    debug!(scheme = %requirement.scheme, alternative = idx, "scheme authenticated");
                    principal = Some(p);
                }
            }
        }

        return AuthDecision {
            applies: true,
            principal,
            error: None,
            alternative: Some(idx),
        };
    }

    if let Some(idx) = anonymous {
        debug!(alternative = idx, "anonymous access granted");
        return AuthDecision {
            applies: false,
            principal: None,
            error: None,
            alternative: Some(idx),
        };
    }

    AuthDecision {
        applies: false,
        principal: None,
        error: Some(ApiError::unauthenticated(scheme_list(alternatives))),
        alternative: None,
    }
}

fn scheme_list(alternatives: &[SecurityAlternative]) -> String {
    let mut names: Vec<&str> = Vec::new();
    for req in alternatives.iter().flat_map(SecurityAlternative::requirements) {
        if !names.contains(&req.scheme.as_str()) {
            names.push(&req.scheme);
        }
    }
    names.join(", ")
}

/// Authorization check run after successful authentication. A rejection
/// reason becomes a `403 Forbidden`.
pub trait Authorizer: Send + Sync {
    fn authorize(&self, operation: &Operation, principal: Option<&Principal>) -> Result<(), String>;
}

impl<F> Authorizer for F
where
    F: Fn(&Operation, Option<&Principal>) -> Result<(), String> + Send + Sync,
{
    fn authorize(&self, operation: &Operation, principal: Option<&Principal>) -> Result<(), String> {
        self(operation, principal)
    }
}
