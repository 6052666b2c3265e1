//! Handler parameter declarations and their classification.
//!
//! Each route states its parameters up front as a [`Signature`]. [`inspect`] runs once at
//! registration and yields the [`Classification`] the dispatcher consults on every call.

use crate::error::RegistrationError;
use std::collections::HashSet;
use std::fmt;

/// Reserved parameter name for the request object.
pub const REQUEST_PARAM: &str = "request";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// Positional-or-keyword; filled from path captures when no keyword source applies.
    Positional,
    VarPositional,
    KeywordOnly { required: bool },
    VarKeyword,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub kind: ParamKind,
}

impl Param {
    pub fn positional(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::Positional,
        }
    }

    pub fn var_positional(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::VarPositional,
        }
    }

    /// Required keyword-only parameter.
    pub fn keyword(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::KeywordOnly { required: true },
        }
    }

    /// Keyword-only parameter with a fallback inside the handler.
    pub fn keyword_opt(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::KeywordOnly { required: false },
        }
    }

    pub fn var_keyword(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            kind: ParamKind::VarKeyword,
        }
    }
}

/// Ordered parameter list of a handler.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signature {
    params: Vec<Param>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    pub fn positional(self, name: impl Into<String>) -> Self {
        self.param(Param::positional(name))
    }

    /// Positional `request` parameter.
    pub fn request(self) -> Self {
        self.param(Param::positional(REQUEST_PARAM))
    }

    pub fn required(self, name: impl Into<String>) -> Self {
        self.param(Param::keyword(name))
    }

    pub fn optional(self, name: impl Into<String>) -> Self {
        self.param(Param::keyword_opt(name))
    }

    pub fn var_kw(self) -> Self {
        self.param(Param::var_keyword("kw"))
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }
}

impl FromIterator<Param> for Signature {
    fn from_iter<I: IntoIterator<Item = Param>>(iter: I) -> Self {
        Signature {
            params: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut star_written = false;
        let mut parts = Vec::with_capacity(self.params.len() + 1);
        for p in &self.params {
            match p.kind {
                ParamKind::Positional => parts.push(p.name.clone()),
                ParamKind::VarPositional => {
                    star_written = true;
                    parts.push(format!("*{}", p.name));
                }
                ParamKind::KeywordOnly { required } => {
                    if !star_written {
                        star_written = true;
                        parts.push("*".into());
                    }
                    if required {
                        parts.push(p.name.clone());
                    } else {
                        parts.push(format!("{}=None", p.name));
                    }
                }
                ParamKind::VarKeyword => parts.push(format!("**{}", p.name)),
            }
        }
        write!(f, "({})", parts.join(", "))
    }
}

/// What the dispatcher needs to know about a handler's parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    pub takes_request: bool,
    pub accepts_var_kw: bool,
    /// Keyword-only parameter names in declaration order.
    pub named: Vec<String>,
    /// Subset of `named` without a fallback.
    pub required: Vec<String>,
}

impl Classification {
    /// Whether arguments must come from the body or query string.
    pub fn needs_keywords(&self) -> bool {
        self.accepts_var_kw || !self.named.is_empty() || !self.required.is_empty()
    }
}

/// Classify a declared signature. Fails when `request` is followed by another
/// positional-or-keyword parameter, or when a name is declared twice.
pub fn inspect(handler: &str, sig: &Signature) -> Result<Classification, RegistrationError> {
    let mut out = Classification::default();
    let mut seen = HashSet::new();
    for p in sig.params() {
        if !seen.insert(p.name.as_str()) {
            return Err(RegistrationError::DuplicateParam {
                handler: handler.to_string(),
                param: p.name.clone(),
            });
        }
        if p.name == REQUEST_PARAM {
            out.takes_request = true;
            continue;
        }
        if out.takes_request && p.kind == ParamKind::Positional {
            return Err(RegistrationError::RequestParamPlacement {
                handler: handler.to_string(),
                signature: sig.to_string(),
            });
        }
        match p.kind {
            ParamKind::KeywordOnly { required } => {
                out.named.push(p.name.clone());
                if required {
                    out.required.push(p.name.clone());
                }
            }
            ParamKind::VarKeyword => out.accepts_var_kw = true,
            ParamKind::Positional | ParamKind::VarPositional => {}
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buckets_are_filled_in_order() {
        let sig = Signature::new().request().required("email").optional("page").required("name").var_kw();
        let c = inspect("register", &sig).unwrap();
        assert!(c.takes_request);
        assert!(c.accepts_var_kw);
        assert_eq!(c.named, ["email", "page", "name"]);
        assert_eq!(c.required, ["email", "name"]);
        assert!(c.needs_keywords());
    }

    #[test]
    fn empty_signature_needs_nothing() {
        let c = inspect("index", &Signature::new()).unwrap();
        assert_eq!(c, Classification::default());
        assert!(!c.needs_keywords());
    }

    #[test]
    fn positional_only_needs_no_keywords() {
        let c = inspect("blog", &Signature::new().positional("id").request()).unwrap();
        assert!(c.takes_request);
        assert!(!c.needs_keywords());
    }

    #[test]
    fn request_followed_by_positional_fails() {
        let sig = Signature::new().request().positional("id");
        let err = inspect("blog", &sig).unwrap_err();
        match err {
            RegistrationError::RequestParamPlacement { handler, signature } => {
                assert_eq!(handler, "blog");
                assert_eq!(signature, "(request, id)");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn request_may_precede_variadic_and_keyword_tail() {
        let sig: Signature = [
            Param::positional(REQUEST_PARAM),
            Param::var_positional("args"),
            Param::keyword("id"),
            Param::var_keyword("kw"),
        ]
        .into_iter()
        .collect();
        assert!(inspect("ok", &sig).is_ok());
    }

    #[test]
    fn duplicate_names_fail() {
        let sig = Signature::new().required("id").optional("id");
        assert!(matches!(
            inspect("dup", &sig),
            Err(RegistrationError::DuplicateParam { .. })
        ));
    }

    #[test]
    fn display_renders_keyword_marker() {
        let sig = Signature::new().request().required("name").optional("page").var_kw();
        assert_eq!(sig.to_string(), "(request, *, name, page=None, **kw)");
    }
}
