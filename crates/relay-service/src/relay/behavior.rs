//! Query-selected response behavior and the target URL it implies.

use url::Url;

/// Which upstream endpoint a relayed request is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behavior {
    /// The configured upstream URL.
    #[default]
    Normal,
    /// The upstream's `/error` endpoint.
    Error,
    /// The upstream's `/notfound` endpoint.
    NotFound,
}

/// Query parameters understood by relay routes: `?type=error` or `?error`.
#[derive(Debug, Default)]
pub struct BehaviorQuery {
    pub kind: Option<String>,
    pub error: Option<String>,
}

impl BehaviorQuery {
    /// Build from raw query pairs. A repeated key keeps its first value and
    /// unrelated keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_ref() {
                "type" => &mut query.kind,
                "error" => &mut query.error,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into());
            }
        }
        query
    }

    /// `error` wins over `type` unless it is explicitly `false` or `0`.
    /// Unknown `type` values mean [`Behavior::Normal`].
    pub fn behavior(&self) -> Behavior {
        if let Some(flag) = self.error.as_deref() {
            if !matches!(flag, "false" | "0") {
                return Behavior::Error;
            }
        }
        match self.kind.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("error") => Behavior::Error,
            Some("notfound") | Some("not_found") | Some("not-found") => Behavior::NotFound,
            _ => Behavior::Normal,
        }
    }
}

impl Behavior {
    pub fn as_str(self) -> &'static str {
        match self {
            Behavior::Normal => "normal",
            Behavior::Error => "error",
            Behavior::NotFound => "notfound",
        }
    }

    /// Resolve the outbound URL against the configured upstream.
    pub fn target(self, upstream: &str) -> Result<Url, url::ParseError> {
        let base = Url::parse(upstream)?;
        match self {
            Behavior::Normal => Ok(base),
            Behavior::Error => base.join("/error"),
            Behavior::NotFound => base.join("/notfound"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(kind: Option<&str>, error: Option<&str>) -> BehaviorQuery {
        BehaviorQuery {
            kind: kind.map(String::from),
            error: error.map(String::from),
        }
    }

    #[test]
    fn test_behavior_from_type() {
        assert_eq!(query(None, None).behavior(), Behavior::Normal);
        assert_eq!(query(Some("normal"), None).behavior(), Behavior::Normal);
        assert_eq!(query(Some("error"), None).behavior(), Behavior::Error);
        assert_eq!(query(Some("NotFound"), None).behavior(), Behavior::NotFound);
        assert_eq!(query(Some("bogus"), None).behavior(), Behavior::Normal);
    }

    #[test]
    fn test_error_flag() {
        assert_eq!(query(None, Some("")).behavior(), Behavior::Error);
        assert_eq!(query(None, Some("true")).behavior(), Behavior::Error);
        assert_eq!(query(Some("notfound"), Some("1")).behavior(), Behavior::Error);
        assert_eq!(query(None, Some("false")).behavior(), Behavior::Normal);
        assert_eq!(query(Some("notfound"), Some("0")).behavior(), Behavior::NotFound);
    }

    #[test]
    fn test_from_pairs_keeps_first_value() {
        let q = BehaviorQuery::from_pairs([("type", "error"), ("type", "notfound")]);
        assert_eq!(q.kind.as_deref(), Some("error"));
        assert_eq!(q.behavior(), Behavior::Error);

        let q = BehaviorQuery::from_pairs([("error", "0"), ("error", "1"), ("type", "notfound")]);
        assert_eq!(q.behavior(), Behavior::NotFound);

        let q = BehaviorQuery::from_pairs([("other", "x"), ("error", "")]);
        assert_eq!(q.error.as_deref(), Some(""));
        assert_eq!(q.behavior(), Behavior::Error);

        let q = BehaviorQuery::from_pairs(Vec::<(String, String)>::new());
        assert_eq!(q.behavior(), Behavior::Normal);
    }

    #[test]
    fn test_target_resolution() {
        let upstream = "http://provider:9090/info?x=1";
        assert_eq!(
            Behavior::Normal.target(upstream).unwrap().as_str(),
            "http://provider:9090/info?x=1"
        );
        assert_eq!(
            Behavior::Error.target(upstream).unwrap().as_str(),
            "http://provider:9090/error"
        );
        assert_eq!(
            Behavior::NotFound.target(upstream).unwrap().as_str(),
            "http://provider:9090/notfound"
        );
    }

    #[test]
    fn test_invalid_upstream() {
        assert!(Behavior::Normal.target("not a url").is_err());
    }
}
