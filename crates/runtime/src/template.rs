//! Resource URI templates of the form `scheme://literal/{var}`.

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Var(String),
}

/// A parsed URI template. Variables match one non-empty, slash-free segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    raw: String,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed '{{' in template '{0}'")]
    Unclosed(String),
    #[error("empty variable name in template '{0}'")]
    EmptyVariable(String),
    #[error("adjacent variables in template '{0}'")]
    AdjacentVariables(String),
}

impl UriTemplate {
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut rest = raw;

        while let Some(open) = rest.find('{') {
            if open > 0 {
                parts.push(Part::Literal(rest[..open].to_string()));
            }
            let after = &rest[open + 1..];
            let close = after
                .find('}')
                .ok_or_else(|| TemplateError::Unclosed(raw.to_string()))?;
            let name = after[..close].trim();
            if name.is_empty() {
                return Err(TemplateError::EmptyVariable(raw.to_string()));
            }
            if matches!(parts.last(), Some(Part::Var(_))) {
                return Err(TemplateError::AdjacentVariables(raw.to_string()));
            }
            parts.push(Part::Var(name.to_string()));
            rest = &after[close + 1..];
        }
        if !rest.is_empty() {
            parts.push(Part::Literal(rest.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Variable names in order of appearance.
    pub fn variables(&self) -> impl Iterator<Item = &str> + '_ {
        self.parts.iter().filter_map(|p| match p {
            Part::Var(name) => Some(name.as_str()),
            Part::Literal(_) => None,
        })
    }

    pub fn is_static(&self) -> bool {
        self.variables().next().is_none()
    }

    /// Match a concrete URI, returning `(variable, raw value)` pairs.
    pub fn match_uri(&self, uri: &str) -> Option<Vec<(String, String)>> {
        let mut rest = uri;
        let mut captured = Vec::new();
        let mut parts = self.parts.iter().peekable();

        while let Some(part) = parts.next() {
            match part {
                Part::Literal(lit) => rest = rest.strip_prefix(lit.as_str())?,
                Part::Var(name) => {
                    let end = match parts.peek() {
                        Some(Part::Literal(next)) => rest.find(next.as_str())?,
                        _ => rest.len(),
                    };
                    let value = &rest[..end];
                    if value.is_empty() || value.contains('/') {
                        return None;
                    }
                    captured.push((name.clone(), value.to_string()));
                    rest = &rest[end..];
                }
            }
        }

        rest.is_empty().then_some(captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_single_variable() {
        let t = UriTemplate::parse("quote://{quote_id}").unwrap();
        assert_eq!(t.variables().collect::<Vec<_>>(), vec!["quote_id"]);
        assert_eq!(
            t.match_uri("quote://1"),
            Some(vec![("quote_id".to_string(), "1".to_string())])
        );
        assert_eq!(t.match_uri("quote://"), None);
        assert_eq!(t.match_uri("quote://1/2"), None);
        assert_eq!(t.match_uri("joke://1"), None);
    }

    #[test]
    fn test_match_with_trailing_literal() {
        let t = UriTemplate::parse("users://{id}/profile").unwrap();
        assert_eq!(
            t.match_uri("users://42/profile"),
            Some(vec![("id".to_string(), "42".to_string())])
        );
        assert_eq!(t.match_uri("users://42/settings"), None);
    }

    #[test]
    fn test_static_template() {
        let t = UriTemplate::parse("config://app").unwrap();
        assert!(t.is_static());
        assert_eq!(t.match_uri("config://app"), Some(vec![]));
        assert_eq!(t.match_uri("config://app2"), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            UriTemplate::parse("quote://{id"),
            Err(TemplateError::Unclosed(_))
        ));
        assert!(matches!(
            UriTemplate::parse("quote://{}"),
            Err(TemplateError::EmptyVariable(_))
        ));
        assert!(matches!(
            UriTemplate::parse("x://{a}{b}"),
            Err(TemplateError::AdjacentVariables(_))
        ));
    }
}
