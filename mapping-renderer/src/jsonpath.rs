//! The JSONPath subset accepted by `$input.path` and `$input.json`:
//! `$`, `.name`, `['name']`, `["name"]`, `[n]`, `.*` and `[*]`.

use serde_json::Value as Json;

use crate::error::UtilError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Key(String),
    Index(usize),
    Wildcard,
}

/// Parse `expr` into steps below the root.
pub fn parse(expr: &str) -> Result<Vec<Step>, UtilError> {
    let invalid = |message: &str| UtilError::JsonPath {
        path: expr.to_string(),
        message: message.to_string(),
    };

    let trimmed = expr.trim();
    let Some(mut rest) = trimmed.strip_prefix('$') else {
        return Err(invalid("must start with '$'"));
    };

    let mut steps = Vec::new();
    while let Some(c) = rest.chars().next() {
        match c {
            '.' => {
                rest = &rest[1..];
                if let Some(after) = rest.strip_prefix('*') {
                    steps.push(Step::Wildcard);
                    rest = after;
                    continue;
                }
                let len = rest.find(['.', '[']).unwrap_or(rest.len());
                if len == 0 {
                    return Err(invalid("expected a member name after '.'"));
                }
                steps.push(Step::Key(rest[..len].to_string()));
                rest = &rest[len..];
            }
            '[' => {
                let Some(close) = rest.find(']') else {
                    return Err(invalid("unterminated '['"));
                };
                steps.push(bracket(rest[1..close].trim()).ok_or_else(|| invalid("bad subscript"))?);
                rest = &rest[close + 1..];
            }
            _ => return Err(invalid("expected '.' or '['")),
        }
    }
    Ok(steps)
}

fn bracket(inner: &str) -> Option<Step> {
    if inner == "*" {
        return Some(Step::Wildcard);
    }
    for quote in ['\'', '"'] {
        if let Some(key) = inner.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return Some(Step::Key(key.to_string()));
        }
    }
    inner.parse().ok().map(Step::Index)
}

/// Select from `root`. Paths with a wildcard yield an array of every match;
/// other paths yield the single match or `null`.
pub fn select(root: &Json, expr: &str) -> Result<Json, UtilError> {
    let steps = parse(expr)?;
    let mut matches = vec![root];
    for step in &steps {
        matches = matches
            .into_iter()
            .flat_map(|node| children(node, step))
            .collect();
    }
    if steps.contains(&Step::Wildcard) {
        Ok(Json::Array(matches.into_iter().cloned().collect()))
    } else {
        Ok(matches.first().map_or(Json::Null, |v| (*v).clone()))
    }
}

fn children<'j>(node: &'j Json, step: &Step) -> Vec<&'j Json> {
    match (node, step) {
        (Json::Object(map), Step::Key(key)) => map.get(key).into_iter().collect(),
        (Json::Array(items), Step::Index(i)) => items.get(*i).into_iter().collect(),
        (Json::Object(map), Step::Wildcard) => map.values().collect(),
        (Json::Array(items), Step::Wildcard) => items.iter().collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Json {
        json!({
            "store": {
                "book": [
                    {"title": "Sayings", "price": 8.95},
                    {"title": "Sword", "price": 12.99}
                ],
                "name.with.dots": true
            }
        })
    }

    #[test]
    fn parses_every_step_kind() {
        let steps = parse("$.a['b'][\"c\"][2].*[*]").unwrap();
        assert_eq!(
            steps,
            vec![
                Step::Key("a".into()),
                Step::Key("b".into()),
                Step::Key("c".into()),
                Step::Index(2),
                Step::Wildcard,
                Step::Wildcard,
            ]
        );
    }

    #[test]
    fn root_selects_everything() {
        assert_eq!(select(&doc(), "$").unwrap(), doc());
    }

    #[test]
    fn member_and_index_access() {
        assert_eq!(select(&doc(), "$.store.book[1].title").unwrap(), json!("Sword"));
        assert_eq!(select(&doc(), "$['store']['name.with.dots']").unwrap(), json!(true));
    }

    #[test]
    fn wildcards_collect_matches() {
        assert_eq!(select(&doc(), "$.store.book[*].price").unwrap(), json!([8.95, 12.99]));
    }

    #[test]
    fn missing_selection_is_null() {
        assert_eq!(select(&doc(), "$.store.magazine").unwrap(), Json::Null);
        assert_eq!(select(&doc(), "$.store.book[7]").unwrap(), Json::Null);
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for bad in ["store", "$.", "$[", "$[-1]", "$..book", "$x"] {
            assert!(
                matches!(parse(bad), Err(UtilError::JsonPath { .. })),
                "{bad:?} should be rejected"
            );
        }
    }
}
