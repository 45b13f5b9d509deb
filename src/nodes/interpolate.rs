use crate::engine::types::Context;

const OPEN: &str = "${ctx.";

/// Replace `${ctx.key}` and `${ctx.nested.key}` references with values from
/// the host context. Unknown references become empty strings; an unclosed
/// reference is left as-is.
pub fn interpolate_ctx(template: &str, ctx: &Context) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find(OPEN) {
        let after = &rest[open + OPEN.len()..];
        let Some(close) = after.find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        out.push_str(&lookup(&after[..close], ctx));
        rest = &after[close + 1..];
    }

    out.push_str(rest);
    out
}

fn lookup(path: &str, ctx: &Context) -> String {
    let mut parts = path.split('.');
    let Some(mut current) = parts.next().and_then(|head| ctx.get(head)) else {
        return String::new();
    };
    for part in parts {
        match current.get(part) {
            Some(next) => current = next,
            None => return String::new(),
        }
    }

    match current {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// String value of `key` in a node config, interpolated against `ctx`.
/// Numbers are accepted and rendered as text.
pub fn config_str(config: &serde_json::Value, key: &str, ctx: &Context) -> Option<String> {
    match config.get(key)? {
        serde_json::Value::String(s) => Some(interpolate_ctx(s, ctx)),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
