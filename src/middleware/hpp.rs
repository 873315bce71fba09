//! HTTP parameter pollution guard: a repeated query key keeps its last value.

use super::query::rewrite_query;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

/// Collapse repeated keys to their last occurrence, in first-seen order.
/// Keys in `whitelist` keep every value.
pub fn collapse_repeated(pairs: Vec<(String, String)>, whitelist: &[String]) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(pairs.len());
    for (key, value) in pairs {
        if whitelist.iter().any(|w| *w == key) {
            out.push((key, value));
            continue;
        }
        match out.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => out.push((key, value)),
        }
    }
    out
}

pub async fn hpp(State(state): State<AppState>, mut req: Request, next: Next) -> Result<Response, AppError> {
    let whitelist = &state.config.hpp_whitelist;
    rewrite_query(&mut req, |pairs| collapse_repeated(pairs, whitelist))?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn last_value_wins() {
        let got = collapse_repeated(pairs(&[("sort", "name"), ("page", "1"), ("sort", "-name")]), &[]);
        assert_eq!(got, pairs(&[("sort", "-name"), ("page", "1")]));
    }

    #[test]
    fn whitelisted_keys_repeat() {
        let whitelist = vec!["province".to_string()];
        let got = collapse_repeated(
            pairs(&[("province", "A"), ("province", "B"), ("limit", "5"), ("limit", "10")]),
            &whitelist,
        );
        assert_eq!(got, pairs(&[("province", "A"), ("province", "B"), ("limit", "10")]));
    }
}
