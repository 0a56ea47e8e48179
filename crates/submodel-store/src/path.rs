// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Hierarchical element paths.
//!
//! This module is the sole source of truth for how a human-readable
//! `idShortPath` maps to a tree location. A path is a non-empty sequence of
//! steps: the first step is a bare identifier, each later step is either
//! `.<identifier>` (named child) or `[<index>]` (list member).
//!
//! ```text
//! root.collection.prop
//! sensors[3].reading
//! ```
//!
//! Identifiers are non-empty and free of `.`, `[` and `]`; indexes are
//! decimal, zero-based, unsigned. Two invariants are maintained here:
//!
//! - a path always equals its parent's path extended by one step;
//! - among the members of one list, positions form a contiguous zero-based
//!   sequence ordered like the index suffixes of their paths.

use sqlx::PgConnection;

use crate::error::{RepoError, Result};

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Named child of a collection, entity or annotated relationship.
    Named(String),

    /// Positional member of a list.
    Index(u32)
}

/// Reject an idShort that would break the path grammar.
///
/// # Errors
///
/// [`RepoError::BadRequest`] when empty or containing `.`, `[` or `]`.
pub fn validate_id_short(id_short: &str) -> Result<()> {
    if id_short.is_empty() {
        return Err(RepoError::bad_request("idShort must not be empty"));
    }
    if id_short.contains(['.', '[', ']']) {
        return Err(RepoError::bad_request(format!(
            "idShort {id_short:?} must not contain '.', '[' or ']'"
        )));
    }
    Ok(())
}

/// Parse a path into steps.
///
/// # Errors
///
/// [`RepoError::BadRequest`] on empty paths, empty identifiers, unterminated
/// or non-numeric indexes, and anything else outside the grammar.
pub fn parse(path: &str) -> Result<Vec<Step>> {
    if path.is_empty() {
        return Err(RepoError::bad_request("idShortPath must not be empty"));
    }

    let bad = |msg: &str| RepoError::bad_request(format!("malformed idShortPath {path:?}: {msg}"));

    let mut steps = Vec::new();
    let mut rest = path;

    // Leading bare identifier.
    let end = rest.find(['.', '[']).unwrap_or(rest.len());
    let (ident, tail) = rest.split_at(end);
    if ident.is_empty() {
        return Err(bad("leading identifier missing"));
    }
    if ident.contains(']') {
        return Err(bad("']' outside an index"));
    }
    steps.push(Step::Named(ident.to_owned()));
    rest = tail;

    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix('.') {
            let end = tail.find(['.', '[']).unwrap_or(tail.len());
            let (ident, tail) = tail.split_at(end);
            if ident.is_empty() {
                return Err(bad("empty identifier step"));
            }
            if ident.contains(']') {
                return Err(bad("']' outside an index"));
            }
            steps.push(Step::Named(ident.to_owned()));
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('[') {
            let Some(end) = tail.find(']') else {
                return Err(bad("unterminated index"));
            };
            let digits = &tail[..end];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(bad("index must be an unsigned decimal"));
            }
            let index: u32 = digits
                .parse()
                .map_err(|_| bad("index out of range"))?;
            steps.push(Step::Index(index));
            rest = &tail[end + 1..];
        } else {
            return Err(bad("expected '.' or '['"));
        }
    }

    Ok(steps)
}

/// Strip the last step; `None` for top-level paths.
#[must_use]
pub fn parent(path: &str) -> Option<&str> {
    if path.ends_with(']') {
        path.rfind('[').map(|i| &path[..i])
    } else {
        path.rfind('.').map(|i| &path[..i])
    }
}

/// Whether the last step is a list index.
#[must_use]
pub fn is_list_tail(path: &str) -> bool {
    path.ends_with(']')
}

/// Append a named-child step.
#[must_use]
pub fn extend(path: &str, child_id_short: &str) -> String {
    if path.is_empty() {
        child_id_short.to_owned()
    } else {
        format!("{path}.{child_id_short}")
    }
}

/// Append a list-index step.
#[must_use]
pub fn indexed(path: &str, index: u32) -> String {
    format!("{path}[{index}]")
}

/// Index of the last step, if it is bracketed.
#[must_use]
pub fn last_index(path: &str) -> Option<u32> {
    let tail = path.strip_suffix(']')?;
    let open = tail.rfind('[')?;
    tail[open + 1..].parse().ok()
}

/// Substitute the last bracketed index.
///
/// Paths without a bracketed tail are returned unchanged.
#[must_use]
pub fn rewrite_index(path: &str, new_index: u32) -> String {
    if !is_list_tail(path) {
        return path.to_owned();
    }
    match path.rfind('[') {
        Some(open) => format!("{}[{new_index}]", &path[..open]),
        None => path.to_owned()
    }
}

/// idShort of the last step, `None` when the path ends in an index.
#[must_use]
pub fn last_id_short(path: &str) -> Option<&str> {
    if is_list_tail(path) {
        return None;
    }
    Some(path.rfind('.').map_or(path, |i| &path[i + 1..]))
}

/// Escape LIKE metacharacters in a user-supplied fragment (`ESCAPE '\'`).
#[must_use]
pub fn escape_like(fragment: &str) -> String {
    let mut out = String::with_capacity(fragment.len());
    for ch in fragment.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// SQL predicate matching a path and its entire subtree.
///
/// Renders `(col = $n OR col LIKE $n+1 ESCAPE '\' OR col LIKE $n+2 ESCAPE '\')`.
/// The `[%` branch covers container targets whose children are list members;
/// escaping keeps sibling paths sharing a literal prefix out of the match.
/// Bind the three values of [`subtree_params`] in order.
#[must_use]
pub fn subtree_where(column: &str, first_param: usize) -> String {
    format!(
        "({column} = ${} OR {column} LIKE ${} ESCAPE '\\' OR {column} LIKE ${} ESCAPE '\\')",
        first_param,
        first_param + 1,
        first_param + 2
    )
}

/// Bind values for [`subtree_where`], in order.
#[must_use]
pub fn subtree_params(path: &str) -> [String; 3] {
    let escaped = escape_like(path);
    [
        path.to_owned(),
        format!("{escaped}.%"),
        format!("{escaped}[%"),
    ]
}

/// Rewrite the path prefix of a subtree (the target itself plus every
/// descendant). Returns the number of rewritten rows.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub async fn rewrite_subtree_paths(
    conn: &mut PgConnection,
    submodel_id: i64,
    old_prefix: &str,
    new_prefix: &str
) -> Result<u64> {
    let sql = format!(
        "UPDATE submodel_element \
         SET id_short_path = $1 || substr(id_short_path, $2) \
         WHERE submodel_id = $3 AND {}",
        subtree_where("id_short_path", 4)
    );
    let [exact, dot, bracket] = subtree_params(old_prefix);
    let prefix_chars = i32::try_from(old_prefix.chars().count())
        .map_err(|_| RepoError::bad_request("path too long"))?;
    let affected = sqlx::query(&sql)
        .bind(new_prefix)
        .bind(prefix_chars + 1)
        .bind(submodel_id)
        .bind(exact)
        .bind(dot)
        .bind(bracket)
        .execute(conn)
        .await?
        .rows_affected();
    Ok(affected)
}

/// Restore list contiguity after a member at `deleted_index` was removed.
///
/// Every sibling with a higher index moves one slot down: its position is
/// decremented and the index suffix of its path (and of every descendant
/// path) is rewritten, in the same transaction, so the path and position
/// invariants are restored together. Rewrites run in ascending index order
/// into the slot just vacated, which keeps `(submodel_id, id_short_path)`
/// unique at every intermediate step.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub async fn renumber_list_siblings(
    conn: &mut PgConnection,
    submodel_id: i64,
    parent_id: i64,
    parent_path: &str,
    deleted_index: u32
) -> Result<()> {
    let shifted: Vec<i32> = sqlx::query_scalar(
        "SELECT position FROM submodel_element \
         WHERE submodel_id = $1 AND parent_sme_id = $2 AND position > $3 \
         ORDER BY position"
    )
    .bind(submodel_id)
    .bind(parent_id)
    .bind(i32::try_from(deleted_index).map_err(|_| RepoError::bad_request("index out of range"))?)
    .fetch_all(&mut *conn)
    .await?;

    for old_position in shifted {
        let old_index =
            u32::try_from(old_position).map_err(|_| RepoError::bad_request("negative position"))?;
        let old_prefix = indexed(parent_path, old_index);
        let new_prefix = indexed(parent_path, old_index - 1);
        rewrite_subtree_paths(&mut *conn, submodel_id, &old_prefix, &new_prefix).await?;
    }

    sqlx::query(
        "UPDATE submodel_element SET position = position - 1 \
         WHERE submodel_id = $1 AND parent_sme_id = $2 AND position > $3"
    )
    .bind(submodel_id)
    .bind(parent_id)
    .bind(i32::try_from(deleted_index).map_err(|_| RepoError::bad_request("index out of range"))?)
    .execute(conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("root", vec![Step::Named("root".into())])]
    #[case("root.child", vec![Step::Named("root".into()), Step::Named("child".into())])]
    #[case("list[3]", vec![Step::Named("list".into()), Step::Index(3)])]
    #[case(
        "list[3].sub",
        vec![Step::Named("list".into()), Step::Index(3), Step::Named("sub".into())]
    )]
    #[case(
        "a.b[0][1].c",
        vec![
            Step::Named("a".into()),
            Step::Named("b".into()),
            Step::Index(0),
            Step::Index(1),
            Step::Named("c".into()),
        ]
    )]
    fn parse_accepts_valid_paths(#[case] input: &str, #[case] expect: Vec<Step>) {
        assert_eq!(parse(input).unwrap(), expect);
    }

    #[rstest]
    #[case("")]
    #[case(".leading")]
    #[case("a..b")]
    #[case("a.")]
    #[case("a[")]
    #[case("a[]")]
    #[case("a[x]")]
    #[case("a[-1]")]
    #[case("a[+1]")]
    #[case("[0]")]
    #[case("a]b")]
    fn parse_rejects_malformed_paths(#[case] input: &str) {
        assert!(parse(input).unwrap_err().is_bad_request(), "{input:?}");
    }

    #[rstest]
    #[case("root", None)]
    #[case("root.child", Some("root"))]
    #[case("list[3]", Some("list"))]
    #[case("list[3].sub", Some("list[3]"))]
    #[case("a.b[0][1]", Some("a.b[0]"))]
    fn parent_strips_one_step(#[case] input: &str, #[case] expect: Option<&str>) {
        assert_eq!(parent(input), expect);
    }

    #[test]
    fn step_builders_compose() {
        let p = extend("", "root");
        let p = extend(&p, "list");
        let p = indexed(&p, 2);
        let p = extend(&p, "leaf");
        assert_eq!(p, "root.list[2].leaf");
        assert!(!is_list_tail(&p));
        assert!(is_list_tail(parent(&p).unwrap()));
    }

    #[rstest]
    #[case("list[3]", Some(3))]
    #[case("a.b[10]", Some(10))]
    #[case("a.b", None)]
    #[case("a[1].b", None)]
    fn last_index_reads_bracketed_tail(#[case] input: &str, #[case] expect: Option<u32>) {
        assert_eq!(last_index(input), expect);
    }

    #[test]
    fn rewrite_index_replaces_only_the_tail() {
        assert_eq!(rewrite_index("list[3]", 2), "list[2]");
        assert_eq!(rewrite_index("a[1].b[9]", 8), "a[1].b[8]");
        assert_eq!(rewrite_index("plain.path", 1), "plain.path");
    }

    #[rstest]
    #[case("root", Some("root"))]
    #[case("a.b.c", Some("c"))]
    #[case("a[1]", None)]
    fn last_id_short_of_named_tails(#[case] input: &str, #[case] expect: Option<&str>) {
        assert_eq!(last_id_short(input), expect);
    }

    #[test]
    fn escape_like_guards_metacharacters() {
        assert_eq!(escape_like("plain"), "plain");
        assert_eq!(escape_like("90%_done"), "90\\%\\_done");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }

    #[test]
    fn subtree_predicate_matches_self_children_and_list_members() {
        let [exact, dot, bracket] = subtree_params("a.b");
        assert_eq!(exact, "a.b");
        assert_eq!(dot, "a.b.%");
        assert_eq!(bracket, "a.b[%");

        let sql = subtree_where("id_short_path", 2);
        assert_eq!(
            sql,
            "(id_short_path = $2 OR id_short_path LIKE $3 ESCAPE '\\' \
             OR id_short_path LIKE $4 ESCAPE '\\')"
        );
    }

    #[test]
    fn subtree_predicate_does_not_cover_sibling_prefixes() {
        // "ab" shares the literal prefix "a" with "a" but is not in its subtree;
        // the dot/bracket branches require a separator right after the prefix.
        let [exact, dot, bracket] = subtree_params("a");
        assert_ne!(exact, "ab");
        assert!(dot.starts_with("a."));
        assert!(bracket.starts_with("a["));
    }

    #[rstest]
    #[case("ok")]
    #[case("with-dash_and_digits9")]
    fn id_short_validation_accepts(#[case] input: &str) {
        validate_id_short(input).unwrap();
    }

    #[rstest]
    #[case("")]
    #[case("has.dot")]
    #[case("has[bracket")]
    #[case("has]bracket")]
    fn id_short_validation_rejects(#[case] input: &str) {
        assert!(validate_id_short(input).unwrap_err().is_bad_request());
    }
}
