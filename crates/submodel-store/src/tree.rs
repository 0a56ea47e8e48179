// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Tree assembly: flat row sets back into ordered element trees.
//!
//! The load path is three phases:
//!
//! 1. **Fetch** — one SELECT joining the header table with all fourteen side
//!    tables yields one row per element; each row becomes a partial [`Node`].
//! 2. **Hydrate** — the reference-, langstring-, qualifier- and
//!    multilanguage-value id sets collected in phase 1 are bulk-fetched
//!    concurrently (one task per lookup kind, each on its own pooled
//!    connection, joined through `try_join!`). The fan-out buys latency only;
//!    a sequential pass would be equally correct.
//! 3. **Assemble** — nodes are partitioned into roots and parent-keyed child
//!    groups, children stably sorted by position and attached to the parent's
//!    container slot, roots sorted by path. The tree is built by moves out of
//!    parent-keyed maps; no cyclic in-memory structure exists at any point.
//!
//! Pagination is cursor-based over the ordered roots: with `limit` set and
//! more roots than fit, the cursor names the idShort of the first element
//! after the returned page.

use std::collections::HashMap;

use sqlx::{PgPool, Row, postgres::PgRow};
use submodel_core::{LangString, LangStringKind, ModelType, SubmodelElement};

use crate::{
    element::{self, handler},
    error::{RepoError, Result},
    path,
    refstore::{self, from_json_opt}
};

/// One partially built element, carrying everything assembly needs.
pub(crate) struct Node {
    /// Internal id.
    pub id: i64,
    /// Owning submodel.
    pub submodel_id: i64,
    /// Parent element, `None` for top-level.
    pub parent_sme_id: Option<i64>,
    /// Position among siblings.
    pub position: Option<i32>,
    /// Full path.
    pub id_short_path: String,
    /// Kind tag.
    pub model_type: ModelType,
    /// Normalized semantic-id row, hydrated in phase 2.
    pub semantic_id: Option<i64>,
    /// Description header id, hydrated in phase 2.
    pub description_id: Option<i64>,
    /// Display-name header id, hydrated in phase 2.
    pub displayname_id: Option<i64>,
    /// The element under construction.
    pub element: SubmodelElement
}

/// Which rows of a submodel to fetch.
pub(crate) enum Scope<'a> {
    /// Every element of the submodel.
    All,
    /// One element and its subtree.
    Subtree(&'a str)
}

const SELECT_COLUMNS: &str = "\
    e.id, e.submodel_id, e.parent_sme_id, e.position, e.id_short, e.id_short_path, \
    e.category, e.model_type, e.semantic_id, e.description_id, e.displayname_id, \
    e.embedded_data_specification, e.supplemental_semantic_ids, e.extensions, \
    p.value_type AS p_value_type, p.value_text AS p_value_text, p.value_num AS p_value_num, \
    p.value_bool AS p_value_bool, p.value_time AS p_value_time, p.value_date AS p_value_date, \
    p.value_datetime AS p_value_datetime, p.value_id AS p_value_id, \
    m.value_id AS m_value_id, \
    r.value_type AS r_value_type, \
    r.min_text AS r_min_text, r.min_num AS r_min_num, r.min_bool AS r_min_bool, \
    r.min_time AS r_min_time, r.min_date AS r_min_date, r.min_datetime AS r_min_datetime, \
    r.max_text AS r_max_text, r.max_num AS r_max_num, r.max_bool AS r_max_bool, \
    r.max_time AS r_max_time, r.max_date AS r_max_date, r.max_datetime AS r_max_datetime, \
    f.content_type AS f_content_type, f.value AS f_value, \
    b.content_type AS b_content_type, b.value AS b_value, \
    re.value AS re_value, \
    rel.first AS rel_first, rel.second AS rel_second, \
    ar.first AS ar_first, ar.second AS ar_second, \
    ev.observed AS ev_observed, ev.direction AS ev_direction, ev.state AS ev_state, \
    ev.message_topic AS ev_message_topic, ev.message_broker AS ev_message_broker, \
    ev.last_update AS ev_last_update, ev.min_interval AS ev_min_interval, \
    ev.max_interval AS ev_max_interval, \
    en.entity_type AS en_entity_type, en.global_asset_id AS en_global_asset_id, \
    en.specific_asset_ids AS en_specific_asset_ids, \
    op.input_variables AS op_input_variables, op.output_variables AS op_output_variables, \
    op.inoutput_variables AS op_inoutput_variables, \
    li.order_relevant AS li_order_relevant, \
    li.semantic_id_list_element AS li_semantic_id_list_element, \
    li.type_value_list_element AS li_type_value_list_element, \
    li.value_type_list_element AS li_value_type_list_element";

const SELECT_JOINS: &str = "\
    FROM submodel_element e \
    LEFT JOIN property_element p ON p.id = e.id \
    LEFT JOIN multilanguage_property_element m ON m.id = e.id \
    LEFT JOIN range_element r ON r.id = e.id \
    LEFT JOIN file_element f ON f.id = e.id \
    LEFT JOIN blob_element b ON b.id = e.id \
    LEFT JOIN reference_element re ON re.id = e.id \
    LEFT JOIN relationship_element rel ON rel.id = e.id \
    LEFT JOIN annotated_relationship_element ar ON ar.id = e.id \
    LEFT JOIN basic_event_element ev ON ev.id = e.id \
    LEFT JOIN entity_element en ON en.id = e.id \
    LEFT JOIN operation_element op ON op.id = e.id \
    LEFT JOIN submodel_element_list li ON li.id = e.id";

fn node_from_row(row: &PgRow) -> Result<Node> {
    let tag: String = row.try_get("model_type")?;
    let model_type = element::model_type_of(&tag)?;
    let mut built = handler(model_type).from_row(row)?;

    let meta = built.meta_mut();
    meta.id_short = row.try_get("id_short")?;
    meta.category = row.try_get("category")?;
    meta.embedded_data_specifications =
        from_json_opt(row.try_get("embedded_data_specification")?)?;
    meta.supplemental_semantic_ids = from_json_opt(row.try_get("supplemental_semantic_ids")?)?;
    meta.extensions = from_json_opt(row.try_get("extensions")?)?;

    Ok(Node {
        id: row.try_get("id")?,
        submodel_id: row.try_get("submodel_id")?,
        parent_sme_id: row.try_get("parent_sme_id")?,
        position: row.try_get("position")?,
        id_short_path: row.try_get("id_short_path")?,
        model_type,
        semantic_id: row.try_get("semantic_id")?,
        description_id: row.try_get("description_id")?,
        displayname_id: row.try_get("displayname_id")?,
        element: built
    })
}

/// Fetch the rows of one submodel (whole or one subtree) as partial nodes.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub(crate) async fn fetch_nodes(
    pool: &PgPool,
    submodel_id: i64,
    scope: Scope<'_>
) -> Result<Vec<Node>> {
    let rows = match scope {
        Scope::All => {
            let sql =
                format!("SELECT {SELECT_COLUMNS} {SELECT_JOINS} WHERE e.submodel_id = $1");
            sqlx::query(&sql).bind(submodel_id).fetch_all(pool).await?
        }
        Scope::Subtree(root_path) => {
            let sql = format!(
                "SELECT {SELECT_COLUMNS} {SELECT_JOINS} WHERE e.submodel_id = $1 AND {}",
                path::subtree_where("e.id_short_path", 2)
            );
            let [exact, dot, bracket] = path::subtree_params(root_path);
            sqlx::query(&sql)
                .bind(submodel_id)
                .bind(exact)
                .bind(dot)
                .bind(bracket)
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter().map(node_from_row).collect()
}

/// Fetch the rows of several submodels in one query; the caller groups by
/// [`Node::submodel_id`] after hydration.
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub(crate) async fn fetch_forest(pool: &PgPool, submodel_ids: &[i64]) -> Result<Vec<Node>> {
    if submodel_ids.is_empty() {
        return Ok(Vec::new());
    }
    let sql = format!("SELECT {SELECT_COLUMNS} {SELECT_JOINS} WHERE e.submodel_id = ANY($1)");
    let rows = sqlx::query(&sql).bind(submodel_ids).fetch_all(pool).await?;
    rows.iter().map(node_from_row).collect()
}

/// Bulk-hydrate the shared aggregates of a node set.
///
/// Four lookup kinds fan out concurrently, each on its own pooled
/// connection: references, name-typed langstrings, text-typed langstrings,
/// and qualifiers together with multilanguage values (paired to keep the
/// task count at four).
///
/// # Errors
///
/// Database failures surface as [`RepoError::Internal`].
pub(crate) async fn hydrate(pool: &PgPool, nodes: &mut [Node]) -> Result<()> {
    let mut reference_ids = Vec::new();
    let mut description_ids = Vec::new();
    let mut displayname_ids = Vec::new();
    let mut element_ids = Vec::with_capacity(nodes.len());
    let mut mlp_ids = Vec::new();

    for node in nodes.iter() {
        element_ids.push(node.id);
        if let Some(id) = node.semantic_id {
            reference_ids.push(id);
        }
        if let Some(id) = node.description_id {
            description_ids.push(id);
        }
        if let Some(id) = node.displayname_id {
            displayname_ids.push(id);
        }
        if node.model_type == ModelType::MultiLanguageProperty {
            mlp_ids.push(node.id);
        }
    }

    let (references, descriptions, display_names, (qualifiers, mlp_values)) = tokio::try_join!(
        async {
            let mut conn = pool.acquire().await?;
            refstore::references_by_ids(&mut *conn, &reference_ids).await
        },
        async {
            let mut conn = pool.acquire().await?;
            refstore::lang_strings_by_ids(&mut *conn, LangStringKind::Text, &description_ids).await
        },
        async {
            let mut conn = pool.acquire().await?;
            refstore::lang_strings_by_ids(&mut *conn, LangStringKind::Name, &displayname_ids).await
        },
        async {
            let mut conn = pool.acquire().await?;
            let qualifiers = refstore::qualifiers_by_sme_ids(&mut *conn, &element_ids).await?;
            let mlp_values = fetch_mlp_values(&mut *conn, &mlp_ids).await?;
            Ok((qualifiers, mlp_values))
        }
    )?;

    for node in nodes.iter_mut() {
        let meta = node.element.meta_mut();
        if let Some(id) = node.semantic_id {
            meta.semantic_id = references.get(&id).cloned();
        }
        if let Some(id) = node.description_id {
            meta.description = descriptions.get(&id).cloned();
        }
        if let Some(id) = node.displayname_id {
            meta.display_name = display_names.get(&id).cloned();
        }
        if let Some(quals) = qualifiers.get(&node.id) {
            meta.qualifiers = Some(quals.clone());
        }
        if let SubmodelElement::MultiLanguageProperty(mlp) = &mut node.element
            && let Some(values) = mlp_values.get(&node.id)
        {
            mlp.value = Some(values.clone());
        }
    }
    Ok(())
}

async fn fetch_mlp_values(
    conn: &mut sqlx::PgConnection,
    mlp_ids: &[i64]
) -> Result<HashMap<i64, Vec<LangString>>> {
    if mlp_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query(
        "SELECT mlp_id, language, text FROM multilanguage_property_value \
         WHERE mlp_id = ANY($1) ORDER BY mlp_id, position"
    )
    .bind(mlp_ids)
    .fetch_all(conn)
    .await?;

    let mut out: HashMap<i64, Vec<LangString>> = HashMap::new();
    for row in rows {
        let mlp_id: i64 = row.try_get("mlp_id")?;
        out.entry(mlp_id).or_default().push(LangString {
            language: row.try_get("language")?,
            text:     row.try_get("text")?
        });
    }
    Ok(out)
}

/// Cursor pagination over assembled roots.
#[derive(Debug, Clone, Default)]
pub(crate) struct Page {
    /// Maximum roots to return; `None` returns all.
    pub limit: Option<u32>,
    /// idShort of the first root to include.
    pub cursor: Option<String>
}

/// An assembled page of element trees.
#[derive(Debug)]
pub(crate) struct Assembled {
    /// Ordered, fully built roots.
    pub elements: Vec<SubmodelElement>,
    /// idShort of the first element after this page, if any.
    pub next_cursor: Option<String>
}

/// Build ordered trees out of hydrated nodes.
///
/// `subtree_root` marks the path whose node is the root of a subtree query
/// (its `parent_sme_id` is not null, yet it roots the result).
///
/// # Errors
///
/// [`RepoError::Internal`] when a non-container node owns children — that is
/// a corrupted tree, not caller error.
pub(crate) fn assemble(
    nodes: Vec<Node>,
    subtree_root: Option<&str>,
    page: &Page
) -> Result<Assembled> {
    let mut roots: Vec<Node> = Vec::new();
    let mut children: HashMap<i64, Vec<Node>> = HashMap::new();

    for node in nodes {
        let is_root = node.parent_sme_id.is_none()
            || subtree_root.is_some_and(|p| node.id_short_path == p);
        if is_root {
            roots.push(node);
        } else if let Some(parent_id) = node.parent_sme_id {
            children.entry(parent_id).or_default().push(node);
        }
    }

    roots.sort_by(|a, b| a.id_short_path.cmp(&b.id_short_path));

    // Cursor: skip roots strictly before the named idShort.
    if let Some(cursor) = page.cursor.as_deref() {
        roots.retain(|node| node.id_short_path.as_str() >= cursor);
    }

    let mut next_cursor = None;
    if let Some(limit) = page.limit {
        let limit = limit as usize;
        if roots.len() > limit {
            next_cursor = roots[limit].element.id_short().map(str::to_owned);
            roots.truncate(limit);
        }
    }

    let elements = roots
        .into_iter()
        .map(|root| attach(root, &mut children))
        .collect::<Result<Vec<_>>>()?;

    Ok(Assembled {
        elements,
        next_cursor
    })
}

fn attach(node: Node, children: &mut HashMap<i64, Vec<Node>>) -> Result<SubmodelElement> {
    let Node {
        id,
        model_type,
        id_short_path,
        mut element,
        ..
    } = node;

    if let Some(mut group) = children.remove(&id) {
        group.sort_by_key(|child| child.position.unwrap_or_default());
        if !model_type.is_container() {
            return Err(RepoError::internal(std::io::Error::other(format!(
                "{} at {id_short_path:?} owns children but is not a container",
                model_type.as_str()
            ))));
        }
        let built = group
            .into_iter()
            .map(|child| attach(child, children))
            .collect::<Result<Vec<_>>>()?;
        element.set_children(built);
    }
    Ok(element)
}

/// Fetch, hydrate and assemble in one call.
///
/// # Errors
///
/// See [`fetch_nodes`], [`hydrate`] and [`assemble`].
pub(crate) async fn load(
    pool: &PgPool,
    submodel_id: i64,
    scope: Scope<'_>,
    page: &Page
) -> Result<Assembled> {
    let subtree_root = match &scope {
        Scope::Subtree(path) => Some((*path).to_owned()),
        Scope::All => None
    };
    let mut nodes = fetch_nodes(pool, submodel_id, scope).await?;
    hydrate(pool, &mut nodes).await?;
    assemble(nodes, subtree_root.as_deref(), page)
}

#[cfg(test)]
mod tests {
    use submodel_core::{ElementMeta, Property, SubmodelElementCollection};

    use super::*;

    fn node(
        id: i64,
        parent: Option<i64>,
        position: i32,
        path: &str,
        element: SubmodelElement
    ) -> Node {
        Node {
            id,
            submodel_id: 1,
            parent_sme_id: parent,
            position: Some(position),
            id_short_path: path.to_owned(),
            model_type: element.model_type(),
            semantic_id: None,
            description_id: None,
            displayname_id: None,
            element
        }
    }

    fn property(id_short: &str) -> SubmodelElement {
        SubmodelElement::Property(Property {
            meta: ElementMeta::named(id_short),
            value_type: Some("xs:string".into()),
            value: None,
            value_id: None
        })
    }

    fn collection(id_short: &str) -> SubmodelElement {
        SubmodelElement::SubmodelElementCollection(SubmodelElementCollection {
            meta:  ElementMeta::named(id_short),
            value: None
        })
    }

    #[test]
    fn children_attach_sorted_by_position() {
        let nodes = vec![
            node(1, None, 0, "coll", collection("coll")),
            node(3, Some(1), 1, "coll.b", property("b")),
            node(2, Some(1), 0, "coll.a", property("a")),
        ];
        let assembled = assemble(nodes, None, &Page::default()).unwrap();
        assert_eq!(assembled.elements.len(), 1);
        let kids = assembled.elements[0].children().unwrap();
        assert_eq!(kids[0].id_short(), Some("a"));
        assert_eq!(kids[1].id_short(), Some("b"));
    }

    #[test]
    fn roots_sort_by_path() {
        let nodes = vec![
            node(2, None, 1, "zeta", property("zeta")),
            node(1, None, 0, "alpha", property("alpha")),
        ];
        let assembled = assemble(nodes, None, &Page::default()).unwrap();
        let names: Vec<_> = assembled
            .elements
            .iter()
            .filter_map(SubmodelElement::id_short)
            .collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn pagination_truncates_and_names_the_next_root() {
        let nodes = vec![
            node(1, None, 0, "a", property("a")),
            node(2, None, 1, "b", property("b")),
            node(3, None, 2, "c", property("c")),
        ];
        let page = Page {
            limit:  Some(2),
            cursor: None
        };
        let assembled = assemble(nodes, None, &page).unwrap();
        assert_eq!(assembled.elements.len(), 2);
        assert_eq!(assembled.next_cursor.as_deref(), Some("c"));
    }

    #[test]
    fn cursor_resumes_at_named_root() {
        let nodes = vec![
            node(1, None, 0, "a", property("a")),
            node(2, None, 1, "b", property("b")),
            node(3, None, 2, "c", property("c")),
        ];
        let page = Page {
            limit:  Some(2),
            cursor: Some("b".into())
        };
        let assembled = assemble(nodes, None, &page).unwrap();
        let names: Vec<_> = assembled
            .elements
            .iter()
            .filter_map(SubmodelElement::id_short)
            .collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(assembled.next_cursor, None);
    }

    #[test]
    fn subtree_root_with_parent_still_roots_the_result() {
        let nodes = vec![
            node(5, Some(1), 0, "coll.inner", collection("inner")),
            node(6, Some(5), 0, "coll.inner.p", property("p")),
        ];
        let assembled = assemble(nodes, Some("coll.inner"), &Page::default()).unwrap();
        assert_eq!(assembled.elements.len(), 1);
        assert_eq!(assembled.elements[0].id_short(), Some("inner"));
        assert_eq!(
            assembled.elements[0].children().unwrap()[0].id_short(),
            Some("p")
        );
    }

    #[test]
    fn scalar_with_children_is_a_corrupted_tree() {
        let nodes = vec![
            node(1, None, 0, "p", property("p")),
            node(2, Some(1), 0, "p.ghost", property("ghost")),
        ];
        let err = assemble(nodes, None, &Page::default()).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn list_members_keep_list_order_not_path_lexicographic() {
        // Eleven members: lexicographic path order would put [10] before [2].
        let list = SubmodelElement::SubmodelElementList(
            submodel_core::SubmodelElementList {
                meta: ElementMeta::named("L"),
                order_relevant: Some(true),
                semantic_id_list_element: None,
                type_value_list_element: None,
                value_type_list_element: None,
                value: None
            }
        );
        let mut nodes = vec![node(1, None, 0, "L", list)];
        for i in 0..11 {
            nodes.push(node(
                10 + i64::from(i),
                Some(1),
                i,
                &format!("L[{i}]"),
                property(&format!("m{i}"))
            ));
        }
        let assembled = assemble(nodes, None, &Page::default()).unwrap();
        let kids = assembled.elements[0].children().unwrap();
        assert_eq!(kids.len(), 11);
        assert_eq!(kids[10].id_short(), Some("m10"));
        assert_eq!(kids[2].id_short(), Some("m2"));
    }
}
