use std::collections::{HashMap, HashSet, VecDeque};

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::categories::{
        CategoryList, CategoryTree, CreateCategoryRequest, DeleteCategoryQuery,
        UpdateCategoryRequest,
    },
    entity::categories::{
        ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories,
        Model as CategoryModel,
    },
    entity::products::{Column as ProdCol, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Category, CategoryNode, DeletionImpact},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// Walk the child adjacency of `root` over a preloaded edge list and return
/// every descendant id. The root itself is never included, each id appears
/// once, and the visited set terminates the walk even on cyclic data.
pub fn collect_descendants(root: Uuid, edges: &[(Uuid, Option<Uuid>)]) -> Vec<Uuid> {
    let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (id, parent) in edges {
        if let Some(parent) = parent {
            children.entry(*parent).or_default().push(*id);
        }
    }

    let mut seen: HashSet<Uuid> = HashSet::new();
    let mut out = Vec::new();
    let mut queue: VecDeque<Uuid> = VecDeque::from([root]);
    while let Some(current) = queue.pop_front() {
        for child in children.get(&current).into_iter().flatten() {
            if *child != root && seen.insert(*child) {
                out.push(*child);
                queue.push_back(*child);
            }
        }
    }
    out
}

async fn load_edges<C: ConnectionTrait>(conn: &C) -> AppResult<Vec<(Uuid, Option<Uuid>)>> {
    let edges = Categories::find()
        .select_only()
        .column(CategoryCol::Id)
        .column(CategoryCol::ParentId)
        .into_tuple::<(Uuid, Option<Uuid>)>()
        .all(conn)
        .await?;
    Ok(edges)
}

pub async fn descendant_ids<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<Vec<Uuid>> {
    let edges = load_edges(conn).await?;
    Ok(collect_descendants(id, &edges))
}

pub async fn deletion_impact<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<DeletionImpact> {
    let descendants = descendant_ids(conn, id).await?;

    let direct_product_count = Products::find()
        .filter(ProdCol::CategoryId.eq(id))
        .count(conn)
        .await? as i64;

    let mut affected: Vec<Uuid> = descendants.clone();
    affected.push(id);
    let total_product_count = Products::find()
        .filter(ProdCol::CategoryId.is_in(affected))
        .count(conn)
        .await? as i64;

    Ok(DeletionImpact {
        descendant_count: descendants.len() as i64,
        direct_product_count,
        total_product_count,
    })
}

pub async fn list_categories(state: &AppState) -> AppResult<ApiResponse<CategoryTree>> {
    let rows = Categories::find()
        .filter(CategoryCol::IsActive.eq(true))
        .order_by_asc(CategoryCol::SortOrder)
        .order_by_asc(CategoryCol::Name)
        .all(&state.orm)
        .await?;

    let items = build_tree(rows);
    Ok(ApiResponse::success(
        "Categories",
        CategoryTree { items },
        Some(Meta::empty()),
    ))
}

pub async fn list_categories_admin(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CategoryList>> {
    ensure_admin(user)?;
    let items = Categories::find()
        .order_by_asc(CategoryCol::SortOrder)
        .order_by_asc(CategoryCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(category_from_entity)
        .collect();
    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::empty()),
    ))
}

pub async fn get_category(state: &AppState, slug: &str) -> AppResult<ApiResponse<Category>> {
    let category = Categories::find()
        .filter(CategoryCol::Slug.eq(slug))
        .filter(CategoryCol::IsActive.eq(true))
        .one(&state.orm)
        .await?;
    let category = match category {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success(
        "Category",
        category_from_entity(category),
        None,
    ))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    ensure_slug_free(&state.orm, &payload.slug, None).await?;

    if let Some(parent_id) = payload.parent_id {
        let parent = Categories::find_by_id(parent_id).one(&state.orm).await?;
        if parent.is_none() {
            return Err(AppError::BadRequest("parent category not found".into()));
        }
    }

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name),
        slug: Set(payload.slug),
        parent_id: Set(payload.parent_id),
        sort_order: Set(payload.sort_order),
        is_active: Set(payload.is_active),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    log_audit(
        state,
        Some(user.user_id),
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category created",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    ensure_admin(user)?;
    let existing = Categories::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(c) => c,
        None => return Err(AppError::NotFound),
    };

    if let Some(slug) = payload.slug.as_ref() {
        ensure_slug_free(&state.orm, slug, Some(id)).await?;
    }

    if let Some(new_parent) = payload.parent_id.as_ref() {
        if let Some(parent_id) = new_parent {
            ensure_valid_parent(&state.orm, id, *parent_id).await?;
        }
    }

    let mut active: CategoryActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(slug) = payload.slug {
        active.slug = Set(slug);
    }
    if let Some(parent_id) = payload.parent_id {
        active.parent_id = Set(parent_id);
    }
    if let Some(sort_order) = payload.sort_order {
        active.sort_order = Set(sort_order);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    let category = active.update(&state.orm).await?;

    log_audit(
        state,
        Some(user.user_id),
        "category_update",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Updated",
        category_from_entity(category),
        Some(Meta::empty()),
    ))
}

pub async fn get_deletion_impact(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<DeletionImpact>> {
    ensure_admin(user)?;
    if Categories::find_by_id(id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }
    let impact = deletion_impact(&state.orm, id).await?;
    Ok(ApiResponse::success(
        "Deletion impact",
        impact,
        Some(Meta::empty()),
    ))
}

/// Delete a category. A non-trivial impact (descendants or products under the
/// subtree) requires the caller to opt in to moving those products to
/// uncategorized; otherwise the impact summary is returned for confirmation.
pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    query: DeleteCategoryQuery,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    if Categories::find_by_id(id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let impact = deletion_impact(&state.orm, id).await?;
    if !impact.is_empty() && !query.move_products_to_uncategorized {
        return Err(AppError::Confirmation {
            message: "Category has descendants or products; confirm to move products to uncategorized".into(),
            impact: serde_json::to_value(&impact)
                .map_err(|e| AppError::Internal(e.into()))?,
        });
    }

    let txn = state.orm.begin().await?;

    let mut affected = descendant_ids(&txn, id).await?;
    affected.push(id);

    // Orphan the products first; the FK cascade then removes descendant rows.
    Products::update_many()
        .col_expr(ProdCol::CategoryId, Expr::value(None::<Uuid>))
        .filter(ProdCol::CategoryId.is_in(affected))
        .exec(&txn)
        .await?;

    Categories::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    log_audit(
        state,
        Some(user.user_id),
        "category_delete",
        "categories",
        serde_json::json!({
            "category_id": id,
            "descendant_count": impact.descendant_count,
            "moved_products": impact.total_product_count,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Category deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// A category's new parent must exist and must not be the category itself or
/// anything below it, so the forest can never acquire a cycle.
async fn ensure_valid_parent<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    parent_id: Uuid,
) -> AppResult<()> {
    if parent_id == id {
        return Err(AppError::BadRequest(
            "category cannot be its own parent".into(),
        ));
    }
    if Categories::find_by_id(parent_id).one(conn).await?.is_none() {
        return Err(AppError::BadRequest("parent category not found".into()));
    }
    let descendants = descendant_ids(conn, id).await?;
    if descendants.contains(&parent_id) {
        return Err(AppError::BadRequest(
            "category cannot be moved under its own descendant".into(),
        ));
    }
    Ok(())
}

async fn ensure_slug_free<C: ConnectionTrait>(
    conn: &C,
    slug: &str,
    exclude: Option<Uuid>,
) -> AppResult<()> {
    let mut finder = Categories::find().filter(CategoryCol::Slug.eq(slug));
    if let Some(exclude) = exclude {
        finder = finder.filter(CategoryCol::Id.ne(exclude));
    }
    if finder.one(conn).await?.is_some() {
        return Err(AppError::BadRequest("slug is already taken".into()));
    }
    Ok(())
}

fn build_tree(rows: Vec<CategoryModel>) -> Vec<CategoryNode> {
    let ids: HashSet<Uuid> = rows.iter().map(|c| c.id).collect();
    let mut by_parent: HashMap<Option<Uuid>, Vec<CategoryModel>> = HashMap::new();
    for row in rows {
        // A child whose parent is filtered out (inactive) surfaces at the root.
        let key = row.parent_id.filter(|p| ids.contains(p));
        by_parent.entry(key).or_default().push(row);
    }
    attach_children(None, &mut by_parent)
}

fn attach_children(
    parent: Option<Uuid>,
    by_parent: &mut HashMap<Option<Uuid>, Vec<CategoryModel>>,
) -> Vec<CategoryNode> {
    let rows = by_parent.remove(&parent).unwrap_or_default();
    rows.into_iter()
        .map(|row| {
            let id = row.id;
            CategoryNode {
                category: category_from_entity(row),
                children: attach_children(Some(id), by_parent),
            }
        })
        .collect()
}

pub fn category_from_entity(model: CategoryModel) -> Category {
    Category {
        id: model.id,
        name: model.name,
        slug: model.slug,
        parent_id: model.parent_id,
        sort_order: model.sort_order,
        is_active: model.is_active,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn descendants_exclude_the_root_and_contain_no_duplicates() {
        // 1 -> {2, 3}, 2 -> {4}, 5 is an unrelated root.
        let edges = vec![
            (id(1), None),
            (id(2), Some(id(1))),
            (id(3), Some(id(1))),
            (id(4), Some(id(2))),
            (id(5), None),
        ];
        let result = collect_descendants(id(1), &edges);
        assert_eq!(result.len(), 3);
        assert!(!result.contains(&id(1)));
        assert!(!result.contains(&id(5)));
        let unique: HashSet<_> = result.iter().collect();
        assert_eq!(unique.len(), result.len());
    }

    #[test]
    fn descendant_walk_terminates_on_cyclic_data() {
        // 1 -> 2 -> 3 -> 1: corrupt, but the walk must still terminate.
        let edges = vec![
            (id(1), Some(id(3))),
            (id(2), Some(id(1))),
            (id(3), Some(id(2))),
        ];
        let result = collect_descendants(id(1), &edges);
        assert_eq!(result, vec![id(2), id(3)]);
    }

    #[test]
    fn leaf_category_has_no_descendants() {
        let edges = vec![(id(1), None), (id(2), Some(id(1)))];
        assert!(collect_descendants(id(2), &edges).is_empty());
    }

    #[test]
    fn tree_nests_children_under_parents() {
        use chrono::Utc;
        let parent = CategoryModel {
            id: id(1),
            name: "Electronics".into(),
            slug: "electronics".into(),
            parent_id: None,
            sort_order: 0,
            is_active: true,
            created_at: Utc::now().into(),
        };
        let child = CategoryModel {
            id: id(2),
            name: "Phones".into(),
            slug: "phones".into(),
            parent_id: Some(id(1)),
            sort_order: 0,
            is_active: true,
            created_at: Utc::now().into(),
        };
        let tree = build_tree(vec![parent, child]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].category.slug, "phones");
    }

    #[test]
    fn orphaned_child_surfaces_at_the_root() {
        use chrono::Utc;
        let child = CategoryModel {
            id: id(2),
            name: "Phones".into(),
            slug: "phones".into(),
            parent_id: Some(id(99)),
            sort_order: 0,
            is_active: true,
            created_at: Utc::now().into(),
        };
        let tree = build_tree(vec![child]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].category.slug, "phones");
    }
}
