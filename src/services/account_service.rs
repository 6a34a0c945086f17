use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::account::{AddressList, UpdateProfileRequest, UpsertAddressRequest},
    entity::addresses::{
        ActiveModel as AddressActive, Column as AddressCol, Entity as Addresses,
        Model as AddressModel,
    },
    entity::users::{ActiveModel as UserActive, Entity as Users},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Address, User},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub async fn get_profile(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let row = Users::find_by_id(user.user_id).one(&state.orm).await?;
    let row = match row {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };
    Ok(ApiResponse::success(
        "Profile",
        User {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role,
            created_at: row.created_at.with_timezone(&Utc),
        },
        None,
    ))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let row = Users::find_by_id(user.user_id).one(&state.orm).await?;
    let row = match row {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    let mut active: UserActive = row.into();
    if let Some(name) = payload.name {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("name must not be empty".into()));
        }
        active.name = Set(name);
    }
    let row = active.update(&state.orm).await?;

    Ok(ApiResponse::success(
        "Profile updated",
        User {
            id: row.id,
            email: row.email,
            name: row.name,
            role: row.role,
            created_at: row.created_at.with_timezone(&Utc),
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_addresses(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<AddressList>> {
    let items = Addresses::find()
        .filter(AddressCol::UserId.eq(user.user_id))
        .order_by_desc(AddressCol::IsDefault)
        .order_by_desc(AddressCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(address_from_entity)
        .collect();
    Ok(ApiResponse::success(
        "Addresses",
        AddressList { items },
        Some(Meta::empty()),
    ))
}

pub async fn create_address(
    state: &AppState,
    user: &AuthUser,
    payload: UpsertAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let txn = state.orm.begin().await?;

    if payload.is_default {
        clear_default(&txn, user.user_id).await?;
    }

    let address = AddressActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        label: Set(payload.label),
        recipient: Set(payload.recipient),
        line1: Set(payload.line1),
        line2: Set(payload.line2),
        city: Set(payload.city),
        state: Set(payload.state),
        postal_code: Set(payload.postal_code),
        phone: Set(payload.phone),
        is_default: Set(payload.is_default),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Address created",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn update_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpsertAddressRequest,
) -> AppResult<ApiResponse<Address>> {
    let txn = state.orm.begin().await?;

    let existing = Addresses::find()
        .filter(
            Condition::all()
                .add(AddressCol::Id.eq(id))
                .add(AddressCol::UserId.eq(user.user_id)),
        )
        .one(&txn)
        .await?;
    let existing = match existing {
        Some(a) => a,
        None => return Err(AppError::NotFound),
    };

    if payload.is_default && !existing.is_default {
        clear_default(&txn, user.user_id).await?;
    }

    let mut active: AddressActive = existing.into();
    active.label = Set(payload.label);
    active.recipient = Set(payload.recipient);
    active.line1 = Set(payload.line1);
    active.line2 = Set(payload.line2);
    active.city = Set(payload.city);
    active.state = Set(payload.state);
    active.postal_code = Set(payload.postal_code);
    active.phone = Set(payload.phone);
    active.is_default = Set(payload.is_default);
    let address = active.update(&txn).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Address updated",
        address_from_entity(address),
        Some(Meta::empty()),
    ))
}

pub async fn delete_address(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Addresses::delete_many()
        .filter(
            Condition::all()
                .add(AddressCol::Id.eq(id))
                .add(AddressCol::UserId.eq(user.user_id)),
        )
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn clear_default<C: sea_orm::ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<()> {
    use sea_orm::sea_query::Expr;
    Addresses::update_many()
        .col_expr(AddressCol::IsDefault, Expr::value(false))
        .filter(AddressCol::UserId.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

fn address_from_entity(model: AddressModel) -> Address {
    Address {
        id: model.id,
        user_id: model.user_id,
        label: model.label,
        recipient: model.recipient,
        line1: model.line1,
        line2: model.line2,
        city: model.city,
        state: model.state,
        postal_code: model.postal_code,
        phone: model.phone,
        is_default: model.is_default,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
