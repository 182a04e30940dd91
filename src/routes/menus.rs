use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect},
};
use minijinja::context;
use serde::Deserialize;
use uuid::Uuid;

use super::{Flash, after_post, page, render};
use crate::context::RestaurantContext;
use crate::error::{AppError, AppResult};
use crate::floor::{self, qr};
use crate::menus::{self, ImageChange, ItemInput, image::encode_data_url};
use crate::router::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MenusQuery {
    menu_id: Option<Uuid>,
    edit_item: Option<Uuid>,
    edit_category: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct NameForm {
    name: String,
}

#[derive(Deserialize)]
pub struct MenuPath {
    menu_id: Uuid,
}

#[derive(Deserialize)]
pub struct CategoryPath {
    menu_id: Uuid,
    category_id: Uuid,
}

#[derive(Deserialize)]
pub struct ItemPath {
    menu_id: Uuid,
    item_id: Uuid,
}

fn menu_url(ctx: &RestaurantContext, menu_id: Uuid) -> String {
    format!("{}/menus?menu_id={}", ctx.base(), menu_id)
}

pub async fn menus_page(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Query(query): Query<MenusQuery>,
    Query(flash): Query<Flash>,
) -> AppResult<impl IntoResponse> {
    let menus = menus::list_menus(&state.db, ctx.id()).await?;
    let selected = query
        .menu_id
        .and_then(|id| menus.iter().find(|m| m.id == id))
        .or_else(|| menus.iter().find(|m| m.enabled))
        .or_else(|| menus.first())
        .cloned();

    let categories = match &selected {
        Some(menu) => menus::menu_contents(&state.db, menu.id).await?,
        None => Vec::new(),
    };

    let tables = floor::list_tables(&state.db, ctx.id()).await?;
    let preview_url = tables
        .first()
        .map(|t| qr::table_menu_url(&state.config.public_menu_base_url, ctx.id(), t.id));

    render(
        &state,
        "menus.html",
        context! {
            menus => menus,
            selected => selected,
            categories => categories,
            edit_item => query.edit_item,
            edit_category => query.edit_category,
            preview_url => preview_url,
            error => flash.error,
            notice => flash.notice,
            ..page(&ctx, "menus")
        },
    )
}

pub async fn create_menu(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Form(form): Form<NameForm>,
) -> AppResult<Redirect> {
    match menus::create_menu(&state.db, ctx.id(), &form.name).await {
        Ok(menu) => Ok(Redirect::to(&menu_url(&ctx, menu.id))),
        Err(e) => after_post(&format!("{}/menus", ctx.base()), Err::<(), _>(e)),
    }
}

pub async fn enable_menu(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(MenuPath { menu_id }): Path<MenuPath>,
) -> AppResult<Redirect> {
    menus::enable_menu(&state.db, ctx.id(), menu_id).await?;
    Ok(Redirect::to(&menu_url(&ctx, menu_id)))
}

pub async fn delete_menu(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(MenuPath { menu_id }): Path<MenuPath>,
) -> AppResult<Redirect> {
    menus::delete_menu(&state.db, ctx.id(), menu_id).await?;
    Ok(Redirect::to(&format!("{}/menus", ctx.base())))
}

pub async fn add_category(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(MenuPath { menu_id }): Path<MenuPath>,
    Form(form): Form<NameForm>,
) -> AppResult<Redirect> {
    menus::find_menu(&state.db, ctx.id(), menu_id).await?;
    let result = menus::add_category(&state.db, menu_id, &form.name).await;
    after_post(&menu_url(&ctx, menu_id), result)
}

pub async fn rename_category(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(CategoryPath { menu_id, category_id }): Path<CategoryPath>,
    Form(form): Form<NameForm>,
) -> AppResult<Redirect> {
    menus::find_menu(&state.db, ctx.id(), menu_id).await?;
    let result = menus::rename_category(&state.db, menu_id, category_id, &form.name).await;
    let back = match &result {
        Ok(_) => menu_url(&ctx, menu_id),
        Err(_) => format!("{}&edit_category={}", menu_url(&ctx, menu_id), category_id),
    };
    after_post(&back, result)
}

pub async fn delete_category(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(CategoryPath { menu_id, category_id }): Path<CategoryPath>,
) -> AppResult<Redirect> {
    menus::find_menu(&state.db, ctx.id(), menu_id).await?;
    menus::delete_category(&state.db, menu_id, category_id).await?;
    Ok(Redirect::to(&menu_url(&ctx, menu_id)))
}

/// Item fields as posted by the add/edit rows, including the optional picture.
#[derive(Debug, Default)]
struct ItemUpload {
    input: ItemInput,
    image: Option<String>,
    remove_image: bool,
}

async fn read_item_form(mut multipart: Multipart) -> AppResult<ItemUpload> {
    let unreadable = |_| AppError::validation("The form could not be read, please try again");
    let mut upload = ItemUpload::default();

    while let Some(field) = multipart.next_field().await.map_err(unreadable)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "name" => upload.input.name = field.text().await.map_err(unreadable)?,
            "description" => upload.input.description = field.text().await.map_err(unreadable)?,
            "price" => upload.input.price = field.text().await.map_err(unreadable)?,
            "remove_image" => upload.remove_image = true,
            "image" => {
                let has_file = field.file_name().is_some_and(|f| !f.is_empty());
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await.map_err(unreadable)?;
                if has_file && !bytes.is_empty() {
                    upload.image = Some(encode_data_url(content_type.as_deref(), &bytes)?);
                }
            }
            _ => {}
        }
    }
    Ok(upload)
}

pub async fn add_item(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(CategoryPath { menu_id, category_id }): Path<CategoryPath>,
    multipart: Multipart,
) -> AppResult<Redirect> {
    menus::find_menu(&state.db, ctx.id(), menu_id).await?;
    let back = menu_url(&ctx, menu_id);
    let upload = match read_item_form(multipart).await {
        Ok(upload) => upload,
        Err(e) => return after_post(&back, Err::<(), _>(e)),
    };
    let result = menus::add_item(&state.db, menu_id, category_id, &upload.input, upload.image).await;
    after_post(&back, result)
}

pub async fn update_item(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(ItemPath { menu_id, item_id }): Path<ItemPath>,
    multipart: Multipart,
) -> AppResult<Redirect> {
    menus::find_menu(&state.db, ctx.id(), menu_id).await?;
    let editing = format!("{}&edit_item={}", menu_url(&ctx, menu_id), item_id);
    let upload = match read_item_form(multipart).await {
        Ok(upload) => upload,
        Err(e) => return after_post(&editing, Err::<(), _>(e)),
    };

    let change = match (upload.image, upload.remove_image) {
        (Some(data_url), _) => ImageChange::Replace(data_url),
        (None, true) => ImageChange::Remove,
        (None, false) => ImageChange::Keep,
    };
    match menus::update_item(&state.db, menu_id, item_id, &upload.input, change).await {
        Ok(_) => Ok(Redirect::to(&menu_url(&ctx, menu_id))),
        Err(e) => after_post(&editing, Err::<(), _>(e)),
    }
}

pub async fn delete_item(
    State(state): State<AppState>,
    ctx: RestaurantContext,
    Path(ItemPath { menu_id, item_id }): Path<ItemPath>,
) -> AppResult<Redirect> {
    menus::find_menu(&state.db, ctx.id(), menu_id).await?;
    menus::delete_item(&state.db, menu_id, item_id).await?;
    Ok(Redirect::to(&menu_url(&ctx, menu_id)))
}
