//! Listing business logic - Seller catalogue management, media uploads, marketplace search
//! and the seller directory.
//!
//! Creating or editing listings and browsing the marketplace require an approved KYC
//! submission. Media files live in the public `listings` bucket and are referenced from the
//! listing row by URL.

use crate::{
    config::settings::MarketplaceConfig,
    core::{
        kyc,
        profile::{self, non_empty},
        shipment::{normalize_extension, object_suffix},
        status::update_where,
    },
    entities::{Listing, listing},
    errors::{Error, Result},
    services::{Bucket, ObjectStore},
};
use sea_orm::{
    Condition, PaginatorTrait, QueryOrder, QuerySelect, Set,
    prelude::*,
    sea_query::{LikeExpr, SimpleExpr},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Product categories offered in the marketplace.
pub const CATEGORIES: [&str; 8] = [
    "Agriculture",
    "Textiles",
    "Chemicals",
    "Metals",
    "Food & Beverage",
    "Electronics",
    "Automotive",
    "Other",
];

/// Accepted delivery terms.
pub const INCOTERMS: [&str; 6] = ["FOB", "CIF", "CFR", "EXW", "DAP", "DDP"];

/// Container options shown to sellers.
pub const CONTAINERS: [&str; 4] = ["20ft", "40ft", "40ft High Cube", "LCL / Pallet"];

/// Packaging types shown to sellers.
pub const PACK_TYPES: [&str; 5] = ["Bag", "Box", "Carton", "Drum", "Bulk"];

/// A photo or video attached to a listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    /// Public URL of the stored object
    pub url: String,
}

/// Which media collection an upload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Still image
    Photo,
    /// Video clip
    Video,
}

impl MediaKind {
    const fn folder(self) -> &'static str {
        match self {
            Self::Photo => "photos",
            Self::Video => "videos",
        }
    }
}

/// Listing fields supplied by the seller
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingInput {
    /// Product name
    pub name: String,
    /// HS code
    pub hsn_code: Option<String>,
    /// One of [`CATEGORIES`]; defaults to `"Other"`
    pub category: Option<String>,
    /// Sub-category
    pub sub_category: Option<String>,
    /// Container option
    pub container: Option<String>,
    /// Packaging size
    pub packaging_size: Option<String>,
    /// Packaging type
    pub packaging_type: Option<String>,
    /// Country of origin
    pub origin: Option<String>,
    /// One of [`INCOTERMS`]
    pub delivery_terms: Option<String>,
    /// Lead time
    pub lead_time: Option<String>,
    /// Unit price
    pub price: Option<f64>,
    /// Unit the price refers to
    pub price_unit: Option<String>,
    /// Available stock
    pub stock: Option<f64>,
    /// Minimum order quantity
    pub min_order_qty: Option<String>,
    /// Payment terms
    pub payment_terms: Option<String>,
}

/// Changes to a listing. `None` leaves a field untouched; an empty string clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingUpdate {
    /// Product name
    pub name: Option<String>,
    /// HS code
    pub hsn_code: Option<String>,
    /// Category
    pub category: Option<String>,
    /// Sub-category
    pub sub_category: Option<String>,
    /// Container option
    pub container: Option<String>,
    /// Packaging size
    pub packaging_size: Option<String>,
    /// Packaging type
    pub packaging_type: Option<String>,
    /// Country of origin
    pub origin: Option<String>,
    /// Incoterm
    pub delivery_terms: Option<String>,
    /// Lead time
    pub lead_time: Option<String>,
    /// Unit price
    pub price: Option<f64>,
    /// Price unit
    pub price_unit: Option<String>,
    /// Stock
    pub stock: Option<f64>,
    /// Minimum order quantity
    pub min_order_qty: Option<String>,
    /// Payment terms
    pub payment_terms: Option<String>,
    /// Media URLs to detach and delete
    #[serde(default)]
    pub remove_media: Vec<String>,
}

fn canonical_category(category: &str) -> Option<&'static str> {
    CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(category.trim()))
        .copied()
}

fn validate_category(category: Option<String>) -> Result<String> {
    let category = non_empty(category).unwrap_or_else(|| "Other".to_string());
    canonical_category(&category)
        .map(str::to_string)
        .ok_or_else(|| Error::validation(format!("Unknown category: {category}")))
}

fn validate_incoterm(terms: Option<String>) -> Result<Option<String>> {
    match non_empty(terms).map(|t| t.to_uppercase()) {
        Some(t) if !INCOTERMS.contains(&t.as_str()) => {
            Err(Error::validation(format!("Unknown Incoterm: {t}")))
        }
        other => Ok(other),
    }
}

fn validate_amount(value: Option<f64>, field: &str) -> Result<Option<f64>> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(Error::validation(format!(
            "{field} must be a non-negative number"
        ))),
        other => Ok(other),
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Listing name cannot be empty"));
    }
    Ok(name.to_string())
}

/// Decodes a stored media column.
#[must_use]
pub fn media_items(value: &Json) -> Vec<MediaItem> {
    serde_json::from_value(value.clone()).unwrap_or_default()
}

fn media_json(items: &[MediaItem]) -> Result<Json> {
    serde_json::to_value(items).map_err(Into::into)
}

/// Number of listings owned by a seller.
pub async fn count_for_seller(db: &DatabaseConnection, seller_id: &str) -> Result<u64> {
    Listing::find()
        .filter(listing::Column::UserId.eq(seller_id))
        .count(db)
        .await
        .map_err(Into::into)
}

/// Creates a listing for a KYC-approved seller.
pub async fn create_listing(
    db: &DatabaseConnection,
    config: &MarketplaceConfig,
    seller_id: &str,
    input: ListingInput,
) -> Result<listing::Model> {
    kyc::require_approved(db, seller_id).await?;

    let name = validate_name(&input.name)?;
    let category = validate_category(input.category)?;
    let delivery_terms = validate_incoterm(input.delivery_terms)?;
    let price = validate_amount(input.price, "price")?;
    let stock = validate_amount(input.stock, "stock")?;

    if count_for_seller(db, seller_id).await? >= config.max_listings_per_seller {
        return Err(Error::LimitExceeded {
            message: format!(
                "a seller may have at most {} listings",
                config.max_listings_per_seller
            ),
        });
    }

    let now = chrono::Utc::now();
    let model = listing::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(seller_id.to_string()),
        name: Set(name),
        hsn_code: Set(non_empty(input.hsn_code)),
        category: Set(category),
        sub_category: Set(non_empty(input.sub_category)),
        container: Set(non_empty(input.container)),
        packaging_size: Set(non_empty(input.packaging_size)),
        packaging_type: Set(non_empty(input.packaging_type)),
        origin: Set(non_empty(input.origin)),
        delivery_terms: Set(delivery_terms),
        lead_time: Set(non_empty(input.lead_time)),
        price: Set(price),
        price_unit: Set(non_empty(input.price_unit)),
        stock: Set(stock),
        min_order_qty: Set(non_empty(input.min_order_qty)),
        payment_terms: Set(non_empty(input.payment_terms)),
        photos: Set(serde_json::json!([])),
        videos: Set(serde_json::json!([])),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = model.insert(db).await?;
    tracing::info!(listing_id = %created.id, seller_id, "Created listing");
    Ok(created)
}

/// Finds a listing by id.
pub async fn get_listing(db: &DatabaseConnection, listing_id: &str) -> Result<listing::Model> {
    Listing::find_by_id(listing_id.to_string())
        .one(db)
        .await?
        .ok_or_else(|| Error::not_found("listing", listing_id))
}

async fn get_owned(
    db: &DatabaseConnection,
    seller_id: &str,
    listing_id: &str,
) -> Result<listing::Model> {
    let found = get_listing(db, listing_id).await?;
    if found.user_id != seller_id {
        return Err(Error::forbidden("Only the seller may change this listing"));
    }
    Ok(found)
}

/// A seller's listings, newest first.
pub async fn list_for_seller(
    db: &DatabaseConnection,
    seller_id: &str,
) -> Result<Vec<listing::Model>> {
    Listing::find()
        .filter(listing::Column::UserId.eq(seller_id))
        .order_by_desc(listing::Column::CreatedAt)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Applies field changes and media removals to a listing the seller owns.
pub async fn update_listing(
    db: &DatabaseConnection,
    store: &ObjectStore,
    seller_id: &str,
    listing_id: &str,
    update: ListingUpdate,
) -> Result<listing::Model> {
    kyc::require_approved(db, seller_id).await?;
    let existing = get_owned(db, seller_id, listing_id).await?;
    let read_at = existing.updated_at;

    let mut photos = media_items(&existing.photos);
    let mut videos = media_items(&existing.videos);
    let mut removed_keys = Vec::new();
    for url in &update.remove_media {
        let before = photos.len() + videos.len();
        photos.retain(|m| &m.url != url);
        videos.retain(|m| &m.url != url);
        if photos.len() + videos.len() == before {
            return Err(Error::validation(format!("Media not attached to listing: {url}")));
        }
        if let Some(key) = store.key_from_public_url(url) {
            removed_keys.push(key.to_string());
        }
    }

    let mut active: listing::ActiveModel = existing.into();
    if let Some(name) = update.name {
        active.name = Set(validate_name(&name)?);
    }
    if update.category.is_some() {
        active.category = Set(validate_category(update.category)?);
    }
    if update.delivery_terms.is_some() {
        active.delivery_terms = Set(validate_incoterm(update.delivery_terms)?);
    }
    if update.price.is_some() {
        active.price = Set(validate_amount(update.price, "price")?);
    }
    if update.stock.is_some() {
        active.stock = Set(validate_amount(update.stock, "stock")?);
    }
    macro_rules! replace_text {
        ($($field:ident),+) => {
            $(if update.$field.is_some() {
                active.$field = Set(non_empty(update.$field));
            })+
        };
    }
    replace_text!(
        hsn_code,
        sub_category,
        container,
        packaging_size,
        packaging_type,
        origin,
        lead_time,
        price_unit,
        min_order_qty,
        payment_terms
    );
    active.photos = Set(media_json(&photos)?);
    active.videos = Set(media_json(&videos)?);
    active.updated_at = Set(chrono::Utc::now());

    let updated = save_if_unchanged(db, active, listing_id, read_at).await?;
    if !removed_keys.is_empty() {
        store.remove(Bucket::Listings, &removed_keys).await?;
    }
    Ok(updated)
}

/// Uploads a photo or video and attaches it to the listing.
#[allow(clippy::too_many_arguments)]
pub async fn add_media(
    db: &DatabaseConnection,
    store: &ObjectStore,
    config: &MarketplaceConfig,
    seller_id: &str,
    listing_id: &str,
    kind: MediaKind,
    ext: &str,
    bytes: &[u8],
) -> Result<listing::Model> {
    kyc::require_approved(db, seller_id).await?;
    let existing = get_owned(db, seller_id, listing_id).await?;
    if bytes.is_empty() {
        return Err(Error::validation("Uploaded file is empty"));
    }

    let (mut items, limit) = match kind {
        MediaKind::Photo => (media_items(&existing.photos), config.max_photos),
        MediaKind::Video => (media_items(&existing.videos), config.max_videos),
    };
    if items.len() >= limit {
        return Err(Error::LimitExceeded {
            message: format!("a listing may have at most {limit} {}", kind.folder()),
        });
    }

    let now = chrono::Utc::now();
    let key = format!(
        "{seller_id}/{}/{}-{}.{}",
        kind.folder(),
        now.timestamp_millis(),
        object_suffix(),
        normalize_extension(ext)?
    );
    store.put(Bucket::Listings, &key, bytes).await?;
    items.push(MediaItem {
        url: store.public_url(&key),
    });

    match save_media(db, existing, kind, &items, now).await {
        Ok(updated) => Ok(updated),
        Err(e) => {
            if let Err(cleanup) = store.remove(Bucket::Listings, &[key]).await {
                tracing::warn!(listing_id, error = %cleanup, "Failed to remove orphaned media");
            }
            Err(e)
        }
    }
}

/// Stores a new media list for `kind`, provided the listing is unchanged since `existing`
/// was read.
async fn save_media(
    db: &DatabaseConnection,
    existing: listing::Model,
    kind: MediaKind,
    items: &[MediaItem],
    now: chrono::DateTime<chrono::Utc>,
) -> Result<listing::Model> {
    let read_at = existing.updated_at;
    let listing_id = existing.id.clone();
    let mut active: listing::ActiveModel = existing.into();
    match kind {
        MediaKind::Photo => active.photos = Set(media_json(items)?),
        MediaKind::Video => active.videos = Set(media_json(items)?),
    }
    active.updated_at = Set(now);
    save_if_unchanged(db, active, &listing_id, read_at).await
}

/// Writes `active` only if the row still carries the `updated_at` that was read, so two
/// concurrent edits cannot overwrite each other's media lists.
async fn save_if_unchanged(
    db: &DatabaseConnection,
    active: listing::ActiveModel,
    listing_id: &str,
    read_at: chrono::DateTime<chrono::Utc>,
) -> Result<listing::Model> {
    let guard = Condition::all()
        .add(listing::Column::Id.eq(listing_id))
        .add(listing::Column::UpdatedAt.eq(read_at));
    if update_where(db, active, guard).await? == 0 {
        return Err(Error::Conflict {
            entity: "listing",
            id: listing_id.to_string(),
        });
    }
    get_listing(db, listing_id).await
}

/// Deletes a listing and all of its stored media.
pub async fn delete_listing(
    db: &DatabaseConnection,
    store: &ObjectStore,
    seller_id: &str,
    listing_id: &str,
) -> Result<()> {
    let existing = get_owned(db, seller_id, listing_id).await?;
    let keys: Vec<String> = media_items(&existing.photos)
        .iter()
        .chain(media_items(&existing.videos).iter())
        .filter_map(|m| store.key_from_public_url(&m.url).map(str::to_string))
        .collect();

    Listing::delete_by_id(existing.id.clone()).exec(db).await?;
    store.remove(Bucket::Listings, &keys).await?;
    tracing::info!(listing_id, media = keys.len(), "Deleted listing");
    Ok(())
}

/// Marketplace search filters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    /// Free text matched against name, category, sub-category and origin
    pub q: Option<String>,
    /// Category filter; `"all"` means none
    pub category: Option<String>,
    /// Origin country filter
    pub country: Option<String>,
    /// Minimum price
    pub min_price: Option<f64>,
    /// Maximum price
    pub max_price: Option<f64>,
    /// Maximum number of results
    pub limit: Option<u64>,
}

/// `%term%` with the LIKE wildcards in `term` matched literally.
fn like_pattern(term: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape('\\')
}

fn column_contains(column: listing::Column, term: &str) -> SimpleExpr {
    Expr::col((Listing, column)).like(like_pattern(term))
}

fn search_condition(query: &SearchQuery) -> Condition {
    let mut condition = Condition::all();
    if let Some(term) = query.q.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        condition = condition.add(
            Condition::any()
                .add(column_contains(listing::Column::Name, term))
                .add(column_contains(listing::Column::Category, term))
                .add(column_contains(listing::Column::SubCategory, term))
                .add(column_contains(listing::Column::Origin, term)),
        );
    }
    if let Some(category) = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("all"))
    {
        // Stored categories are canonical; an unknown one matches nothing
        let category = canonical_category(category).unwrap_or(category);
        condition = condition.add(listing::Column::Category.eq(category));
    }
    if let Some(country) = query.country.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        condition = condition.add(column_contains(listing::Column::Origin, country));
    }
    if let Some(min) = query.min_price {
        condition = condition.add(listing::Column::Price.gte(min));
    }
    if let Some(max) = query.max_price {
        condition = condition.add(listing::Column::Price.lte(max));
    }
    condition
}

/// Searches the marketplace, newest listings first. Requires approved KYC.
pub async fn search(
    db: &DatabaseConnection,
    config: &MarketplaceConfig,
    viewer_id: &str,
    query: &SearchQuery,
) -> Result<Vec<listing::Model>> {
    kyc::require_approved(db, viewer_id).await?;
    let limit = query
        .limit
        .unwrap_or(config.search_limit)
        .clamp(1, config.search_limit.max(1));

    Listing::find()
        .filter(search_condition(query))
        .order_by_desc(listing::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await
        .map_err(Into::into)
}

/// One entry in the seller directory
#[derive(Debug, Clone, Serialize)]
pub struct SellerCard {
    /// Seller account
    pub seller_id: String,
    /// Company name, or a placeholder derived from the id
    pub name: String,
    /// Country of registration
    pub country: Option<String>,
    /// Matching listings
    pub listing_count: u64,
}

/// Groups matching listings by seller, busiest sellers first.
pub async fn sellers(
    db: &DatabaseConnection,
    viewer_id: &str,
    query: &SearchQuery,
) -> Result<Vec<SellerCard>> {
    kyc::require_approved(db, viewer_id).await?;
    let rows = Listing::find()
        .filter(search_condition(query))
        .all(db)
        .await?;

    let mut counts: HashMap<String, u64> = HashMap::new();
    for row in rows {
        *counts.entry(row.user_id).or_default() += 1;
    }
    let ids: Vec<String> = counts.keys().cloned().collect();
    let profiles = profile::get_profiles_by_ids(db, &ids).await?;

    let mut cards: Vec<SellerCard> = counts
        .into_iter()
        .map(|(seller_id, listing_count)| {
            let found = profiles.get(&seller_id);
            let name = found
                .and_then(|p| p.company_name.clone())
                .unwrap_or_else(|| {
                    format!("Seller {}", seller_id.chars().take(6).collect::<String>())
                });
            SellerCard {
                country: found.and_then(|p| p.country.clone()),
                name,
                seller_id,
                listing_count,
            }
        })
        .collect();
    cards.sort_by(|a, b| {
        b.listing_count
            .cmp(&a.listing_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(cards)
}
