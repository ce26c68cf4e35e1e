//! Database configuration module.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL.

use crate::entities::{
    CustomsRequest, Document, Enquiry, KycLog, KycSubmission, Lead, Listing, Message, Payment,
    Profile, Shipment, ShipmentQuote,
};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};

const DEFAULT_DATABASE_URL: &str = "sqlite://data/exerly.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable or returns the
/// default local `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by [`get_database_url`].
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    tracing::debug!("Connecting to database at {}", database_url);
    if let Some(file) = database_url
        .strip_prefix("sqlite://")
        .and_then(|rest| rest.split('?').next())
        && let Some(parent) = std::path::Path::new(file).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Database::connect(&database_url).await.map_err(Into::into)
}

async fn create_table<C, E>(db: &C, schema: &Schema, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all marketplace tables if they do not exist yet.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, Profile).await?;
    create_table(db, &schema, Listing).await?;
    create_table(db, &schema, KycSubmission).await?;
    create_table(db, &schema, KycLog).await?;
    create_table(db, &schema, Shipment).await?;
    create_table(db, &schema, ShipmentQuote).await?;
    create_table(db, &schema, Payment).await?;
    create_table(db, &schema, Message).await?;
    create_table(db, &schema, Enquiry).await?;
    create_table(db, &schema, Lead).await?;
    create_table(db, &schema, CustomsRequest).await?;
    create_table(db, &schema, Document).await?;

    Ok(())
}
