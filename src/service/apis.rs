//! CRUD descriptors published for each provisioned table.

use crate::catalog::CatalogStore;
use crate::error::AppError;
use crate::model::{ApiDescriptor, HttpMethod, NewApiDescriptor};
use futures::future::try_join_all;
use uuid::Uuid;

/// Collection route of a table's data endpoints.
pub fn data_route(table_id: Uuid) -> String {
    format!("/api/tables/{}/data", table_id)
}

/// The five descriptors for a table, in list, get, create, update, delete order.
pub fn descriptors(table_id: Uuid, table_name: &str) -> Vec<NewApiDescriptor> {
    let collection = data_route(table_id);
    let item = format!("{}/:id", collection);
    [
        (format!("Get all {}", table_name), collection.clone(), HttpMethod::Get),
        (format!("Get {} by ID", table_name), item.clone(), HttpMethod::Get),
        (format!("Create {}", table_name), collection, HttpMethod::Post),
        (format!("Update {}", table_name), item.clone(), HttpMethod::Put),
        (format!("Delete {}", table_name), item, HttpMethod::Delete),
    ]
    .into_iter()
    .map(|(name, route, method)| NewApiDescriptor {
        table_id,
        name,
        route,
        method,
    })
    .collect()
}

/// Write the descriptors concurrently. Each call appends, so running it twice duplicates rows.
pub async fn publish(catalog: &dyn CatalogStore, table_id: Uuid, table_name: &str) -> Result<Vec<ApiDescriptor>, AppError> {
    let writes = descriptors(table_id, table_name)
        .into_iter()
        .map(|d| catalog.create_api_descriptor(d));
    let published = try_join_all(writes).await?;
    tracing::debug!(table = table_name, count = published.len(), "api descriptors published");
    Ok(published)
}
