//! Paginated lead listing for the CRM

use super::{date_range_filters, non_blank, status_filter};
use crate::error::Result;
use crate::leads::{Lead, LeadFilter, LeadQuery, LeadSort, LeadStore};
use serde::{Deserialize, Serialize};

/// Query string of `GET /api/admin/leads`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeadListParams {
    #[serde(default)]
    pub page: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
}

impl LeadListParams {
    /// One-based page; missing, unparsable and values below 1 become 1
    pub fn page(&self) -> u32 {
        non_blank(&self.page)
            .and_then(|p| p.parse::<i64>().ok())
            .map(|p| p.clamp(1, i64::from(u32::MAX)) as u32)
            .unwrap_or(1)
    }

    pub fn filters(&self) -> Result<Vec<LeadFilter>> {
        let mut filters = Vec::new();
        if let Some(status) = status_filter(&self.status)? {
            filters.push(status);
        }
        if let Some(search) = non_blank(&self.search) {
            filters.push(LeadFilter::Search(search.to_string()));
        }
        if let Some(source) = non_blank(&self.utm_source) {
            filters.push(LeadFilter::UtmSource(source.to_string()));
        }
        filters.extend(date_range_filters(&self.date_from, &self.date_to)?);
        Ok(filters)
    }

    pub fn sort(&self) -> LeadSort {
        LeadSort::parse(self.sort_by.as_deref(), self.sort_order.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(page: u32, per_page: u32, total: u64) -> Self {
        let per_page = per_page.max(1);
        Self {
            page,
            per_page,
            total,
            total_pages: total.div_ceil(u64::from(per_page)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadListFilters {
    pub utm_sources: Vec<String>,
}

/// Response body of the lead listing
#[derive(Debug, Clone, Serialize)]
pub struct LeadList {
    pub leads: Vec<Lead>,
    pub pagination: Pagination,
    pub filters: LeadListFilters,
}

/// One page of leads plus pagination metadata and filter options
pub async fn list_leads(
    store: &LeadStore,
    params: &LeadListParams,
    per_page: u32,
) -> Result<LeadList> {
    let page = params.page();
    let query = LeadQuery::new()
        .filters(params.filters()?)
        .sort(params.sort())
        .page(page, per_page);

    let (leads, total) = store.query(&query).await?;
    let utm_sources = store.distinct_utm_sources().await?;

    Ok(LeadList {
        leads,
        pagination: Pagination::new(page, per_page, total),
        filters: LeadListFilters { utm_sources },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribution::{AttributionData, RequestContext};
    use crate::leads::{LeadPatch, LeadStatus, NewLead};
    use crate::validation::LeadFormData;
    use tempfile::TempDir;

    #[test]
    fn test_total_pages() {
        assert_eq!(Pagination::new(1, 25, 0).total_pages, 0);
        assert_eq!(Pagination::new(1, 25, 1).total_pages, 1);
        assert_eq!(Pagination::new(1, 25, 25).total_pages, 1);
        assert_eq!(Pagination::new(1, 25, 26).total_pages, 2);
    }

    #[test]
    fn test_page_parsing() {
        let params = |p: &str| LeadListParams {
            page: Some(p.to_string()),
            ..Default::default()
        };
        assert_eq!(LeadListParams::default().page(), 1);
        assert_eq!(params("3").page(), 3);
        assert_eq!(params("0").page(), 1);
        assert_eq!(params("-4").page(), 1);
        assert_eq!(params("abc").page(), 1);
    }

    #[test]
    fn test_pagination_serializes_camel_case() {
        let json = serde_json::to_value(Pagination::new(2, 25, 51)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"page": 2, "perPage": 25, "total": 51, "totalPages": 3})
        );
    }

    async fn seed(store: &LeadStore, name: &str, source: Option<&str>) -> Lead {
        store
            .insert(NewLead::new(
                LeadFormData {
                    name: name.to_string(),
                    practice_name: format!("{} Clinic", name),
                    email: format!("{}@x.com", name.to_lowercase()),
                    phone: "5551234567".to_string(),
                    website: None,
                    project_type: None,
                },
                AttributionData {
                    utm_source: source.map(str::to_string),
                    ..Default::default()
                },
                RequestContext::default(),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_leads() {
        let temp_dir = TempDir::new().unwrap();
        let store = LeadStore::connect_path(&temp_dir.path().join("leads.db"), 1)
            .await
            .unwrap();
        store.init_schema().await.unwrap();

        let empty = list_leads(&store, &LeadListParams::default(), 25)
            .await
            .unwrap();
        assert!(empty.leads.is_empty());
        assert_eq!(empty.pagination.total_pages, 0);

        let won = seed(&store, "Ann", Some("google")).await;
        seed(&store, "Bob", Some("bing")).await;
        seed(&store, "Cy", None).await;
        store
            .update(
                &won.id,
                &LeadPatch {
                    status: Some(LeadStatus::Won),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let params = LeadListParams {
            status: Some("won".into()),
            ..Default::default()
        };
        let list = list_leads(&store, &params, 25).await.unwrap();
        assert_eq!(list.leads.len(), 1);
        assert_eq!(list.leads[0].id, won.id);
        assert_eq!(list.filters.utm_sources, vec!["bing", "google"]);

        let params = LeadListParams {
            page: Some("2".into()),
            sort_by: Some("name".into()),
            sort_order: Some("asc".into()),
            ..Default::default()
        };
        let list = list_leads(&store, &params, 2).await.unwrap();
        assert_eq!(list.pagination.total, 3);
        assert_eq!(list.pagination.total_pages, 2);
        assert_eq!(list.leads.len(), 1);
        assert_eq!(list.leads[0].name, "Cy");
    }
}
