use crate::{database::get_db, error::AppResult};
use chrono::{DateTime as ChronoDateTime, FixedOffset};
use futures::stream::StreamExt;
use mongodb::{
    bson::{doc, from_document, DateTime, Document},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{
    permit_status::{coerce_status, coerce_work_type, PermitStatus, WorkType},
    site_time,
    work_permit::WorkPermit,
};

pub const PAGE_SIZE: u64 = 10;
pub const ALL_STATUSES: &str = "All";
/// Highest page whose offset still fits the store's signed 64-bit `$skip`.
pub const MAX_PAGE: u64 = i64::MAX as u64 / PAGE_SIZE;

const SEARCH_FIELDS: [&str; 4] = ["work_permit_no", "requester_name", "work_type", "status"];
const DATE_FIELDS: [&str; 2] = ["create_date", "approve_date"];

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortColumn {
    WorkPermitNo,
    RequesterName,
    WorkType,
    Status,
    #[default]
    CreateDate,
    ApproveDate,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}
/// Raw listing parameters as the dashboard sends them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkPermitListParams {
    pub query: Option<String>,
    pub page: Option<String>,
    pub sort_column: Option<String>,
    pub sort_direction: Option<String>,
    pub status: Option<String>,
}
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkPermitListQuery {
    pub query: String,
    pub page: u64,
    pub sort_column: SortColumn,
    pub sort_direction: SortDirection,
    pub status: String,
}
#[derive(Debug, Deserialize)]
struct WorkPermitSummaryRow {
    work_permit_id: String,
    #[serde(default)]
    work_permit_no: String,
    requester_name: String,
    #[serde(default, deserialize_with = "coerce_work_type")]
    work_type: WorkType,
    #[serde(default, deserialize_with = "coerce_status")]
    status: PermitStatus,
    create_date: Option<DateTime>,
    approve_date: Option<DateTime>,
    approver: String,
}
#[derive(Debug, Serialize)]
pub struct WorkPermitSummary {
    pub work_permit_id: String,
    pub work_permit_no: String,
    pub requester_name: String,
    pub work_type: WorkType,
    pub status: PermitStatus,
    pub create_date: Option<ChronoDateTime<FixedOffset>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approve_date: Option<ChronoDateTime<FixedOffset>>,
    pub approver: String,
}

impl SortColumn {
    /// Unknown columns sort by creation date.
    pub fn from_param(value: &str) -> Self {
        match value {
            "work_permit_no" => Self::WorkPermitNo,
            "requester_name" => Self::RequesterName,
            "work_type" => Self::WorkType,
            "status" => Self::Status,
            "approve_date" => Self::ApproveDate,
            _ => Self::CreateDate,
        }
    }
    pub fn field(&self) -> &'static str {
        match self {
            Self::WorkPermitNo => "work_permit_no",
            Self::RequesterName => "requester_name",
            Self::WorkType => "work_type",
            Self::Status => "status",
            Self::CreateDate => "create_date",
            Self::ApproveDate => "approve_date",
        }
    }
}

impl SortDirection {
    pub fn from_param(value: &str) -> Self {
        if value.eq_ignore_ascii_case("asc") {
            Self::Asc
        } else {
            Self::Desc
        }
    }
    pub fn order(&self) -> i32 {
        match self {
            Self::Asc => 1,
            Self::Desc => -1,
        }
    }
}

impl From<WorkPermitListParams> for WorkPermitListQuery {
    fn from(params: WorkPermitListParams) -> Self {
        let page = params
            .page
            .and_then(|page| page.trim().parse::<u64>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_PAGE);

        WorkPermitListQuery {
            query: params.query.unwrap_or_default(),
            page,
            sort_column: params
                .sort_column
                .map(|column| SortColumn::from_param(&column))
                .unwrap_or_default(),
            sort_direction: params
                .sort_direction
                .map(|direction| SortDirection::from_param(&direction))
                .unwrap_or_default(),
            status: params
                .status
                .filter(|status| !status.is_empty())
                .unwrap_or_else(|| ALL_STATUSES.to_string()),
        }
    }
}

impl WorkPermitListQuery {
    pub fn skip(&self) -> u64 {
        (self.page.clamp(1, MAX_PAGE) - 1) * PAGE_SIZE
    }
}

pub fn page_count(total: u64) -> u64 {
    total.div_ceil(PAGE_SIZE)
}

/// Case-insensitive substring match over the searchable text fields, plus a
/// date match when the search text reads as a date.
pub fn search_filter(query: &str, offset: FixedOffset) -> Document {
    let pattern = regex::escape(query);
    let mut any: Vec<Document> = Vec::new();

    for field in SEARCH_FIELDS {
        let mut condition = Document::new();
        condition.insert(field, doc! { "$regex": pattern.as_str(), "$options": "i" });
        any.push(condition);
    }
    if let Some((start, end)) = site_time::search_range(query, offset) {
        for field in DATE_FIELDS {
            let mut condition = Document::new();
            condition.insert(field, doc! { "$gte": start, "$lt": end });
            any.push(condition);
        }
    }

    doc! { "$or": any }
}

pub fn list_filter(query: &str, status: &str, offset: FixedOffset) -> Document {
    let search = search_filter(query, offset);
    if status == ALL_STATUSES {
        search
    } else {
        doc! { "$and": [search, { "status": status }] }
    }
}

fn summary_stages() -> Vec<Document> {
    vec![
        doc! {
            "$lookup": {
                "from": "users",
                "localField": "approver_id",
                "foreignField": "_id",
                "as": "approver"
            }
        },
        doc! {
            "$project": {
                "_id": 0,
                "work_permit_id": { "$toString": "$_id" },
                "work_permit_no": "$work_permit_no",
                "requester_name": { "$ifNull": ["$requester_name", ""] },
                "work_type": "$work_type",
                "status": "$status",
                "create_date": "$create_date",
                "approve_date": "$approve_date",
                "approver": {
                    "$ifNull": [{ "$arrayElemAt": ["$approver.user_name", 0] }, "N/A"]
                },
            }
        },
    ]
}

pub fn list_pipeline(list: &WorkPermitListQuery, offset: FixedOffset) -> Vec<Document> {
    let mut sort = Document::new();
    sort.insert(list.sort_column.field(), list.sort_direction.order());
    sort.insert("_id", list.sort_direction.order());

    let mut pipeline = vec![
        doc! { "$match": list_filter(&list.query, &list.status, offset) },
        doc! { "$sort": sort },
        doc! { "$skip": list.skip() as i64 },
        doc! { "$limit": PAGE_SIZE as i64 },
    ];
    pipeline.extend(summary_stages());
    pipeline
}

pub fn latest_pipeline() -> Vec<Document> {
    let mut pipeline = vec![doc! { "$sort": { "create_date": -1, "_id": -1 } }];
    pipeline.extend(summary_stages());
    pipeline
}

impl WorkPermit {
    pub async fn count_pages(query: &str, offset: FixedOffset) -> AppResult<u64> {
        let db: Database = get_db()?;
        let collection: Collection<WorkPermit> = db.collection::<WorkPermit>("work-permits");

        let total = collection
            .count_documents(search_filter(query, offset), None)
            .await?;
        Ok(page_count(total))
    }
    pub async fn list_filtered(
        list: &WorkPermitListQuery,
        offset: FixedOffset,
    ) -> AppResult<Vec<WorkPermitSummary>> {
        Self::summaries(list_pipeline(list, offset), offset).await
    }
    pub async fn list_latest(offset: FixedOffset) -> AppResult<Vec<WorkPermitSummary>> {
        Self::summaries(latest_pipeline(), offset).await
    }
    async fn summaries(
        pipeline: Vec<Document>,
        offset: FixedOffset,
    ) -> AppResult<Vec<WorkPermitSummary>> {
        let db: Database = get_db()?;
        let collection: Collection<WorkPermit> = db.collection::<WorkPermit>("work-permits");

        let mut summaries: Vec<WorkPermitSummary> = Vec::new();
        let mut cursor = collection.aggregate(pipeline, None).await?;
        while let Some(doc) = cursor.next().await {
            let row = from_document::<WorkPermitSummaryRow>(doc?)?;
            summaries.push(WorkPermitSummary::from_row(row, offset));
        }
        Ok(summaries)
    }
}

impl WorkPermitSummary {
    fn from_row(row: WorkPermitSummaryRow, offset: FixedOffset) -> Self {
        WorkPermitSummary {
            work_permit_id: row.work_permit_id,
            work_permit_no: row.work_permit_no,
            requester_name: row.requester_name,
            work_type: row.work_type,
            status: row.status,
            create_date: row.create_date.and_then(|v| site_time::to_site(&v, offset)),
            approve_date: row.approve_date.and_then(|v| site_time::to_site(&v, offset)),
            approver: row.approver,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::Bson;

    fn bangkok() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn params(value: serde_json::Value) -> WorkPermitListQuery {
        serde_json::from_value::<WorkPermitListParams>(value)
            .unwrap()
            .into()
    }

    fn stage<'a>(pipeline: &'a [Document], name: &str) -> &'a Document {
        pipeline
            .iter()
            .find_map(|stage| stage.get_document(name).ok())
            .unwrap()
    }

    #[test]
    fn missing_params_use_dashboard_defaults() {
        let list = params(serde_json::json!({}));
        assert_eq!(
            list,
            WorkPermitListQuery {
                query: String::new(),
                page: 1,
                sort_column: SortColumn::CreateDate,
                sort_direction: SortDirection::Desc,
                status: "All".to_string(),
            }
        );
    }

    #[test]
    fn camel_case_params_are_read() {
        let list = params(serde_json::json!({
            "query": "weld",
            "page": "3",
            "sortColumn": "requester_name",
            "sortDirection": "asc",
            "status": "Real Time",
        }));
        assert_eq!(list.page, 3);
        assert_eq!(list.skip(), 20);
        assert_eq!(list.sort_column, SortColumn::RequesterName);
        assert_eq!(list.sort_direction, SortDirection::Asc);
        assert_eq!(list.status, "Real Time");
    }

    #[test]
    fn bad_page_and_sort_fall_back() {
        let list = params(serde_json::json!({
            "page": "zero",
            "sortColumn": "password",
            "sortDirection": "sideways",
        }));
        assert_eq!(list.page, 1);
        assert_eq!(list.skip(), 0);
        assert_eq!(list.sort_column, SortColumn::CreateDate);
        assert_eq!(list.sort_direction, SortDirection::Desc);

        assert_eq!(params(serde_json::json!({ "page": "0" })).page, 1);
    }

    #[test]
    fn huge_page_is_clamped_to_a_valid_skip() {
        let list = params(serde_json::json!({ "page": "18446744073709551615" }));
        assert_eq!(list.page, MAX_PAGE);
        assert!(list.skip() <= i64::MAX as u64);

        let pipeline = list_pipeline(
            &params(serde_json::json!({ "page": "1000000000000000000" })),
            bangkok(),
        );
        assert!(pipeline[2].get_i64("$skip").unwrap() >= 0);
    }

    #[test]
    fn page_count_bounds_every_total() {
        for total in 0..=125_u64 {
            let pages = page_count(total);
            assert!(pages * PAGE_SIZE >= total, "total {total}");
            if total > 0 {
                assert!(total > (pages - 1) * PAGE_SIZE, "total {total}");
            } else {
                assert_eq!(pages, 0);
            }
        }
    }

    #[test]
    fn search_is_case_insensitive_and_escaped() {
        let filter = search_filter("HW_001 (a+b)", bangkok());
        let any = filter.get_array("$or").unwrap();
        assert_eq!(any.len(), SEARCH_FIELDS.len());

        let first = any[0].as_document().unwrap();
        let condition = first.get_document("work_permit_no").unwrap();
        assert_eq!(condition.get_str("$regex").unwrap(), r"HW_001 \(a\+b\)");
        assert_eq!(condition.get_str("$options").unwrap(), "i");
    }

    #[test]
    fn date_search_adds_date_ranges() {
        let filter = search_filter("2024-11-13", bangkok());
        let any = filter.get_array("$or").unwrap();
        assert_eq!(any.len(), SEARCH_FIELDS.len() + DATE_FIELDS.len());
        let last = any.last().and_then(Bson::as_document).unwrap();
        assert!(last.get_document("approve_date").unwrap().contains_key("$gte"));
    }

    #[test]
    fn all_status_adds_no_status_condition() {
        let filter = list_filter("", ALL_STATUSES, bangkok());
        assert!(filter.contains_key("$or"));
        assert!(!filter.contains_key("$and"));
    }

    #[test]
    fn specific_status_is_matched_exactly() {
        let filter = list_filter("", "Work Permit Approved", bangkok());
        let all = filter.get_array("$and").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(
            all[1].as_document().unwrap(),
            &doc! { "status": "Work Permit Approved" }
        );
    }

    #[test]
    fn list_pipeline_sorts_then_pages() {
        let list = params(serde_json::json!({
            "page": "2",
            "sortColumn": "work_permit_no",
            "sortDirection": "asc",
        }));
        let pipeline = list_pipeline(&list, bangkok());

        assert_eq!(
            stage(&pipeline, "$sort"),
            &doc! { "work_permit_no": 1, "_id": 1 }
        );
        assert_eq!(pipeline[2].get_i64("$skip").unwrap(), 10);
        assert_eq!(pipeline[3].get_i64("$limit").unwrap(), 10);
    }

    #[test]
    fn missing_approver_projects_na() {
        let pipeline = latest_pipeline();
        let project = stage(&pipeline, "$project");
        let approver = project.get_document("approver").unwrap();
        let fallback = approver.get_array("$ifNull").unwrap();
        assert_eq!(fallback[1], Bson::String("N/A".to_string()));
    }

    #[test]
    fn summary_row_coerces_status_and_renders_dates() {
        let row: WorkPermitSummaryRow = from_document(doc! {
            "work_permit_id": "65a1",
            "work_permit_no": "CW_002",
            "requester_name": "Somchai",
            "work_type": "Coldwork",
            "status": "Escalated",
            "create_date": DateTime::from_millis(1_731_461_400_000),
            "approver": "N/A",
        })
        .unwrap();
        let summary = WorkPermitSummary::from_row(row, bangkok());

        assert_eq!(summary.status, PermitStatus::Draft);
        assert_eq!(summary.work_type, WorkType::Coldwork);
        assert!(summary.approve_date.is_none());
        assert_eq!(
            summary.create_date.unwrap().to_rfc3339(),
            "2024-11-13T08:30:00+07:00"
        );

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "Draft");
        assert!(json.get("approve_date").is_none());
    }
}
