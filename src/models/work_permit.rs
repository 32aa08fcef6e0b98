use crate::{
    database::get_db,
    error::{AppError, AppResult},
};
use chrono::{DateTime as ChronoDateTime, FixedOffset, Utc};
use mongodb::{
    bson::{doc, oid::ObjectId, Bson, DateTime, Document},
    options::{FindOneAndUpdateOptions, IndexOptions, ReturnDocument, UpdateOptions},
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{
    permit_status::{coerce_status, coerce_work_type, PermitStatus, WorkType},
    session::Session,
    site_time,
    user::User,
};

const UNKNOWN_REQUESTER: &str = "Unknown Requester";
const UNKNOWN_WORKER: &str = "Unknown Worker";
const UNKNOWN_DEPARTMENT: &str = "Unknown Department";
const NO_EQUIPMENT: &str = "None";
const UNKNOWN_EMERGENCY_CONTACT: &str = "Unknown Emergency Contact";
const NO_MOBILE_NO: &str = "0000000000";

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct WorkPermit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub work_permit_no: String,
    #[serde(default, deserialize_with = "coerce_work_type")]
    pub work_type: WorkType,
    #[serde(default, deserialize_with = "coerce_status")]
    pub status: PermitStatus,
    #[serde(default)]
    pub requester_name: String,
    #[serde(default)]
    pub worker_name: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub work_description: String,
    #[serde(default)]
    pub is_high_area: bool,
    #[serde(default)]
    pub use_welding_helmet: bool,
    #[serde(default)]
    pub use_leather_gloves: bool,
    #[serde(default)]
    pub use_full_body_harness: bool,
    #[serde(default)]
    pub use_safety_belt: bool,
    #[serde(default)]
    pub other_safety_equipment: String,
    pub working_start_date: Option<DateTime>,
    pub working_end_date: Option<DateTime>,
    pub approve_date: Option<DateTime>,
    #[serde(default)]
    pub emergency_person_name: String,
    #[serde(default)]
    pub emergency_mobile_no: String,
    pub id_card_file_path: Option<String>,
    pub other_document_file_path: Option<String>,
    pub approver_id: Option<ObjectId>,
    #[serde(default)]
    pub reject_reason_1: String,
    #[serde(default)]
    pub reject_reason_2: String,
    #[serde(default = "WorkPermit::default_is_active")]
    pub is_active: bool,
    pub create_date: DateTime,
    pub create_by: Option<String>,
}
#[derive(Debug, Deserialize, Serialize)]
struct PermitCounter {
    _id: String,
    seq: i64,
}
#[derive(Debug, Deserialize, Validate)]
pub struct WorkPermitRequest {
    #[validate(length(min = 1, max = 100))]
    pub requester_name: String,
    pub work_type: WorkType,
    #[serde(default)]
    pub status: PermitStatus,
    pub worker_name: Option<String>,
    pub department: Option<String>,
    #[validate(length(max = 1000))]
    pub work_description: Option<String>,
    #[serde(default)]
    pub is_high_area: bool,
    #[serde(default)]
    pub use_welding_helmet: bool,
    #[serde(default)]
    pub use_leather_gloves: bool,
    #[serde(default)]
    pub use_full_body_harness: bool,
    #[serde(default)]
    pub use_safety_belt: bool,
    pub other_safety_equipment: Option<String>,
    #[validate(length(min = 1))]
    pub working_start_date: String,
    #[validate(length(min = 1))]
    pub working_end_date: String,
    pub approve_date: Option<String>,
    pub emergency_person_name: Option<String>,
    pub emergency_mobile_no: Option<String>,
    pub id_card_file_path: Option<String>,
    pub other_document_file_path: Option<String>,
    pub approver_id: Option<String>,
}
/// Partial update. An absent field keeps the stored value; a present one,
/// `false` and `""` included, replaces it. `""` clears nullable fields.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct WorkPermitPatch {
    #[validate(length(min = 1, max = 100))]
    pub requester_name: Option<String>,
    pub work_type: Option<WorkType>,
    pub status: Option<PermitStatus>,
    pub worker_name: Option<String>,
    pub department: Option<String>,
    #[validate(length(max = 1000))]
    pub work_description: Option<String>,
    pub is_high_area: Option<bool>,
    pub use_welding_helmet: Option<bool>,
    pub use_leather_gloves: Option<bool>,
    pub use_full_body_harness: Option<bool>,
    pub use_safety_belt: Option<bool>,
    pub other_safety_equipment: Option<String>,
    pub working_start_date: Option<String>,
    pub working_end_date: Option<String>,
    pub approve_date: Option<String>,
    pub emergency_person_name: Option<String>,
    pub emergency_mobile_no: Option<String>,
    pub id_card_file_path: Option<String>,
    pub other_document_file_path: Option<String>,
    pub approver_id: Option<String>,
    pub reject_reason_1: Option<String>,
    pub reject_reason_2: Option<String>,
    pub is_active: Option<bool>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct WorkPermitSaved {
    pub work_permit_id: String,
    pub work_permit_no: String,
    pub redirect: String,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct WorkPermitResponse {
    pub work_permit_id: String,
    pub work_permit_no: String,
    pub work_type: WorkType,
    pub status: PermitStatus,
    pub requester_name: String,
    pub worker_name: String,
    pub department: String,
    pub work_description: String,
    pub is_high_area: bool,
    pub use_welding_helmet: bool,
    pub use_leather_gloves: bool,
    pub use_full_body_harness: bool,
    pub use_safety_belt: bool,
    pub other_safety_equipment: String,
    pub working_start_date: Option<ChronoDateTime<FixedOffset>>,
    pub working_end_date: Option<ChronoDateTime<FixedOffset>>,
    pub approve_date: Option<ChronoDateTime<FixedOffset>>,
    pub emergency_person_name: String,
    pub emergency_mobile_no: String,
    pub id_card_file_path: Option<String>,
    pub other_document_file_path: Option<String>,
    pub approver_id: Option<String>,
    pub reject_reason_1: String,
    pub reject_reason_2: String,
    pub is_active: bool,
    pub create_date: Option<ChronoDateTime<FixedOffset>>,
    pub create_by: Option<String>,
}
#[derive(Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct StatusCounts {
    pub draft: u64,
    pub approved: u64,
    pub real_time: u64,
    pub closed: u64,
}

fn backfill(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(value) if !value.trim().is_empty() => value,
        _ => fallback.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn parse_date(value: Option<String>, offset: FixedOffset) -> AppResult<Option<DateTime>> {
    match non_empty(value) {
        Some(value) => site_time::parse(&value, offset).map(Some),
        None => Ok(None),
    }
}

fn highest_sequence(work_type: &WorkType, numbers: &[Bson]) -> u64 {
    numbers
        .iter()
        .filter_map(Bson::as_str)
        .filter_map(|number| work_type.sequence_of(number))
        .max()
        .unwrap_or(0)
}

fn active_filter(_id: &ObjectId) -> Document {
    doc! { "_id": _id, "is_active": true }
}

fn parse_approver(value: Option<String>) -> AppResult<Option<ObjectId>> {
    match non_empty(value) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| AppError::Validation(format!("approver_id: {value}"))),
        None => Ok(None),
    }
}

impl WorkPermit {
    fn default_is_active() -> bool {
        true
    }

    /// Builds an unsaved permit from a create request. The number is assigned
    /// later, once the sequence is allocated.
    pub fn from_request(
        request: WorkPermitRequest,
        create_by: Option<String>,
        now: ChronoDateTime<Utc>,
        offset: FixedOffset,
    ) -> AppResult<WorkPermit> {
        request.validate()?;
        if !request.status.is_initial() {
            return Err(AppError::Validation(format!(
                "status: a new permit cannot start as {}",
                request.status
            )));
        }

        Ok(WorkPermit {
            _id: None,
            work_permit_no: String::new(),
            work_type: request.work_type,
            status: request.status,
            requester_name: backfill(Some(request.requester_name), UNKNOWN_REQUESTER),
            worker_name: backfill(request.worker_name, UNKNOWN_WORKER),
            department: backfill(request.department, UNKNOWN_DEPARTMENT),
            work_description: request.work_description.unwrap_or_default(),
            is_high_area: request.is_high_area,
            use_welding_helmet: request.use_welding_helmet,
            use_leather_gloves: request.use_leather_gloves,
            use_full_body_harness: request.use_full_body_harness,
            use_safety_belt: request.use_safety_belt,
            other_safety_equipment: backfill(request.other_safety_equipment, NO_EQUIPMENT),
            working_start_date: Some(site_time::parse(&request.working_start_date, offset)?),
            working_end_date: Some(site_time::parse(&request.working_end_date, offset)?),
            approve_date: parse_date(request.approve_date, offset)?,
            emergency_person_name: backfill(
                request.emergency_person_name,
                UNKNOWN_EMERGENCY_CONTACT,
            ),
            emergency_mobile_no: backfill(request.emergency_mobile_no, NO_MOBILE_NO),
            id_card_file_path: non_empty(request.id_card_file_path),
            other_document_file_path: non_empty(request.other_document_file_path),
            approver_id: parse_approver(request.approver_id)?,
            reject_reason_1: String::new(),
            reject_reason_2: String::new(),
            is_active: true,
            create_date: site_time::to_bson(now),
            create_by,
        })
    }

    pub fn apply_patch(&mut self, patch: WorkPermitPatch, offset: FixedOffset) -> AppResult<()> {
        patch.validate()?;

        if let Some(work_type) = patch.work_type {
            if work_type != self.work_type {
                return Err(AppError::Validation(format!(
                    "work_type is fixed by permit number {}",
                    self.work_permit_no
                )));
            }
        }
        if let Some(status) = patch.status {
            if !self.status.can_transition_to(&status) {
                return Err(AppError::InvalidTransition {
                    from: self.status.to_string(),
                    to: status.to_string(),
                });
            }
            self.status = status;
        }

        if let Some(value) = patch.requester_name {
            self.requester_name = value;
        }
        if let Some(value) = patch.worker_name {
            self.worker_name = backfill(Some(value), UNKNOWN_WORKER);
        }
        if let Some(value) = patch.department {
            self.department = backfill(Some(value), UNKNOWN_DEPARTMENT);
        }
        if let Some(value) = patch.work_description {
            self.work_description = value;
        }
        if let Some(value) = patch.other_safety_equipment {
            self.other_safety_equipment = backfill(Some(value), NO_EQUIPMENT);
        }
        if let Some(value) = patch.emergency_person_name {
            self.emergency_person_name = backfill(Some(value), UNKNOWN_EMERGENCY_CONTACT);
        }
        if let Some(value) = patch.emergency_mobile_no {
            self.emergency_mobile_no = backfill(Some(value), NO_MOBILE_NO);
        }

        for (flag, value) in [
            (&mut self.is_high_area, patch.is_high_area),
            (&mut self.use_welding_helmet, patch.use_welding_helmet),
            (&mut self.use_leather_gloves, patch.use_leather_gloves),
            (&mut self.use_full_body_harness, patch.use_full_body_harness),
            (&mut self.use_safety_belt, patch.use_safety_belt),
            (&mut self.is_active, patch.is_active),
        ] {
            if let Some(value) = value {
                *flag = value;
            }
        }

        if patch.working_start_date.is_some() {
            self.working_start_date = parse_date(patch.working_start_date, offset)?;
        }
        if patch.working_end_date.is_some() {
            self.working_end_date = parse_date(patch.working_end_date, offset)?;
        }
        if patch.approve_date.is_some() {
            self.approve_date = parse_date(patch.approve_date, offset)?;
        }
        if patch.approver_id.is_some() {
            self.approver_id = parse_approver(patch.approver_id)?;
        }
        if patch.id_card_file_path.is_some() {
            self.id_card_file_path = non_empty(patch.id_card_file_path);
        }
        if patch.other_document_file_path.is_some() {
            self.other_document_file_path = non_empty(patch.other_document_file_path);
        }
        if let Some(value) = patch.reject_reason_1 {
            self.reject_reason_1 = value;
        }
        if let Some(value) = patch.reject_reason_2 {
            self.reject_reason_2 = value;
        }

        Ok(())
    }

    pub fn into_response(self, offset: FixedOffset) -> WorkPermitResponse {
        let site = |value: Option<DateTime>| value.and_then(|v| site_time::to_site(&v, offset));

        WorkPermitResponse {
            work_permit_id: self._id.map(|id| id.to_hex()).unwrap_or_default(),
            work_permit_no: self.work_permit_no,
            work_type: self.work_type,
            status: self.status,
            requester_name: self.requester_name,
            worker_name: self.worker_name,
            department: self.department,
            work_description: self.work_description,
            is_high_area: self.is_high_area,
            use_welding_helmet: self.use_welding_helmet,
            use_leather_gloves: self.use_leather_gloves,
            use_full_body_harness: self.use_full_body_harness,
            use_safety_belt: self.use_safety_belt,
            other_safety_equipment: self.other_safety_equipment,
            working_start_date: site(self.working_start_date),
            working_end_date: site(self.working_end_date),
            approve_date: site(self.approve_date),
            emergency_person_name: self.emergency_person_name,
            emergency_mobile_no: self.emergency_mobile_no,
            id_card_file_path: self.id_card_file_path,
            other_document_file_path: self.other_document_file_path,
            approver_id: self.approver_id.map(|id| id.to_hex()),
            reject_reason_1: self.reject_reason_1,
            reject_reason_2: self.reject_reason_2,
            is_active: self.is_active,
            create_date: site(Some(self.create_date)),
            create_by: self.create_by,
        }
    }

    /// Where the dashboard goes after an update: back to the list after an
    /// approval decision, otherwise back to the edit form.
    pub fn update_redirect(work_permit_id: &str, approval: bool) -> String {
        if approval {
            "/dashboard/".to_string()
        } else {
            format!("/dashboard/work-permit/{work_permit_id}/edit")
        }
    }

    pub async fn create_indexes() -> AppResult<()> {
        let db: Database = get_db()?;
        let collection: Collection<WorkPermit> = db.collection::<WorkPermit>("work-permits");

        let index = IndexModel::builder()
            .keys(doc! { "work_permit_no": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        collection.create_index(index, None).await?;
        Ok(())
    }
    /// Raises each per-type counter to at least the highest number already
    /// issued under that type.
    pub async fn sync_sequences() -> AppResult<()> {
        let db: Database = get_db()?;
        let permits: Collection<WorkPermit> = db.collection::<WorkPermit>("work-permits");
        let counters: Collection<PermitCounter> = db.collection::<PermitCounter>("counters");

        for work_type in [
            WorkType::Hotwork,
            WorkType::Coldwork,
            WorkType::PreventiveMaintenance,
        ] {
            let pattern = format!("^{}_", work_type.prefix());
            let numbers = permits
                .distinct(
                    "work_permit_no",
                    doc! { "work_permit_no": { "$regex": pattern } },
                    None,
                )
                .await?;
            let highest = highest_sequence(&work_type, &numbers);
            counters
                .update_one(
                    doc! { "_id": work_type.prefix() },
                    doc! { "$max": { "seq": highest as i64 } },
                    UpdateOptions::builder().upsert(true).build(),
                )
                .await?;
            tracing::info!(prefix = work_type.prefix(), seq = highest, "permit counter synced");
        }
        Ok(())
    }
    pub async fn next_sequence(work_type: &WorkType) -> AppResult<u64> {
        let db: Database = get_db()?;
        let counters: Collection<PermitCounter> = db.collection::<PermitCounter>("counters");

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let counter = counters
            .find_one_and_update(
                doc! { "_id": work_type.prefix() },
                doc! { "$inc": { "seq": 1_i64 } },
                options,
            )
            .await?
            .ok_or(AppError::NotFound("PERMIT_COUNTER"))?;

        Ok(counter.seq.max(0) as u64)
    }
    pub async fn save(&mut self) -> AppResult<ObjectId> {
        let db: Database = get_db()?;
        let collection: Collection<WorkPermit> = db.collection::<WorkPermit>("work-permits");

        let _id = ObjectId::new();
        self._id = Some(_id);

        collection.insert_one(&*self, None).await?;
        Ok(_id)
    }
    pub async fn update(&self) -> AppResult<ObjectId> {
        let db: Database = get_db()?;
        let collection: Collection<WorkPermit> = db.collection::<WorkPermit>("work-permits");

        let _id = self._id.ok_or(AppError::NotFound("WORK_PERMIT"))?;
        let result = collection
            .replace_one(doc! { "_id": _id }, self, None)
            .await?;
        if result.matched_count == 0 {
            return Err(AppError::NotFound("WORK_PERMIT"));
        }
        Ok(_id)
    }
    /// Loads a permit that has not been deactivated.
    pub async fn find_active_by_id(_id: &ObjectId) -> AppResult<Option<WorkPermit>> {
        let db: Database = get_db()?;
        let collection: Collection<WorkPermit> = db.collection::<WorkPermit>("work-permits");

        Ok(collection.find_one(active_filter(_id), None).await?)
    }
    pub async fn find_detail(
        _id: &ObjectId,
        offset: FixedOffset,
    ) -> AppResult<Option<WorkPermitResponse>> {
        Ok(Self::find_active_by_id(_id)
            .await?
            .map(|permit| permit.into_response(offset)))
    }
    pub async fn count_by_status(status: &PermitStatus) -> AppResult<u64> {
        let db: Database = get_db()?;
        let collection: Collection<WorkPermit> = db.collection::<WorkPermit>("work-permits");

        Ok(collection
            .count_documents(doc! { "status": status.as_str() }, None)
            .await?)
    }
    pub async fn count_draft() -> AppResult<u64> {
        Self::count_by_status(&PermitStatus::Draft).await
    }
    pub async fn count_approved() -> AppResult<u64> {
        Self::count_by_status(&PermitStatus::Approved).await
    }
    pub async fn count_real_time() -> AppResult<u64> {
        Self::count_by_status(&PermitStatus::RealTime).await
    }
    pub async fn count_closed() -> AppResult<u64> {
        Self::count_by_status(&PermitStatus::Closed).await
    }

    pub async fn create(
        request: WorkPermitRequest,
        session: &Session,
        offset: FixedOffset,
    ) -> AppResult<WorkPermitSaved> {
        let mut permit =
            Self::from_request(request, Some(session.username.clone()), Utc::now(), offset)?;
        if let Some(approver_id) = &permit.approver_id {
            User::find_by_id(approver_id)
                .await?
                .ok_or(AppError::NotFound("APPROVER"))?;
        }

        let seq = Self::next_sequence(&permit.work_type).await?;
        permit.work_permit_no = permit.work_type.permit_number(seq);
        let _id = permit.save().await?;

        tracing::info!(
            work_permit_no = %permit.work_permit_no,
            create_by = %session.username,
            "work permit created"
        );
        Ok(WorkPermitSaved {
            work_permit_id: _id.to_hex(),
            work_permit_no: permit.work_permit_no,
            redirect: "/dashboard".to_string(),
        })
    }
    pub async fn update_by_id(
        _id: &ObjectId,
        patch: WorkPermitPatch,
        session: &Session,
        offset: FixedOffset,
    ) -> AppResult<WorkPermitSaved> {
        let approval = non_empty(patch.approver_id.clone()).is_some();

        let mut permit = Self::find_active_by_id(_id)
            .await?
            .ok_or(AppError::NotFound("WORK_PERMIT"))?;
        let previous = permit.status;
        permit.apply_patch(patch, offset)?;
        if approval {
            if let Some(approver_id) = &permit.approver_id {
                User::find_by_id(approver_id)
                    .await?
                    .ok_or(AppError::NotFound("APPROVER"))?;
            }
        }
        permit.update().await?;

        tracing::info!(
            work_permit_no = %permit.work_permit_no,
            from = %previous,
            to = %permit.status,
            by = %session.username,
            "work permit updated"
        );
        let work_permit_id = _id.to_hex();
        Ok(WorkPermitSaved {
            redirect: Self::update_redirect(&work_permit_id, approval),
            work_permit_id,
            work_permit_no: permit.work_permit_no,
        })
    }
}

impl StatusCounts {
    pub async fn fetch() -> AppResult<StatusCounts> {
        Ok(StatusCounts {
            draft: WorkPermit::count_draft().await?,
            approved: WorkPermit::count_approved().await?,
            real_time: WorkPermit::count_real_time().await?,
            closed: WorkPermit::count_closed().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bangkok() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    fn request() -> WorkPermitRequest {
        serde_json::from_value(serde_json::json!({
            "requester_name": "Somchai",
            "work_type": "Hotwork",
            "working_start_date": "2024-11-13T08:00",
            "working_end_date": "2024-11-13T17:00",
            "is_high_area": true,
        }))
        .unwrap()
    }

    fn permit() -> WorkPermit {
        let mut permit =
            WorkPermit::from_request(request(), Some("admin".to_string()), Utc::now(), bangkok())
                .unwrap();
        permit._id = Some(ObjectId::new());
        permit.work_permit_no = "HW_001".to_string();
        permit
    }

    fn patch(value: serde_json::Value) -> WorkPermitPatch {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn create_backfills_missing_text() {
        let permit = permit();
        assert_eq!(permit.worker_name, "Unknown Worker");
        assert_eq!(permit.department, "Unknown Department");
        assert_eq!(permit.other_safety_equipment, "None");
        assert_eq!(permit.emergency_person_name, "Unknown Emergency Contact");
        assert_eq!(permit.emergency_mobile_no, "0000000000");
        assert_eq!(permit.status, PermitStatus::Draft);
        assert!(permit.is_active);
        assert!(permit.is_high_area);
        assert!(!permit.use_safety_belt);
        assert_eq!(permit.create_by.as_deref(), Some("admin"));
    }

    #[test]
    fn create_normalizes_dates_to_site_time() {
        let permit = permit();
        let start = site_time::to_site(&permit.working_start_date.unwrap(), bangkok()).unwrap();
        assert_eq!(start.to_rfc3339(), "2024-11-13T08:00:00+07:00");
        assert!(permit.approve_date.is_none());
    }

    #[test]
    fn create_rejects_blank_requester() {
        let mut request = request();
        request.requester_name = String::new();
        let result = WorkPermit::from_request(request, None, Utc::now(), bangkok());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn create_rejects_overlong_description() {
        let mut request = request();
        request.work_description = Some("x".repeat(1001));
        let result = WorkPermit::from_request(request, None, Utc::now(), bangkok());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn create_requires_working_dates() {
        let result = serde_json::from_value::<WorkPermitRequest>(serde_json::json!({
            "requester_name": "Somchai",
            "work_type": "PM",
        }));
        assert!(result.is_err());

        let mut request = request();
        request.working_end_date = String::new();
        let result = WorkPermit::from_request(request, None, Utc::now(), bangkok());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn create_cannot_start_mid_lifecycle() {
        let mut request = request();
        request.status = PermitStatus::Approved;
        let result = WorkPermit::from_request(request, None, Utc::now(), bangkok());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn create_rejects_malformed_approver() {
        let mut request = request();
        request.approver_id = Some("not-an-id".to_string());
        let result = WorkPermit::from_request(request, None, Utc::now(), bangkok());
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn absent_fields_keep_stored_values() {
        let mut permit = permit();
        let before = permit.clone();
        permit.apply_patch(WorkPermitPatch::default(), bangkok()).unwrap();

        assert_eq!(permit.requester_name, before.requester_name);
        assert_eq!(permit.is_high_area, before.is_high_area);
        assert_eq!(permit.working_start_date, before.working_start_date);
        assert_eq!(permit.status, before.status);
    }

    #[test]
    fn explicit_false_clears_a_flag() {
        let mut permit = permit();
        assert!(permit.is_high_area);
        permit
            .apply_patch(patch(serde_json::json!({ "is_high_area": false })), bangkok())
            .unwrap();
        assert!(!permit.is_high_area);
    }

    #[test]
    fn empty_string_clears_nullable_fields() {
        let mut permit = permit();
        permit.id_card_file_path = Some("/uploads/id.png".to_string());
        permit
            .apply_patch(
                patch(serde_json::json!({
                    "working_end_date": "",
                    "id_card_file_path": "",
                    "worker_name": "",
                })),
                bangkok(),
            )
            .unwrap();
        assert!(permit.working_end_date.is_none());
        assert!(permit.id_card_file_path.is_none());
        assert_eq!(permit.worker_name, "Unknown Worker");
    }

    #[test]
    fn approval_sets_approver_and_status() {
        let mut permit = permit();
        permit.status = PermitStatus::Requested;
        let approver = ObjectId::new();
        permit
            .apply_patch(
                patch(serde_json::json!({
                    "status": "Work Permit Approved",
                    "approver_id": approver.to_hex(),
                    "approve_date": "2024-11-13T09:00",
                })),
                bangkok(),
            )
            .unwrap();
        assert_eq!(permit.status, PermitStatus::Approved);
        assert_eq!(permit.approver_id, Some(approver));
        assert!(permit.approve_date.is_some());
    }

    #[test]
    fn illegal_transition_is_refused_and_leaves_status() {
        let mut permit = permit();
        let result = permit.apply_patch(
            patch(serde_json::json!({ "status": "Close Permit" })),
            bangkok(),
        );
        assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
        assert_eq!(permit.status, PermitStatus::Draft);
    }

    #[test]
    fn work_type_cannot_change_after_numbering() {
        let mut permit = permit();
        let result = permit.apply_patch(
            patch(serde_json::json!({ "work_type": "Coldwork" })),
            bangkok(),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));

        permit
            .apply_patch(patch(serde_json::json!({ "work_type": "Hotwork" })), bangkok())
            .unwrap();
    }

    #[test]
    fn rejection_reasons_are_recorded() {
        let mut permit = permit();
        permit.status = PermitStatus::Requested;
        permit
            .apply_patch(
                patch(serde_json::json!({
                    "status": "Work Permit Rejected",
                    "reject_reason_1": "No fire watch assigned",
                })),
                bangkok(),
            )
            .unwrap();
        assert_eq!(permit.status, PermitStatus::Rejected);
        assert_eq!(permit.reject_reason_1, "No fire watch assigned");
        assert_eq!(permit.reject_reason_2, "");
    }

    #[test]
    fn update_redirect_depends_on_approval() {
        assert_eq!(WorkPermit::update_redirect("abc", true), "/dashboard/");
        assert_eq!(
            WorkPermit::update_redirect("abc", false),
            "/dashboard/work-permit/abc/edit"
        );
    }

    #[test]
    fn response_renders_ids_and_site_dates() {
        let permit = permit();
        let _id = permit._id.unwrap();
        let response = permit.into_response(bangkok());
        assert_eq!(response.work_permit_id, _id.to_hex());
        assert_eq!(
            response.working_end_date.unwrap().to_rfc3339(),
            "2024-11-13T17:00:00+07:00"
        );
        assert!(response.approver_id.is_none());
    }

    #[test]
    fn counter_seed_follows_the_highest_issued_number() {
        let numbers = [
            Bson::String("HW_001".to_string()),
            Bson::String("HW_004".to_string()),
            Bson::String("HW_legacy".to_string()),
            Bson::String("CW_009".to_string()),
            Bson::Null,
        ];
        assert_eq!(highest_sequence(&WorkType::Hotwork, &numbers), 4);
        assert_eq!(highest_sequence(&WorkType::PreventiveMaintenance, &numbers), 0);
        assert_eq!(highest_sequence(&WorkType::Coldwork, &numbers), 9);
    }

    #[test]
    fn reads_and_updates_share_the_active_filter() {
        let _id = ObjectId::new();
        assert_eq!(active_filter(&_id), doc! { "_id": _id, "is_active": true });
    }

    #[test]
    fn stored_document_with_unknown_status_reads_as_draft() {
        let mut stored = mongodb::bson::to_document(&permit()).unwrap();
        stored.insert("status", "Archived");
        let read: WorkPermit = mongodb::bson::from_document(stored).unwrap();
        assert_eq!(read.status, PermitStatus::Draft);
    }
}
