use crate::{database::get_db, error::AppResult};
use futures::stream::StreamExt;
use mongodb::{
    bson::{doc, from_document, oid::ObjectId, Document},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use serde::{Deserialize, Serialize};

use super::role::{AssignedRole, Role, RoleAssignment, WORKER_ROLE};

pub const ACTIVE_STATUS: &str = "Active";

#[derive(Debug, Deserialize, Serialize)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub user_name: String,
    pub email: String,
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default)]
    pub status: String,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct UserLoginRequest {
    pub email: String,
    pub role: String,
}
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLoginResponse {
    pub user_id: String,
    pub username: String,
    pub role: String,
    pub token: String,
}
#[derive(Debug)]
pub struct UserWithRoles {
    pub _id: ObjectId,
    pub user_name: String,
    pub roles: Vec<AssignedRole>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct WorkerResponse {
    pub user_id: String,
    pub user_name: String,
    pub email: String,
    pub title: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    pub async fn create_indexes() -> AppResult<()> {
        let db: Database = get_db()?;
        let collection: Collection<User> = db.collection::<User>("users");

        let index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        collection.create_index(index, None).await?;
        Ok(())
    }
    pub async fn find_by_id(_id: &ObjectId) -> AppResult<Option<User>> {
        let db: Database = get_db()?;
        let collection: Collection<User> = db.collection::<User>("users");

        Ok(collection.find_one(doc! { "_id": _id }, None).await?)
    }
    pub async fn find_by_email(email: &str) -> AppResult<Option<User>> {
        let db: Database = get_db()?;
        let collection: Collection<User> = db.collection::<User>("users");

        Ok(collection.find_one(doc! { "email": email }, None).await?)
    }
    pub async fn find_with_roles(email: &str) -> AppResult<Option<UserWithRoles>> {
        let (_id, user_name) = match Self::find_by_email(email).await? {
            Some(User {
                _id: Some(_id),
                user_name,
                ..
            }) => (_id, user_name),
            _ => return Ok(None),
        };
        let roles = RoleAssignment::find_roles_of_user(&_id).await?;

        Ok(Some(UserWithRoles {
            _id,
            user_name,
            roles,
        }))
    }
    pub fn workers_pipeline(role_id: &ObjectId) -> Vec<Document> {
        vec![
            doc! { "$match": { "status": ACTIVE_STATUS } },
            doc! {
                "$lookup": {
                    "from": "user-roles",
                    "localField": "_id",
                    "foreignField": "user_id",
                    "as": "assignments"
                }
            },
            doc! {
                "$match": {
                    "assignments": {
                        "$elemMatch": { "role_id": role_id, "is_active": { "$ne": false } }
                    }
                }
            },
            doc! { "$sort": { "first_name": 1 } },
            doc! {
                "$project": {
                    "_id": 0,
                    "user_id": { "$toString": "$_id" },
                    "user_name": "$user_name",
                    "email": "$email",
                    "title": "$title",
                    "first_name": "$first_name",
                    "last_name": "$last_name",
                }
            },
        ]
    }
    pub async fn find_workers() -> AppResult<Vec<WorkerResponse>> {
        let db: Database = get_db()?;
        let collection: Collection<User> = db.collection::<User>("users");

        let role = match Role::find_by_name(WORKER_ROLE).await? {
            Some(Role { _id: Some(_id), .. }) => _id,
            _ => return Ok(Vec::new()),
        };

        let mut workers: Vec<WorkerResponse> = Vec::new();
        let mut cursor = collection
            .aggregate(Self::workers_pipeline(&role), None)
            .await?;
        while let Some(doc) = cursor.next().await {
            workers.push(from_document::<WorkerResponse>(doc?)?);
        }
        Ok(workers)
    }
}

impl UserWithRoles {
    /// The assignment that lets this user sign in under `role`, if any.
    pub fn active_role(&self, role: &str) -> Option<&AssignedRole> {
        self.roles
            .iter()
            .find(|assigned| assigned.is_active && assigned.role_name == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with(roles: &[(&str, bool)]) -> UserWithRoles {
        UserWithRoles {
            _id: ObjectId::new(),
            user_name: "somchai".to_string(),
            roles: roles
                .iter()
                .map(|(name, active)| AssignedRole {
                    role_name: name.to_string(),
                    is_active: *active,
                })
                .collect(),
        }
    }

    #[test]
    fn login_requires_the_named_role() {
        let user = user_with(&[("Approver", true)]);
        assert!(user.active_role("Worker").is_none());
        assert!(user.active_role("Approver").is_some());
    }

    #[test]
    fn inactive_assignment_does_not_count() {
        let user = user_with(&[("Worker", false), ("Approver", true)]);
        assert!(user.active_role("Worker").is_none());
    }

    #[test]
    fn role_names_match_exactly() {
        let user = user_with(&[("Worker", true)]);
        assert!(user.active_role("worker").is_none());
        assert_eq!(user.active_role("Worker").map(|r| r.role_name.as_str()), Some("Worker"));
    }

    #[test]
    fn workers_are_sorted_by_first_name() {
        let pipeline = User::workers_pipeline(&ObjectId::new());
        assert!(pipeline
            .iter()
            .any(|stage| stage.get_document("$sort").ok() == Some(&doc! { "first_name": 1 })));
        assert_eq!(
            pipeline[0].get_document("$match").unwrap(),
            &doc! { "status": "Active" }
        );
    }
}
